/// File extensions (lower case, without dot) the viewer loads as scenes.
pub const SUPPORTED_SCAN_EXTENSIONS: &[&str] = &["glb", "gltf"];

/// Returns true when `url` names a renderable scan, ignoring any query string or fragment.
pub fn is_supported_scan_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit_once('.')
        .map(|(_, ext)| {
            SUPPORTED_SCAN_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}
