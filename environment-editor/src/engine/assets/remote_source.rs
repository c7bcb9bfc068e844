use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use bevy::asset::io::{
    AssetReader, AssetReaderError, AssetSource, AssetSourceId, PathStream, Reader, VecReader,
};
use bevy::prelude::*;

/// URL schemes registered as asset sources, so `https://host/scan.glb` loads like any asset path.
pub const REMOTE_SCHEMES: [&str; 2] = ["http", "https"];

/// Full scan URLs, query string included, keyed by scheme and the path the reader sees.
/// Asset paths never carry the query string; it is restored on fetch.
#[derive(Resource, Clone, Default)]
pub struct RemoteUrls(Arc<RwLock<HashMap<(String, PathBuf), String>>>);

impl RemoteUrls {
    /// Registers a remote URL and returns the asset path to load it under.
    /// Returns `None` for anything other than an http(s) URL with a path.
    pub fn register(&self, url: &str) -> Option<String> {
        let (scheme, path) = split_remote_url(url)?;
        if let Ok(mut urls) = self.0.write() {
            urls.insert((scheme.to_string(), PathBuf::from(path)), url.trim().to_string());
        }
        Some(format!("{scheme}://{path}"))
    }

    fn resolve(&self, scheme: &str, path: &Path) -> String {
        self.0
            .read()
            .ok()
            .and_then(|urls| urls.get(&(scheme.to_string(), path.to_path_buf())).cloned())
            .unwrap_or_else(|| format!("{scheme}://{}", path.to_string_lossy()))
    }
}

/// Splits `https://host/a.glb?sig=1` into `("https", "host/a.glb")`.
pub fn split_remote_url(url: &str) -> Option<(&'static str, &str)> {
    let url = url.trim();
    let (scheme, rest) = url.split_once("://")?;
    let scheme = REMOTE_SCHEMES
        .into_iter()
        .find(|known| known.eq_ignore_ascii_case(scheme))?;
    let path = rest.split(['?', '#']).next().unwrap_or(rest);
    match path.split_once('/') {
        Some((host, file)) if !host.is_empty() && !file.is_empty() => Some((scheme, path)),
        _ => None,
    }
}

/// Asset reader fetching bytes over HTTP with the same client the gateway uses.
struct RemoteAssetReader {
    scheme: &'static str,
    urls: RemoteUrls,
}

impl AssetReader for RemoteAssetReader {
    async fn read<'a>(&'a self, path: &'a Path) -> Result<impl Reader + 'a, AssetReaderError> {
        let url = self.urls.resolve(self.scheme, path);
        debug!("Fetching remote asset {}", url);
        let bytes = fetch_bytes(url, path.to_path_buf()).await?;
        Ok(VecReader::new(bytes))
    }

    async fn read_meta<'a>(&'a self, path: &'a Path) -> Result<impl Reader + 'a, AssetReaderError> {
        Err::<VecReader, _>(AssetReaderError::NotFound(path.to_path_buf()))
    }

    async fn read_directory<'a>(
        &'a self,
        path: &'a Path,
    ) -> Result<Box<PathStream>, AssetReaderError> {
        Err(AssetReaderError::NotFound(path.to_path_buf()))
    }

    async fn is_directory<'a>(&'a self, _path: &'a Path) -> Result<bool, AssetReaderError> {
        Ok(false)
    }
}

async fn fetch_bytes(url: String, path: PathBuf) -> Result<Vec<u8>, AssetReaderError> {
    let (sender, receiver) = flume::bounded(1);
    ehttp::fetch(ehttp::Request::get(url), move |result| {
        let _ = sender.send(result);
    });

    let io_error = |message: String| AssetReaderError::Io(Arc::new(std::io::Error::other(message)));
    match receiver.recv_async().await {
        Ok(Ok(response)) if response.ok => Ok(response.bytes),
        Ok(Ok(response)) if response.status == 404 => Err(AssetReaderError::NotFound(path)),
        Ok(Ok(response)) => Err(AssetReaderError::HttpError(response.status)),
        Ok(Err(message)) => Err(io_error(message)),
        Err(_) => Err(io_error("request was dropped".to_string())),
    }
}

/// Registers the `http` and `https` asset sources. Must be added before `DefaultPlugins`.
pub struct RemoteAssetPlugin;

impl Plugin for RemoteAssetPlugin {
    fn build(&self, app: &mut App) {
        let urls = RemoteUrls::default();
        for scheme in REMOTE_SCHEMES {
            let urls = urls.clone();
            app.register_asset_source(
                AssetSourceId::from(scheme),
                AssetSource::build().with_reader(move || {
                    Box::new(RemoteAssetReader {
                        scheme,
                        urls: urls.clone(),
                    })
                }),
            );
        }
        app.insert_resource(urls);
    }
}
