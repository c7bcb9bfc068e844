use bevy::asset::LoadState;
use bevy::prelude::*;
use constants::scan_formats::is_supported_scan_url;
use serde::Serialize;

use crate::editor::notice::Notice;
use crate::editor::session::{EnvironmentSession, SessionEvent};
use crate::editor::transform_store::{ScanId, TransformStore};
use crate::editor::EditorApplySet;
use crate::engine::assets::editor_config::EditorConfig;
use crate::engine::assets::remote_source::{RemoteUrls, split_remote_url};
use crate::persistence::dto::ScanDto;

pub const NO_SUPPORTED_SCANS_MESSAGE: &str = "This environment has no supported 3D models";

/// Root entity of one scan. Scene meshes are spawned beneath it.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct ScanRoot {
    pub scan_id: ScanId,
}

/// Per-scan load state. Only `Loaded` scans take part in picking.
#[derive(Component, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ScanLoad {
    Loading,
    Loaded,
    Failed(String),
    /// The file format cannot be rendered.
    Unsupported,
    /// Removal is waiting for the server.
    Deleting,
}

/// Asset path of a scan scene still to be requested.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct ScanAsset {
    pub path: String,
}

/// Scene handle polled until the scan finishes loading.
#[derive(Component, Debug, Clone)]
pub struct ScanScene(pub Handle<Scene>);

/// How a scan will be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanSource {
    /// Scene in the local asset folder.
    Scene(String),
    /// Scene fetched over http(s) from its full URL.
    Remote(String),
    Unsupported,
    /// Renderable format at a location no asset source can reach.
    Unreachable(String),
}

pub fn classify_scan(scan: &ScanDto, config: Option<&EditorConfig>) -> ScanSource {
    if !is_supported_scan_url(&scan.file_url) {
        return ScanSource::Unsupported;
    }
    let local = match config {
        Some(config) => config.scan_asset_path(&scan.file_url),
        None => Some(scan.file_url.trim().to_string()).filter(|url| !url.contains("://")),
    };
    match local {
        Some(path) => ScanSource::Scene(path),
        None if split_remote_url(&scan.file_url).is_some() => {
            ScanSource::Remote(scan.file_url.trim().to_string())
        }
        None => ScanSource::Unreachable(scan.file_url.clone()),
    }
}

/// Scan root spawning and transform sync. Runs after the frame's editor inputs
/// so a drag frame moves its scan in the same update.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanSyncSet;

pub struct ScanSyncPlugin;

impl Plugin for ScanSyncPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(Update, ScanSyncSet.after(EditorApplySet))
            .add_systems(
                Update,
                (spawn_environment_scans, apply_scan_transforms)
                    .chain()
                    .in_set(ScanSyncSet),
            );
    }
}

/// Spawns one root per scan when an environment opens and clears them when it closes.
pub fn spawn_environment_scans(
    mut commands: Commands,
    mut events: EventReader<SessionEvent>,
    session: Res<EnvironmentSession>,
    config: Option<Res<EditorConfig>>,
    remote: Option<Res<RemoteUrls>>,
    transforms: Res<TransformStore>,
    existing: Query<Entity, With<ScanRoot>>,
    mut notices: EventWriter<Notice>,
) {
    let mut reload = false;
    let mut clear = false;
    for event in events.read() {
        match event {
            SessionEvent::Loaded { .. } => reload = true,
            SessionEvent::LoadFailed { .. } | SessionEvent::Deleted { .. } => clear = true,
            _ => {}
        }
    }
    if !(reload || clear) {
        return;
    }

    for entity in &existing {
        commands.entity(entity).despawn();
    }
    if !reload {
        return;
    }
    let Some(environment) = session.environment.as_ref() else {
        return;
    };

    let mut renderable = 0;
    for scan in &environment.scans {
        let failed = |url: &str| -> (ScanLoad, Option<String>) {
            warn!("Scan {} has no asset source for {}", scan.id, url);
            (ScanLoad::Failed(format!("Cannot load {url}")), None)
        };
        let (load, asset_path) = match classify_scan(scan, config.as_deref()) {
            ScanSource::Scene(path) => (ScanLoad::Loading, Some(path)),
            ScanSource::Remote(url) => {
                match remote.as_deref().and_then(|remote| remote.register(&url)) {
                    Some(path) => (ScanLoad::Loading, Some(path)),
                    None => failed(&url),
                }
            }
            ScanSource::Unsupported => (ScanLoad::Unsupported, None),
            ScanSource::Unreachable(url) => failed(&url),
        };

        let mut root = commands.spawn((
            Name::new(format!("scan {}", scan.id)),
            ScanRoot {
                scan_id: scan.id.clone(),
            },
            load,
            transforms.get(&scan.id).to_transform(),
            Visibility::default(),
        ));
        if let Some(path) = asset_path {
            renderable += 1;
            root.insert(ScanAsset { path });
        }
    }

    info!(
        "Spawned {} scan(s), {} renderable",
        environment.scans.len(),
        renderable
    );
    if renderable == 0 {
        notices.write(Notice::error(NO_SUPPORTED_SCANS_MESSAGE));
    }
}

/// Starts loading the first scene of each newly spawned glTF scan.
pub fn request_scan_scenes(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    scans: Query<(Entity, &ScanAsset), Without<ScanScene>>,
) {
    for (entity, asset) in &scans {
        let handle: Handle<Scene> =
            asset_server.load(GltfAssetLabel::Scene(0).from_asset(asset.path.clone()));
        commands
            .entity(entity)
            .insert((ScanScene(handle.clone()), SceneRoot(handle)));
    }
}

/// Moves loading scans to `Loaded` or `Failed` as their scenes resolve.
pub fn track_scan_loading(
    asset_server: Res<AssetServer>,
    mut scans: Query<(&ScanRoot, &ScanScene, &mut ScanLoad)>,
    mut notices: EventWriter<Notice>,
) {
    for (root, scene, mut load) in &mut scans {
        if *load != ScanLoad::Loading {
            continue;
        }
        if let Some(LoadState::Failed(error)) = asset_server.get_load_state(&scene.0) {
            warn!("Scan {} failed to load: {}", root.scan_id, error);
            *load = ScanLoad::Failed(error.to_string());
            notices.write(Notice::error(format!("Scan {} could not be loaded", root.scan_id)));
        } else if asset_server.is_loaded_with_dependencies(&scene.0) {
            info!("✓ Scan {} loaded", root.scan_id);
            *load = ScanLoad::Loaded;
        }
    }
}

/// Keeps scan root transforms in step with the transform store.
pub fn apply_scan_transforms(
    store: Res<TransformStore>,
    mut scans: Query<(&ScanRoot, &mut Transform)>,
) {
    if !store.is_changed() {
        return;
    }
    for (root, mut transform) in &mut scans {
        let target = store.get(&root.scan_id).to_transform();
        if *transform != target {
            *transform = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorPlugin;
    use crate::editor::controller::{EditorController, EditorInput, TransformMode};
    use crate::editor::transform_store::TransformPatch;
    use crate::persistence::scripted::environment_fixture;
    use pretty_assertions::assert_eq;

    #[derive(Resource, Default)]
    struct SeenNotices(Vec<Notice>);

    fn record_notices(mut seen: ResMut<SeenNotices>, mut notices: EventReader<Notice>) {
        seen.0.extend(notices.read().cloned());
    }

    fn app() -> App {
        let mut app = App::new();
        app.add_plugins((EditorPlugin, ScanSyncPlugin))
            .init_resource::<SeenNotices>()
            .init_resource::<RemoteUrls>()
            .add_systems(Last, record_notices);
        app
    }

    fn open(app: &mut App, scans: &[(&str, &str)]) {
        let environment = environment_fixture("env-1", scans, &[]);
        let world = app.world_mut();
        world.resource_mut::<TransformStore>().load(
            environment
                .scans
                .iter()
                .map(|scan| (scan.id.clone(), scan.transform())),
        );
        world.resource_mut::<EnvironmentSession>().environment = Some(environment);
        world.send_event(SessionEvent::Loaded {
            environment_id: "env-1".into(),
        });
        app.update();
    }

    fn scan_states(app: &mut App) -> Vec<(String, ScanLoad, Option<String>)> {
        let mut query = app
            .world_mut()
            .query::<(&ScanRoot, &ScanLoad, Option<&ScanAsset>)>();
        let mut states: Vec<_> = query
            .iter(app.world())
            .map(|(root, load, asset)| {
                (
                    root.scan_id.clone(),
                    load.clone(),
                    asset.map(|asset| asset.path.clone()),
                )
            })
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    #[test]
    fn unsupported_scan_does_not_block_renderable_one() {
        let mut app = app();
        open(&mut app, &[("a", "scans/room.glb"), ("b", "scans/room.e57")]);

        assert_eq!(
            scan_states(&mut app),
            vec![
                ("a".into(), ScanLoad::Loading, Some("scans/room.glb".into())),
                ("b".into(), ScanLoad::Unsupported, None),
            ]
        );
        assert!(app.world().resource::<SeenNotices>().0.is_empty());
    }

    #[test]
    fn environment_without_renderable_scans_raises_notice() {
        let mut app = app();
        open(&mut app, &[("b", "scans/room.ply")]);

        assert_eq!(
            app.world().resource::<SeenNotices>().0,
            vec![Notice::error(NO_SUPPORTED_SCANS_MESSAGE)]
        );
    }

    #[test]
    fn reopening_replaces_previous_scans() {
        let mut app = app();
        open(&mut app, &[("a", "scans/a.glb"), ("b", "scans/b.glb")]);
        open(&mut app, &[("c", "scans/c.glb")]);

        let ids: Vec<String> = scan_states(&mut app).into_iter().map(|(id, ..)| id).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn absolute_urls_outside_asset_base_load_remotely() {
        let mut app = app();
        let config: EditorConfig = serde_json::from_value(serde_json::json!({
            "api_base_url": "https://api.example.com",
            "asset_base_url": "https://cdn.example.com"
        }))
        .unwrap();
        app.insert_resource(config);

        open(
            &mut app,
            &[
                ("a", "https://cdn.example.com/a.glb"),
                ("b", "https://bucket.s3.amazonaws.com/scans/b.glb?sig=1"),
                ("c", "ftp://files.example.com/c.glb"),
            ],
        );

        let states = scan_states(&mut app);
        assert_eq!(states[0].2.as_deref(), Some("a.glb"));
        assert_eq!(
            states[1],
            (
                "b".into(),
                ScanLoad::Loading,
                Some("https://bucket.s3.amazonaws.com/scans/b.glb".into())
            )
        );
        assert!(matches!(states[2].1, ScanLoad::Failed(_)));
    }

    #[test]
    fn absolute_urls_are_remote_without_an_asset_base() {
        let scan = |url: &str| environment_fixture("env-1", &[("a", url)], &[]).scans[0].clone();
        assert_eq!(
            classify_scan(&scan("https://bucket.s3.amazonaws.com/scans/x.glb"), None),
            ScanSource::Remote("https://bucket.s3.amazonaws.com/scans/x.glb".into())
        );
        assert_eq!(
            classify_scan(&scan("scans/x.glb"), None),
            ScanSource::Scene("scans/x.glb".into())
        );
        assert_eq!(
            classify_scan(&scan("https://bucket.s3.amazonaws.com/scans/x.e57"), None),
            ScanSource::Unsupported
        );
    }

    #[test]
    fn store_changes_move_scan_roots() {
        let mut app = app();
        open(&mut app, &[("a", "scans/a.glb")]);

        app.world_mut().resource_mut::<TransformStore>().set(
            "a",
            &TransformPatch {
                position: Some([4.0, 0.0, -1.0]),
                ..default()
            },
        );
        app.update();

        let mut query = app.world_mut().query::<(&ScanRoot, &Transform)>();
        let (_, transform) = query.single(app.world()).unwrap();
        assert_eq!(transform.translation, Vec3::new(4.0, 0.0, -1.0));
    }

    #[test]
    fn drag_frame_moves_scan_root_in_the_same_update() {
        let mut app = app();
        open(&mut app, &[("a", "scans/a.glb")]);
        app.world_mut().resource_mut::<EnvironmentSession>().editable = true;
        let context = app.world().resource::<EnvironmentSession>().context();
        {
            let mut controller = app.world_mut().resource_mut::<EditorController>();
            controller.handle(EditorInput::BeginTransform(TransformMode::Translate), &context);
            controller.handle(EditorInput::SelectScan(Some("a".into())), &context);
        }

        app.world_mut().send_event(EditorInput::DragFrame {
            scan: "a".into(),
            patch: TransformPatch {
                position: Some([2.0, 0.5, 0.0]),
                ..default()
            },
        });
        app.update();

        let mut query = app.world_mut().query::<(&ScanRoot, &Transform)>();
        let (_, transform) = query.single(app.world()).unwrap();
        assert_eq!(transform.translation, Vec3::new(2.0, 0.5, 0.0));
    }
}
