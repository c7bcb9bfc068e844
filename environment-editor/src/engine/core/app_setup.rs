use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy::render::camera::PerspectiveProjection;
use bevy_common_assets::json::JsonAssetPlugin;
use constants::camera::{CAMERA_FAR, CAMERA_FOV_DEGREES, CAMERA_NEAR};

use crate::editor::{EditorApplySet, EditorPlugin};
use crate::engine::assets::editor_config::EditorConfig;
use crate::engine::assets::remote_source::RemoteAssetPlugin;
use crate::engine::camera::viewport_camera::{ViewportCamera, camera_controller};
use crate::engine::core::app_state::{AppState, LoadFailure, log_state_transitions};
use crate::engine::core::window_config::create_window_config;
use crate::engine::loading::config_loader::{ConfigLoader, finish_config_loading, start_config_loading};
use crate::engine::loading::environment_loader::{
    EnvironmentLoader, begin_environment_load, close_deleted_environment, finish_environment_load,
};
use crate::engine::loading::scan_loader::{
    ScanSyncPlugin, ScanSyncSet, request_scan_scenes, track_scan_loading,
};
use crate::engine::scene::gizmos::{draw_hover_point, draw_origin_axes, draw_selected_scan_axes};
use crate::engine::scene::markers::{
    MarkerAssets, attach_scan_fallbacks, sync_marking_markers, sync_origin_marker,
    sync_pick_preview,
};
use crate::persistence::PersistencePlugin;
use crate::rpc::web_rpc::WebRpcPlugin;
use crate::tools::manipulation::{ScanDrag, drag_selected_scan};
use crate::tools::pointer::{PointerPress, detect_pointer_clicks};
use crate::tools::shortcuts::handle_editor_shortcuts;

#[cfg(not(target_arch = "wasm32"))]
use crate::engine::systems::status_overlay::{add_status_overlay, create_status_overlay};

pub fn create_app() -> App {
    let mut app = App::new();

    // Remote asset sources must exist before the asset plugin is built.
    app.add_plugins(RemoteAssetPlugin)
        .add_plugins(create_default_plugins())
        .init_state::<AppState>()
        // Registers EditorConfig as a loadable asset type from `.editor.json` files.
        .add_plugins(JsonAssetPlugin::<EditorConfig>::new(&["editor.json"]))
        .add_plugins(EditorPlugin)
        .add_plugins(PersistencePlugin)
        .add_plugins(WebRpcPlugin);

    app.init_resource::<ConfigLoader>()
        .init_resource::<EnvironmentLoader>()
        .init_resource::<LoadFailure>()
        .init_resource::<ScanDrag>()
        .init_resource::<PointerPress>()
        .init_resource::<MarkerAssets>()
        .init_resource::<ViewportCamera>();

    app.add_systems(Startup, (setup, start_config_loading).chain())
        .add_systems(
            Update,
            finish_config_loading
                .run_if(in_state(AppState::LoadingConfig))
                .before(begin_environment_load),
        )
        .add_systems(
            Update,
            (
                begin_environment_load,
                finish_environment_load,
                close_deleted_environment,
            )
                .chain(),
        )
        .add_plugins(ScanSyncPlugin)
        .configure_sets(Update, ScanSyncSet.after(close_deleted_environment))
        .add_systems(
            Update,
            (request_scan_scenes, track_scan_loading)
                .chain()
                .after(ScanSyncSet),
        );

    // Pointer and keyboard input feed the editor before it applies this frame's inputs.
    app.add_systems(
        Update,
        (
            detect_pointer_clicks,
            drag_selected_scan,
            handle_editor_shortcuts,
            camera_controller,
        )
            .chain()
            .before(EditorApplySet)
            .run_if(in_state(AppState::Ready)),
    );

    app.add_systems(
        Update,
        (
            sync_marking_markers,
            sync_origin_marker,
            sync_pick_preview,
            attach_scan_fallbacks,
            draw_origin_axes,
            draw_selected_scan_axes,
            draw_hover_point,
        )
            .after(EditorApplySet),
    )
    .add_systems(Update, log_state_transitions);

    #[cfg(not(target_arch = "wasm32"))]
    {
        add_status_overlay(&mut app);
    }

    app
}

fn spawn_lighting(commands: &mut Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    });
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(
            EulerRot::ZYX,
            0.0,
            1.0,
            -std::f32::consts::FRAC_PI_4,
        )),
    ));
}

fn spawn_viewport_camera(commands: &mut Commands, viewport: &ViewportCamera) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: CAMERA_FOV_DEGREES.to_radians(),
            near: CAMERA_NEAR,
            far: CAMERA_FAR,
            ..default()
        }),
        viewport.target_transform(),
    ));
}

fn setup(mut commands: Commands, viewport: Res<ViewportCamera>) {
    spawn_lighting(&mut commands);
    spawn_viewport_camera(&mut commands, &viewport);

    #[cfg(not(target_arch = "wasm32"))]
    {
        create_status_overlay(&mut commands);
    }
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}
