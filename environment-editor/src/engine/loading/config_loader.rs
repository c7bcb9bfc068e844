use bevy::asset::LoadState;
use bevy::prelude::*;

use crate::editor::session::{EnvironmentCommand, EnvironmentSession};
use crate::engine::assets::editor_config::{ConfigError, EditorConfig, runtime_overrides};
use crate::engine::core::app_state::{AppState, LoadFailure};
use crate::persistence::gateway::Gateway;
use crate::persistence::http_gateway::HttpGateway;

pub const SETTINGS_PATH: &str = "settings.editor.json";

#[derive(Resource, Default)]
pub struct ConfigLoader {
    handle: Option<Handle<EditorConfig>>,
}

pub fn start_config_loading(mut loader: ResMut<ConfigLoader>, asset_server: Res<AssetServer>) {
    info!("Loading settings from {}", SETTINGS_PATH);
    loader.handle = Some(asset_server.load(SETTINGS_PATH));
}

/// Waits for the settings asset, then installs the configuration and the gateway.
pub fn finish_config_loading(
    mut commands: Commands,
    loader: Res<ConfigLoader>,
    asset_server: Res<AssetServer>,
    configs: Res<Assets<EditorConfig>>,
    gateway: Option<Res<Gateway>>,
    mut session: ResMut<EnvironmentSession>,
    mut environment_commands: EventWriter<EnvironmentCommand>,
    mut failure: ResMut<LoadFailure>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some(handle) = loader.handle.as_ref() else {
        return;
    };

    if let Some(LoadState::Failed(error)) = asset_server.get_load_state(handle) {
        let error = ConfigError::Unreadable(error.to_string());
        error!("{}", error);
        failure.set(error.to_string());
        next_state.set(AppState::LoadFailed);
        return;
    }

    let Some(config) = configs.get(handle) else {
        return;
    };

    let (environment_id, auth_token) = runtime_overrides();
    let config = config.clone().with_overrides(environment_id, auth_token);
    if let Err(error) = config.validate() {
        error!("Invalid settings: {}", error);
        failure.set(error.to_string());
        next_state.set(AppState::LoadFailed);
        return;
    }

    info!("✓ Settings loaded, API at {}", config.api_base_url);
    session.configured_author = config.author_id.clone();
    if gateway.is_none() {
        commands.insert_resource(Gateway::new(HttpGateway::new(
            &config.api_base_url,
            config.auth_token.clone(),
        )));
    }

    match config.environment_id.clone().filter(|id| !id.trim().is_empty()) {
        Some(environment_id) => {
            environment_commands.write(EnvironmentCommand::Load(environment_id));
        }
        None => info!("No environment configured, waiting for the host"),
    }
    next_state.set(AppState::Idle);
    commands.insert_resource(config);
}
