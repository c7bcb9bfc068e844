use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Editor settings loaded from `settings.editor.json`.
#[derive(Asset, Debug, Clone, PartialEq, Serialize, Deserialize, TypePath, Resource)]
pub struct EditorConfig {
    /// Base URL of the environment API, e.g. `https://example.com`.
    pub api_base_url: String,
    /// Scan URLs starting with this prefix are loaded from the asset folder.
    #[serde(default)]
    pub asset_base_url: Option<String>,
    /// Environment opened at startup.
    #[serde(default)]
    pub environment_id: Option<String>,
    /// Author recorded on new markings.
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_marker_scale")]
    pub marker_scale: f32,
}

fn default_marker_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("api_base_url must be an http(s) URL, got `{0}`")]
    InvalidApiBaseUrl(String),
    #[error("marker_scale must be a positive number")]
    InvalidMarkerScale,
    #[error("settings file could not be loaded: {0}")]
    Unreadable(String),
}

impl EditorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiBaseUrl(self.api_base_url.clone()));
        }
        if !self.marker_scale.is_finite() || self.marker_scale <= 0.0 {
            return Err(ConfigError::InvalidMarkerScale);
        }
        Ok(())
    }

    /// Applies overrides, ignoring blank values.
    pub fn with_overrides(mut self, environment_id: Option<String>, auth_token: Option<String>) -> Self {
        let present = |value: Option<String>| value.filter(|value| !value.trim().is_empty());
        if let Some(environment_id) = present(environment_id) {
            self.environment_id = Some(environment_id);
        }
        if let Some(auth_token) = present(auth_token) {
            self.auth_token = Some(auth_token);
        }
        self
    }

    /// Maps a scan URL to a path the asset server can load.
    ///
    /// URLs under `asset_base_url` become relative asset paths and relative URLs
    /// are used as they are. Other absolute URLs return `None` and are fetched
    /// remotely instead. Query strings and fragments are dropped.
    pub fn scan_asset_path(&self, file_url: &str) -> Option<String> {
        let file_url = file_url.split(['?', '#']).next().unwrap_or(file_url).trim();
        let relative = match self.asset_base_url.as_deref().filter(|base| !base.is_empty()) {
            Some(base) if file_url.starts_with(base) => &file_url[base.len()..],
            _ if file_url.contains("://") => return None,
            _ => file_url,
        };
        let relative = relative.trim_start_matches('/');
        (!relative.is_empty()).then(|| relative.to_string())
    }
}

/// Environment id and auth token supplied by the process environment.
#[cfg(not(target_arch = "wasm32"))]
pub fn runtime_overrides() -> (Option<String>, Option<String>) {
    (
        std::env::var("EDITOR_ENVIRONMENT_ID").ok(),
        std::env::var("EDITOR_AUTH_TOKEN").ok(),
    )
}

/// Environment id from the `environment` query parameter of the page URL.
#[cfg(target_arch = "wasm32")]
pub fn runtime_overrides() -> (Option<String>, Option<String>) {
    let environment_id = web_sys::window()
        .and_then(|window| window.location().search().ok())
        .and_then(|search| web_sys::UrlSearchParams::new_with_str(&search).ok())
        .and_then(|params| params.get("environment"));
    (environment_id, None)
}
