//! Application setup and lifecycle state.
//!
//! Handles window configuration, plugin wiring and the state machine that
//! runs from reading settings to an open environment, for both native and
//! WASM targets.

/// Builds the app: plugins, resources and system ordering.
pub mod app_setup;

/// Lifecycle states and the load failure message.
pub mod app_state;

/// Platform-specific window configuration for native and WASM builds.
///
/// Configures canvas integration for web targets and vsync settings.
pub mod window_config;
