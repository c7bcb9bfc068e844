//! Shared tuning values for the environment editor.

/// Endpoint paths of the remote environment API.
pub mod api;

/// Orbit camera defaults.
pub mod camera;

/// Pointer thresholds and drag sensitivities.
pub mod interaction;

/// Marker sizes and colours.
pub mod render_settings;

/// Scan asset formats the viewer can render.
pub mod scan_formats;
