//! Runtime systems for the native status display.

/// Mode, scan and notice text plus the full-view load error.
///
/// Native builds only; the web host renders its own chrome from RPC notifications.
pub mod status_overlay;
