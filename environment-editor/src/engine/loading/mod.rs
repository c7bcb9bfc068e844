//! Loading pipeline from settings to a fully populated scene.
//!
//! Settings are read first, then the environment is fetched through the
//! gateway and its scans are spawned. Each scan resolves on its own, so a slow
//! or broken scan never holds back the others.

/// Settings asset loading and gateway installation.
pub mod config_loader;

/// Environment fetch and population of the editor stores.
pub mod environment_loader;

/// Per-scan scene spawning, load tracking and transform sync.
pub mod scan_loader;
