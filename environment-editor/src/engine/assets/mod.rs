//! Configuration assets loaded through the asset server.

/// Editor settings: API location, startup environment, author and marker scale.
pub mod editor_config;

/// `http`/`https` asset sources for scans hosted outside the asset folder.
pub mod remote_source;
