//! Orbit camera for inspecting scanned environments.
//!
//! Right drag orbits around the focus point, middle drag pans it and the
//! wheel zooms. The camera eases towards its target every frame.

/// Viewport camera resource and controller system.
pub mod viewport_camera;
