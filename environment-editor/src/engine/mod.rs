pub mod assets;
pub mod camera;
pub mod core;
pub mod loading;
pub mod scene;

#[cfg(not(target_arch = "wasm32"))]
pub mod systems;
