//! Pointer and keyboard tools that feed the editor.
//!
//! Tools never write to the stores themselves. They turn raw input into
//! `EditorInput` events, which the editor controller accepts or rejects.
//!
//! ## Input Flow
//!
//! ```text
//! Pointer / keyboard (native) or RPC (WASM)
//!   └─> EditorInput
//!       └─> transition()
//!           ├─> next EditorState
//!           └─> effects applied to the stores
//! ```
//!
//! ## Cross-Platform Considerations
//!
//! Native builds get keyboard shortcuts for every mode. WASM builds are driven
//! by the host page through JSON-RPC, so the shortcut system is a no-op there.

/// Drag manipulation of the selected scan in translate, rotate and scale modes.
pub mod manipulation;

/// Ray construction and nearest-hit search against loaded scan meshes.
pub mod picking;

/// Click detection that turns left clicks into picks.
pub mod pointer;

/// Keyboard shortcuts for mode changes (native only).
pub mod shortcuts;
