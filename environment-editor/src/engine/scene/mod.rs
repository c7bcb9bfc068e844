//! Scene visuals layered over the loaded scans.
//!
//! Marker spheres for markings, the origin and the pending pick, plus
//! immediate-mode gizmos for axes and pointer feedback.

/// Origin axes, selected scan axes and hover point gizmos.
pub mod gizmos;

/// Marker entities mirroring the marking and origin stores.
pub mod markers;
