use bevy::color::Color;

pub const MARKER_RADIUS: f32 = 0.15;
pub const PICK_PREVIEW_RADIUS: f32 = 0.125;
pub const ORIGIN_MARKER_RADIUS: f32 = 0.2;
pub const ORIGIN_AXIS_LENGTH: f32 = 1.5;
pub const SCAN_GIZMO_AXIS_LENGTH: f32 = 2.0;
pub const UNSUPPORTED_SCAN_MARKER_SIZE: f32 = 1.0;

pub const CONFIRMED_MARKER_COLOUR: Color = Color::srgb(0.05, 0.05, 0.05);
pub const PENDING_MARKER_COLOUR: Color = Color::srgb(1.0, 0.85, 0.2);
pub const DELETING_MARKER_COLOUR: Color = Color::srgb(0.55, 0.55, 0.55);
pub const DELETE_FAILED_MARKER_COLOUR: Color = Color::srgb(0.9, 0.1, 0.1);
pub const PICK_PREVIEW_COLOUR: Color = Color::srgb(0.2, 0.6, 1.0);
pub const ORIGIN_COLOUR: Color = Color::srgb(0.95, 0.3, 0.3);
pub const UNSUPPORTED_SCAN_COLOUR: Color = Color::srgb(1.0, 0.75, 0.0);
