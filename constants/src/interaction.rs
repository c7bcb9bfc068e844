/// Pointer travel (logical pixels) below which a press-release counts as a click.
pub const CLICK_DRAG_THRESHOLD: f32 = 4.0;

/// Radians of yaw per logical pixel of horizontal drag in rotate mode.
pub const DRAG_ROTATE_SPEED: f32 = 0.01;

/// Scale factor change per logical pixel of vertical drag in scale mode.
pub const DRAG_SCALE_SPEED: f32 = 0.005;

/// Lower bound for any scale component produced by a drag.
pub const MIN_DRAG_SCALE: f32 = 0.01;
