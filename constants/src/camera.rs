/// Initial camera position in world space.
pub const INITIAL_CAMERA_POSITION: [f32; 3] = [20.0, 60.0, 20.0];

/// Vertical field of view in degrees.
pub const CAMERA_FOV_DEGREES: f32 = 45.0;
pub const CAMERA_NEAR: f32 = 0.01;
pub const CAMERA_FAR: f32 = 5000.0;

/// Orbit distance limits.
pub const MIN_ORBIT_DISTANCE: f32 = 0.1;
pub const MAX_ORBIT_DISTANCE: f32 = 2000.0;

pub const ORBIT_SENSITIVITY: f32 = 0.005;
pub const PAN_SENSITIVITY: f32 = 0.0015;
pub const ZOOM_SPEED: f32 = 1.5;
