use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;
use constants::camera::{
    INITIAL_CAMERA_POSITION, MAX_ORBIT_DISTANCE, MIN_ORBIT_DISTANCE, ORBIT_SENSITIVITY,
    PAN_SENSITIVITY, ZOOM_SPEED,
};

use crate::editor::controller::EditorController;
use crate::tools::manipulation::ScanDrag;

const PITCH_LIMIT: f32 = 1.55;
const PIXEL_SCROLL_SCALE: f32 = 0.05;

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ViewportCamera {
    pub focus_point: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for ViewportCamera {
    fn default() -> Self {
        Self::looking_at(Vec3::from_array(INITIAL_CAMERA_POSITION), Vec3::ZERO)
    }
}

impl ViewportCamera {
    /// Orbit that places the camera at `eye` looking at `focus_point`.
    pub fn looking_at(eye: Vec3, focus_point: Vec3) -> Self {
        let offset = eye - focus_point;
        let distance = offset.length().clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE);
        let direction = offset.normalize_or(Vec3::Z);
        Self {
            focus_point,
            distance,
            yaw: direction.x.atan2(direction.z),
            pitch: (-direction.y).asin().clamp(-PITCH_LIMIT, PITCH_LIMIT),
        }
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, 0.0)
    }

    pub fn eye(&self) -> Vec3 {
        self.focus_point + self.rotation() * Vec3::Z * self.distance
    }

    pub fn target_transform(&self) -> Transform {
        Transform::from_translation(self.eye()).looking_at(self.focus_point, Vec3::Y)
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw -= delta.x * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch - delta.y * ORBIT_SENSITIVITY).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Moves the focus point in the view plane, scaled by distance.
    pub fn pan(&mut self, delta: Vec2) {
        let rotation = self.rotation();
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;
        let speed = self.distance * PAN_SENSITIVITY;
        self.focus_point += (-right * delta.x + up * delta.y) * speed;
    }

    /// Positive `amount` moves closer.
    pub fn zoom(&mut self, amount: f32) {
        let factor = ZOOM_SPEED.powf(-amount);
        self.distance = (self.distance * factor).clamp(MIN_ORBIT_DISTANCE, MAX_ORBIT_DISTANCE);
    }
}

pub fn camera_controller(
    mut cameras: Query<&mut Transform, With<Camera3d>>,
    mut viewport: ResMut<ViewportCamera>,
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    scroll: Res<AccumulatedMouseScroll>,
    controller: Res<EditorController>,
    drag: Res<ScanDrag>,
    time: Res<Time>,
) {
    let Ok(mut transform) = cameras.single_mut() else {
        return;
    };

    let steering = controller.state().camera_controls_enabled() && !drag.is_active();
    if steering && motion.delta != Vec2::ZERO {
        if buttons.pressed(MouseButton::Right) {
            viewport.orbit(motion.delta);
        } else if buttons.pressed(MouseButton::Middle) {
            viewport.pan(motion.delta);
        }
    }

    let scrolled = match scroll.unit {
        MouseScrollUnit::Line => scroll.delta.y,
        MouseScrollUnit::Pixel => scroll.delta.y * PIXEL_SCROLL_SCALE,
    };
    if scrolled.abs() > f32::EPSILON {
        viewport.zoom(scrolled);
    }

    let target = viewport.target_transform();
    let lerp = (12.0 * time.delta_secs()).min(1.0);
    transform.translation = transform.translation.lerp(target.translation, lerp);
    transform.rotation = transform.rotation.slerp(target.rotation, lerp);
}
