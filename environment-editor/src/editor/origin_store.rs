use bevy::prelude::*;
use serde::Serialize;

/// Reference point and orientation of an environment. Rotation is XYZ euler radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Origin {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
}

impl Origin {
    /// Origin at a picked surface point, oriented so its up axis follows the surface normal.
    pub fn from_hit(point: Vec3, normal: Option<Vec3>) -> Self {
        let rotation = normal
            .and_then(|normal| normal.try_normalize())
            .map(|normal| {
                let (x, y, z) = Quat::from_rotation_arc(Vec3::Y, normal).to_euler(EulerRot::XYZ);
                [x, y, z]
            })
            .unwrap_or([0.0; 3]);

        Self {
            position: point.to_array(),
            rotation,
        }
    }

    /// Builds an origin from stored components. An empty or malformed position
    /// means no origin; a position without a usable rotation gets zero rotation.
    pub fn from_parts(position: Option<&[f32]>, rotation: Option<&[f32]>) -> Option<Self> {
        let position = match position? {
            [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => [*x, *y, *z],
            _ => return None,
        };
        let rotation = match rotation {
            Some([x, y, z]) if x.is_finite() && y.is_finite() && z.is_finite() => [*x, *y, *z],
            _ => [0.0; 3],
        };
        Some(Self { position, rotation })
    }

    pub fn to_transform(&self) -> Transform {
        let [rx, ry, rz] = self.rotation;
        Transform::from_translation(Vec3::from_array(self.position))
            .with_rotation(Quat::from_euler(EulerRot::XYZ, rx, ry, rz))
    }
}

/// Holds at most one origin. Position and rotation are always written and cleared together.
#[derive(Resource, Debug, Default)]
pub struct OriginStore {
    origin: Option<Origin>,
}

impl OriginStore {
    pub fn set(&mut self, position: [f32; 3], rotation: [f32; 3]) {
        self.origin = Some(Origin { position, rotation });
    }

    pub fn clear(&mut self) {
        self.origin = None;
    }

    pub fn get(&self) -> Option<Origin> {
        self.origin
    }

    pub fn replace(&mut self, origin: Option<Origin>) {
        self.origin = origin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear_move_both_components() {
        let mut store = OriginStore::default();
        assert_eq!(store.get(), None);

        store.set([1.0, 2.0, 3.0], [0.0, 0.5, 0.0]);
        assert_eq!(
            store.get(),
            Some(Origin {
                position: [1.0, 2.0, 3.0],
                rotation: [0.0, 0.5, 0.0],
            })
        );

        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn stored_parts_are_never_partial() {
        let empty: &[f32] = &[];
        let position: &[f32] = &[1.0, 0.0, 2.0];

        assert_eq!(Origin::from_parts(None, None), None);
        assert_eq!(Origin::from_parts(Some(empty), Some(position)), None);

        let origin = Origin::from_parts(Some(position), Some(empty)).unwrap();
        assert_eq!(origin.position, [1.0, 0.0, 2.0]);
        assert_eq!(origin.rotation, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn upward_normal_gives_zero_rotation() {
        let origin = Origin::from_hit(Vec3::new(1.0, 2.0, 3.0), Some(Vec3::Y));
        assert_eq!(origin.position, [1.0, 2.0, 3.0]);
        assert!(Vec3::from_array(origin.rotation).abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn rotation_aligns_up_axis_with_the_normal() {
        let normal = Vec3::new(1.0, 1.0, 0.0).normalize();
        let origin = Origin::from_hit(Vec3::ZERO, Some(normal));
        let up = origin.to_transform().rotation * Vec3::Y;

        assert!(up.abs_diff_eq(normal, 1e-5));
    }

    #[test]
    fn missing_normal_gives_zero_rotation() {
        let origin = Origin::from_hit(Vec3::ONE, None);
        assert_eq!(origin.rotation, [0.0, 0.0, 0.0]);
    }
}
