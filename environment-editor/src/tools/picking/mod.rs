//! Pointer-to-surface picking against loaded scan meshes.
//!
//! The pointer is first normalised against the camera viewport, unprojected
//! into a world-space ray, then tested against every mesh that belongs to a
//! loaded scan. The nearest surface wins.

/// Ray intersection primitives: AABB slab test, triangle test, mesh search.
pub mod ray;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::render::primitives::Aabb;
use bevy::window::PrimaryWindow;

use crate::editor::transform_store::ScanId;
use crate::engine::loading::scan_loader::{ScanLoad, ScanRoot};
use ray::intersect_mesh;

/// Surface point under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub point: Vec3,
    pub normal: Option<Vec3>,
    pub distance: f32,
    /// Scan owning the mesh that was hit.
    pub scan: Option<ScanId>,
}

/// Maps a cursor position inside `viewport` to normalised device coordinates
/// (x right, y up, both in -1..=1). Positions outside the viewport give `None`.
pub fn normalized_pointer(cursor: Vec2, viewport: Rect) -> Option<Vec2> {
    let size = viewport.size();
    if size.x <= 0.0 || size.y <= 0.0 || !viewport.contains(cursor) {
        return None;
    }
    let relative = (cursor - viewport.min) / size;
    Some(Vec2::new(relative.x * 2.0 - 1.0, 1.0 - relative.y * 2.0))
}

/// World-space ray through a point in normalised device coordinates.
///
/// Uses reverse-Z: the near plane sits at depth 1.
pub fn ray_from_ndc(ndc: Vec2, clip_from_view: Mat4, world_from_view: Mat4) -> Option<Ray3d> {
    let world_from_ndc = world_from_view * clip_from_view.inverse();
    let near = world_from_ndc.project_point3(ndc.extend(1.0));
    let far = world_from_ndc.project_point3(ndc.extend(f32::EPSILON));
    if !near.is_finite() || !far.is_finite() {
        return None;
    }
    let direction = Dir3::new(far - near).ok()?;
    Some(Ray3d::new(near, direction))
}

/// Everything needed to pick against the scene in one system parameter.
#[derive(SystemParam)]
pub struct ScenePicker<'w, 's> {
    windows: Query<'w, 's, &'static Window, With<PrimaryWindow>>,
    cameras: Query<'w, 's, (&'static Camera, &'static GlobalTransform), With<Camera3d>>,
    targets: Query<
        'w,
        's,
        (
            Entity,
            &'static Mesh3d,
            &'static GlobalTransform,
            Option<&'static Aabb>,
        ),
    >,
    parents: Query<'w, 's, &'static ChildOf>,
    roots: Query<'w, 's, (&'static ScanRoot, &'static ScanLoad)>,
    meshes: Res<'w, Assets<Mesh>>,
}

impl ScenePicker<'_, '_> {
    pub fn cursor(&self) -> Option<Vec2> {
        self.windows.single().ok()?.cursor_position()
    }

    /// Ray under the current cursor position.
    pub fn cursor_ray(&self) -> Option<Ray3d> {
        let cursor = self.cursor()?;
        let (camera, camera_transform) = self.cameras.single().ok()?;
        let viewport = camera.logical_viewport_rect()?;
        let ndc = normalized_pointer(cursor, viewport)?;
        ray_from_ndc(ndc, camera.clip_from_view(), camera_transform.compute_matrix())
    }

    /// Nearest loaded scan surface under the cursor.
    pub fn pick(&self) -> Option<PickHit> {
        self.pick_ray(self.cursor_ray()?)
    }

    pub fn pick_ray(&self, ray: Ray3d) -> Option<PickHit> {
        let origin = ray.origin;
        let direction = ray.direction.as_vec3();

        self.targets
            .iter()
            .filter_map(|(entity, mesh, transform, aabb)| {
                let scan = self.loaded_scan_of(entity)?;
                let mesh = self.meshes.get(&mesh.0)?;
                let bounds = aabb.map(|aabb| {
                    let center = Vec3::from(aabb.center);
                    let half = Vec3::from(aabb.half_extents);
                    (center - half, center + half)
                });
                let hit = intersect_mesh(origin, direction, &transform.compute_matrix(), mesh, bounds)?;
                Some(PickHit {
                    point: hit.point,
                    normal: Some(hit.normal),
                    distance: hit.distance,
                    scan: Some(scan),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Scan id of the loaded scan root above `entity`, if any.
    fn loaded_scan_of(&self, entity: Entity) -> Option<ScanId> {
        let mut current = entity;
        loop {
            if let Ok((root, load)) = self.roots.get(current) {
                return matches!(load, ScanLoad::Loaded).then(|| root.scan_id.clone());
            }
            current = self.parents.get(current).ok()?.parent();
        }
    }
}
