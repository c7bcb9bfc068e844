use bevy::prelude::*;
use bevy::render::mesh::{PrimitiveTopology, VertexAttributeValues};

/// Nearest intersection of a ray with one mesh, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    pub distance: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

// Slab-method ray-AABB intersection, returns Some(t) or None
pub fn ray_aabb_hit_t(ray_origin: Vec3, ray_direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let inv = Vec3::new(
        safe_recip(ray_direction.x),
        safe_recip(ray_direction.y),
        safe_recip(ray_direction.z),
    );

    let mut tmin = f32::NEG_INFINITY;
    let mut tmax = f32::INFINITY;
    for axis in 0..3 {
        let (mut near, mut far) = (
            (min[axis] - ray_origin[axis]) * inv[axis],
            (max[axis] - ray_origin[axis]) * inv[axis],
        );
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }
        // Parallel ray outside the slab produces NaN bounds.
        if near.is_nan() || far.is_nan() {
            if ray_origin[axis] < min[axis] || ray_origin[axis] > max[axis] {
                return None;
            }
            continue;
        }
        if tmin > far || near > tmax {
            return None;
        }
        tmin = tmin.max(near);
        tmax = tmax.min(far);
    }

    if tmax < 0.0 {
        return None;
    }
    Some(if tmin >= 0.0 { tmin } else { tmax })
}

fn safe_recip(value: f32) -> f32 {
    if value != 0.0 { 1.0 / value } else { f32::INFINITY }
}

/// Möller-Trumbore intersection. Returns the ray parameter and the unnormalised face normal.
pub fn ray_triangle_hit_t(
    ray_origin: Vec3,
    ray_direction: Vec3,
    [v0, v1, v2]: [Vec3; 3],
) -> Option<(f32, Vec3)> {
    const EPSILON: f32 = 1e-8;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray_direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray_origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray_direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then(|| (t, edge1.cross(edge2)))
}

/// Tests a world-space ray against every triangle of `mesh` placed by `world_from_mesh`.
///
/// `local_bounds` is the mesh-space AABB used to reject the mesh before the
/// triangle pass. Meshes without triangle-list topology or positions never hit.
pub fn intersect_mesh(
    ray_origin: Vec3,
    ray_direction: Vec3,
    world_from_mesh: &Mat4,
    mesh: &Mesh,
    local_bounds: Option<(Vec3, Vec3)>,
) -> Option<MeshHit> {
    if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
        return None;
    }
    let Some(VertexAttributeValues::Float32x3(positions)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION)
    else {
        return None;
    };

    let mesh_from_world = world_from_mesh.inverse();
    let local_origin = mesh_from_world.transform_point3(ray_origin);
    let local_direction = mesh_from_world.transform_vector3(ray_direction);

    if let Some((min, max)) = local_bounds {
        ray_aabb_hit_t(local_origin, local_direction, min, max)?;
    }

    let vertex = |index: usize| positions.get(index).map(|p| Vec3::from_array(*p));
    let corners: Vec<usize> = match mesh.indices() {
        Some(indices) => indices.iter().collect(),
        None => (0..positions.len()).collect(),
    };

    let mut nearest: Option<(f32, Vec3)> = None;
    for triangle in corners.chunks_exact(3) {
        let (Some(v0), Some(v1), Some(v2)) =
            (vertex(triangle[0]), vertex(triangle[1]), vertex(triangle[2]))
        else {
            continue;
        };
        if let Some((t, normal)) = ray_triangle_hit_t(local_origin, local_direction, [v0, v1, v2])
        {
            if nearest.is_none_or(|(best, _)| t < best) {
                nearest = Some((t, normal));
            }
        }
    }

    let (t, local_normal) = nearest?;
    let point = world_from_mesh.transform_point3(local_origin + local_direction * t);
    let mut normal = mesh_from_world
        .transpose()
        .transform_vector3(local_normal)
        .normalize_or_zero();
    if normal.dot(ray_direction) > 0.0 {
        normal = -normal;
    }

    Some(MeshHit {
        distance: point.distance(ray_origin),
        point,
        normal,
    })
}
