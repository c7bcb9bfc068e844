use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub type ScanId = String;

pub const DEFAULT_POSITION: [f32; 3] = [0.0, 0.0, 0.0];
pub const DEFAULT_ROTATION: [f32; 3] = [0.0, 0.0, 0.0];
pub const DEFAULT_SCALE: [f32; 3] = [1.0, 1.0, 1.0];

/// Placement of one scan. Rotation is XYZ euler angles in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanTransform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for ScanTransform {
    fn default() -> Self {
        Self {
            position: DEFAULT_POSITION,
            rotation: DEFAULT_ROTATION,
            scale: DEFAULT_SCALE,
        }
    }
}

/// Partial update produced by a drag frame. Absent fields keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformPatch {
    pub position: Option<[f32; 3]>,
    pub rotation: Option<[f32; 3]>,
    pub scale: Option<[f32; 3]>,
}

impl ScanTransform {
    /// Fills any missing or malformed component with its default.
    pub fn normalized(
        position: Option<&[f32]>,
        rotation: Option<&[f32]>,
        scale: Option<&[f32]>,
    ) -> Self {
        Self {
            position: component_or(position, DEFAULT_POSITION),
            rotation: component_or(rotation, DEFAULT_ROTATION),
            scale: component_or(scale, DEFAULT_SCALE),
        }
    }

    pub fn apply(&mut self, patch: &TransformPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(scale) = patch.scale {
            self.scale = scale;
        }
    }

    pub fn to_transform(&self) -> Transform {
        let [rx, ry, rz] = self.rotation;
        Transform {
            translation: Vec3::from_array(self.position),
            rotation: Quat::from_euler(EulerRot::XYZ, rx, ry, rz),
            scale: Vec3::from_array(self.scale),
        }
    }
}

fn component_or(value: Option<&[f32]>, default: [f32; 3]) -> [f32; 3] {
    match value {
        Some([x, y, z]) if x.is_finite() && y.is_finite() && z.is_finite() => [*x, *y, *z],
        _ => default,
    }
}

/// Per-scan transforms plus the snapshot they were last loaded or saved from.
#[derive(Resource, Debug, Default)]
pub struct TransformStore {
    current: HashMap<ScanId, ScanTransform>,
    committed: HashMap<ScanId, ScanTransform>,
}

impl TransformStore {
    pub fn get(&self, scan_id: &str) -> ScanTransform {
        self.current.get(scan_id).copied().unwrap_or_default()
    }

    pub fn contains(&self, scan_id: &str) -> bool {
        self.current.contains_key(scan_id)
    }

    pub fn set(&mut self, scan_id: &str, patch: &TransformPatch) -> ScanTransform {
        let transform = self.current.entry(scan_id.to_string()).or_default();
        transform.apply(patch);
        *transform
    }

    /// Replaces every transform and marks the result as committed.
    pub fn load(&mut self, transforms: impl IntoIterator<Item = (ScanId, ScanTransform)>) {
        self.current = transforms.into_iter().collect();
        self.committed = self.current.clone();
    }

    pub fn commit(&mut self) {
        self.committed = self.current.clone();
    }

    /// Restores the committed snapshot, returning the scans whose transform changed.
    pub fn revert(&mut self) -> Vec<ScanId> {
        let changed = self
            .current
            .iter()
            .filter(|(scan_id, transform)| self.committed.get(*scan_id) != Some(*transform))
            .map(|(scan_id, _)| scan_id.clone())
            .collect();
        self.current = self.committed.clone();
        changed
    }

    pub fn remove(&mut self, scan_id: &str) {
        self.current.remove(scan_id);
        self.committed.remove(scan_id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScanId, &ScanTransform)> {
        self.current.iter()
    }
}
