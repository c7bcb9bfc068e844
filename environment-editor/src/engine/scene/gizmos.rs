use bevy::prelude::*;
use constants::render_settings::{
    ORIGIN_AXIS_LENGTH, PICK_PREVIEW_COLOUR, PICK_PREVIEW_RADIUS, SCAN_GIZMO_AXIS_LENGTH,
};

use crate::editor::controller::{EditorController, EditorState};
use crate::editor::origin_store::OriginStore;
use crate::engine::loading::scan_loader::ScanRoot;
use crate::tools::manipulation::ScanDrag;
use crate::tools::picking::ScenePicker;

pub fn draw_origin_axes(mut gizmos: Gizmos, origin: Res<OriginStore>) {
    if let Some(origin) = origin.get() {
        gizmos.axes(origin.to_transform(), ORIGIN_AXIS_LENGTH);
    }
}

/// Axes on the scan being transformed.
pub fn draw_selected_scan_axes(
    mut gizmos: Gizmos,
    controller: Res<EditorController>,
    scans: Query<(&ScanRoot, &GlobalTransform)>,
) {
    let Some(selected) = controller.state().selected_scan() else {
        return;
    };
    for (root, transform) in &scans {
        if &root.scan_id == selected {
            gizmos.axes(*transform, SCAN_GIZMO_AXIS_LENGTH);
        }
    }
}

/// Surface point under the pointer while a pick is expected.
pub fn draw_hover_point(
    mut gizmos: Gizmos,
    controller: Res<EditorController>,
    drag: Res<ScanDrag>,
    picker: ScenePicker,
) {
    let picking = match controller.state() {
        EditorState::AddingMarking { pending } => pending.is_none(),
        EditorState::PickingOrigin { .. } => true,
        _ => false,
    };
    if !picking || drag.is_active() {
        return;
    }
    let Some(hit) = picker.pick() else {
        return;
    };

    let rotation = hit
        .normal
        .map_or(Quat::IDENTITY, |normal| Quat::from_rotation_arc(Vec3::Z, normal));
    gizmos.circle(
        Isometry3d::new(hit.point, rotation),
        PICK_PREVIEW_RADIUS,
        PICK_PREVIEW_COLOUR,
    );
}
