use bevy::prelude::*;
use constants::interaction::{DRAG_ROTATE_SPEED, DRAG_SCALE_SPEED, MIN_DRAG_SCALE};

use super::picking::ScenePicker;
use crate::editor::controller::{EditorController, EditorInput, EditorState, TransformMode};
use crate::editor::transform_store::{ScanId, ScanTransform, TransformPatch, TransformStore};

/// Drag in progress on the selected scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DragStart {
    pub scan: ScanId,
    pub mode: TransformMode,
    pub cursor: Vec2,
    pub transform: ScanTransform,
    /// Surface point grabbed at press time. Translation moves it across a camera-facing plane.
    pub grab_point: Vec3,
    pub plane_normal: Vec3,
}

#[derive(Resource, Debug, Default)]
pub struct ScanDrag {
    active: Option<DragStart>,
    last_patch: Option<TransformPatch>,
}

impl ScanDrag {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn end(&mut self) {
        self.active = None;
        self.last_patch = None;
    }
}

/// Transform patch for the current drag frame.
///
/// Translate follows the cursor on the grab plane, rotate turns about the
/// vertical axis with horizontal travel, scale grows uniformly when dragging up.
pub fn drag_patch(start: &DragStart, cursor: Vec2, plane_hit: Option<Vec3>) -> Option<TransformPatch> {
    let delta = cursor - start.cursor;
    match start.mode {
        TransformMode::Translate => {
            let offset = plane_hit? - start.grab_point;
            let position = Vec3::from_array(start.transform.position) + offset;
            Some(TransformPatch {
                position: Some(position.to_array()),
                ..default()
            })
        }
        TransformMode::Rotate => {
            let [x, y, z] = start.transform.rotation;
            Some(TransformPatch {
                rotation: Some([x, y + delta.x * DRAG_ROTATE_SPEED, z]),
                ..default()
            })
        }
        TransformMode::Scale => {
            let factor = (1.0 - delta.y * DRAG_SCALE_SPEED).max(MIN_DRAG_SCALE);
            let scale = (Vec3::from_array(start.transform.scale) * factor).max(Vec3::splat(MIN_DRAG_SCALE));
            Some(TransformPatch {
                scale: Some(scale.to_array()),
                ..default()
            })
        }
    }
}

/// Starts, continues and ends drags on the selected scan, emitting one drag frame per changed frame.
pub fn drag_selected_scan(
    buttons: Res<ButtonInput<MouseButton>>,
    controller: Res<EditorController>,
    store: Res<TransformStore>,
    picker: ScenePicker,
    mut drag: ResMut<ScanDrag>,
    mut inputs: EventWriter<EditorInput>,
) {
    let EditorState::TransformingScan {
        mode,
        selected: Some(selected),
    } = controller.state()
    else {
        if drag.is_active() {
            drag.end();
        }
        return;
    };

    if !buttons.pressed(MouseButton::Left) {
        if drag.is_active() {
            drag.end();
        }
        return;
    }

    let Some(cursor) = picker.cursor() else {
        return;
    };

    if buttons.just_pressed(MouseButton::Left) {
        let Some(ray) = picker.cursor_ray() else {
            return;
        };
        let Some(hit) = picker.pick_ray(ray) else {
            return;
        };
        if hit.scan.as_ref() != Some(selected) {
            return;
        }
        drag.active = Some(DragStart {
            scan: selected.clone(),
            mode: *mode,
            cursor,
            transform: store.get(selected),
            grab_point: hit.point,
            plane_normal: -ray.direction.as_vec3(),
        });
        drag.last_patch = None;
        return;
    }

    let Some(start) = drag.active.clone() else {
        return;
    };
    if start.scan != *selected {
        drag.end();
        return;
    }

    let plane_hit = picker.cursor_ray().and_then(|ray| {
        let distance = ray.intersect_plane(start.grab_point, InfinitePlane3d::new(start.plane_normal))?;
        Some(ray.get_point(distance))
    });

    let Some(patch) = drag_patch(&start, cursor, plane_hit) else {
        return;
    };
    if drag.last_patch == Some(patch) {
        return;
    }
    drag.last_patch = Some(patch);
    inputs.write(EditorInput::DragFrame {
        scan: start.scan,
        patch,
    });
}
