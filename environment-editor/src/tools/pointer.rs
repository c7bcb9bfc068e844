use bevy::prelude::*;
use constants::interaction::CLICK_DRAG_THRESHOLD;

use super::picking::ScenePicker;
use crate::editor::controller::{EditorController, EditorInput, EditorState};

/// Cursor position at the last left-button press.
#[derive(Resource, Debug, Default)]
pub struct PointerPress {
    start: Option<Vec2>,
}

/// A press and release closer than the drag threshold count as a click.
pub fn is_click(press: Vec2, release: Vec2) -> bool {
    press.distance(release) < CLICK_DRAG_THRESHOLD
}

/// Turns left clicks into picks for the editor. Drags are left to the camera and manipulation.
pub fn detect_pointer_clicks(
    buttons: Res<ButtonInput<MouseButton>>,
    controller: Res<EditorController>,
    picker: ScenePicker,
    mut press: ResMut<PointerPress>,
    mut inputs: EventWriter<EditorInput>,
) {
    if buttons.just_pressed(MouseButton::Left) {
        press.start = picker.cursor();
        return;
    }
    if !buttons.just_released(MouseButton::Left) {
        return;
    }

    let Some(start) = press.start.take() else {
        return;
    };
    let Some(release) = picker.cursor() else {
        return;
    };
    if !is_click(start, release) || *controller.state() == EditorState::Viewing {
        return;
    }

    let hit = picker.pick();
    match &hit {
        Some(hit) => debug!("Picked {:?} at {}", hit.scan, hit.point),
        None => debug!("Click hit nothing"),
    }
    inputs.write(EditorInput::PointerClick(hit));
}
