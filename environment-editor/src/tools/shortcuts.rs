#[cfg(not(target_arch = "wasm32"))]
use bevy::prelude::*;

#[cfg(not(target_arch = "wasm32"))]
use crate::editor::controller::{EditorController, EditorInput, TransformMode};
#[cfg(not(target_arch = "wasm32"))]
use crate::editor::session::{EnvironmentCommand, EnvironmentSession};

/// Keyboard shortcuts for mode changes and saving (native builds only).
///
/// `M` add marking, `O` pick origin, `G`/`R`/`S` translate, rotate and scale,
/// `E` toggles editing, `Enter` confirms a pick with the default label,
/// `Ctrl+S` saves new markings and `Escape` steps back.
#[cfg(not(target_arch = "wasm32"))]
pub fn handle_editor_shortcuts(
    keyboard: Res<ButtonInput<KeyCode>>,
    controller: Res<EditorController>,
    session: Res<EnvironmentSession>,
    mut inputs: EventWriter<EditorInput>,
    mut commands: EventWriter<EnvironmentCommand>,
) {
    let ctrl = keyboard.any_pressed([KeyCode::ControlLeft, KeyCode::ControlRight]);

    if ctrl {
        if keyboard.just_pressed(KeyCode::KeyS) {
            commands.write(EnvironmentCommand::SaveMarkings);
        }
        return;
    }

    if keyboard.just_pressed(KeyCode::Escape) {
        inputs.write(controller.state().cancel_input());
    }
    if keyboard.just_pressed(KeyCode::KeyM) {
        inputs.write(EditorInput::BeginAddMarking);
    }
    if keyboard.just_pressed(KeyCode::KeyO) {
        inputs.write(EditorInput::BeginOriginPick);
    }
    if keyboard.just_pressed(KeyCode::KeyG) {
        inputs.write(EditorInput::BeginTransform(TransformMode::Translate));
    }
    if keyboard.just_pressed(KeyCode::KeyR) {
        inputs.write(EditorInput::BeginTransform(TransformMode::Rotate));
    }
    if keyboard.just_pressed(KeyCode::KeyS) {
        inputs.write(EditorInput::BeginTransform(TransformMode::Scale));
    }
    if keyboard.just_pressed(KeyCode::KeyE) {
        commands.write(EnvironmentCommand::SetEditable(!session.editable));
    }
    if keyboard.just_pressed(KeyCode::Enter) && controller.state().pending_pick().is_some() {
        inputs.write(EditorInput::ConfirmPick {
            label: constants::api::UNNAMED_MARKING_LABEL.to_string(),
            link: None,
        });
    }
}

/// Placeholder system for WASM builds where the host page drives every mode change.
#[cfg(target_arch = "wasm32")]
pub fn handle_editor_shortcuts() {
    // No keyboard shortcuts in WASM builds - the editor is controlled via RPC only.
}
