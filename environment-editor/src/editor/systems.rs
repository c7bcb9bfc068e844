use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::controller::{EditorController, EditorInput, Effect, Transition};
use super::marking_store::MarkingStore;
use super::origin_store::OriginStore;
use super::session::EnvironmentSession;
use super::transform_store::TransformStore;

/// The controller together with the stores its effects write to.
#[derive(SystemParam)]
pub struct EditorDispatch<'w> {
    pub controller: ResMut<'w, EditorController>,
    pub session: Res<'w, EnvironmentSession>,
    pub markings: ResMut<'w, MarkingStore>,
    pub transforms: ResMut<'w, TransformStore>,
    pub origin: ResMut<'w, OriginStore>,
}

impl EditorDispatch<'_> {
    /// Runs `input` through the controller and applies the resulting effects.
    pub fn apply(&mut self, input: EditorInput) -> Transition {
        let context = self.session.context();
        let outcome = self.controller.handle(input, &context);

        if let Some(rejection) = outcome.rejected {
            debug!("Editor input rejected: {}", rejection.message());
        }

        for effect in &outcome.effects {
            match effect {
                Effect::AppendPendingMarking {
                    position,
                    label,
                    link,
                } => {
                    let marking = self.markings.add_pending(*position, label, link.clone());
                    info!("Pending marking {} added at {}", marking.id, marking.position);
                }
                Effect::WriteOrigin(origin) => {
                    self.origin.set(origin.position, origin.rotation);
                    info!("Origin set at {:?}", origin.position);
                }
                Effect::WriteTransform { scan, patch } => {
                    self.transforms.set(scan, patch);
                }
            }
        }

        outcome
    }
}

pub fn apply_editor_inputs(mut inputs: EventReader<EditorInput>, mut editor: EditorDispatch) {
    for input in inputs.read() {
        editor.apply(input.clone());
    }
}
