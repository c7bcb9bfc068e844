//! Editing core: the interaction state machine and the stores it writes to.
//!
//! Pointer, keyboard and host input all arrive as `EditorInput` events. The
//! controller turns each one into a next state plus a list of store writes,
//! which `EditorDispatch` applies. Requests that reach the server travel as
//! `EnvironmentCommand` events and are handled by the persistence layer.

/// Pure transition function over `EditorState`.
pub mod controller;

/// Ordered markings with pending, confirmed and deleting states.
pub mod marking_store;

/// User-facing notices.
pub mod notice;

/// The single optional origin of the environment.
pub mod origin_store;

/// Open environment, editability and environment-level commands.
pub mod session;

/// Bevy glue applying controller effects to the stores.
pub mod systems;

/// Per-scan position, rotation and scale with committed values for revert.
pub mod transform_store;

use bevy::prelude::*;

use controller::{EditorController, EditorInput};
use marking_store::MarkingStore;
use notice::{LastNotice, Notice, remember_last_notice};
use origin_store::OriginStore;
use session::{EnvironmentCommand, EnvironmentSession, SessionEvent};
use transform_store::TransformStore;

/// Set containing the systems that apply editor inputs to the stores.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct EditorApplySet;

pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EditorController>()
            .init_resource::<EnvironmentSession>()
            .init_resource::<MarkingStore>()
            .init_resource::<TransformStore>()
            .init_resource::<OriginStore>()
            .init_resource::<LastNotice>()
            .add_event::<EditorInput>()
            .add_event::<EnvironmentCommand>()
            .add_event::<SessionEvent>()
            .add_event::<Notice>()
            .add_systems(
                Update,
                (systems::apply_editor_inputs, remember_last_notice).in_set(EditorApplySet),
            );
    }
}
