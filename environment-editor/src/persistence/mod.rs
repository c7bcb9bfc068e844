//! Remote environment API and the systems that keep the editor in step with it.
//!
//! Every request goes through the `PersistenceGateway` trait and returns a
//! `GatewayCall` that systems poll once per frame, so network latency never
//! blocks input handling or rendering.

/// Wire shapes of the environment API.
pub mod dto;

/// Gateway error taxonomy and user-facing messages.
pub mod error;

/// Gateway trait and the polled call handle.
pub mod gateway;

/// `ehttp`-backed gateway talking to the environment API.
pub mod http_gateway;

/// Sequential save of pending markings with per-item status.
pub mod save_batch;

/// Command handling and polling of outstanding gateway calls.
pub mod sync;

#[cfg(test)]
pub mod scripted;

use bevy::prelude::*;

use crate::editor::EditorApplySet;
use save_batch::MarkingSaveQueue;
use sync::{PendingCalls, drive_marking_save, handle_environment_commands, poll_gateway_calls};

pub struct PersistencePlugin;

impl Plugin for PersistencePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingCalls>()
            .init_resource::<MarkingSaveQueue>()
            .add_systems(
                Update,
                (handle_environment_commands, drive_marking_save, poll_gateway_calls)
                    .chain()
                    .after(EditorApplySet),
            );
    }
}
