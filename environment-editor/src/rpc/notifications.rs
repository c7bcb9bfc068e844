//! Pushes editor changes to the host page as JSON-RPC notifications.
//!
//! Each system watches one store or event stream and sends at most one
//! notification per frame for it.

use bevy::prelude::*;
use serde_json::json;

use super::web_rpc::WebRpcInterface;
use crate::editor::controller::{EditorController, EditorState};
use crate::editor::marking_store::MarkingStore;
use crate::editor::notice::Notice;
use crate::editor::origin_store::OriginStore;
use crate::editor::session::{EnvironmentSession, SessionEvent};
use crate::engine::loading::scan_loader::{ScanLoad, ScanRoot};
use crate::persistence::save_batch::MarkingSaveQueue;

/// Sends `editor_state_changed`, plus `pending_pick` whenever the picked point changes.
pub fn notify_editor_state(
    controller: Res<EditorController>,
    session: Res<EnvironmentSession>,
    mut last_sent: Local<Option<(EditorState, bool)>>,
    mut rpc: ResMut<WebRpcInterface>,
) {
    let current = (controller.state().clone(), session.editable);
    if last_sent.as_ref() == Some(&current) {
        return;
    }

    let previous_pick = last_sent
        .as_ref()
        .and_then(|(state, _)| state.pending_pick().copied());
    let pick = current.0.pending_pick().copied();

    rpc.send_notification(
        "editor_state_changed",
        json!({
            "mode": current.0.mode(),
            "state": current.0,
            "editable": current.1,
            "camera_controls_enabled": current.0.camera_controls_enabled(),
        }),
    );
    if pick != previous_pick {
        rpc.send_notification("pending_pick", json!({ "pick": pick }));
    }
    *last_sent = Some(current);
}

pub fn notify_markings(markings: Res<MarkingStore>, mut rpc: ResMut<WebRpcInterface>) {
    if !markings.is_changed() {
        return;
    }
    rpc.send_notification(
        "markings_changed",
        json!({ "markings": markings.iter().collect::<Vec<_>>() }),
    );
}

pub fn notify_origin(origin: Res<OriginStore>, mut rpc: ResMut<WebRpcInterface>) {
    if !origin.is_changed() {
        return;
    }
    rpc.send_notification("origin_changed", json!({ "origin": origin.get() }));
}

pub fn notify_scan_states(
    scans: Query<(&ScanRoot, &ScanLoad), Changed<ScanLoad>>,
    mut removed: RemovedComponents<ScanRoot>,
    mut rpc: ResMut<WebRpcInterface>,
) {
    let changed: Vec<_> = scans
        .iter()
        .map(|(root, load)| json!({ "id": root.scan_id, "load": load }))
        .collect();
    let removed = removed.read().count();
    if changed.is_empty() && removed == 0 {
        return;
    }
    rpc.send_notification(
        "scan_state_changed",
        json!({ "scans": changed, "removed": removed }),
    );
}

pub fn notify_session_events(
    mut events: EventReader<SessionEvent>,
    session: Res<EnvironmentSession>,
    mut rpc: ResMut<WebRpcInterface>,
) {
    for event in events.read() {
        match event {
            SessionEvent::Loaded { environment_id } => {
                let environment = session.environment.as_ref();
                rpc.send_notification(
                    "environment_loaded",
                    json!({
                        "environment_id": environment_id,
                        "title": environment.map(|environment| environment.title.as_str()),
                        "scan_count": environment.map_or(0, |environment| environment.scans.len()),
                    }),
                );
            }
            SessionEvent::LoadFailed {
                environment_id,
                message,
            } => {
                rpc.send_notification(
                    "environment_load_failed",
                    json!({
                        "environment_id": environment_id,
                        "message": message,
                    }),
                );
            }
            _ => {}
        }
    }
}

pub fn notify_save_progress(saves: Res<MarkingSaveQueue>, mut rpc: ResMut<WebRpcInterface>) {
    if !saves.is_changed() {
        return;
    }
    if let Some(batch) = saves.batch.as_ref() {
        rpc.send_notification("save_progress", json!(batch.progress()));
    }
}

pub fn notify_notices(mut notices: EventReader<Notice>, mut rpc: ResMut<WebRpcInterface>) {
    for notice in notices.read() {
        rpc.send_notification("notice", json!(notice));
    }
}
