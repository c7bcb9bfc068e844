//! Systems that turn environment commands into gateway calls and apply the
//! results once they arrive.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use super::dto::{EnvironmentDto, OriginRequest};
use super::gateway::{Gateway, GatewayCall};
use super::save_batch::{MarkingSaveQueue, SaveBatch, SaveStatus};
use crate::editor::controller::{EditorController, EditorInput};
use crate::editor::marking_store::{MarkingId, MarkingStore, Removal};
use crate::editor::notice::Notice;
use crate::editor::origin_store::{Origin, OriginStore};
use crate::editor::session::{EnvironmentCommand, EnvironmentSession, SessionEvent};
use crate::editor::transform_store::{ScanId, TransformStore};
use crate::engine::loading::scan_loader::{ScanLoad, ScanRoot};

const NO_ENVIRONMENT_MESSAGE: &str = "No environment is open";
const NO_GATEWAY_MESSAGE: &str = "Server connection is not configured";
const MARKING_SAVING_MESSAGE: &str = "This marking is being saved. Delete it once saving finishes";

/// Gateway calls still waiting for an answer.
#[derive(Resource, Default)]
pub struct PendingCalls {
    environment_save: Option<GatewayCall<EnvironmentDto>>,
    origin_save: Option<(Origin, GatewayCall<EnvironmentDto>)>,
    marking_deletes: Vec<(MarkingId, GatewayCall<()>)>,
    /// Scan id, state to restore on failure, call.
    scan_deletes: Vec<(ScanId, ScanLoad, GatewayCall<()>)>,
    environment_delete: Option<(String, GatewayCall<()>)>,
}

impl PendingCalls {
    pub fn is_saving_environment(&self) -> bool {
        self.environment_save.is_some()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(SystemParam)]
pub struct Persistence<'w, 's> {
    commands: Commands<'w, 's>,
    gateway: Option<Res<'w, Gateway>>,
    calls: ResMut<'w, PendingCalls>,
    saves: ResMut<'w, MarkingSaveQueue>,
    session: ResMut<'w, EnvironmentSession>,
    controller: ResMut<'w, EditorController>,
    markings: ResMut<'w, MarkingStore>,
    transforms: ResMut<'w, TransformStore>,
    origin: ResMut<'w, OriginStore>,
    scans: Query<'w, 's, (Entity, &'static ScanRoot, &'static mut ScanLoad)>,
    notices: EventWriter<'w, Notice>,
    session_events: EventWriter<'w, SessionEvent>,
}

impl Persistence<'_, '_> {
    fn gateway(&mut self) -> Option<Gateway> {
        let gateway = self.gateway.as_deref().cloned();
        if gateway.is_none() {
            self.notices.write(Notice::error(NO_GATEWAY_MESSAGE));
        }
        gateway
    }

    fn environment_id(&mut self) -> Option<String> {
        let id = self
            .session
            .environment
            .as_ref()
            .map(|environment| environment.id.clone());
        if id.is_none() {
            self.notices.write(Notice::error(NO_ENVIRONMENT_MESSAGE));
        }
        id
    }

    fn handle(&mut self, command: &EnvironmentCommand) {
        match command {
            // Loading belongs to the environment loader.
            EnvironmentCommand::Load(_) => {}
            EnvironmentCommand::SetEditable(editable) => self.set_editable(*editable),
            EnvironmentCommand::SaveEnvironment => self.save_environment(),
            EnvironmentCommand::SaveMarkings => self.save_markings(),
            EnvironmentCommand::ResumeSave => {
                if let Some(batch) = self.saves.batch.as_mut() {
                    if batch.resume() {
                        info!("Resuming marking save");
                    }
                }
            }
            EnvironmentCommand::CancelSave => {
                if let Some(batch) = self.saves.batch.as_mut() {
                    if batch.cancel() {
                        info!("Marking save cancelled");
                    }
                }
            }
            EnvironmentCommand::SaveOrigin => self.save_origin(),
            EnvironmentCommand::ClearOrigin => {
                self.origin.clear();
                info!("Origin cleared");
            }
            EnvironmentCommand::DeleteMarking(id) => self.delete_marking(id),
            EnvironmentCommand::RetryDelete(id) => self.retry_delete(id),
            EnvironmentCommand::DeleteScan(scan_id) => self.delete_scan(scan_id),
            EnvironmentCommand::DeleteEnvironment => self.delete_environment(),
        }
    }

    fn set_editable(&mut self, editable: bool) {
        if self.environment_id().is_none() {
            return;
        }

        if editable {
            self.session.editable = true;
            info!("Environment editing enabled");
            return;
        }

        let reverted = self.transforms.revert();
        self.session.editable = false;
        let context = self.session.context();
        self.controller.handle(EditorInput::Back, &context);
        info!("Environment editing cancelled, {} scan(s) reverted", reverted.len());
    }

    fn save_environment(&mut self) {
        if self.calls.environment_save.is_some() {
            self.notices.write(Notice::error("A save is already in progress"));
            return;
        }
        if !self.session.editable {
            self.notices.write(Notice::error("Environment is not in edit mode"));
            return;
        }
        let Some(snapshot) = self.session.environment.as_ref() else {
            self.notices.write(Notice::error(NO_ENVIRONMENT_MESSAGE));
            return;
        };
        let transforms = &self.transforms;
        let update = snapshot.with_transforms(|scan_id| transforms.get(scan_id), false);
        let Some(gateway) = self.gateway() else {
            return;
        };

        info!("Saving environment {}", update.id);
        self.calls.environment_save = Some(gateway.update_environment(&update));
    }

    fn save_markings(&mut self) {
        if self.saves.is_running() {
            self.notices.write(Notice::error("Markings are already being saved"));
            return;
        }
        let Some(environment_id) = self.environment_id() else {
            return;
        };
        let Some(author_id) = self.session.author_id() else {
            self.notices
                .write(Notice::error("No author is available for new markings"));
            return;
        };

        let batch = SaveBatch::new(&environment_id, &author_id, &self.markings);
        if batch.items().is_empty() {
            self.notices.write(Notice::info("There are no new markings to save"));
            return;
        }

        info!("Saving {} pending marking(s)", batch.items().len());
        self.saves.batch = Some(batch);
    }

    fn save_origin(&mut self) {
        if self.calls.origin_save.is_some() {
            self.notices.write(Notice::error("The origin is already being saved"));
            return;
        }
        let Some(environment_id) = self.environment_id() else {
            return;
        };
        let Some(origin) = self.origin.get() else {
            self.notices.write(Notice::error("Pick an origin before saving it"));
            return;
        };
        let Some(gateway) = self.gateway() else {
            return;
        };

        let request = OriginRequest::new(&environment_id, &origin);
        self.calls.origin_save = Some((origin, gateway.save_origin(&request)));
    }

    fn delete_marking(&mut self, id: &MarkingId) {
        if self.saves.is_in_flight(id) {
            self.notices.write(Notice::error(MARKING_SAVING_MESSAGE));
            return;
        }
        match self.markings.begin_removal(id) {
            Some(Removal::Local) => info!("Pending marking {} discarded", id),
            Some(Removal::Remote(server_id)) => self.request_marking_delete(id, &server_id),
            None if self.markings.get(id).is_none() => {
                self.notices.write(Notice::error(format!("Unknown marking {id}")));
            }
            None => debug!("Marking {} is already being deleted", id),
        }
    }

    fn retry_delete(&mut self, id: &MarkingId) {
        match self.markings.retry_removal(id) {
            Some(server_id) => self.request_marking_delete(id, &server_id),
            None => debug!("Marking {} has no failed deletion to retry", id),
        }
    }

    fn request_marking_delete(&mut self, id: &MarkingId, server_id: &str) {
        let Some(gateway) = self.gateway() else {
            self.markings
                .fail_removal(id, NO_GATEWAY_MESSAGE.to_string());
            return;
        };
        self.calls
            .marking_deletes
            .push((id.clone(), gateway.delete_marking(server_id)));
    }

    fn delete_scan(&mut self, scan_id: &ScanId) {
        let Some(gateway) = self.gateway() else {
            return;
        };
        let Some((_, _, mut load)) = self
            .scans
            .iter_mut()
            .find(|(_, root, _)| root.scan_id == *scan_id)
        else {
            self.notices.write(Notice::error(format!("Unknown scan {scan_id}")));
            return;
        };
        if *load == ScanLoad::Deleting {
            return;
        }

        let previous = std::mem::replace(&mut *load, ScanLoad::Deleting);
        info!("Deleting scan {}", scan_id);
        self.calls
            .scan_deletes
            .push((scan_id.clone(), previous, gateway.delete_scan(scan_id)));
    }

    fn delete_environment(&mut self) {
        if self.calls.environment_delete.is_some() {
            return;
        }
        let Some(environment_id) = self.environment_id() else {
            return;
        };
        let Some(gateway) = self.gateway() else {
            return;
        };
        info!("Deleting environment {}", environment_id);
        let call = gateway.delete_environment(&environment_id);
        self.calls.environment_delete = Some((environment_id, call));
    }

    fn poll_environment_save(&mut self) {
        let Some(result) = self
            .calls
            .environment_save
            .as_ref()
            .and_then(GatewayCall::poll)
        else {
            return;
        };
        self.calls.environment_save = None;

        match result {
            Ok(saved) => {
                self.transforms.commit();
                self.session.editable = false;
                let context = self.session.context();
                self.controller.handle(EditorInput::EditingEnded, &context);
                info!("Environment {} saved", saved.id);
                self.session_events.write(SessionEvent::Saved {
                    environment_id: saved.id.clone(),
                });
                self.session.environment = Some(saved);
                self.notices.write(Notice::info("Environment saved"));
            }
            Err(error) => {
                warn!("Saving environment failed: {}", error);
                self.notices.write(Notice::error(error.user_message()));
            }
        }
    }

    fn poll_origin_save(&mut self) {
        let Some((origin, result)) = self
            .calls
            .origin_save
            .as_ref()
            .and_then(|(origin, call)| call.poll().map(|result| (*origin, result)))
        else {
            return;
        };
        self.calls.origin_save = None;

        match result {
            Ok(_) => {
                let Some(environment) = self.session.environment.as_mut() else {
                    return;
                };
                environment.origin_position = Some(origin.position.to_vec());
                environment.origin_rotation = Some(origin.rotation.to_vec());
                self.session_events.write(SessionEvent::OriginSaved {
                    environment_id: environment.id.clone(),
                });
                self.notices.write(Notice::info("Origin saved"));
            }
            Err(error) => {
                warn!("Saving origin failed: {}", error);
                self.notices.write(Notice::error(error.user_message()));
            }
        }
    }

    fn poll_marking_deletes(&mut self) {
        let mut finished = Vec::new();
        self.calls.marking_deletes.retain(|(id, call)| match call.poll() {
            Some(result) => {
                finished.push((id.clone(), result));
                false
            }
            None => true,
        });

        for (id, result) in finished {
            match result {
                Ok(()) => {
                    self.markings.complete_removal(&id);
                    info!("Marking {} deleted", id);
                }
                Err(error) => {
                    warn!("Deleting marking {} failed: {}", id, error);
                    let message = error.user_message();
                    self.markings.fail_removal(&id, message.clone());
                    self.notices.write(Notice::error(message));
                }
            }
        }
    }

    fn poll_scan_deletes(&mut self) {
        let mut finished = Vec::new();
        self.calls
            .scan_deletes
            .retain(|(scan_id, previous, call)| match call.poll() {
                Some(result) => {
                    finished.push((scan_id.clone(), previous.clone(), result));
                    false
                }
                None => true,
            });

        for (scan_id, previous, result) in finished {
            let entity = self
                .scans
                .iter_mut()
                .find(|(_, root, _)| root.scan_id == scan_id)
                .map(|(entity, _, mut load)| {
                    if result.is_err() {
                        *load = previous.clone();
                    }
                    entity
                });

            match result {
                Ok(()) => {
                    if let Some(entity) = entity {
                        self.commands.entity(entity).despawn();
                    }
                    self.transforms.remove(&scan_id);
                    if let Some(environment) = self.session.environment.as_mut() {
                        environment.scans.retain(|scan| scan.id != scan_id);
                    }
                    info!("Scan {} deleted", scan_id);
                    self.notices.write(Notice::info("Scan deleted"));
                }
                Err(error) => {
                    warn!("Deleting scan {} failed: {}", scan_id, error);
                    self.notices.write(Notice::error(error.user_message()));
                }
            }
        }
    }

    fn poll_environment_delete(&mut self) {
        let Some((environment_id, result)) = self
            .calls
            .environment_delete
            .as_ref()
            .and_then(|(id, call)| call.poll().map(|result| (id.clone(), result)))
        else {
            return;
        };
        self.calls.environment_delete = None;

        match result {
            Ok(()) => {
                info!("Environment {} deleted", environment_id);
                self.session.close();
                self.controller.reset();
                self.markings.clear();
                self.transforms.load(Vec::new());
                self.origin.clear();
                self.saves.batch = None;
                self.calls.clear();
                self.session_events
                    .write(SessionEvent::Deleted { environment_id });
                self.notices.write(Notice::info("Environment deleted"));
            }
            Err(error) => {
                warn!("Deleting environment {} failed: {}", environment_id, error);
                self.notices.write(Notice::error(error.user_message()));
            }
        }
    }
}

pub fn handle_environment_commands(
    mut commands: EventReader<EnvironmentCommand>,
    mut persistence: Persistence,
) {
    for command in commands.read() {
        persistence.handle(command);
    }
}

pub fn poll_gateway_calls(mut persistence: Persistence) {
    persistence.poll_environment_save();
    persistence.poll_origin_save();
    persistence.poll_marking_deletes();
    persistence.poll_scan_deletes();
    persistence.poll_environment_delete();
}

/// Advances the running marking save by one step per frame.
pub fn drive_marking_save(
    gateway: Option<Res<Gateway>>,
    mut saves: ResMut<MarkingSaveQueue>,
    mut markings: ResMut<MarkingStore>,
    mut notices: EventWriter<Notice>,
) {
    let Some(gateway) = gateway else {
        return;
    };
    let Some(batch) = saves.bypass_change_detection().batch.as_mut() else {
        return;
    };
    if batch.is_finished() {
        return;
    }

    if !batch.step(&**gateway, markings.bypass_change_detection()) {
        return;
    }

    let progress = batch.progress();
    if progress.halted {
        let message = progress
            .items
            .iter()
            .find_map(|item| match &item.status {
                SaveStatus::Failed(message) => Some(message.clone()),
                _ => None,
            })
            .unwrap_or_default();
        notices.write(Notice::error(format!("Saving markings stopped: {message}")));
    } else if progress.finished && progress.cancelled > 0 {
        notices.write(Notice::info(format!(
            "Marking save cancelled after {} of {}",
            progress.succeeded, progress.total
        )));
    } else if progress.finished {
        notices.write(Notice::info(format!("{} marking(s) saved", progress.succeeded)));
    }

    saves.set_changed();
    markings.set_changed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorPlugin;
    use crate::editor::marking_store::RemovalState;
    use crate::editor::transform_store::TransformPatch;
    use crate::persistence::PersistencePlugin;
    use crate::persistence::error::GatewayError;
    use crate::persistence::scripted::{GatewayRequest, ScriptedGateway, environment_fixture};
    use pretty_assertions::assert_eq;

    #[derive(Resource, Default)]
    struct Seen {
        notices: Vec<Notice>,
        sessions: Vec<SessionEvent>,
    }

    fn record(
        mut seen: ResMut<Seen>,
        mut notices: EventReader<Notice>,
        mut sessions: EventReader<SessionEvent>,
    ) {
        seen.notices.extend(notices.read().cloned());
        seen.sessions.extend(sessions.read().cloned());
    }

    fn app_with(gateway: &ScriptedGateway) -> App {
        let environment = environment_fixture(
            "env-1",
            &[("scan-a", "scans/a.glb"), ("scan-b", "scans/b.glb")],
            &[("m-1", "Door")],
        );
        let gateway = gateway.clone().with_environment(environment.clone());

        let mut app = App::new();
        app.add_plugins((EditorPlugin, PersistencePlugin))
            .insert_resource(Gateway::new(gateway))
            .init_resource::<Seen>()
            .add_systems(Last, record);

        let world = app.world_mut();
        world
            .resource_mut::<MarkingStore>()
            .replace_all(environment.markings());
        world.resource_mut::<TransformStore>().load(
            environment
                .scans
                .iter()
                .map(|scan| (scan.id.clone(), scan.transform())),
        );
        for scan in &environment.scans {
            world.spawn((
                ScanRoot {
                    scan_id: scan.id.clone(),
                },
                ScanLoad::Loaded,
            ));
        }
        let mut session = world.resource_mut::<EnvironmentSession>();
        session.environment_id = Some(environment.id.clone());
        session.environment = Some(environment);
        app
    }

    fn run(app: &mut App, command: EnvironmentCommand) {
        app.world_mut().send_event(command);
        for _ in 0..4 {
            app.update();
        }
    }

    fn notices(app: &mut App) -> Vec<Notice> {
        std::mem::take(&mut app.world_mut().resource_mut::<Seen>().notices)
    }

    fn confirmed(id: &str) -> MarkingId {
        MarkingId::Confirmed(id.to_string())
    }

    #[test]
    fn failed_marking_delete_keeps_marking_until_retry_succeeds() {
        let gateway = ScriptedGateway::default().fail_next(GatewayError::Status {
            status: 500,
            message: "Could not delete".into(),
        });
        let mut app = app_with(&gateway);

        run(&mut app, EnvironmentCommand::DeleteMarking(confirmed("m-1")));

        let store = app.world().resource::<MarkingStore>();
        let marking = store.get(&confirmed("m-1")).unwrap();
        assert_eq!(
            marking.removal,
            RemovalState::DeleteFailed("Could not delete".into())
        );
        assert!(notices(&mut app).contains(&Notice::error("Could not delete")));

        run(&mut app, EnvironmentCommand::RetryDelete(confirmed("m-1")));

        assert!(app.world().resource::<MarkingStore>().is_empty());
        assert_eq!(
            gateway.calls(),
            vec![
                GatewayRequest::DeleteMarking("m-1".into()),
                GatewayRequest::DeleteMarking("m-1".into()),
            ]
        );
    }

    #[test]
    fn pending_marking_delete_never_reaches_the_server() {
        let gateway = ScriptedGateway::default();
        let mut app = app_with(&gateway);
        let pending = app
            .world_mut()
            .resource_mut::<MarkingStore>()
            .add_pending(Vec3::ONE, "Draft", None)
            .id;

        run(&mut app, EnvironmentCommand::DeleteMarking(pending.clone()));

        assert!(app.world().resource::<MarkingStore>().get(&pending).is_none());
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn marking_being_saved_cannot_be_deleted() {
        let gateway = ScriptedGateway::default();
        let mut app = app_with(&gateway);
        let pending = app
            .world_mut()
            .resource_mut::<MarkingStore>()
            .add_pending(Vec3::ONE, "Draft", None)
            .id;

        app.world_mut().send_event(EnvironmentCommand::SaveMarkings);
        app.update();
        assert!(app.world().resource::<MarkingSaveQueue>().is_in_flight(&pending));

        run(&mut app, EnvironmentCommand::DeleteMarking(pending.clone()));

        let store = app.world().resource::<MarkingStore>();
        assert_eq!(store.pending().count(), 0);
        let labels: Vec<String> = store.iter().map(|marking| marking.label.clone()).collect();
        assert_eq!(labels, vec!["Door", "Draft"]);
        assert!(notices(&mut app).contains(&Notice::error(MARKING_SAVING_MESSAGE)));
        assert!(
            !gateway
                .calls()
                .iter()
                .any(|call| matches!(call, GatewayRequest::DeleteMarking(_)))
        );
    }

    #[test]
    fn save_markings_stops_at_first_failure_and_resumes() {
        let gateway = ScriptedGateway::default()
            .succeed_next()
            .fail_next(GatewayError::Network("offline".into()));
        let mut app = app_with(&gateway);
        {
            let mut store = app.world_mut().resource_mut::<MarkingStore>();
            store.add_pending(Vec3::X, "A", None);
            store.add_pending(Vec3::Y, "B", None);
            store.add_pending(Vec3::Z, "C", None);
        }

        run(&mut app, EnvironmentCommand::SaveMarkings);

        let pending: Vec<String> = app
            .world()
            .resource::<MarkingStore>()
            .pending()
            .map(|marking| marking.label.clone())
            .collect();
        assert_eq!(pending, vec!["B", "C"]);
        assert!(notices(&mut app).contains(&Notice::error(
            "Saving markings stopped: Network error or server unavailable"
        )));

        run(&mut app, EnvironmentCommand::ResumeSave);

        assert_eq!(app.world().resource::<MarkingStore>().pending().count(), 0);
        let labels: Vec<String> = app
            .world()
            .resource::<MarkingStore>()
            .iter()
            .map(|marking| marking.label.clone())
            .collect();
        assert_eq!(labels, vec!["Door", "A", "B", "C"]);
        let submitted: Vec<GatewayRequest> = gateway.calls();
        assert_eq!(submitted.len(), 4);
        assert!(submitted.iter().all(|call| match call {
            GatewayRequest::AddMarking(request) => request.created_by_id == "scanner-1",
            _ => false,
        }));
    }

    #[test]
    fn save_environment_posts_transforms_and_ends_editing() {
        let gateway = ScriptedGateway::default();
        let mut app = app_with(&gateway);

        run(&mut app, EnvironmentCommand::SaveEnvironment);
        assert!(gateway.calls().is_empty());

        run(&mut app, EnvironmentCommand::SetEditable(true));
        app.world_mut().resource_mut::<TransformStore>().set(
            "scan-b",
            &TransformPatch {
                position: Some([5.0, 0.0, 1.0]),
                ..default()
            },
        );
        run(&mut app, EnvironmentCommand::SaveEnvironment);

        let calls = gateway.calls();
        let [GatewayRequest::UpdateEnvironment(update)] = calls.as_slice() else {
            panic!("expected one update, got {calls:?}");
        };
        assert!(!update.is_editable);
        assert_eq!(update.markings, None);
        let scan_b = update.scans.iter().find(|scan| scan.id == "scan-b").unwrap();
        assert_eq!(scan_b.position, Some(vec![5.0, 0.0, 1.0]));
        assert_eq!(scan_b.scale, Some(vec![1.0, 1.0, 1.0]));

        assert!(!app.world().resource::<EnvironmentSession>().editable);
        run(&mut app, EnvironmentCommand::SetEditable(true));
        run(&mut app, EnvironmentCommand::SetEditable(false));
        assert_eq!(
            app.world().resource::<TransformStore>().get("scan-b").position,
            [5.0, 0.0, 1.0]
        );
    }

    #[test]
    fn cancelling_edit_reverts_transforms() {
        let gateway = ScriptedGateway::default();
        let mut app = app_with(&gateway);

        run(&mut app, EnvironmentCommand::SetEditable(true));
        app.world_mut().resource_mut::<TransformStore>().set(
            "scan-a",
            &TransformPatch {
                rotation: Some([0.0, 1.0, 0.0]),
                ..default()
            },
        );
        run(&mut app, EnvironmentCommand::SetEditable(false));

        let transform = app.world().resource::<TransformStore>().get("scan-a");
        assert_eq!(transform.rotation, [0.0, 0.0, 0.0]);
        assert!(!app.world().resource::<EnvironmentSession>().editable);
        assert!(gateway.calls().is_empty());
    }

    #[test]
    fn origin_save_requires_an_origin() {
        let gateway = ScriptedGateway::default();
        let mut app = app_with(&gateway);

        run(&mut app, EnvironmentCommand::SaveOrigin);
        assert!(gateway.calls().is_empty());
        assert!(notices(&mut app).contains(&Notice::error("Pick an origin before saving it")));

        app.world_mut()
            .resource_mut::<OriginStore>()
            .set([1.0, 2.0, 3.0], [0.0, 0.5, 0.0]);
        run(&mut app, EnvironmentCommand::SaveOrigin);

        let calls = gateway.calls();
        let [GatewayRequest::SaveOrigin(request)] = calls.as_slice() else {
            panic!("expected one origin save, got {calls:?}");
        };
        assert_eq!(request.position_z, "3");
        assert_eq!(request.rotation_y, "0.5");
        let session = app.world().resource::<EnvironmentSession>();
        let environment = session.environment.as_ref().unwrap();
        assert_eq!(environment.origin_position, Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn failed_scan_delete_restores_the_scan() {
        let gateway = ScriptedGateway::default().fail_next(GatewayError::Network("offline".into()));
        let mut app = app_with(&gateway);

        run(&mut app, EnvironmentCommand::DeleteScan("scan-a".into()));

        let mut scans = app.world_mut().query::<(&ScanRoot, &ScanLoad)>();
        let states: Vec<(String, ScanLoad)> = scans
            .iter(app.world())
            .map(|(root, load)| (root.scan_id.clone(), load.clone()))
            .collect();
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|(_, load)| *load == ScanLoad::Loaded));

        run(&mut app, EnvironmentCommand::DeleteScan("scan-a".into()));

        let mut scans = app.world_mut().query::<&ScanRoot>();
        let remaining: Vec<String> = scans
            .iter(app.world())
            .map(|root| root.scan_id.clone())
            .collect();
        assert_eq!(remaining, vec!["scan-b"]);
        assert!(!app.world().resource::<TransformStore>().contains("scan-a"));
    }

    #[test]
    fn deleting_the_environment_closes_the_session() {
        let gateway = ScriptedGateway::default();
        let mut app = app_with(&gateway);

        run(&mut app, EnvironmentCommand::DeleteEnvironment);

        assert!(!app.world().resource::<EnvironmentSession>().is_loaded());
        assert!(app.world().resource::<MarkingStore>().is_empty());
        assert_eq!(
            gateway.calls(),
            vec![GatewayRequest::DeleteEnvironment("env-1".into())]
        );
        assert_eq!(
            app.world().resource::<Seen>().sessions,
            vec![SessionEvent::Deleted {
                environment_id: "env-1".into()
            }]
        );
    }
}
