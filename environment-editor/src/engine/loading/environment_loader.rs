use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::editor::controller::EditorController;
use crate::editor::marking_store::MarkingStore;
use crate::editor::notice::Notice;
use crate::editor::origin_store::OriginStore;
use crate::editor::session::{EnvironmentCommand, EnvironmentSession, SessionEvent};
use crate::editor::transform_store::TransformStore;
use crate::engine::core::app_state::{AppState, LoadFailure};
use crate::persistence::dto::EnvironmentDto;
use crate::persistence::gateway::{Gateway, GatewayCall};
use crate::persistence::save_batch::MarkingSaveQueue;
use crate::persistence::sync::PendingCalls;

/// Environment fetch in flight.
#[derive(Resource, Default)]
pub struct EnvironmentLoader {
    pending: Option<(String, GatewayCall<EnvironmentDto>)>,
}

impl EnvironmentLoader {
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }
}

/// Stores replaced wholesale when an environment opens.
#[derive(SystemParam)]
pub struct EditorStores<'w> {
    pub session: ResMut<'w, EnvironmentSession>,
    pub controller: ResMut<'w, EditorController>,
    pub markings: ResMut<'w, MarkingStore>,
    pub transforms: ResMut<'w, TransformStore>,
    pub origin: ResMut<'w, OriginStore>,
    pub saves: ResMut<'w, MarkingSaveQueue>,
    pub calls: ResMut<'w, PendingCalls>,
}

impl EditorStores<'_> {
    /// Replaces every store with the contents of `environment`.
    pub fn open(&mut self, environment: EnvironmentDto) {
        self.transforms.load(
            environment
                .scans
                .iter()
                .map(|scan| (scan.id.clone(), scan.transform())),
        );
        self.markings.replace_all(environment.markings());
        self.origin.replace(environment.origin());
        self.controller.reset();
        self.saves.batch = None;
        self.calls.clear();
        self.session.environment_id = Some(environment.id.clone());
        self.session.editable = environment.is_editable;
        self.session.environment = Some(environment);
    }

    pub fn close(&mut self) {
        self.transforms.load(Vec::new());
        self.markings.clear();
        self.origin.clear();
        self.controller.reset();
        self.saves.batch = None;
        self.calls.clear();
        self.session.close();
    }
}

pub fn begin_environment_load(
    mut commands: EventReader<EnvironmentCommand>,
    gateway: Option<Res<Gateway>>,
    mut loader: ResMut<EnvironmentLoader>,
    mut notices: EventWriter<Notice>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    for command in commands.read() {
        let EnvironmentCommand::Load(environment_id) = command else {
            continue;
        };
        let environment_id = environment_id.trim();
        if environment_id.is_empty() {
            notices.write(Notice::error("An environment id is required"));
            continue;
        }
        let Some(gateway) = gateway.as_deref() else {
            notices.write(Notice::error("Server connection is not configured"));
            continue;
        };

        info!("Fetching environment {}", environment_id);
        loader.pending = Some((
            environment_id.to_string(),
            gateway.fetch_environment(environment_id),
        ));
        next_state.set(AppState::FetchingEnvironment);
    }
}

pub fn finish_environment_load(
    mut loader: ResMut<EnvironmentLoader>,
    mut stores: EditorStores,
    mut failure: ResMut<LoadFailure>,
    mut session_events: EventWriter<SessionEvent>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    let Some((environment_id, result)) = loader
        .pending
        .as_ref()
        .and_then(|(id, call)| call.poll().map(|result| (id.clone(), result)))
    else {
        return;
    };
    loader.pending = None;

    match result {
        Ok(environment) => {
            info!(
                "✓ Environment {} loaded with {} scan(s)",
                environment.id,
                environment.scans.len()
            );
            stores.open(environment);
            failure.clear();
            session_events.write(SessionEvent::Loaded { environment_id });
            next_state.set(AppState::Ready);
        }
        Err(error) => {
            warn!("Loading environment {} failed: {}", environment_id, error);
            let message = error.user_message();
            stores.close();
            failure.set(message.clone());
            session_events.write(SessionEvent::LoadFailed {
                environment_id,
                message,
            });
            next_state.set(AppState::LoadFailed);
        }
    }
}

/// Returns to idle once the open environment has been deleted on the server.
pub fn close_deleted_environment(
    mut events: EventReader<SessionEvent>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if events
        .read()
        .any(|event| matches!(event, SessionEvent::Deleted { .. }))
    {
        next_state.set(AppState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::EditorPlugin;
    use crate::editor::marking_store::MarkingId;
    use crate::persistence::PersistencePlugin;
    use crate::persistence::scripted::{ScriptedGateway, environment_fixture};
    use bevy::state::app::StatesPlugin;
    use pretty_assertions::assert_eq;

    fn app(gateway: ScriptedGateway) -> App {
        let mut app = App::new();
        app.add_plugins((StatesPlugin, EditorPlugin, PersistencePlugin))
            .init_state::<AppState>()
            .init_resource::<EnvironmentLoader>()
            .init_resource::<LoadFailure>()
            .insert_resource(Gateway::new(gateway))
            .add_systems(
                Update,
                (begin_environment_load, finish_environment_load).chain(),
            );
        app
    }

    fn load(app: &mut App, id: &str) {
        app.world_mut()
            .send_event(EnvironmentCommand::Load(id.to_string()));
        app.update();
        app.update();
    }

    #[test]
    fn loading_fills_every_store() {
        let mut environment = environment_fixture(
            "env-1",
            &[("scan-a", "scans/a.glb"), ("scan-b", "scans/b.obj")],
            &[("m-1", ""), ("m-2", "Window")],
        );
        environment.origin_position = Some(vec![1.0, 0.0, 2.0]);
        environment.origin_rotation = None;
        environment.scans[0].rotation = None;
        environment.scans[0].scale = Some(vec![2.0, 2.0, 2.0]);
        let mut app = app(ScriptedGateway::default().with_environment(environment));

        load(&mut app, "env-1");

        let world = app.world();
        assert_eq!(*world.resource::<State<AppState>>().get(), AppState::Ready);

        let transforms = world.resource::<TransformStore>();
        let scan_a = transforms.get("scan-a");
        assert_eq!(scan_a.rotation, [0.0, 0.0, 0.0]);
        assert_eq!(scan_a.scale, [2.0, 2.0, 2.0]);
        assert!(transforms.contains("scan-b"));

        let labels: Vec<(MarkingId, String)> = world
            .resource::<MarkingStore>()
            .iter()
            .map(|marking| (marking.id.clone(), marking.label.clone()))
            .collect();
        assert_eq!(
            labels,
            vec![
                (MarkingId::Confirmed("m-1".into()), "Unnamed Marking".into()),
                (MarkingId::Confirmed("m-2".into()), "Window".into()),
            ]
        );

        let origin = world.resource::<OriginStore>().get().unwrap();
        assert_eq!(origin.position, [1.0, 0.0, 2.0]);
        assert_eq!(origin.rotation, [0.0, 0.0, 0.0]);

        let session = world.resource::<EnvironmentSession>();
        assert_eq!(session.environment_id.as_deref(), Some("env-1"));
        assert!(!session.editable);
    }

    #[test]
    fn environment_marked_editable_opens_in_edit_mode() {
        let mut environment = environment_fixture("env-2", &[("scan-a", "scans/a.glb")], &[]);
        environment.is_editable = true;
        let mut app = app(ScriptedGateway::default().with_environment(environment));

        load(&mut app, "env-2");

        let session = app.world().resource::<EnvironmentSession>();
        assert_eq!(session.environment_id.as_deref(), Some("env-2"));
        assert!(session.editable);
        assert!(session.context().editable);
    }

    #[test]
    fn empty_origin_position_means_no_origin() {
        let environment = environment_fixture("env-1", &[], &[]);
        let mut app = app(ScriptedGateway::default().with_environment(environment));
        app.world_mut()
            .resource_mut::<OriginStore>()
            .set([9.0, 9.0, 9.0], [0.0; 3]);

        load(&mut app, "env-1");

        assert_eq!(app.world().resource::<OriginStore>().get(), None);
    }

    #[test]
    fn failed_fetch_enters_load_failed_with_message() {
        let mut app = app(ScriptedGateway::default());

        load(&mut app, "missing");

        let world = app.world();
        assert_eq!(*world.resource::<State<AppState>>().get(), AppState::LoadFailed);
        assert_eq!(
            world.resource::<LoadFailure>().message.as_deref(),
            Some("Environment not found")
        );
        assert!(!world.resource::<EnvironmentSession>().is_loaded());
    }

    #[test]
    fn blank_environment_id_is_refused_locally() {
        let gateway = ScriptedGateway::default();
        let mut app = app(gateway.clone());

        load(&mut app, "  ");

        assert!(gateway.calls().is_empty());
        assert_eq!(
            *app.world().resource::<State<AppState>>().get(),
            AppState::LoadingConfig
        );
    }
}
