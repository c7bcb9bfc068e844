//! In-memory gateway for tests. Records every call and answers immediately.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::dto::{
    AddMarkingRequest, ApiMarkingDto, DashboardDto, EnvironmentDto, OriginRequest,
};
use super::error::GatewayError;
use super::gateway::{GatewayCall, GatewayResult, PersistenceGateway};

#[derive(Debug, Clone, PartialEq)]
pub enum GatewayRequest {
    FetchEnvironment(String),
    ListEnvironments,
    UpdateEnvironment(EnvironmentDto),
    AddMarking(AddMarkingRequest),
    FetchMarking(String),
    DeleteMarking(String),
    SaveOrigin(OriginRequest),
    DeleteEnvironment(String),
    DeleteScan(String),
    Dashboard,
}

#[derive(Default)]
struct Script {
    calls: Vec<GatewayRequest>,
    environments: HashMap<String, EnvironmentDto>,
    failures: VecDeque<Option<GatewayError>>,
    next_marking_id: usize,
}

/// Cloning shares the script, so a test can keep a handle after handing one to the app.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

impl ScriptedGateway {
    pub fn with_environment(self, environment: EnvironmentDto) -> Self {
        self.lock()
            .environments
            .insert(environment.id.clone(), environment);
        self
    }

    /// Queues the outcome of the next calls in order. `None` lets a call succeed.
    pub fn then(self, outcome: Option<GatewayError>) -> Self {
        self.lock().failures.push_back(outcome);
        self
    }

    pub fn fail_next(self, error: GatewayError) -> Self {
        self.then(Some(error))
    }

    pub fn succeed_next(self) -> Self {
        self.then(None)
    }

    pub fn calls(&self) -> Vec<GatewayRequest> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer<T>(&self, request: GatewayRequest, success: impl FnOnce(&mut Script) -> GatewayResult<T>) -> GatewayCall<T> {
        let mut script = self.lock();
        script.calls.push(request);
        let result = match script.failures.pop_front().flatten() {
            Some(error) => Err(error),
            None => success(&mut script),
        };
        GatewayCall::ready(result)
    }
}

fn not_found() -> GatewayError {
    GatewayError::Status {
        status: 404,
        message: "Environment not found".into(),
    }
}

impl PersistenceGateway for ScriptedGateway {
    fn fetch_environment(&self, environment_id: &str) -> GatewayCall<EnvironmentDto> {
        let id = environment_id.to_string();
        self.answer(GatewayRequest::FetchEnvironment(id.clone()), move |script| {
            script.environments.get(&id).cloned().ok_or_else(not_found)
        })
    }

    fn list_environments(&self) -> GatewayCall<Vec<EnvironmentDto>> {
        self.answer(GatewayRequest::ListEnvironments, |script| {
            Ok(script.environments.values().cloned().collect())
        })
    }

    fn update_environment(&self, environment: &EnvironmentDto) -> GatewayCall<EnvironmentDto> {
        let environment = environment.clone();
        self.answer(
            GatewayRequest::UpdateEnvironment(environment.clone()),
            move |script| {
                script
                    .environments
                    .insert(environment.id.clone(), environment.clone());
                Ok(environment)
            },
        )
    }

    fn add_marking(&self, request: &AddMarkingRequest) -> GatewayCall<ApiMarkingDto> {
        let request = request.clone();
        self.answer(GatewayRequest::AddMarking(request.clone()), move |script| {
            script.next_marking_id += 1;
            Ok(ApiMarkingDto {
                id: format!("srv-{}", script.next_marking_id),
                environment_id: request.environment_id,
                created_by_id: request.created_by_id,
                x: Some(request.x),
                y: Some(request.y),
                z: Some(request.z),
                url: Some(request.url),
                metadata: Some(request.metadata),
                remark: Some(request.remark),
                created_at: Some("2024-06-01T12:00:00Z".into()),
                created_by: None,
                comments: None,
            })
        })
    }

    fn fetch_marking(&self, marking_id: &str) -> GatewayCall<ApiMarkingDto> {
        let id = marking_id.to_string();
        self.answer(GatewayRequest::FetchMarking(id.clone()), move |script| {
            script
                .environments
                .values()
                .flat_map(|environment| environment.markings.iter().flatten())
                .find(|marking| marking.id == id)
                .cloned()
                .ok_or_else(not_found)
        })
    }

    fn delete_marking(&self, marking_id: &str) -> GatewayCall<()> {
        self.answer(GatewayRequest::DeleteMarking(marking_id.to_string()), |_| Ok(()))
    }

    fn save_origin(&self, request: &OriginRequest) -> GatewayCall<EnvironmentDto> {
        let id = request.environment_id.clone();
        self.answer(GatewayRequest::SaveOrigin(request.clone()), move |script| {
            script.environments.get(&id).cloned().ok_or_else(not_found)
        })
    }

    fn delete_environment(&self, environment_id: &str) -> GatewayCall<()> {
        let id = environment_id.to_string();
        self.answer(GatewayRequest::DeleteEnvironment(id.clone()), move |script| {
            script.environments.remove(&id).map(|_| ()).ok_or_else(not_found)
        })
    }

    fn delete_scan(&self, scan_id: &str) -> GatewayCall<()> {
        self.answer(GatewayRequest::DeleteScan(scan_id.to_string()), |_| Ok(()))
    }

    fn dashboard(&self) -> GatewayCall<DashboardDto> {
        self.answer(GatewayRequest::Dashboard, |script| {
            Ok(DashboardDto {
                area_scanned: script.environments.len() as f64,
                total_users: 1,
                total_markings: 0,
                total_suggestions: 0,
                recent_areas: Vec::new(),
                recent_suggestions: Vec::new(),
                recent_markings: Vec::new(),
            })
        })
    }
}

/// Environment fixture with the given scans (id, file url) and confirmed markings.
pub fn environment_fixture(id: &str, scans: &[(&str, &str)], markings: &[(&str, &str)]) -> EnvironmentDto {
    let value = serde_json::json!({
        "id": id,
        "title": "Fixture",
        "location": "Lab",
        "isEditable": false,
        "originPosition": [],
        "originRotation": [],
        "scannedBy": { "id": "scanner-1", "name": "Scanner", "email": "scanner@example.com" },
        "scans": scans.iter().map(|(scan_id, url)| serde_json::json!({
            "id": scan_id,
            "scanName": scan_id,
            "fileUrl": url,
            "isEditable": true,
            "position": [0.0, 0.0, 0.0]
        })).collect::<Vec<_>>(),
        "markings": markings.iter().map(|(marking_id, remark)| serde_json::json!({
            "id": marking_id,
            "x": 1.0, "y": 2.0, "z": 3.0,
            "remark": remark,
            "url": ""
        })).collect::<Vec<_>>(),
    });
    serde_json::from_value(value).unwrap_or_else(|error| panic!("invalid fixture: {error}"))
}
