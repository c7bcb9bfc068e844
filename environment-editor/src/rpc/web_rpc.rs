use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::deferred::{DeferredCall, DeferredResponses, deliver_deferred_responses};
use super::notifications::{
    notify_editor_state, notify_markings, notify_notices, notify_origin, notify_save_progress,
    notify_scan_states, notify_session_events,
};
use crate::editor::EditorApplySet;
use crate::editor::controller::{EditorInput, EditorMode, Rejection};
use crate::editor::marking_store::MarkingId;
use crate::editor::session::EnvironmentCommand;
use crate::editor::systems::EditorDispatch;
use crate::engine::loading::scan_loader::{ScanLoad, ScanRoot};
use crate::persistence::gateway::Gateway;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
    pub id: Option<Value>,
}

impl RpcResponse {
    pub fn new(id: Value, result: Result<Value, RpcError>) -> Self {
        match result {
            Ok(value) => Self {
                jsonrpc: "2.0".to_string(),
                result: Some(value),
                error: None,
                id: Some(id),
            },
            Err(error) => Self {
                jsonrpc: "2.0".to_string(),
                result: None,
                error: Some(error),
                id: Some(id),
            },
        }
    }
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
}

/// JSON-RPC error structure following specification.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

/// Resource managing bidirectional RPC communication between the host page and Bevy.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the host page without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    /// Queue response for transmission to the host page.
    pub(crate) fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }

    #[cfg(test)]
    pub(crate) fn responses(&self) -> &[RpcResponse] {
        &self.outgoing_responses
    }

    #[cfg(test)]
    pub(crate) fn notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }
}

/// Plugin establishing the postMessage bridge to the host page.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .init_resource::<DeferredResponses>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .before(EditorApplySet),
            )
            .add_systems(
                PostUpdate,
                (
                    deliver_deferred_responses,
                    notify_session_events,
                    notify_editor_state,
                    notify_markings,
                    notify_origin,
                    notify_scan_states,
                    notify_save_progress,
                    notify_notices,
                    send_outgoing_messages,
                )
                    .chain(),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    // Shared with the JS callback, drained once per frame.
    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    match window() {
        Some(window) => {
            if let Err(error) = window
                .add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
            {
                error!("Failed to register message listener: {:?}", error);
            }
        }
        None => error!("Window object not available"),
    }

    // Ownership moves to JS so the listener outlives this system.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Resource wrapping thread-safe message queue for WASM event handling.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Raw message received from the host page.
#[derive(Event)]
pub(crate) struct IncomingRpcMessage {
    pub(crate) content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

/// World access needed to answer host requests.
#[derive(SystemParam)]
pub struct RpcContext<'w, 's> {
    editor: EditorDispatch<'w>,
    commands: EventWriter<'w, EnvironmentCommand>,
    scans: Query<'w, 's, (&'static ScanRoot, &'static ScanLoad)>,
    gateway: Option<Res<'w, Gateway>>,
    deferred: ResMut<'w, DeferredResponses>,
}

pub(crate) fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut context: RpcContext,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                debug!("Processing RPC method: {}", request.method);
                if let Some(response) = handle_rpc_request(&request, &mut context) {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Unparseable RPC message: {}", parse_error);
                let id = serde_json::from_str::<Value>(&event.content)
                    .ok()
                    .and_then(|value| value.get("id").cloned());
                if let Some(id) = id {
                    rpc_interface
                        .queue_response(RpcResponse::new(id, Err(RpcError::invalid_request(
                            "Malformed JSON-RPC request",
                        ))));
                }
            }
        }
    }
}

/// Outcome of one request.
enum Reply {
    Now(Result<Value, RpcError>),
    /// Answered once the gateway call completes.
    Later(DeferredCall),
}

/// Handle individual RPC request. Requests without an id run but get no response.
fn handle_rpc_request(request: &RpcRequest, context: &mut RpcContext) -> Option<RpcResponse> {
    if request.jsonrpc != "2.0" {
        return request.id.clone().map(|id| {
            RpcResponse::new(id, Err(RpcError::invalid_request("Expected jsonrpc 2.0")))
        });
    }

    let Some(reply) = dispatch_method(&request.method, &request.params, context) else {
        warn!("Unknown RPC method: {}", request.method);
        return request.id.clone().map(|id| {
            create_error_response(
                id,
                -32601,
                "Method not found",
                Some(json!({"method": request.method})),
            )
        });
    };

    let id = request.id.clone()?;
    match reply {
        Reply::Now(result) => Some(RpcResponse::new(id, result)),
        Reply::Later(call) => {
            context.deferred.push(id, call);
            None
        }
    }
}

fn dispatch_method(method: &str, params: &Value, context: &mut RpcContext) -> Option<Reply> {
    let reply = match method {
        // Editor interaction, answered with the resulting state.
        "set_mode" => Reply::Now(handle_set_mode(params, &mut context.editor)),
        "confirm_pick" => Reply::Now(handle_confirm_pick(params, &mut context.editor)),
        "cancel_pick" => Reply::Now(apply_input(&mut context.editor, EditorInput::CancelPick)),
        "cancel" => {
            let input = context.editor.controller.state().cancel_input();
            Reply::Now(apply_input(&mut context.editor, input))
        }
        "select_scan" => Reply::Now(handle_select_scan(params, &mut context.editor)),

        // Environment commands, acknowledged once queued.
        "set_editable" => Reply::Now(handle_set_editable(params, context)),
        "save_environment" => Reply::Now(queue(context, EnvironmentCommand::SaveEnvironment)),
        "save_markings" => Reply::Now(queue(context, EnvironmentCommand::SaveMarkings)),
        "resume_save" => Reply::Now(queue(context, EnvironmentCommand::ResumeSave)),
        "cancel_save" => Reply::Now(queue(context, EnvironmentCommand::CancelSave)),
        "save_origin" => Reply::Now(queue(context, EnvironmentCommand::SaveOrigin)),
        "clear_origin" => Reply::Now(queue(context, EnvironmentCommand::ClearOrigin)),
        "delete_environment" => {
            Reply::Now(queue(context, EnvironmentCommand::DeleteEnvironment))
        }
        "delete_marking" => Reply::Now(
            marking_param(params)
                .and_then(|id| queue(context, EnvironmentCommand::DeleteMarking(id))),
        ),
        "retry_delete" => Reply::Now(
            marking_param(params).and_then(|id| queue(context, EnvironmentCommand::RetryDelete(id))),
        ),
        "delete_scan" => Reply::Now(
            scan_param(params).and_then(|id| queue(context, EnvironmentCommand::DeleteScan(id))),
        ),
        "load_environment" => Reply::Now(handle_load_environment(params, context)),

        // Queries.
        "get_editor_state" => Reply::Now(Ok(editor_state_json(&context.editor))),
        "get_markings" => Reply::Now(Ok(json!({
            "markings": context.editor.markings.iter().collect::<Vec<_>>()
        }))),
        "get_origin" => Reply::Now(Ok(json!({ "origin": context.editor.origin.get() }))),
        "get_scans" => Reply::Now(Ok(scans_json(context))),
        "get_qr_payload" => Reply::Now(handle_get_qr_payload(&context.editor)),
        "get_marking" => handle_get_marking(params, context),
        "get_dashboard" => match context.gateway.as_deref() {
            Some(gateway) => Reply::Later(DeferredCall::Dashboard(gateway.dashboard())),
            None => Reply::Now(Err(no_gateway())),
        },
        "list_environments" => match context.gateway.as_deref() {
            Some(gateway) => Reply::Later(DeferredCall::Environments(gateway.list_environments())),
            None => Reply::Now(Err(no_gateway())),
        },
        _ => return None,
    };
    Some(reply)
}

fn parse_params<T: DeserializeOwned>(params: &Value, expected: &str) -> Result<T, RpcError> {
    serde_json::from_value(params.clone()).map_err(|_| RpcError::invalid_params(expected))
}

fn no_gateway() -> RpcError {
    RpcError::internal_error("Server connection is not configured")
}

/// Runs an editor input and reports the resulting state, or the rejection.
fn apply_input(editor: &mut EditorDispatch, input: EditorInput) -> Result<Value, RpcError> {
    let outcome = editor.apply(input);
    if let Some(rejection) = outcome.rejected {
        return Err(RpcError::rejected(rejection));
    }
    Ok(json!({
        "success": true,
        "mode": outcome.state.mode(),
        "state": outcome.state,
    }))
}

fn queue(context: &mut RpcContext, command: EnvironmentCommand) -> Result<Value, RpcError> {
    info!("Host requested {:?}", command);
    context.commands.write(command);
    Ok(json!({ "success": true }))
}

fn handle_set_mode(params: &Value, editor: &mut EditorDispatch) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct SetModeParams {
        mode: String,
    }

    let parsed: SetModeParams = parse_params(params, "Expected 'mode' parameter")?;
    let mode = EditorMode::from_string(&parsed.mode)
        .ok_or_else(|| RpcError::invalid_params(&format!("Unknown mode: {}", parsed.mode)))?;
    apply_input(editor, mode.input())
}

fn handle_confirm_pick(params: &Value, editor: &mut EditorDispatch) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct ConfirmPickParams {
        label: String,
        #[serde(default)]
        link: Option<String>,
    }

    let parsed: ConfirmPickParams = parse_params(params, "Expected 'label' parameter")?;
    apply_input(
        editor,
        EditorInput::ConfirmPick {
            label: parsed.label,
            link: parsed.link,
        },
    )
}

fn handle_select_scan(params: &Value, editor: &mut EditorDispatch) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct SelectScanParams {
        scan_id: Option<String>,
    }

    let parsed: SelectScanParams = parse_params(params, "Expected 'scan_id' parameter")?;
    apply_input(editor, EditorInput::SelectScan(parsed.scan_id))
}

fn handle_set_editable(params: &Value, context: &mut RpcContext) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct SetEditableParams {
        editable: bool,
    }

    let parsed: SetEditableParams = parse_params(params, "Expected 'editable' parameter")?;
    queue(context, EnvironmentCommand::SetEditable(parsed.editable))
}

fn handle_load_environment(params: &Value, context: &mut RpcContext) -> Result<Value, RpcError> {
    #[derive(Deserialize)]
    struct LoadParams {
        environment_id: String,
    }

    let parsed: LoadParams = parse_params(params, "Expected 'environment_id' parameter")?;
    let environment_id = parsed.environment_id.trim();
    if environment_id.is_empty() {
        return Err(RpcError::invalid_params("An environment id is required"));
    }
    queue(context, EnvironmentCommand::Load(environment_id.to_string()))
}

fn marking_param(params: &Value) -> Result<MarkingId, RpcError> {
    #[derive(Deserialize)]
    struct MarkingParams {
        marking_id: String,
    }

    let parsed: MarkingParams = parse_params(params, "Expected 'marking_id' parameter")?;
    Ok(MarkingId::parse(&parsed.marking_id))
}

fn scan_param(params: &Value) -> Result<String, RpcError> {
    #[derive(Deserialize)]
    struct ScanParams {
        scan_id: String,
    }

    let parsed: ScanParams = parse_params(params, "Expected 'scan_id' parameter")?;
    Ok(parsed.scan_id)
}

pub(crate) fn editor_state_json(editor: &EditorDispatch) -> Value {
    let state = editor.controller.state();
    json!({
        "mode": state.mode(),
        "state": state,
        "editable": editor.session.editable,
        "environment_id": editor.session.environment_id,
        "camera_controls_enabled": state.camera_controls_enabled(),
    })
}

fn scans_json(context: &RpcContext) -> Value {
    let Some(environment) = context.editor.session.environment.as_ref() else {
        return json!({ "scans": [] });
    };
    let scans: Vec<Value> = environment
        .scans
        .iter()
        .map(|scan| {
            let load = context
                .scans
                .iter()
                .find(|(root, _)| root.scan_id == scan.id)
                .map(|(_, load)| load.clone());
            json!({
                "id": scan.id,
                "name": scan.scan_name,
                "file_url": scan.file_url,
                "load": load,
                "transform": context.editor.transforms.get(&scan.id),
            })
        })
        .collect();
    json!({ "scans": scans })
}

/// QR codes carry only the environment id and need a placed origin.
fn handle_get_qr_payload(editor: &EditorDispatch) -> Result<Value, RpcError> {
    let Some(environment_id) = editor.session.environment_id.as_ref() else {
        return Err(RpcError::invalid_request("No environment is open"));
    };
    if editor.origin.get().is_none() {
        return Err(RpcError::invalid_request(
            "Set an origin before generating a QR code",
        ));
    }
    Ok(json!({ "id": environment_id }))
}

/// Unsaved markings are answered locally, confirmed ones are fetched from the server.
fn handle_get_marking(params: &Value, context: &mut RpcContext) -> Reply {
    let id = match marking_param(params) {
        Ok(id) => id,
        Err(error) => return Reply::Now(Err(error)),
    };
    match &id {
        MarkingId::Pending(_) => Reply::Now(
            context
                .editor
                .markings
                .get(&id)
                .map(|marking| json!({ "marking": marking }))
                .ok_or_else(|| RpcError::invalid_params("Unknown marking")),
        ),
        MarkingId::Confirmed(server_id) => match context.gateway.as_deref() {
            Some(gateway) => Reply::Later(DeferredCall::Marking(gateway.fetch_marking(server_id))),
            None => Reply::Now(Err(no_gateway())),
        },
    }
}

/// Create standardized error response with optional data payload.
fn create_error_response(id: Value, code: i32, message: &str, data: Option<Value>) -> RpcResponse {
    RpcResponse::new(
        id,
        Err(RpcError {
            code,
            message: message.to_string(),
            data,
        }),
    )
}

/// Send queued notifications and responses to the host page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send serialized message to the parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    if let Some(parent) = window.parent().ok().flatten() {
                        if let Err(e) = parent.post_message(&JsValue::from_str(&json), "*") {
                            error!("Failed to send message to parent: {:?}", e);
                        }
                    } else {
                        warn!("No parent window available for message transmission");
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn invalid_request(message: &str) -> Self {
        Self {
            code: -32600,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn invalid_params(message: &str) -> Self {
        Self {
            code: -32602,
            message: message.to_string(),
            data: None,
        }
    }

    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }

    /// Input the editor refused in its current state.
    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            code: -32600,
            message: rejection.message().to_string(),
            data: Some(json!({ "reason": rejection })),
        }
    }
}
