use bevy::prelude::*;
use serde::Serialize;
use serde_json::{Value, json};

use super::web_rpc::{RpcError, RpcResponse, WebRpcInterface};
use crate::persistence::dto::{ApiMarkingDto, DashboardDto, EnvironmentDto};
use crate::persistence::error::GatewayError;
use crate::persistence::gateway::GatewayCall;

/// Gateway call whose result answers a host request.
pub enum DeferredCall {
    Dashboard(GatewayCall<DashboardDto>),
    Environments(GatewayCall<Vec<EnvironmentDto>>),
    Marking(GatewayCall<ApiMarkingDto>),
}

impl DeferredCall {
    fn poll(&self) -> Option<Result<Value, RpcError>> {
        match self {
            Self::Dashboard(call) => settle(call),
            Self::Environments(call) => settle(call),
            Self::Marking(call) => settle(call),
        }
    }
}

fn settle<T: Serialize>(call: &GatewayCall<T>) -> Option<Result<Value, RpcError>> {
    let result = call.poll()?;
    Some(result.map_err(|error| gateway_error(&error)).and_then(|value| {
        serde_json::to_value(value).map_err(|error| RpcError::internal_error(&error.to_string()))
    }))
}

/// Gateway failures keep the user-facing message; the HTTP status travels as data.
pub fn gateway_error(error: &GatewayError) -> RpcError {
    warn!("Deferred RPC request failed: {}", error);
    let mut rpc_error = RpcError::internal_error(&error.user_message());
    if let GatewayError::Status { status, .. } = error {
        rpc_error.data = Some(json!({ "status": status }));
    }
    rpc_error
}

/// Requests waiting on the gateway, keyed by their JSON-RPC id.
#[derive(Resource, Default)]
pub struct DeferredResponses {
    pending: Vec<(Value, DeferredCall)>,
}

impl DeferredResponses {
    pub fn push(&mut self, id: Value, call: DeferredCall) {
        self.pending.push((id, call));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub fn deliver_deferred_responses(
    mut deferred: ResMut<DeferredResponses>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    if deferred.is_empty() {
        return;
    }
    deferred.pending.retain(|(id, call)| match call.poll() {
        Some(result) => {
            rpc_interface.queue_response(RpcResponse::new(id.clone(), result));
            false
        }
        None => true,
    });
}
