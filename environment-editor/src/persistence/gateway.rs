use std::sync::Arc;

use bevy::prelude::*;
use flume::{Receiver, Sender, TryRecvError};

use super::dto::{
    AddMarkingRequest, ApiMarkingDto, DashboardDto, EnvironmentDto, OriginRequest,
};
use super::error::GatewayError;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Handle to an in-flight gateway request.
///
/// Requests run off the frame loop; systems poll the handle once per frame and
/// act on the result when it arrives.
pub struct GatewayCall<T> {
    receiver: Receiver<GatewayResult<T>>,
}

impl<T> GatewayCall<T> {
    /// Creates a call together with the sender that completes it.
    pub fn channel() -> (Sender<GatewayResult<T>>, Self) {
        let (sender, receiver) = flume::bounded(1);
        (sender, Self { receiver })
    }

    /// A call that has already completed.
    pub fn ready(result: GatewayResult<T>) -> Self {
        let (sender, call) = Self::channel();
        // The receiver is held by `call`, so the bounded slot is free.
        let _ = sender.send(result);
        call
    }

    /// Returns the result once available. A dropped sender completes the call with `Disconnected`.
    pub fn poll(&self) -> Option<GatewayResult<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(GatewayError::Disconnected)),
        }
    }
}

/// Remote API consumed by the editor.
pub trait PersistenceGateway: Send + Sync + 'static {
    fn fetch_environment(&self, environment_id: &str) -> GatewayCall<EnvironmentDto>;

    fn list_environments(&self) -> GatewayCall<Vec<EnvironmentDto>>;

    /// Submits a whole environment, including every scan transform.
    fn update_environment(&self, environment: &EnvironmentDto) -> GatewayCall<EnvironmentDto>;

    fn add_marking(&self, request: &AddMarkingRequest) -> GatewayCall<ApiMarkingDto>;

    fn fetch_marking(&self, marking_id: &str) -> GatewayCall<ApiMarkingDto>;

    fn delete_marking(&self, marking_id: &str) -> GatewayCall<()>;

    fn save_origin(&self, request: &OriginRequest) -> GatewayCall<EnvironmentDto>;

    fn delete_environment(&self, environment_id: &str) -> GatewayCall<()>;

    fn delete_scan(&self, scan_id: &str) -> GatewayCall<()>;

    fn dashboard(&self) -> GatewayCall<DashboardDto>;
}

/// Shared gateway used by every persistence driver.
#[derive(Resource, Clone)]
pub struct Gateway(pub Arc<dyn PersistenceGateway>);

impl Gateway {
    pub fn new(gateway: impl PersistenceGateway) -> Self {
        Self(Arc::new(gateway))
    }
}

impl std::ops::Deref for Gateway {
    type Target = dyn PersistenceGateway;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
