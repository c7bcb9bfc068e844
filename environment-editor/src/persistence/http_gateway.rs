use constants::api::{
    ADD_MARKING_PATH, DASHBOARD_PATH, DELETE_ENVIRONMENT_PATH, DELETE_MARKING_PATH,
    DELETE_SCAN_PATH, ENVIRONMENTS_PATH, MARKING_PATH, ORIGIN_PATH, UPDATE_SCANS_PATH,
};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::dto::{
    AddMarkingRequest, ApiMarkingDto, DashboardDto, EnvironmentDto, OriginRequest,
};
use super::error::GatewayError;
use super::gateway::{GatewayCall, GatewayResult, PersistenceGateway};

/// Gateway talking JSON over HTTP to the environment API.
pub struct HttpGateway {
    base_url: String,
    auth_token: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: &str, auth_token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: auth_token.filter(|token| !token.is_empty()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn resource_url(&self, path: &str, id: &str) -> Result<String, GatewayError> {
        let id = id.trim();
        if id.is_empty() || id.contains(['/', '?', '#']) {
            return Err(GatewayError::InvalidRequest(format!(
                "'{id}' is not a valid identifier"
            )));
        }
        Ok(format!("{}{}/{}", self.base_url, path, id))
    }

    fn request(&self, method: &str, url: String, body: Vec<u8>) -> ehttp::Request {
        let mut headers = ehttp::Headers::new(&[
            ("Accept", "application/json"),
            ("Content-Type", "application/json"),
        ]);
        if let Some(token) = &self.auth_token {
            headers.insert("Authorization", format!("Bearer {token}"));
        }

        ehttp::Request {
            method: method.to_string(),
            url,
            body,
            headers,
            ..ehttp::Request::get("")
        }
    }

    fn get<T>(&self, url: Result<String, GatewayError>) -> GatewayCall<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        match url {
            Ok(url) => dispatch(self.request("GET", url, Vec::new()), decode_json),
            Err(error) => GatewayCall::ready(Err(error)),
        }
    }

    fn post<B, T>(&self, url: String, body: &B) -> GatewayCall<T>
    where
        B: Serialize,
        T: DeserializeOwned + Send + 'static,
    {
        match serde_json::to_vec(body) {
            Ok(bytes) => dispatch(self.request("POST", url, bytes), decode_json),
            Err(error) => GatewayCall::ready(Err(GatewayError::Encode(error.to_string()))),
        }
    }

    fn delete(&self, url: Result<String, GatewayError>) -> GatewayCall<()> {
        match url {
            Ok(url) => dispatch(self.request("DELETE", url, Vec::new()), |_| Ok(())),
            Err(error) => GatewayCall::ready(Err(error)),
        }
    }
}

impl PersistenceGateway for HttpGateway {
    fn fetch_environment(&self, environment_id: &str) -> GatewayCall<EnvironmentDto> {
        self.get(self.resource_url(ENVIRONMENTS_PATH, environment_id))
    }

    fn list_environments(&self) -> GatewayCall<Vec<EnvironmentDto>> {
        self.get(Ok(self.url(ENVIRONMENTS_PATH)))
    }

    fn update_environment(&self, environment: &EnvironmentDto) -> GatewayCall<EnvironmentDto> {
        self.post(self.url(UPDATE_SCANS_PATH), environment)
    }

    fn add_marking(&self, request: &AddMarkingRequest) -> GatewayCall<ApiMarkingDto> {
        self.post(self.url(ADD_MARKING_PATH), request)
    }

    fn fetch_marking(&self, marking_id: &str) -> GatewayCall<ApiMarkingDto> {
        self.get(self.resource_url(MARKING_PATH, marking_id))
    }

    fn delete_marking(&self, marking_id: &str) -> GatewayCall<()> {
        self.delete(self.resource_url(DELETE_MARKING_PATH, marking_id))
    }

    fn save_origin(&self, request: &OriginRequest) -> GatewayCall<EnvironmentDto> {
        self.post(self.url(ORIGIN_PATH), request)
    }

    fn delete_environment(&self, environment_id: &str) -> GatewayCall<()> {
        self.delete(self.resource_url(DELETE_ENVIRONMENT_PATH, environment_id))
    }

    fn delete_scan(&self, scan_id: &str) -> GatewayCall<()> {
        self.delete(self.resource_url(DELETE_SCAN_PATH, scan_id))
    }

    fn dashboard(&self) -> GatewayCall<DashboardDto> {
        self.get(Ok(self.url(DASHBOARD_PATH)))
    }
}

/// Sends the request on ehttp's background executor and completes the call from its callback.
fn dispatch<T, D>(request: ehttp::Request, decode: D) -> GatewayCall<T>
where
    T: Send + 'static,
    D: FnOnce(&[u8]) -> GatewayResult<T> + Send + 'static,
{
    let (sender, call) = GatewayCall::channel();
    ehttp::fetch(request, move |result| {
        let outcome = match result {
            Err(message) => Err(GatewayError::Network(message)),
            Ok(response) if !response.ok => {
                Err(GatewayError::from_status(response.status, &response.bytes))
            }
            Ok(response) => decode(&response.bytes),
        };
        // A closed channel means the caller stopped waiting.
        let _ = sender.send(outcome);
    });
    call
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> GatewayResult<T> {
    serde_json::from_slice(bytes).map_err(|error| GatewayError::Decode(error.to_string()))
}
