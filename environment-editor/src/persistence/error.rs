use thiserror::Error;

/// Message shown when a request never produced a response.
pub const NETWORK_FAILURE_MESSAGE: &str = "Network error or server unavailable";

/// Message shown when the server rejected a request without explaining why.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred";

/// Failure of a single persistence gateway call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("request failed before a response arrived: {0}")]
    Network(String),

    #[error("server responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode response body: {0}")]
    Decode(String),

    #[error("could not encode request body: {0}")]
    Encode(String),

    #[error("gateway call was dropped before it completed")]
    Disconnected,

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Builds a status error, taking the message from a JSON body of the form `{"message": ...}`.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            message: Option<String>,
        }

        let message = serde_json::from_slice::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());

        Self::Status { status, message }
    }

    /// Plain message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) | Self::Disconnected => NETWORK_FAILURE_MESSAGE.to_string(),
            Self::Status { message, .. } => message.clone(),
            Self::Decode(_) | Self::Encode(_) => GENERIC_FAILURE_MESSAGE.to_string(),
            Self::InvalidRequest(message) => message.clone(),
        }
    }
}
