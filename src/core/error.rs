use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::http_client::HttpClientError;

/// Fallback message when neither the backend nor the transport says anything useful.
pub const GENERIC_MESSAGE: &str = "An error occurred";

/// Error codes produced by the client layer itself. Backend supplied codes pass through.
pub mod codes {
    pub const BAD_REQUEST: &str = "ERR_BAD_REQUEST";
    pub const BAD_RESPONSE: &str = "ERR_BAD_RESPONSE";
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const INVALID_RESPONSE: &str = "INVALID_RESPONSE";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
}

/// Normalized error every resource call rejects with.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message} (status {status}, code {code})")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub code: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

// Shape of error payloads the backend (or the proxy) may send back.
#[derive(Deserialize, Default)]
struct ErrorPayload {
    message: Option<String>,
    error: Option<String>,
    code: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: u16, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            code: code.into(),
        }
    }

    /// Build from a non-success HTTP response, preferring the backend's own fields.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let payload: ErrorPayload = serde_json::from_slice(body).unwrap_or_default();

        let message = payload
            .message
            .or(payload.error)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

        let code = payload.code.unwrap_or_else(|| {
            if status.is_server_error() {
                codes::BAD_RESPONSE.to_string()
            } else if status.is_client_error() {
                codes::BAD_REQUEST.to_string()
            } else {
                codes::UNKNOWN_ERROR.to_string()
            }
        });

        Self::new(message, status.as_u16(), code)
    }

    /// A request that never produced a response.
    pub fn transport(err: &HttpClientError) -> Self {
        let code = match err {
            HttpClientError::Timeout(_) => codes::TIMEOUT,
            HttpClientError::InvalidRequest(_) => codes::INVALID_REQUEST,
            _ => codes::NETWORK_ERROR,
        };
        Self::new(err.to_string(), 500, code)
    }

    pub fn timeout(after_ms: u64) -> Self {
        Self::transport(&HttpClientError::Timeout(after_ms))
    }

    /// A success response whose body could not be decoded into the expected payload.
    pub fn invalid_response(detail: impl std::fmt::Display) -> Self {
        Self::new(
            format!("Unexpected response payload: {detail}"),
            500,
            codes::INVALID_RESPONSE,
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED.as_u16()
    }
}

impl Default for ApiError {
    fn default() -> Self {
        Self::new(GENERIC_MESSAGE, 500, codes::UNKNOWN_ERROR)
    }
}
