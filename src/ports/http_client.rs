use async_trait::async_trait;
use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Custom error type for HTTP client operations
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum HttpClientError {
    /// Error when connection to the backend fails
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error when the request did not complete within the configured time
    #[error("Timeout error after {0} ms")]
    Timeout(u64),

    /// Error when the request is invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for HTTP client operations
pub type HttpClientResult<T> = Result<T, HttpClientError>;

/// HttpClient defines the port (interface) for making HTTP requests to the remote backend.
///
/// Both the reverse proxy and the API client go through this trait, so tests can swap in
/// a scripted implementation without opening sockets.
#[async_trait]
pub trait HttpClient: Send + Sync + 'static {
    /// Send an HTTP request and resolve with the backend's response, whatever its status.
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>>;

    /// Probe a URL, resolving to `true` when it answers with a success status.
    async fn health_check(&self, url: &str, timeout_secs: u64) -> HttpClientResult<bool>;
}
