//! Mock adapters for unit testing without a live backend.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! busgate = { path = "...", features = ["test-support"] }
//! ```

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::body::Body as AxumBody;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{HeaderMap, Method, Request, Response, StatusCode, header};

use crate::ports::http_client::{HttpClient, HttpClientError, HttpClientResult};

/// Scripted [`HttpClient`] that records every request it receives.
///
/// Replies are keyed by method and URI path. When several replies are queued for the
/// same key they are served in order and the last one repeats. Unscripted requests get
/// a 404 with a JSON message.
#[derive(Clone, Default)]
pub struct MockHttpClient {
    replies: Arc<Mutex<HashMap<(Method, String), VecDeque<MockReply>>>>,
    records: Arc<Mutex<Vec<RecordedRequest>>>,
    healthy: Arc<Mutex<Option<bool>>>,
}

#[derive(Debug, Clone)]
enum MockReply {
    Respond {
        status: StatusCode,
        body: Bytes,
        content_type: Option<&'static str>,
        delay: Option<Duration>,
    },
    Fail(String),
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }

    pub fn path(&self) -> String {
        self.uri
            .parse::<hyper::Uri>()
            .map(|u| u.path().to_string())
            .unwrap_or_default()
    }
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, path: &str, reply: MockReply) {
        self.replies
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn respond_json(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        self.push(
            method,
            path,
            MockReply::Respond {
                status: StatusCode::from_u16(status).unwrap(),
                body: Bytes::from(body.to_string()),
                content_type: Some("application/json"),
                delay: None,
            },
        );
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &'static str) {
        self.push(
            method,
            path,
            MockReply::Respond {
                status: StatusCode::from_u16(status).unwrap(),
                body: Bytes::from_static(body.as_bytes()),
                content_type: None,
                delay: None,
            },
        );
    }

    pub fn respond_after(
        &self,
        method: Method,
        path: &str,
        delay: Duration,
        status: u16,
        body: serde_json::Value,
    ) {
        self.push(
            method,
            path,
            MockReply::Respond {
                status: StatusCode::from_u16(status).unwrap(),
                body: Bytes::from(body.to_string()),
                content_type: Some("application/json"),
                delay: Some(delay),
            },
        );
    }

    /// Make requests to `path` fail at the transport level.
    pub fn fail(&self, method: Method, path: &str, reason: &str) {
        self.push(method, path, MockReply::Fail(reason.to_string()));
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = Some(healthy);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.records.lock().unwrap().clone()
    }

    /// Number of requests received for `method` + `path`.
    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.path() == path)
            .count()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    fn next_reply(&self, method: &Method, path: &str) -> Option<MockReply> {
        let mut replies = self.replies.lock().unwrap();
        let queue = replies.get_mut(&(method.clone(), path.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn send_request(&self, req: Request<AxumBody>) -> HttpClientResult<Response<AxumBody>> {
        let (parts, body) = req.into_parts();
        let body = body
            .collect()
            .await
            .map(|c| c.to_bytes())
            .map_err(|e| HttpClientError::InvalidRequest(e.to_string()))?;

        let path = parts.uri.path().to_string();
        self.records.lock().unwrap().push(RecordedRequest {
            method: parts.method.clone(),
            uri: parts.uri.to_string(),
            headers: parts.headers.clone(),
            body,
        });

        match self.next_reply(&parts.method, &path) {
            Some(MockReply::Respond {
                status,
                body,
                content_type,
                delay,
            }) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let mut builder = Response::builder().status(status);
                if let Some(content_type) = content_type {
                    builder = builder.header(header::CONTENT_TYPE, content_type);
                }
                Ok(builder.body(AxumBody::from(body)).unwrap())
            }
            Some(MockReply::Fail(reason)) => Err(HttpClientError::ConnectionError(reason)),
            None => Ok(Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header(header::CONTENT_TYPE, "application/json")
                .body(AxumBody::from(
                    serde_json::json!({ "message": format!("no mock for {} {}", parts.method, path) })
                        .to_string(),
                ))
                .unwrap()),
        }
    }

    async fn health_check(&self, _url: &str, _timeout_secs: u64) -> HttpClientResult<bool> {
        Ok(self.healthy.lock().unwrap().unwrap_or(true))
    }
}
