use std::sync::Arc;

use axum::{
    Router,
    body::Body as AxumBody,
    extract::{Request, State},
    middleware,
    routing::{any, get},
};
use bytes::Bytes;
use eyre::{Result, WrapErr};
use http_body_util::BodyExt;
use hyper::{
    HeaderMap, Method, Response, StatusCode, Uri,
    ext::ReasonPhrase,
    header::{self, HeaderValue},
};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::{
    adapters::middleware::{request_id_middleware, request_timing_middleware},
    config::models::{PROXY_PREFIX, ProxyConfig},
    ports::http_client::HttpClient,
};

/// Response headers copied from the backend; everything else is dropped.
const FORWARDED_RESPONSE_HEADERS: [header::HeaderName; 2] =
    [header::CONTENT_TYPE, header::CACHE_CONTROL];

/// Server-side forwarder for `ANY /api/proxy/{*path}`.
pub struct ProxyHandler {
    http_client: Arc<dyn HttpClient>,
    backend_base_url: String,
    health_timeout_secs: u64,
}

impl ProxyHandler {
    pub fn new(http_client: Arc<dyn HttpClient>, backend_base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            backend_base_url: backend_base_url.into().trim_end_matches('/').to_string(),
            health_timeout_secs: 5,
        }
    }

    pub fn from_config(config: &ProxyConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let mut handler = Self::new(http_client, config.backend_base_url.clone());
        handler.health_timeout_secs = config.health_timeout_secs;
        handler
    }

    pub fn backend_base_url(&self) -> &str {
        &self.backend_base_url
    }

    /// Axum router exposing the proxy route and the proxy's own health endpoint.
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .route(&format!("{PROXY_PREFIX}/{{*path}}"), any(proxy_route))
            .route("/health", get(health_route))
            .with_state(self)
            .layer(middleware::from_fn(request_timing_middleware))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
    }

    /// Backend URL for a wildcard path. The raw query string is carried over untouched.
    pub fn target_url(&self, path: &str, query: Option<&str>) -> Result<Uri> {
        let mut target = format!(
            "{}/{}",
            self.backend_base_url,
            path.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }
        target
            .parse()
            .wrap_err_with(|| format!("Invalid proxy target '{target}'"))
    }

    /// Forward one request, answering with a 500 envelope if anything goes wrong.
    pub async fn handle_request(&self, req: Request) -> Response<AxumBody> {
        let method = req.method().clone();
        let uri = req.uri().clone();

        match self.forward(req).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Proxy request {} {} failed: {:#}", method, uri, e);
                Self::failure_response(&e)
            }
        }
    }

    async fn forward(&self, req: Request) -> Result<Response<AxumBody>> {
        let (parts, body) = req.into_parts();

        let wildcard = parts
            .uri
            .path()
            .strip_prefix(PROXY_PREFIX)
            .unwrap_or(parts.uri.path());
        let target = self.target_url(wildcard, parts.uri.query())?;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        if let Some(authorization) = parts.headers.get(header::AUTHORIZATION) {
            headers.insert(header::AUTHORIZATION, authorization.clone());
        }

        let payload = if parts.method == Method::GET {
            Bytes::new()
        } else {
            match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    tracing::warn!("Error reading request body, forwarding empty body: {}", e);
                    Bytes::new()
                }
            }
        };

        tracing::info!(
            "Proxying {} {} -> {} ({} body bytes)",
            parts.method,
            parts.uri.path(),
            target,
            payload.len()
        );

        let mut outgoing = hyper::Request::builder()
            .method(parts.method.clone())
            .uri(target.clone())
            .body(AxumBody::from(payload))
            .wrap_err("Failed to build backend request")?;
        *outgoing.headers_mut() = headers;

        let response = self
            .http_client
            .send_request(outgoing)
            .await
            .wrap_err_with(|| format!("Backend request to {target} failed"))?;

        let (backend_parts, backend_body) = response.into_parts();
        let bytes = backend_body
            .collect()
            .await
            .wrap_err("Failed to read backend response body")?
            .to_bytes();

        let mut builder = Response::builder().status(backend_parts.status);
        for name in FORWARDED_RESPONSE_HEADERS {
            if let Some(value) = backend_parts.headers.get(&name) {
                builder = builder.header(name, value.clone());
            }
        }
        // hyper only attaches a reason phrase when the backend's differs from the canonical one
        if let Some(reason) = backend_parts.extensions.get::<ReasonPhrase>() {
            builder = builder.extension(reason.clone());
        }

        builder
            .body(AxumBody::from(bytes))
            .wrap_err("Failed to build proxy response")
    }

    fn failure_response(err: &eyre::Report) -> Response<AxumBody> {
        let envelope = serde_json::json!({
            "error": "Proxy request failed",
            "message": format!("{err:#}"),
        });

        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header(header::CONTENT_TYPE, "application/json")
            .body(AxumBody::from(envelope.to_string()))
            .unwrap_or_else(|_| {
                let mut fallback = Response::new(AxumBody::from(envelope.to_string()));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }

    /// Report proxy liveness plus whether the backend origin answers `/health`.
    pub async fn handle_health(&self) -> Result<Response<AxumBody>> {
        let backend_reachable = match Url::parse(&self.backend_base_url)
            .and_then(|base| base.join("/health"))
        {
            Ok(url) => self
                .http_client
                .health_check(url.as_str(), self.health_timeout_secs)
                .await
                .unwrap_or(false),
            Err(e) => {
                tracing::warn!("Cannot derive backend health URL: {}", e);
                false
            }
        };

        let health_data = serde_json::json!({
            "status": "healthy",
            "backend": {
                "url": self.backend_base_url,
                "reachable": backend_reachable,
            },
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(AxumBody::from(health_data.to_string()))
            .wrap_err("Failed to build health check response")
    }
}

async fn proxy_route(State(proxy): State<Arc<ProxyHandler>>, req: Request) -> Response<AxumBody> {
    proxy.handle_request(req).await
}

async fn health_route(State(proxy): State<Arc<ProxyHandler>>) -> Response<AxumBody> {
    match proxy.handle_health().await {
        Ok(response) => response,
        Err(e) => ProxyHandler::failure_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use tower::ServiceExt; // for oneshot

    use super::*;
    use crate::mocks::MockHttpClient;

    fn create_test_proxy(http: &MockHttpClient) -> Router {
        Arc::new(ProxyHandler::new(
            Arc::new(http.clone()),
            "http://backend.test/api/",
        ))
        .router()
    }

    async fn body_string(response: Response<AxumBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_target_url_joins_path_and_query() {
        let proxy = ProxyHandler::new(Arc::new(MockHttpClient::new()), "http://backend.test/api/");
        assert_eq!(
            proxy.target_url("/students", Some("page=2")).unwrap(),
            "http://backend.test/api/students?page=2"
        );
        assert_eq!(
            proxy.target_url("buses/b1/status", None).unwrap(),
            "http://backend.test/api/buses/b1/status"
        );
    }

    #[tokio::test]
    async fn test_get_preserves_query_and_authorization() {
        let http = MockHttpClient::new();
        http.respond_json(
            Method::GET,
            "/api/students",
            200,
            serde_json::json!({"data": []}),
        );
        let app = create_test_proxy(&http);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/students?page=2&search=a%20b")
                    .header(header::AUTHORIZATION, "Bearer t0k")
                    .header(header::COOKIE, "session=1")
                    .body(AxumBody::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let sent = &http.requests()[0];
        assert_eq!(sent.method, Method::GET);
        assert_eq!(
            sent.uri,
            "http://backend.test/api/students?page=2&search=a%20b"
        );
        assert_eq!(sent.header("authorization").as_deref(), Some("Bearer t0k"));
        assert_eq!(sent.header("content-type").as_deref(), Some("application/json"));
        assert!(sent.header("cookie").is_none());
        assert!(sent.body.is_empty());
    }

    #[tokio::test]
    async fn test_body_is_forwarded_byte_for_byte() {
        let raw = "{ \"status\" :\"active\",\n  \"current_location\": null }";
        for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
            let http = MockHttpClient::new();
            http.respond_json(
                method.clone(),
                "/api/buses/b1/status",
                200,
                serde_json::json!({"data": {}}),
            );
            let app = create_test_proxy(&http);

            let response = app
                .oneshot(
                    Request::builder()
                        .method(method.clone())
                        .uri("/api/proxy/buses/b1/status")
                        .header(header::CONTENT_TYPE, "text/plain")
                        .body(AxumBody::from(raw))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let sent = &http.requests()[0];
            assert_eq!(sent.method, method);
            assert_eq!(sent.body, Bytes::from(raw));
            assert_eq!(sent.header("content-type").as_deref(), Some("application/json"));
            assert!(sent.header("authorization").is_none());
        }
    }

    #[tokio::test]
    async fn test_unreadable_body_is_forwarded_empty() {
        let http = MockHttpClient::new();
        http.respond_json(
            Method::POST,
            "/api/routes",
            201,
            serde_json::json!({"data": {"id": "r-1"}}),
        );
        let app = create_test_proxy(&http);
        let broken = futures_util::stream::iter(vec![Err::<Bytes, std::io::Error>(
            std::io::Error::other("connection reset by client"),
        )]);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/proxy/routes")
                    .header(header::AUTHORIZATION, "Bearer t-1")
                    .body(AxumBody::from_stream(broken))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let requests = http.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert!(requests[0].body.is_empty());
        assert_eq!(requests[0].header("authorization").as_deref(), Some("Bearer t-1"));
    }

    #[tokio::test]
    async fn test_backend_status_and_body_are_returned_verbatim() {
        let http = MockHttpClient::new();
        http.respond_raw(Method::GET, "/api/routes/r9", 404, "route r9 does not exist");
        let app = create_test_proxy(&http);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/routes/r9")
                    .body(AxumBody::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
        assert_eq!(body_string(response).await, "route r9 does not exist");
    }

    #[tokio::test]
    async fn test_unreachable_backend_yields_error_envelope() {
        let http = MockHttpClient::new();
        http.fail(Method::GET, "/api/buses", "connection refused");
        let app = create_test_proxy(&http);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/proxy/buses")
                    .body(AxumBody::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["error"], "Proxy request failed");
        assert!(
            body["message"]
                .as_str()
                .unwrap()
                .contains("connection refused")
        );
    }

    #[tokio::test]
    async fn test_health_reports_backend_reachability() {
        let http = MockHttpClient::new();
        http.set_healthy(false);
        let app = create_test_proxy(&http);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(AxumBody::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["backend"]["reachable"], false);
    }
}
