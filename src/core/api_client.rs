//! The configured request pipeline every resource module goes through.
//!
//! Responsibilities:
//! * joins resource paths to the configured base (backend or `/api/proxy`)
//! * attaches `Authorization: Bearer <token>` from the session context
//! * enforces the per-request timeout
//! * on 401 clears the session and sends the user to the login view, once
//! * normalizes every failure into [`ApiError`] and unwraps the `{data}` envelope
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::body::Body as AxumBody;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{Method, Request, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use url::Url;

use crate::{
    config::models::ClientConfig,
    core::{
        envelope,
        error::{ApiError, ApiResult, codes},
        session::SessionContext,
    },
    ports::{
        http_client::HttpClient,
        navigator::{LOGIN_PATH, Navigator},
    },
};

/// Query string parameters, kept ordered so they double as cache key parts.
pub type QueryParams = BTreeMap<String, String>;

pub struct ApiClient {
    http_client: Arc<dyn HttpClient>,
    session: Arc<SessionContext>,
    navigator: Arc<dyn Navigator>,
    base_url: String,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        session: Arc<SessionContext>,
        navigator: Arc<dyn Navigator>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        tracing::debug!("API client targeting {} (timeout {:?})", base_url, timeout);
        Self {
            http_client,
            session,
            navigator,
            base_url,
            timeout,
        }
    }

    /// Build a client from configuration, honoring the proxy flag.
    pub fn from_config(
        config: &ClientConfig,
        http_client: Arc<dyn HttpClient>,
        session: Arc<SessionContext>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::new(
            http_client,
            session,
            navigator,
            config.effective_base_url(),
            config.timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.get_with(path, &QueryParams::new()).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryParams,
    ) -> ApiResult<T> {
        let body = self
            .execute(Method::GET, self.resource_url(path, query), None)
            .await?;
        envelope::decode(&body)
    }

    pub async fn post<B, T>(&self, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, payload).await
    }

    pub async fn put<B, T>(&self, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, payload).await
    }

    pub async fn patch<B, T>(&self, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, payload).await
    }

    /// PATCH with no request body, for action endpoints such as `.../read`.
    pub async fn patch_empty<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let body = self
            .execute(
                Method::PATCH,
                self.resource_url(path, &QueryParams::new()),
                None,
            )
            .await?;
        envelope::decode(&body)
    }

    /// Delete a resource. Whatever payload comes back is discarded.
    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(
            Method::DELETE,
            self.resource_url(path, &QueryParams::new()),
            None,
        )
        .await
        .map(|_| ())
    }

    /// GET an absolute path on the base URL's origin, outside the resource prefix.
    pub async fn get_from_origin<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| ApiError::new(e.to_string(), 500, codes::INVALID_REQUEST))?;
        let body = self.execute(Method::GET, url.to_string(), None).await?;
        envelope::decode(&body)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, payload: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(payload).map_err(|e| {
            ApiError::new(
                format!("Failed to encode request body: {e}"),
                500,
                codes::INVALID_REQUEST,
            )
        })?;
        let body = self
            .execute(
                method,
                self.resource_url(path, &QueryParams::new()),
                Some(Bytes::from(bytes)),
            )
            .await?;
        envelope::decode(&body)
    }

    fn resource_url(&self, path: &str, query: &QueryParams) -> String {
        let mut target = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        if !query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query.iter())
                .finish();
            target.push('?');
            target.push_str(&encoded);
        }
        target
    }

    /// Run one request through the pipeline and return the raw success body.
    async fn execute(&self, method: Method, url: String, body: Option<Bytes>) -> ApiResult<Bytes> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");

        if let Some(token) = self.session.token() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = builder
            .body(body.map(AxumBody::from).unwrap_or_else(AxumBody::empty))
            .map_err(|e| {
                ApiError::new(
                    format!("Invalid request to {url}: {e}"),
                    500,
                    codes::INVALID_REQUEST,
                )
            })?;

        tracing::debug!("Sending request: {} {}", method, url);

        let response =
            match tokio::time::timeout(self.timeout, self.http_client.send_request(request)).await
            {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!("Request {} {} failed: {}", method, url, e);
                    return Err(ApiError::transport(&e));
                }
                Err(_) => {
                    tracing::warn!("Request {} {} timed out after {:?}", method, url, self.timeout);
                    return Err(ApiError::timeout(self.timeout.as_millis() as u64));
                }
            };

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|e| {
                ApiError::new(
                    format!("Failed to read response body: {e}"),
                    500,
                    codes::NETWORK_ERROR,
                )
            })?;

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized().await;
        }

        if !status.is_success() {
            let err = ApiError::from_response(status, &bytes);
            tracing::debug!("Request {} {} rejected: {}", method, url, err);
            return Err(err);
        }

        Ok(bytes)
    }

    async fn handle_unauthorized(&self) {
        if !self.session.begin_login_redirect() {
            tracing::debug!("Login redirect already issued, ignoring repeated 401");
            return;
        }

        if let Err(e) = self.session.clear().await {
            tracing::error!("Failed to clear session after 401: {}", e);
        }
        tracing::info!("Authentication rejected, redirecting to {}", LOGIN_PATH);
        self.navigator.navigate(LOGIN_PATH);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        adapters::{navigator::HistoryNavigator, session_store::MemorySessionStore},
        core::session::{Role, Session},
        mocks::MockHttpClient,
    };

    const BASE: &str = "http://backend.test/api";

    async fn client_with_session(
        http: &MockHttpClient,
        session: Option<Session>,
    ) -> (ApiClient, Arc<HistoryNavigator>, Arc<SessionContext>) {
        let store = Arc::new(match session {
            Some(s) => MemorySessionStore::with_session(s),
            None => MemorySessionStore::new(),
        });
        let context = Arc::new(SessionContext::restore(store).await.unwrap());
        let navigator = Arc::new(HistoryNavigator::new());
        let client = ApiClient::new(
            Arc::new(http.clone()),
            context.clone(),
            navigator.clone(),
            BASE,
            Duration::from_millis(200),
        );
        (client, navigator, context)
    }

    fn driver_session() -> Session {
        Session {
            token: "secret".into(),
            role: Role::Driver,
            user_id: "d-1".into(),
        }
    }

    #[tokio::test]
    async fn test_get_attaches_bearer_and_unwraps_envelope() {
        let http = MockHttpClient::new();
        http.respond_json(Method::GET, "/api/buses", 200, json!({"data": [{"id": "b1"}]}));
        let (client, _, _) = client_with_session(&http, Some(driver_session())).await;

        let buses: Vec<serde_json::Value> = client.get("/buses").await.unwrap();
        assert_eq!(buses.len(), 1);

        let sent = http.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].header("authorization").as_deref(), Some("Bearer secret"));
        assert_eq!(
            sent[0].header("content-type").as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_no_token_means_no_authorization_header() {
        let http = MockHttpClient::new();
        http.respond_json(Method::GET, "/api/buses", 200, json!({"data": []}));
        let (client, _, _) = client_with_session(&http, None).await;

        let _: Vec<serde_json::Value> = client.get("/buses").await.unwrap();
        assert!(http.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_query_params_are_encoded() {
        let http = MockHttpClient::new();
        http.respond_json(Method::GET, "/api/users", 200, json!({"data": []}));
        let (client, _, _) = client_with_session(&http, None).await;

        let query = QueryParams::from([
            ("page".to_string(), "2".to_string()),
            ("search".to_string(), "ann lee".to_string()),
        ]);
        let _: Vec<serde_json::Value> = client.get_with("/users", &query).await.unwrap();

        assert_eq!(
            http.requests()[0].uri,
            "http://backend.test/api/users?page=2&search=ann+lee"
        );
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let http = MockHttpClient::new();
        http.respond_json(Method::POST, "/api/students", 201, json!({"data": {"id": "s1"}}));
        let (client, _, _) = client_with_session(&http, Some(driver_session())).await;

        let created: serde_json::Value = client
            .post("/students", &json!({"name": "Ann"}))
            .await
            .unwrap();
        assert_eq!(created["id"], "s1");
        assert_eq!(http.requests()[0].body_json()["name"], "Ann");
    }

    #[tokio::test]
    async fn test_backend_error_is_normalized() {
        let http = MockHttpClient::new();
        http.respond_json(
            Method::PUT,
            "/api/routes/r1",
            422,
            json!({"message": "Route name taken", "code": "ROUTE_CONFLICT"}),
        );
        let (client, navigator, _) = client_with_session(&http, Some(driver_session())).await;

        let err = client
            .put::<_, serde_json::Value>("/routes/r1", &json!({"name": "A"}))
            .await
            .unwrap_err();
        assert_eq!(err.status, 422);
        assert_eq!(err.message, "Route name taken");
        assert_eq!(err.code, "ROUTE_CONFLICT");
        assert!(navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_clears_session_and_redirects_once() {
        let http = MockHttpClient::new();
        http.respond_json(Method::GET, "/api/buses", 401, json!({"message": "Token expired"}));
        let (client, navigator, session) =
            client_with_session(&http, Some(driver_session())).await;

        let err = client.get::<serde_json::Value>("/buses").await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.message, "Token expired");
        assert!(!session.is_authenticated());

        // a second rejected call must not redirect again
        let _ = client.get::<serde_json::Value>("/buses").await;
        assert_eq!(navigator.history(), vec![LOGIN_PATH.to_string()]);
    }

    #[tokio::test]
    async fn test_connection_failure_is_normalized() {
        let http = MockHttpClient::new();
        http.fail(Method::GET, "/api/buses", "connection refused");
        let (client, _, _) = client_with_session(&http, None).await;

        let err = client.get::<serde_json::Value>("/buses").await.unwrap_err();
        assert_eq!(err.status, 500);
        assert_eq!(err.code, codes::NETWORK_ERROR);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let http = MockHttpClient::new();
        http.respond_after(
            Method::GET,
            "/api/buses",
            Duration::from_secs(5),
            200,
            json!({"data": []}),
        );
        let (client, _, _) = client_with_session(&http, None).await;

        let err = client.get::<serde_json::Value>("/buses").await.unwrap_err();
        assert_eq!(err.code, codes::TIMEOUT);
        assert_eq!(err.status, 500);
    }

    #[tokio::test]
    async fn test_delete_ignores_empty_body() {
        let http = MockHttpClient::new();
        http.respond_raw(Method::DELETE, "/api/users/u9", 204, "");
        let (client, _, _) = client_with_session(&http, None).await;

        assert!(client.delete("/users/u9").await.is_ok());
    }

    #[tokio::test]
    async fn test_get_from_origin_escapes_prefix() {
        let http = MockHttpClient::new();
        http.respond_json(Method::GET, "/health", 200, json!({"data": {"status": "ok"}}));
        let (client, _, _) = client_with_session(&http, None).await;

        let health: serde_json::Value = client.get_from_origin("/health").await.unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(http.requests()[0].uri, "http://backend.test/health");
    }
}
