// Console flows (login, guard, dashboards, logout) against a scripted backend on loopback
#[cfg(test)]
mod test {
    use std::{
        net::SocketAddr,
        sync::{Arc, Mutex},
    };

    use axum::{
        Json, Router,
        body::Bytes,
        extract::State,
        http::{HeaderMap, Method, StatusCode, Uri, header},
        response::{IntoResponse, Response},
    };
    use busgate::{
        FileSessionStore, HttpClientAdapter, ProxyHandler,
        adapters::MemorySessionStore,
        config::AppConfig,
        console::Console,
        core::{Role, Session},
        models::BusStatus,
        ports::{http_client::HttpClient, session_store::SessionStore},
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    const STAMP: &str = "2024-09-02T07:15:00Z";

    #[derive(Clone)]
    struct Backend {
        bus_status: Arc<Mutex<String>>,
    }

    fn user(id: &str, role: &str) -> Value {
        json!({
            "id": id,
            "email": format!("{id}@school.test"),
            "name": format!("User {id}"),
            "role": role,
            "createdAt": STAMP,
            "updatedAt": STAMP
        })
    }

    fn bus(status: &str) -> Value {
        json!({
            "id": "b-1",
            "busNumber": "12",
            "licensePlate": "SCH-012",
            "capacity": 40,
            "status": status,
            "createdAt": STAMP,
            "updatedAt": STAMP
        })
    }

    fn ok(payload: Value) -> Response {
        Json(json!({ "data": payload })).into_response()
    }

    fn rejected(status: StatusCode, message: &str) -> Response {
        (status, Json(json!({ "message": message }))).into_response()
    }

    async fn handle(
        State(backend): State<Backend>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Response {
        let path = uri.path().trim_start_matches("/api");

        if method == Method::POST && path == "/users/login" {
            let credentials: Value = serde_json::from_slice(&body).unwrap_or_default();
            return match credentials["password"].as_str() {
                Some("secret") => ok(json!({ "user": user("a-1", "admin"), "token": "tok-admin" })),
                _ => rejected(StatusCode::UNAUTHORIZED, "Invalid credentials"),
            };
        }

        let caller = match headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        {
            Some("Bearer tok-admin") => user("a-1", "admin"),
            _ => return rejected(StatusCode::UNAUTHORIZED, "Token expired"),
        };

        match (method.as_str(), path) {
            ("GET", "/profile") => ok(caller),
            ("GET", "/dashboard/admin") => ok(json!({
                "totalStudents": 120,
                "totalDrivers": 8,
                "activeBuses": 6,
                "todayAttendance": { "present": 110, "total": 120 }
            })),
            ("GET", "/users") => ok(json!([caller, user("d-1", "driver")])),
            ("GET", "/students" | "/routes") => ok(json!([])),
            ("GET", "/buses") => {
                let status = backend.bus_status.lock().unwrap().clone();
                ok(json!([bus(&status)]))
            }
            ("PATCH", "/buses/b-1/status") => {
                let update: Value = serde_json::from_slice(&body).unwrap_or_default();
                let status = update["status"].as_str().unwrap_or("offline").to_string();
                *backend.bus_status.lock().unwrap() = status.clone();
                ok(bus(&status))
            }
            _ => rejected(StatusCode::NOT_FOUND, "Not found"),
        }
    }

    async fn spawn(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn spawn_backend() -> SocketAddr {
        let backend = Backend {
            bus_status: Arc::new(Mutex::new("active".to_string())),
        };
        spawn(Router::new().fallback(handle).with_state(backend)).await
    }

    fn direct_config(backend: SocketAddr) -> AppConfig {
        let mut config = AppConfig::default();
        config.client.api_base_url = format!("http://{backend}/api");
        config.client.timeout_ms = 5_000;
        config.guard.unauthorized_redirect_delay_secs = 0;
        config
    }

    fn http() -> Arc<dyn HttpClient> {
        Arc::new(HttpClientAdapter::new().unwrap())
    }

    async fn console(config: &AppConfig, store: Arc<dyn SessionStore>) -> Console {
        Console::assemble(config, http(), store).await.unwrap()
    }

    async fn signed_in(config: &AppConfig) -> Console {
        let console = console(config, Arc::new(MemorySessionStore::new())).await;
        console
            .queries
            .login(&busgate::models::LoginCredentials {
                email: "a-1@school.test".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();
        console
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_then_root_lands_on_admin_dashboard() {
        let backend = spawn_backend().await;
        let console = signed_in(&direct_config(backend)).await;
        assert_eq!(console.session.role(), Some(Role::Admin));

        let visit = console.open("/").await.unwrap();

        assert_eq!(visit.trail, vec!["/".to_string()]);
        assert_eq!(visit.location, "/admin/dashboard");
        assert_eq!(visit.user.unwrap().id, "a-1");
        let dashboard = visit.dashboard.unwrap();
        assert_eq!(dashboard.role, Role::Admin);
        assert_eq!(dashboard.data.users.len(), 2);
        assert_eq!(dashboard.data.buses[0].status, BusStatus::Active);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_role_mismatch_detours_through_unauthorized() {
        let backend = spawn_backend().await;
        let console = signed_in(&direct_config(backend)).await;

        let visit = console.open("/driver/dashboard").await.unwrap();

        assert_eq!(
            visit.trail,
            vec!["/driver/dashboard".to_string(), "/unauthorized".to_string()]
        );
        assert_eq!(visit.location, "/admin/dashboard");
        assert!(visit.dashboard.is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_signed_out_visit_goes_to_login() {
        let backend = spawn_backend().await;
        let console = console(
            &direct_config(backend),
            Arc::new(MemorySessionStore::new()),
        )
        .await;

        let visit = console.open("/admin/dashboard").await.unwrap();

        assert_eq!(visit.location, "/login");
        assert!(visit.dashboard.is_none());
        assert_eq!(console.navigator.history(), vec!["/login".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_expired_token_clears_session() {
        let backend = spawn_backend().await;
        let stale = Session {
            token: "tok-stale".to_string(),
            role: Role::Admin,
            user_id: "a-1".to_string(),
        };
        let console = console(
            &direct_config(backend),
            Arc::new(MemorySessionStore::with_session(stale)),
        )
        .await;
        assert!(console.session.is_authenticated());

        let visit = console.open("/admin/dashboard").await.unwrap();

        assert_eq!(visit.location, "/login");
        assert!(!console.session.is_authenticated());
        assert_eq!(console.navigator.history().last().unwrap(), "/login");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bad_credentials_reject_login() {
        let backend = spawn_backend().await;
        let console = console(
            &direct_config(backend),
            Arc::new(MemorySessionStore::new()),
        )
        .await;

        let err = console
            .queries
            .login(&busgate::models::LoginCredentials {
                email: "a-1@school.test".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status, 401);
        assert_eq!(err.message, "Invalid credentials");
        assert!(!console.session.is_authenticated());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bus_status_change_refreshes_fleet() {
        let backend = spawn_backend().await;
        let console = signed_in(&direct_config(backend)).await;
        console.open("/admin/dashboard").await.unwrap();

        let fleet = console
            .dashboards
            .update_bus_status("b-1", BusStatus::Maintenance)
            .await
            .unwrap();

        assert_eq!(fleet[0].status, BusStatus::Maintenance);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_console_through_proxy() {
        let backend = spawn_backend().await;
        let proxy = spawn(
            Arc::new(ProxyHandler::new(http(), format!("http://{backend}/api"))).router(),
        )
        .await;

        let mut config = direct_config(backend);
        config.client.api_base_url = "http://unused.invalid/api".to_string();
        config.client.use_proxy = true;
        config.client.proxy_base_url = format!("http://{proxy}");

        let console = signed_in(&config).await;
        assert_eq!(console.client.base_url(), format!("http://{proxy}/api/proxy"));

        let visit = console.open("/").await.unwrap();
        assert_eq!(visit.location, "/admin/dashboard");
        assert_eq!(visit.dashboard.unwrap().data.users.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_file_survives_restart_until_logout() {
        let backend = spawn_backend().await;
        let config = direct_config(backend);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let first = console(&config, Arc::new(FileSessionStore::new(&path))).await;
        first
            .queries
            .login(&busgate::models::LoginCredentials {
                email: "a-1@school.test".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();

        let second = console(&config, Arc::new(FileSessionStore::new(&path))).await;
        assert_eq!(second.session.token().as_deref(), Some("tok-admin"));
        second.guard.logout().await.unwrap();
        assert_eq!(second.navigator.history().last().unwrap(), "/login");

        let third = console(&config, Arc::new(FileSessionStore::new(&path))).await;
        assert!(!third.session.is_authenticated());
    }
}
