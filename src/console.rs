//! Composition root for the client side: session, API client, cache, guard and
//! dashboards built from one [`AppConfig`].
use std::sync::Arc;

use eyre::{Result, WrapErr};

use crate::{
    adapters::{FileSessionStore, HistoryNavigator, HttpClientAdapter},
    api::Api,
    config::AppConfig,
    core::{
        ApiClient, ApiResult, AuthGuard, Dashboard, DashboardLoader, GuardOutcome, Location,
        QueryCache, Queries, SessionContext,
    },
    models::User,
    ports::{UNAUTHORIZED_PATH, http_client::HttpClient, session_store::SessionStore},
};

/// Redirect chains longer than this are cut off.
const MAX_HOPS: usize = 4;

/// Where a visit ended up.
#[derive(Debug, Clone)]
pub struct Visit {
    /// Locations passed through before arriving, in order.
    pub trail: Vec<String>,
    pub location: String,
    pub user: Option<User>,
    /// Loaded when the location is a role dashboard.
    pub dashboard: Option<Dashboard>,
}

impl Visit {
    fn arrived(trail: Vec<String>, location: String) -> Self {
        Self {
            trail,
            location,
            user: None,
            dashboard: None,
        }
    }
}

pub struct Console {
    pub session: Arc<SessionContext>,
    pub client: Arc<ApiClient>,
    pub queries: Arc<Queries>,
    pub guard: AuthGuard,
    pub dashboards: DashboardLoader,
    pub navigator: Arc<HistoryNavigator>,
}

impl Console {
    /// Build against the real backend (or proxy) with the on-disk session file.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let http_client: Arc<dyn HttpClient> =
            Arc::new(HttpClientAdapter::new().wrap_err("Failed to create HTTP client adapter")?);
        let store: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::new(config.session.resolved_path()));
        Self::assemble(config, http_client, store).await
    }

    /// Build from explicit adapters.
    pub async fn assemble(
        config: &AppConfig,
        http_client: Arc<dyn HttpClient>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let session = Arc::new(
            SessionContext::restore(store)
                .await
                .wrap_err("Failed to restore session")?,
        );
        let navigator = Arc::new(HistoryNavigator::new());
        let client = Arc::new(ApiClient::from_config(
            &config.client,
            http_client,
            session.clone(),
            navigator.clone(),
        ));
        let queries = Arc::new(Queries::new(
            Api::new(client.clone()),
            Arc::new(QueryCache::new()),
            session.clone(),
        ));
        let guard = AuthGuard::new(
            queries.clone(),
            navigator.clone(),
            config.guard.unauthorized_delay(),
        );
        let dashboards = DashboardLoader::new(queries.clone());

        tracing::debug!(
            "Console ready against {} (signed in: {})",
            client.base_url(),
            session.is_authenticated()
        );

        Ok(Self {
            session,
            client,
            queries,
            guard,
            dashboards,
            navigator,
        })
    }

    /// Visit `path` the way the console would: guard first, follow redirects, and load
    /// the dashboard when the final location is one.
    pub async fn open(&self, path: &str) -> ApiResult<Visit> {
        let mut trail = Vec::new();
        let mut location = path.to_string();

        for _ in 0..MAX_HOPS {
            match self.guard.enter(&location).await {
                GuardOutcome::Public => return Ok(Visit::arrived(trail, location)),
                GuardOutcome::Redirect(target) if target == UNAUTHORIZED_PATH => {
                    trail.push(location);
                    trail.push(target);
                    location = self.guard.follow_unauthorized_redirect().await;
                }
                GuardOutcome::Redirect(target) => {
                    trail.push(location);
                    return Ok(Visit::arrived(trail, target));
                }
                GuardOutcome::Render {
                    redirect: Some(target),
                    ..
                } => {
                    trail.push(location);
                    location = target;
                }
                GuardOutcome::Render {
                    user,
                    redirect: None,
                } => {
                    let dashboard = match Location::parse(&location).dashboard_role() {
                        Some(role) => Some(self.dashboards.load(role).await?),
                        None => None,
                    };
                    return Ok(Visit {
                        trail,
                        location,
                        user: Some(user),
                        dashboard,
                    });
                }
            }
        }

        tracing::warn!("Gave up following redirects at {}", location);
        Ok(Visit::arrived(trail, location))
    }
}
