//! Session and role gate in front of every protected location.
//!
//! A check reads the stored token, confirms it with exactly one profile fetch and
//! compares the fetched role against what the location requires. Callers only load
//! protected data after a [`GuardOutcome::Render`].
use std::{sync::Arc, time::Duration};

use crate::{
    core::{cache::QueryKey, queries::Queries, session::Role},
    models::User,
    ports::{
        navigator::{LOGIN_PATH, Navigator, UNAUTHORIZED_PATH},
        session_store::SessionStoreResult,
    },
};

/// What a location demands of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Role(Role),
}

/// A console location together with the access it requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    access: Access,
}

impl Location {
    /// Classify a path. Query strings and trailing slashes are ignored.
    pub fn parse(raw: &str) -> Self {
        let path = raw.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed if trimmed.starts_with('/') => trimmed.to_string(),
            trimmed => format!("/{trimmed}"),
        };

        let first = path.trim_start_matches('/').split('/').next().unwrap_or_default();
        let access = match first {
            "login" | "register" | "unauthorized" => Access::Public,
            "admin" => Access::Role(Role::Admin),
            "driver" => Access::Role(Role::Driver),
            "parent" => Access::Role(Role::Parent),
            _ => Access::Authenticated,
        };

        Self { path, access }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn required_role(&self) -> Option<Role> {
        match self.access {
            Access::Role(role) => Some(role),
            _ => None,
        }
    }

    pub fn is_public(&self) -> bool {
        self.access == Access::Public
    }

    /// The dashboard a role lands on, when this location is one.
    pub fn dashboard_role(&self) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| role.dashboard_path() == self.path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
    /// Location needs no session.
    Public,
    /// Nothing may be shown; the user was sent to the given location.
    Redirect(String),
    /// Protected content may load. `redirect` is set when `/` forwards to a dashboard.
    Render { user: User, redirect: Option<String> },
}

pub struct AuthGuard {
    queries: Arc<Queries>,
    navigator: Arc<dyn Navigator>,
    unauthorized_delay: Duration,
}

impl AuthGuard {
    pub fn new(
        queries: Arc<Queries>,
        navigator: Arc<dyn Navigator>,
        unauthorized_delay: Duration,
    ) -> Self {
        Self {
            queries,
            navigator,
            unauthorized_delay,
        }
    }

    /// Classify `path` and check it. Public locations pass without touching the session.
    pub async fn enter(&self, path: &str) -> GuardOutcome {
        let location = Location::parse(path);
        if location.is_public() {
            return GuardOutcome::Public;
        }
        self.check(location.path(), location.required_role()).await
    }

    /// Gate `path` on a live session and, when given, on `required_role`.
    pub async fn check(&self, path: &str, required_role: Option<Role>) -> GuardOutcome {
        let session = self.queries.session();
        if session.token().is_none() {
            tracing::debug!("No session token, {} requires login", path);
            return self.redirect(LOGIN_PATH);
        }

        match self.queries.api().auth.profile().await {
            Ok(user) => {
                if let Err(e) = self
                    .queries
                    .cache()
                    .set_query_data(QueryKey::auth_me(), &user)
                    .await
                {
                    tracing::warn!("Could not cache profile: {}", e);
                }

                if let Some(required) = required_role.filter(|r| *r != user.role) {
                    tracing::info!(
                        "User {} ({}) denied {}, requires {}",
                        user.id,
                        user.role,
                        path,
                        required
                    );
                    return self.redirect(UNAUTHORIZED_PATH);
                }

                let redirect = (path == "/").then(|| user.role.dashboard_path().to_string());
                if let Some(target) = &redirect {
                    self.navigator.navigate(target);
                }
                GuardOutcome::Render { user, redirect }
            }
            Err(err) => {
                tracing::warn!("Session check for {} failed: {}", path, err);
                if let Err(e) = session.clear().await {
                    tracing::error!("Failed to clear session: {}", e);
                }
                // a 401 has already been redirected by the client
                if err.is_unauthorized() {
                    GuardOutcome::Redirect(LOGIN_PATH.to_string())
                } else {
                    self.redirect(LOGIN_PATH)
                }
            }
        }
    }

    /// Delay and target for the role-mismatch view.
    pub fn unauthorized_redirect(&self) -> (Duration, String) {
        let target = self
            .queries
            .session()
            .role()
            .map_or(LOGIN_PATH, |role| role.dashboard_path());
        (self.unauthorized_delay, target.to_string())
    }

    /// Wait out the role-mismatch view, then move on. Returns where it went.
    pub async fn follow_unauthorized_redirect(&self) -> String {
        let (delay, target) = self.unauthorized_redirect();
        tokio::time::sleep(delay).await;
        self.navigator.navigate(&target);
        target
    }

    /// Drop the session and cached data and return to the login view.
    pub async fn logout(&self) -> SessionStoreResult<()> {
        let result = self.queries.logout().await;
        self.navigator.navigate(LOGIN_PATH);
        result
    }

    fn redirect(&self, target: &str) -> GuardOutcome {
        self.navigator.navigate(target);
        GuardOutcome::Redirect(target.to_string())
    }
}
