//! Session identity and the single read/write boundary over the persisted session slot.
//!
//! Nothing outside [`SessionContext`] touches the [`SessionStore`]; the guard, the API
//! client and the query layer all share one context through an `Arc`.
use std::{
    fmt,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ports::session_store::{SessionStore, SessionStoreResult};

/// Console roles, each with its own dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Driver,
    Parent,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Driver, Role::Parent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Driver => "driver",
            Role::Parent => "parent",
        }
    }

    /// Landing location for this role.
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            Role::Admin => "/admin/dashboard",
            Role::Driver => "/driver/dashboard",
            Role::Parent => "/parent/dashboard",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Unknown role '{0}', expected admin, driver or parent")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "driver" => Ok(Role::Driver),
            "parent" => Ok(Role::Parent),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Authenticated identity plus bearer token. Serialized with the persisted key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "authToken")]
    pub token: String,
    #[serde(rename = "userRole")]
    pub role: Role,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Shared view of the current session backed by a [`SessionStore`].
pub struct SessionContext {
    store: Arc<dyn SessionStore>,
    current: ArcSwapOption<Session>,
    // set once a 401 has sent the user to the login view; cleared by `establish`
    login_redirect_pending: AtomicBool,
}

impl SessionContext {
    /// Create an empty context over `store` without reading it.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            current: ArcSwapOption::empty(),
            login_redirect_pending: AtomicBool::new(false),
        }
    }

    /// Create a context primed with whatever `store` currently holds.
    pub async fn restore(store: Arc<dyn SessionStore>) -> SessionStoreResult<Self> {
        let context = Self::new(store);
        if let Some(session) = context.store.load().await? {
            tracing::debug!(
                "Restored session for user {} ({})",
                session.user_id,
                session.role
            );
            context.current.store(Some(Arc::new(session)));
        }
        Ok(context)
    }

    pub fn current(&self) -> Option<Arc<Session>> {
        self.current.load_full()
    }

    pub fn token(&self) -> Option<String> {
        self.current.load_full().map(|s| s.token.clone())
    }

    /// Role of the stored session, used to pick redirect targets.
    pub fn role(&self) -> Option<Role> {
        self.current.load_full().map(|s| s.role)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.load().is_some()
    }

    /// Persist a freshly issued session and make it current.
    pub async fn establish(&self, session: Session) -> SessionStoreResult<()> {
        self.store.save(&session).await?;
        tracing::info!(
            "Session established for user {} ({})",
            session.user_id,
            session.role
        );
        self.current.store(Some(Arc::new(session)));
        self.login_redirect_pending.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Drop the current session from memory and from the persisted slot.
    pub async fn clear(&self) -> SessionStoreResult<()> {
        self.current.store(None);
        self.store.clear().await?;
        tracing::info!("Session cleared");
        Ok(())
    }

    /// Returns `true` for the first caller after a session was lost to a 401.
    pub(crate) fn begin_login_redirect(&self) -> bool {
        self.login_redirect_pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::session_store::MemorySessionStore;

    fn admin_session() -> Session {
        Session {
            token: "tok-1".to_string(),
            role: Role::Admin,
            user_id: "u-1".to_string(),
        }
    }

    #[test]
    fn test_role_dashboard_paths() {
        assert_eq!(Role::Admin.dashboard_path(), "/admin/dashboard");
        assert_eq!(Role::Driver.dashboard_path(), "/driver/dashboard");
        assert_eq!(Role::Parent.dashboard_path(), "/parent/dashboard");
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Driver".parse::<Role>().unwrap(), Role::Driver);
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn test_session_uses_persisted_key_names() {
        let json = serde_json::to_value(admin_session()).unwrap();
        assert_eq!(json["authToken"], "tok-1");
        assert_eq!(json["userRole"], "admin");
        assert_eq!(json["userId"], "u-1");
    }

    #[tokio::test]
    async fn test_establish_and_clear() {
        let store = Arc::new(MemorySessionStore::new());
        let context = SessionContext::new(store.clone());
        assert!(!context.is_authenticated());

        context.establish(admin_session()).await.unwrap();
        assert_eq!(context.token().as_deref(), Some("tok-1"));
        assert_eq!(context.role(), Some(Role::Admin));
        assert!(store.load().await.unwrap().is_some());

        context.clear().await.unwrap();
        assert!(context.token().is_none());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_reads_store() {
        let store = Arc::new(MemorySessionStore::with_session(admin_session()));
        let context = SessionContext::restore(store).await.unwrap();
        assert_eq!(context.current().unwrap().user_id, "u-1");
    }

    #[tokio::test]
    async fn test_login_redirect_latch_resets_on_new_session() {
        let context = SessionContext::new(Arc::new(MemorySessionStore::new()));

        assert!(context.begin_login_redirect());
        assert!(!context.begin_login_redirect());

        context.establish(admin_session()).await.unwrap();
        assert!(context.begin_login_redirect());
    }
}
