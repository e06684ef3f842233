use async_trait::async_trait;
use thiserror::Error;

use crate::core::session::Session;

/// Errors raised while reading or writing the persisted session slot
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionStoreError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session record is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type SessionStoreResult<T> = Result<T, SessionStoreError>;

/// Persisted key-value slot holding the current session.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Read the stored session, `None` when nobody is logged in.
    async fn load(&self) -> SessionStoreResult<Option<Session>>;

    /// Replace the stored session.
    async fn save(&self, session: &Session) -> SessionStoreResult<()>;

    /// Remove the stored session. Clearing an empty slot is not an error.
    async fn clear(&self) -> SessionStoreResult<()>;
}
