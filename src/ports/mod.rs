pub mod http_client;
pub mod navigator;
pub mod session_store;

pub use http_client::{HttpClient, HttpClientError, HttpClientResult};
pub use navigator::{LOGIN_PATH, Navigator, UNAUTHORIZED_PATH};
pub use session_store::{SessionStore, SessionStoreError, SessionStoreResult};
