pub mod http_client;
pub mod middleware;
pub mod navigator;
pub mod proxy_handler;
pub mod session_store;

pub use http_client::HttpClientAdapter;
pub use navigator::HistoryNavigator;
pub use proxy_handler::ProxyHandler;
pub use session_store::{FileSessionStore, MemorySessionStore};
