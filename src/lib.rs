//! Busgate - the access and data layer of a school bus administration console.
//!
//! The crate has two halves that share one configuration file:
//!
//! - a **reverse proxy** (`ANY /api/proxy/{*path}`) that relays console traffic to the remote
//!   backend and reports its reachability on `GET /health`;
//! - a **client layer**: an authenticated HTTP client that unwraps the backend's `{data}`
//!   envelope, a keyed query cache with prefix invalidation, typed resource APIs, the role
//!   based route guard and the per-role dashboard loader.
//!
//! # Architecture
//! As in a hexagonal layout, **ports** are traits (HTTP transport, session storage,
//! navigation) and **adapters** implement them. Business rules live in `core` and only talk
//! to the ports, which is what lets the test suites drive everything through in-memory
//! fakes.
//!
//! # Quick Example
//! ```no_run
//! use busgate::{config::load_config, console::Console};
//!
//! # #[tokio::main] async fn main() -> eyre::Result<()> {
//! let config = load_config("busgate.toml").await?;
//! let console = Console::from_config(&config).await?;
//! let visit = console.open("/admin/dashboard").await?;
//! println!("ended up at {}", visit.location);
//! # Ok(()) }
//! ```
//!
//! # Error Handling
//! Client calls return [`core::ApiResult`], whose error always carries a message, an HTTP
//! status (500 when nothing came back) and a code. Process level plumbing uses
//! `eyre::Result<T>` with `WrapErr` context.
//!
//! # Concurrency & Data Structures
//! Shared maps (cache entries, in-flight fetches) use `scc::HashMap`; the current session is
//! swapped atomically through `arc_swap`.
pub mod config;
pub mod models;
pub mod ports;
pub mod tracing_setup;
pub mod utils;

pub mod adapters;
pub mod api;
pub mod console;
pub mod core;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use crate::{
    adapters::{FileSessionStore, HistoryNavigator, HttpClientAdapter, ProxyHandler},
    console::{Console, Visit},
    core::{ApiError, ApiResult, AuthGuard, GuardOutcome, Queries, Role, Session},
    ports::http_client::HttpClient,
    utils::GracefulShutdown,
};
