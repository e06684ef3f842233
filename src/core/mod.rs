pub mod api_client;
pub mod cache;
pub mod dashboard;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod queries;
pub mod session;

pub use api_client::{ApiClient, QueryParams};
pub use cache::{QueryCache, QueryKey};
pub use dashboard::{Dashboard, DashboardLoader, DashboardSpec};
pub use error::{ApiError, ApiResult};
pub use guard::{AuthGuard, GuardOutcome, Location};
pub use queries::Queries;
pub use session::{Role, Session, SessionContext};
