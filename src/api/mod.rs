//! Typed wrappers over [`ApiClient`], one per backend resource.
//!
//! Every method returns the unwrapped payload or a normalized [`ApiError`]; none of them
//! touch the cache. Cache-aware reads and mutations live in [`crate::core::queries`].
//!
//! [`ApiError`]: crate::core::error::ApiError
use std::{borrow::Cow, sync::Arc};

use chrono::NaiveDate;

use crate::core::api_client::{ApiClient, QueryParams};

mod attendance;
mod auth;
mod buses;
mod dashboard;
mod notifications;
mod profile;
mod routes;
mod students;
mod system;
mod users;

pub use attendance::AttendanceApi;
pub use auth::AuthApi;
pub use buses::BusesApi;
pub use dashboard::DashboardApi;
pub use notifications::NotificationsApi;
pub use profile::ProfileApi;
pub use routes::RoutesApi;
pub use students::StudentsApi;
pub use system::SystemApi;
pub use users::UsersApi;

/// All resource modules over one shared client.
#[derive(Clone)]
pub struct Api {
    pub auth: AuthApi,
    pub users: UsersApi,
    pub students: StudentsApi,
    pub routes: RoutesApi,
    pub buses: BusesApi,
    pub attendance: AttendanceApi,
    pub notifications: NotificationsApi,
    pub dashboard: DashboardApi,
    pub profile: ProfileApi,
    pub system: SystemApi,
}

impl Api {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            auth: AuthApi::new(client.clone()),
            users: UsersApi::new(client.clone()),
            students: StudentsApi::new(client.clone()),
            routes: RoutesApi::new(client.clone()),
            buses: BusesApi::new(client.clone()),
            attendance: AttendanceApi::new(client.clone()),
            notifications: NotificationsApi::new(client.clone()),
            dashboard: DashboardApi::new(client.clone()),
            profile: ProfileApi::new(client.clone()),
            system: SystemApi::new(client),
        }
    }
}

/// Percent-encode an id for use as one path segment.
pub(crate) fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

pub(crate) fn limit_query(limit: Option<u32>) -> QueryParams {
    let mut query = QueryParams::new();
    if let Some(limit) = limit {
        query.insert("limit".to_string(), limit.to_string());
    }
    query
}

pub(crate) fn date_query(date: Option<NaiveDate>) -> QueryParams {
    let mut query = QueryParams::new();
    if let Some(date) = date {
        query.insert("date".to_string(), date.format("%Y-%m-%d").to_string());
    }
    query
}
