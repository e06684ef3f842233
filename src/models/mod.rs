//! Records exchanged with the backend. Field names are camelCase on the wire.
mod attendance;
mod bus;
mod dashboard;
mod notification;
mod route;
mod student;
mod user;

pub use attendance::{Attendance, AttendanceStatus, AttendanceUpdate, NewAttendance};
pub use bus::{Bus, BusStatus, BusStatusUpdate, NewBus};
pub use dashboard::{AdminDashboard, AttendanceTally, DriverDashboard, ParentDashboard};
pub use notification::{Count, Notification, NotificationDraft, NotificationKind};
pub use route::{NewRoute, Route, RouteUpdate};
pub use student::{NewStudent, Student, StudentUpdate};
pub use user::{LoginCredentials, LoginResponse, PasswordChange, RegisterData, User, UserUpdate};

use serde::{Deserialize, Serialize};

use crate::core::{api_client::QueryParams, session::Role};

/// Filters accepted by the list endpoints. Unset fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub role: Option<Role>,
    pub status: Option<BusStatus>,
    pub unread_only: Option<bool>,
}

impl PaginationParams {
    pub fn page(page: u32, limit: u32) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn to_query(&self) -> QueryParams {
        let mut query = QueryParams::new();
        if let Some(page) = self.page {
            query.insert("page".to_string(), page.to_string());
        }
        if let Some(limit) = self.limit {
            query.insert("limit".to_string(), limit.to_string());
        }
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            query.insert("search".to_string(), search.clone());
        }
        if let Some(role) = self.role {
            query.insert("role".to_string(), role.as_str().to_string());
        }
        if let Some(status) = self.status {
            query.insert("status".to_string(), status.as_str().to_string());
        }
        if let Some(unread_only) = self.unread_only {
            query.insert("unread_only".to_string(), unread_only.to_string());
        }
        query
    }
}
