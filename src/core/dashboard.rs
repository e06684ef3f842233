//! One dashboard, parameterized by role.
//!
//! Each role maps to a [`DashboardSpec`]: the tabs it shows and the data sources it
//! needs. [`DashboardLoader::load`] fetches every source concurrently and fails as a
//! whole if any of them fails.
use std::sync::Arc;

use futures_util::future::try_join_all;
use serde::Serialize;

use crate::{
    core::{error::ApiResult, queries::Queries, session::Role},
    models::{
        AdminDashboard, Attendance, Bus, BusStatus, BusStatusUpdate, DriverDashboard,
        Notification, PaginationParams, ParentDashboard, Route, Student, User,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Overview,
    Users,
    Students,
    Routes,
    Buses,
    Attendance,
    Notifications,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// The role's pre-aggregated summary.
    Summary,
    Users,
    Students,
    Routes,
    Buses,
    Notifications,
    /// Attendance history of every loaded student, fetched once students are known.
    StudentAttendance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardSpec {
    pub role: Role,
    pub tabs: &'static [Tab],
    pub sources: &'static [DataSource],
}

const ADMIN: DashboardSpec = DashboardSpec {
    role: Role::Admin,
    tabs: &[Tab::Overview, Tab::Users, Tab::Students, Tab::Routes, Tab::Buses],
    sources: &[
        DataSource::Summary,
        DataSource::Users,
        DataSource::Students,
        DataSource::Routes,
        DataSource::Buses,
    ],
};

const DRIVER: DashboardSpec = DashboardSpec {
    role: Role::Driver,
    tabs: &[
        Tab::Overview,
        Tab::Routes,
        Tab::Buses,
        Tab::Attendance,
        Tab::Notifications,
    ],
    sources: &[
        DataSource::Summary,
        DataSource::Routes,
        DataSource::Buses,
        DataSource::Notifications,
    ],
};

const PARENT: DashboardSpec = DashboardSpec {
    role: Role::Parent,
    tabs: &[
        Tab::Overview,
        Tab::Students,
        Tab::Attendance,
        Tab::Notifications,
    ],
    sources: &[
        DataSource::Summary,
        DataSource::Students,
        DataSource::Notifications,
        DataSource::StudentAttendance,
    ],
};

impl DashboardSpec {
    pub fn for_role(role: Role) -> &'static DashboardSpec {
        match role {
            Role::Admin => &ADMIN,
            Role::Driver => &DRIVER,
            Role::Parent => &PARENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "role", content = "summary", rename_all = "lowercase")]
pub enum Summary {
    Admin(AdminDashboard),
    Driver(DriverDashboard),
    Parent(ParentDashboard),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardData {
    pub summary: Option<Summary>,
    pub users: Vec<User>,
    pub students: Vec<Student>,
    pub routes: Vec<Route>,
    pub buses: Vec<Bus>,
    pub notifications: Vec<Notification>,
    pub attendance: Vec<Attendance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub role: Role,
    pub tabs: Vec<Tab>,
    pub data: DashboardData,
}

enum Loaded {
    Summary(Summary),
    Users(Vec<User>),
    Students(Vec<Student>),
    Routes(Vec<Route>),
    Buses(Vec<Bus>),
    Notifications(Vec<Notification>),
    Deferred,
}

impl DashboardData {
    fn absorb(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Summary(summary) => self.summary = Some(summary),
            Loaded::Users(users) => self.users = users,
            Loaded::Students(students) => self.students = students,
            Loaded::Routes(routes) => self.routes = routes,
            Loaded::Buses(buses) => self.buses = buses,
            Loaded::Notifications(notifications) => self.notifications = notifications,
            Loaded::Deferred => {}
        }
    }
}

pub struct DashboardLoader {
    queries: Arc<Queries>,
}

impl DashboardLoader {
    pub fn new(queries: Arc<Queries>) -> Self {
        Self { queries }
    }

    pub async fn load(&self, role: Role) -> ApiResult<Dashboard> {
        let spec = DashboardSpec::for_role(role);
        tracing::debug!("Loading {} dashboard ({} sources)", role, spec.sources.len());

        let loaded = try_join_all(
            spec.sources
                .iter()
                .map(|source| self.load_source(role, *source)),
        )
        .await?;

        let mut data = DashboardData::default();
        for item in loaded {
            data.absorb(item);
        }

        if spec.sources.contains(&DataSource::StudentAttendance) {
            let histories = try_join_all(
                data.students
                    .iter()
                    .map(|student| self.queries.student_attendance(&student.id, None)),
            )
            .await?;
            data.attendance = histories.into_iter().flatten().collect();
        }

        Ok(Dashboard {
            role,
            tabs: spec.tabs.to_vec(),
            data,
        })
    }

    async fn load_source(&self, role: Role, source: DataSource) -> ApiResult<Loaded> {
        let all = PaginationParams::default();
        Ok(match source {
            DataSource::Summary => Loaded::Summary(match role {
                Role::Admin => Summary::Admin(self.queries.admin_dashboard().await?),
                Role::Driver => Summary::Driver(self.queries.driver_dashboard().await?),
                Role::Parent => Summary::Parent(self.queries.parent_dashboard().await?),
            }),
            DataSource::Users => Loaded::Users(self.queries.users(&all).await?),
            DataSource::Students => Loaded::Students(self.queries.students(&all).await?),
            DataSource::Routes => Loaded::Routes(self.queries.routes(&all).await?),
            DataSource::Buses => Loaded::Buses(self.queries.buses(&all).await?),
            DataSource::Notifications => {
                Loaded::Notifications(self.queries.notifications(&all).await?)
            }
            // needs the students first, see `load`
            DataSource::StudentAttendance => Loaded::Deferred,
        })
    }

    /// Change a bus's status from the dashboard and return the refetched fleet.
    pub async fn update_bus_status(&self, bus_id: &str, status: BusStatus) -> ApiResult<Vec<Bus>> {
        self.queries
            .update_bus_status(bus_id, &BusStatusUpdate::status(status))
            .await?;
        self.queries.buses(&PaginationParams::default()).await
    }
}
