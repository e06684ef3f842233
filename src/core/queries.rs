//! Cache-aware reads and mutations over the resource modules.
//!
//! Reads go through [`QueryCache::fetch`]. Mutations follow one rule set: a
//! single-record update writes the detail entry directly and marks the category stale,
//! a delete removes the detail entry and marks the category stale, anything else
//! just marks the category stale.
use std::sync::Arc;

use crate::{
    api::Api,
    core::{
        cache::{QueryCache, QueryKey, resources},
        error::{ApiError, ApiResult, codes},
        session::SessionContext,
    },
    models::{
        AdminDashboard, Attendance, AttendanceUpdate, Bus, BusStatusUpdate, Count,
        DriverDashboard, LoginCredentials, LoginResponse, NewAttendance, NewRoute, NewStudent,
        Notification, NotificationDraft, PaginationParams, ParentDashboard, RegisterData, Route,
        RouteUpdate, Student, StudentUpdate, User, UserUpdate,
    },
    ports::session_store::SessionStoreResult,
};

pub struct Queries {
    api: Api,
    cache: Arc<QueryCache>,
    session: Arc<SessionContext>,
}

impl Queries {
    pub fn new(api: Api, cache: Arc<QueryCache>, session: Arc<SessionContext>) -> Self {
        Self {
            api,
            cache,
            session,
        }
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    // reads

    pub async fn me(&self) -> ApiResult<User> {
        let auth = self.api.auth.clone();
        self.cache
            .fetch(QueryKey::auth_me(), move || async move { auth.profile().await })
            .await
    }

    pub async fn users(&self, params: &PaginationParams) -> ApiResult<Vec<User>> {
        let users = self.api.users.clone();
        let params = params.clone();
        self.cache
            .fetch(
                QueryKey::list(resources::USERS, params.to_query()),
                move || async move { users.list(&params).await },
            )
            .await
    }

    pub async fn user(&self, id: &str) -> ApiResult<User> {
        let users = self.api.users.clone();
        let id = id.to_string();
        self.cache
            .fetch(QueryKey::detail(resources::USERS, &id), move || async move {
                users.get(&id).await
            })
            .await
    }

    pub async fn students(&self, params: &PaginationParams) -> ApiResult<Vec<Student>> {
        let students = self.api.students.clone();
        let params = params.clone();
        self.cache
            .fetch(
                QueryKey::list(resources::STUDENTS, params.to_query()),
                move || async move { students.list(&params).await },
            )
            .await
    }

    pub async fn student(&self, id: &str) -> ApiResult<Student> {
        let students = self.api.students.clone();
        let id = id.to_string();
        self.cache
            .fetch(
                QueryKey::detail(resources::STUDENTS, &id),
                move || async move { students.get(&id).await },
            )
            .await
    }

    pub async fn student_attendance(
        &self,
        student_id: &str,
        limit: Option<u32>,
    ) -> ApiResult<Vec<Attendance>> {
        let attendance = self.api.attendance.clone();
        let student_id = student_id.to_string();
        let key = QueryKey::all(resources::ATTENDANCE)
            .push("student")
            .push(student_id.as_str())
            .with_params(crate::api::limit_query(limit));
        self.cache
            .fetch(key, move || async move {
                attendance.student_history(&student_id, limit).await
            })
            .await
    }

    pub async fn today_attendance(&self) -> ApiResult<Vec<Attendance>> {
        let attendance = self.api.attendance.clone();
        self.cache
            .fetch(
                QueryKey::all(resources::ATTENDANCE).push("today"),
                move || async move { attendance.today().await },
            )
            .await
    }

    pub async fn routes(&self, params: &PaginationParams) -> ApiResult<Vec<Route>> {
        let routes = self.api.routes.clone();
        let params = params.clone();
        self.cache
            .fetch(
                QueryKey::list(resources::ROUTES, params.to_query()),
                move || async move { routes.list(&params).await },
            )
            .await
    }

    pub async fn route(&self, id: &str) -> ApiResult<Route> {
        let routes = self.api.routes.clone();
        let id = id.to_string();
        self.cache
            .fetch(QueryKey::detail(resources::ROUTES, &id), move || async move {
                routes.get(&id).await
            })
            .await
    }

    pub async fn route_students(&self, id: &str) -> ApiResult<Vec<Student>> {
        let routes = self.api.routes.clone();
        let id = id.to_string();
        self.cache
            .fetch(
                QueryKey::detail(resources::ROUTES, &id).push("students"),
                move || async move { routes.students(&id).await },
            )
            .await
    }

    pub async fn buses(&self, params: &PaginationParams) -> ApiResult<Vec<Bus>> {
        let buses = self.api.buses.clone();
        let params = params.clone();
        self.cache
            .fetch(
                QueryKey::list(resources::BUSES, params.to_query()),
                move || async move { buses.list(&params).await },
            )
            .await
    }

    pub async fn bus(&self, id: &str) -> ApiResult<Bus> {
        let buses = self.api.buses.clone();
        let id = id.to_string();
        self.cache
            .fetch(QueryKey::detail(resources::BUSES, &id), move || async move {
                buses.get(&id).await
            })
            .await
    }

    pub async fn bus_students(&self, id: &str) -> ApiResult<Vec<Student>> {
        let buses = self.api.buses.clone();
        let id = id.to_string();
        self.cache
            .fetch(
                QueryKey::detail(resources::BUSES, &id).push("students"),
                move || async move { buses.students(&id).await },
            )
            .await
    }

    pub async fn notifications(&self, params: &PaginationParams) -> ApiResult<Vec<Notification>> {
        let notifications = self.api.notifications.clone();
        let params = params.clone();
        self.cache
            .fetch(
                QueryKey::list(resources::NOTIFICATIONS, params.to_query()),
                move || async move { notifications.list(&params).await },
            )
            .await
    }

    pub async fn unread_count(&self) -> ApiResult<Count> {
        let notifications = self.api.notifications.clone();
        self.cache
            .fetch(
                QueryKey::all(resources::NOTIFICATIONS).push("unread"),
                move || async move { notifications.unread_count().await },
            )
            .await
    }

    pub async fn admin_dashboard(&self) -> ApiResult<AdminDashboard> {
        let dashboard = self.api.dashboard.clone();
        self.cache
            .fetch(
                QueryKey::all(resources::DASHBOARD).push("admin"),
                move || async move { dashboard.admin().await },
            )
            .await
    }

    pub async fn driver_dashboard(&self) -> ApiResult<DriverDashboard> {
        let dashboard = self.api.dashboard.clone();
        self.cache
            .fetch(
                QueryKey::all(resources::DASHBOARD).push("driver"),
                move || async move { dashboard.driver().await },
            )
            .await
    }

    pub async fn parent_dashboard(&self) -> ApiResult<ParentDashboard> {
        let dashboard = self.api.dashboard.clone();
        self.cache
            .fetch(
                QueryKey::all(resources::DASHBOARD).push("parent"),
                move || async move { dashboard.parent().await },
            )
            .await
    }

    pub async fn driver_routes(&self) -> ApiResult<Vec<Route>> {
        let profile = self.api.profile.clone();
        self.cache
            .fetch(
                QueryKey::all(resources::PROFILE).push("routes"),
                move || async move { profile.driver_routes().await },
            )
            .await
    }

    pub async fn parent_students(&self) -> ApiResult<Vec<Student>> {
        let profile = self.api.profile.clone();
        self.cache
            .fetch(
                QueryKey::all(resources::PROFILE).push("students"),
                move || async move { profile.parent_students().await },
            )
            .await
    }

    // mutations

    pub async fn update_user(&self, id: &str, update: &UserUpdate) -> ApiResult<User> {
        let user = self.api.users.update(id, update).await?;
        self.write_detail(resources::USERS, id, &user).await;
        Ok(user)
    }

    pub async fn delete_user(&self, id: &str) -> ApiResult<()> {
        self.api.users.delete(id).await?;
        self.drop_detail(resources::USERS, id).await;
        Ok(())
    }

    pub async fn create_student(&self, student: &NewStudent) -> ApiResult<Student> {
        let created = self.api.students.create(student).await?;
        self.cache
            .invalidate(&QueryKey::all(resources::STUDENTS))
            .await;
        Ok(created)
    }

    pub async fn update_student(&self, id: &str, update: &StudentUpdate) -> ApiResult<Student> {
        let student = self.api.students.update(id, update).await?;
        self.write_detail(resources::STUDENTS, id, &student).await;
        Ok(student)
    }

    pub async fn delete_student(&self, id: &str) -> ApiResult<()> {
        self.api.students.delete(id).await?;
        self.drop_detail(resources::STUDENTS, id).await;
        Ok(())
    }

    pub async fn create_route(&self, route: &NewRoute) -> ApiResult<Route> {
        let created = self.api.routes.create(route).await?;
        self.cache.invalidate(&QueryKey::all(resources::ROUTES)).await;
        Ok(created)
    }

    pub async fn update_route(&self, id: &str, update: &RouteUpdate) -> ApiResult<Route> {
        let route = self.api.routes.update(id, update).await?;
        self.write_detail(resources::ROUTES, id, &route).await;
        Ok(route)
    }

    /// Change a bus's status. The fleet list and the dashboards are refetched on next read.
    pub async fn update_bus_status(&self, id: &str, update: &BusStatusUpdate) -> ApiResult<Bus> {
        let bus = self.api.buses.update_status(id, update).await?;
        self.write_detail(resources::BUSES, id, &bus).await;
        self.cache
            .invalidate(&QueryKey::all(resources::DASHBOARD))
            .await;
        Ok(bus)
    }

    pub async fn record_attendance(&self, entry: &NewAttendance) -> ApiResult<Attendance> {
        let recorded = self.api.attendance.record(entry).await?;
        self.cache
            .invalidate(&QueryKey::all(resources::ATTENDANCE))
            .await;
        Ok(recorded)
    }

    pub async fn update_attendance(
        &self,
        id: &str,
        update: &AttendanceUpdate,
    ) -> ApiResult<Attendance> {
        let updated = self.api.attendance.update(id, update).await?;
        self.write_detail(resources::ATTENDANCE, id, &updated).await;
        Ok(updated)
    }

    pub async fn mark_notification_read(&self, id: &str) -> ApiResult<()> {
        self.api.notifications.mark_read(id).await?;
        self.cache
            .invalidate(&QueryKey::all(resources::NOTIFICATIONS))
            .await;
        Ok(())
    }

    pub async fn mark_all_notifications_read(&self) -> ApiResult<Count> {
        let count = self.api.notifications.mark_all_read().await?;
        self.cache
            .invalidate(&QueryKey::all(resources::NOTIFICATIONS))
            .await;
        Ok(count)
    }

    pub async fn send_notification(
        &self,
        draft: &NotificationDraft,
    ) -> ApiResult<Vec<Notification>> {
        let sent = self.api.notifications.send(draft).await?;
        self.cache
            .invalidate(&QueryKey::all(resources::NOTIFICATIONS))
            .await;
        Ok(sent)
    }

    pub async fn update_profile(&self, update: &UserUpdate) -> ApiResult<User> {
        let user = self.api.profile.update(update).await?;
        if let Err(e) = self.cache.set_query_data(QueryKey::auth_me(), &user).await {
            tracing::warn!("Could not cache updated profile: {}", e);
        }
        self.cache
            .invalidate(&QueryKey::all(resources::PROFILE))
            .await;
        Ok(user)
    }

    /// Exchange credentials for a session and make it current.
    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<LoginResponse> {
        let granted = self.api.auth.login(credentials).await?;
        self.adopt(&granted).await?;
        Ok(granted)
    }

    pub async fn register(&self, data: &RegisterData) -> ApiResult<LoginResponse> {
        let granted = self.api.auth.register(data).await?;
        self.adopt(&granted).await?;
        Ok(granted)
    }

    /// Forget the session and everything cached under it.
    pub async fn logout(&self) -> SessionStoreResult<()> {
        self.cache.clear().await;
        self.session.clear().await
    }

    async fn adopt(&self, granted: &LoginResponse) -> ApiResult<()> {
        self.session
            .establish(granted.session())
            .await
            .map_err(|e| {
                ApiError::new(
                    format!("Failed to persist session: {e}"),
                    500,
                    codes::UNKNOWN_ERROR,
                )
            })?;
        self.cache.invalidate(&QueryKey::all(resources::AUTH)).await;
        Ok(())
    }

    async fn write_detail<T: serde::Serialize>(&self, resource: &str, id: &str, record: &T) {
        // stale-mark first so the freshly written detail entry stays fresh
        self.cache.invalidate(&QueryKey::all(resource)).await;
        if let Err(e) = self
            .cache
            .set_query_data(QueryKey::detail(resource, id), record)
            .await
        {
            tracing::warn!("Could not cache {} {}: {}", resource, id, e);
        }
    }

    async fn drop_detail(&self, resource: &str, id: &str) {
        self.cache.remove(&QueryKey::detail(resource, id)).await;
        self.cache.invalidate(&QueryKey::all(resource)).await;
    }
}
