use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use super::{date_query, limit_query, segment};
use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{Attendance, AttendanceUpdate, NewAttendance},
};

#[derive(Clone)]
pub struct AttendanceApi {
    client: Arc<ApiClient>,
}

impl AttendanceApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn record(&self, entry: &NewAttendance) -> ApiResult<Attendance> {
        self.client.post("/attendance", entry).await
    }

    pub async fn student_history(
        &self,
        student_id: &str,
        limit: Option<u32>,
    ) -> ApiResult<Vec<Attendance>> {
        self.client
            .get_with(
                &format!("/attendance/student/{}", segment(student_id)),
                &limit_query(limit),
            )
            .await
    }

    pub async fn route_summary(&self, route_id: &str, date: Option<NaiveDate>) -> ApiResult<Value> {
        self.client
            .get_with(
                &format!("/attendance/route/{}", segment(route_id)),
                &date_query(date),
            )
            .await
    }

    pub async fn today(&self) -> ApiResult<Vec<Attendance>> {
        self.client.get("/attendance/today").await
    }

    pub async fn summary(&self, date: Option<NaiveDate>) -> ApiResult<Value> {
        self.client
            .get_with("/attendance/summary", &date_query(date))
            .await
    }

    pub async fn update(&self, id: &str, update: &AttendanceUpdate) -> ApiResult<Attendance> {
        self.client
            .put(&format!("/attendance/{}", segment(id)), update)
            .await
    }
}

#[cfg(test)]
mod tests {
    use hyper::Method;

    use super::*;
    use crate::{
        api::{fixtures, test_support},
        mocks::MockHttpClient,
    };

    #[tokio::test]
    async fn test_student_history_passes_limit() {
        let http = MockHttpClient::new();
        http.respond_json(
            Method::GET,
            "/api/attendance/student/s-1",
            200,
            fixtures::data(serde_json::json!([fixtures::attendance("a-1", "s-1")])),
        );
        let (client, _, _) = test_support::client(&http, None).await;

        let history = AttendanceApi::new(client)
            .student_history("s-1", Some(5))
            .await
            .unwrap();

        assert_eq!(history[0].student_id, "s-1");
        assert_eq!(
            http.requests()[0].uri,
            "http://backend.test/api/attendance/student/s-1?limit=5"
        );
    }
}
