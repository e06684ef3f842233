use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use super::{date_query, segment};
use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{NewRoute, PaginationParams, Route, RouteUpdate, Student},
};

#[derive(Clone)]
pub struct RoutesApi {
    client: Arc<ApiClient>,
}

impl RoutesApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &PaginationParams) -> ApiResult<Vec<Route>> {
        self.client.get_with("/routes", &params.to_query()).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Route> {
        self.client.get(&format!("/routes/{}", segment(id))).await
    }

    pub async fn create(&self, route: &NewRoute) -> ApiResult<Route> {
        self.client.post("/routes", route).await
    }

    pub async fn update(&self, id: &str, update: &RouteUpdate) -> ApiResult<Route> {
        self.client
            .put(&format!("/routes/{}", segment(id)), update)
            .await
    }

    pub async fn students(&self, id: &str) -> ApiResult<Vec<Student>> {
        self.client
            .get(&format!("/routes/{}/students", segment(id)))
            .await
    }

    /// Per-route attendance for `date` (today when unset). The shape is backend defined.
    pub async fn attendance(&self, id: &str, date: Option<NaiveDate>) -> ApiResult<Value> {
        self.client
            .get_with(
                &format!("/routes/{}/attendance", segment(id)),
                &date_query(date),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use hyper::Method;

    use super::*;
    use crate::{api::test_support, mocks::MockHttpClient};

    #[tokio::test]
    async fn test_attendance_sends_date() {
        let http = MockHttpClient::new();
        http.respond_json(
            Method::GET,
            "/api/routes/r-1/attendance",
            200,
            serde_json::json!({"data": {"present": 20}}),
        );
        let (client, _, _) = test_support::client(&http, None).await;

        let date = NaiveDate::from_ymd_opt(2024, 9, 2).unwrap();
        let summary = RoutesApi::new(client)
            .attendance("r-1", Some(date))
            .await
            .unwrap();

        assert_eq!(summary["present"], 20);
        assert_eq!(
            http.requests()[0].uri,
            "http://backend.test/api/routes/r-1/attendance?date=2024-09-02"
        );
    }
}
