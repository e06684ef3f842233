use std::sync::Arc;

use serde_json::Value;

use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{AdminDashboard, DriverDashboard, ParentDashboard},
};

/// Pre-aggregated dashboard summaries.
#[derive(Clone)]
pub struct DashboardApi {
    client: Arc<ApiClient>,
}

impl DashboardApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn admin(&self) -> ApiResult<AdminDashboard> {
        self.client.get("/dashboard/admin").await
    }

    pub async fn driver(&self) -> ApiResult<DriverDashboard> {
        self.client.get("/dashboard/driver").await
    }

    pub async fn parent(&self) -> ApiResult<ParentDashboard> {
        self.client.get("/dashboard/parent").await
    }

    pub async fn stats(&self) -> ApiResult<Value> {
        self.client.get("/dashboard/stats").await
    }
}
