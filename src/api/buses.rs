use std::sync::Arc;

use super::segment;
use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{Attendance, Bus, BusStatusUpdate, NewBus, PaginationParams, Student},
};

#[derive(Clone)]
pub struct BusesApi {
    client: Arc<ApiClient>,
}

impl BusesApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `status` narrows the fleet to buses in that state.
    pub async fn list(&self, params: &PaginationParams) -> ApiResult<Vec<Bus>> {
        self.client.get_with("/buses", &params.to_query()).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Bus> {
        self.client.get(&format!("/buses/{}", segment(id))).await
    }

    pub async fn create(&self, bus: &NewBus) -> ApiResult<Bus> {
        self.client.post("/buses", bus).await
    }

    pub async fn update_status(&self, id: &str, update: &BusStatusUpdate) -> ApiResult<Bus> {
        self.client
            .patch(&format!("/buses/{}/status", segment(id)), update)
            .await
    }

    pub async fn students(&self, id: &str) -> ApiResult<Vec<Student>> {
        self.client
            .get(&format!("/buses/{}/students", segment(id)))
            .await
    }

    pub async fn attendance(&self, id: &str) -> ApiResult<Vec<Attendance>> {
        self.client
            .get(&format!("/buses/{}/attendance", segment(id)))
            .await
    }
}
