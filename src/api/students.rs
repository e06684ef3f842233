use std::sync::Arc;

use super::{limit_query, segment};
use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{Attendance, NewStudent, PaginationParams, Student, StudentUpdate},
};

#[derive(Clone)]
pub struct StudentsApi {
    client: Arc<ApiClient>,
}

impl StudentsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &PaginationParams) -> ApiResult<Vec<Student>> {
        self.client.get_with("/students", &params.to_query()).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Student> {
        self.client.get(&format!("/students/{}", segment(id))).await
    }

    pub async fn create(&self, student: &NewStudent) -> ApiResult<Student> {
        self.client.post("/students", student).await
    }

    pub async fn update(&self, id: &str, update: &StudentUpdate) -> ApiResult<Student> {
        self.client
            .put(&format!("/students/{}", segment(id)), update)
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client
            .delete(&format!("/students/{}", segment(id)))
            .await
    }

    pub async fn attendance(&self, id: &str, limit: Option<u32>) -> ApiResult<Vec<Attendance>> {
        self.client
            .get_with(
                &format!("/attendance/student/{}", segment(id)),
                &limit_query(limit),
            )
            .await
    }
}
