use std::sync::Arc;

use serde_json::Value;

use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{Notification, PaginationParams, PasswordChange, Route, Student, User, UserUpdate},
};

/// Everything scoped to the signed-in user.
#[derive(Clone)]
pub struct ProfileApi {
    client: Arc<ApiClient>,
}

impl ProfileApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> ApiResult<User> {
        self.client.get("/profile").await
    }

    pub async fn update(&self, update: &UserUpdate) -> ApiResult<User> {
        self.client.put("/profile", update).await
    }

    pub async fn update_password(&self, change: &PasswordChange) -> ApiResult<()> {
        let _: Value = self.client.put("/profile/password", change).await?;
        Ok(())
    }

    /// Routes assigned to the signed-in driver.
    pub async fn driver_routes(&self) -> ApiResult<Vec<Route>> {
        self.client.get("/profile/routes").await
    }

    /// Children of the signed-in parent.
    pub async fn parent_students(&self) -> ApiResult<Vec<Student>> {
        self.client.get("/profile/students").await
    }

    pub async fn notifications(&self, params: &PaginationParams) -> ApiResult<Vec<Notification>> {
        self.client
            .get_with("/profile/notifications", &params.to_query())
            .await
    }
}
