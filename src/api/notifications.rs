use std::sync::Arc;

use serde_json::Value;

use super::{limit_query, segment};
use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{Count, Notification, NotificationDraft, PaginationParams},
};

#[derive(Clone)]
pub struct NotificationsApi {
    client: Arc<ApiClient>,
}

impl NotificationsApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `page`, `limit` and `unread_only` are honored.
    pub async fn list(&self, params: &PaginationParams) -> ApiResult<Vec<Notification>> {
        self.client
            .get_with("/notifications", &params.to_query())
            .await
    }

    pub async fn get(&self, id: &str) -> ApiResult<Notification> {
        self.client
            .get(&format!("/notifications/{}", segment(id)))
            .await
    }

    /// Returns one notification per recipient.
    pub async fn send(&self, draft: &NotificationDraft) -> ApiResult<Vec<Notification>> {
        self.client.post("/notifications", draft).await
    }

    pub async fn mark_read(&self, id: &str) -> ApiResult<()> {
        let _: Value = self
            .client
            .patch_empty(&format!("/notifications/{}/read", segment(id)))
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self) -> ApiResult<Count> {
        self.client.patch_empty("/notifications/read-all").await
    }

    pub async fn unread_count(&self) -> ApiResult<Count> {
        self.client.get("/notifications/unread/count").await
    }

    pub async fn recent(&self, limit: Option<u32>) -> ApiResult<Vec<Notification>> {
        self.client
            .get_with("/notifications/recent", &limit_query(limit))
            .await
    }
}
