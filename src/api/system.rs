use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{api_client::ApiClient, error::ApiResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHealth {
    pub status: String,
}

/// Endpoints served at the backend origin rather than under the API prefix.
#[derive(Clone)]
pub struct SystemApi {
    client: Arc<ApiClient>,
}

impl SystemApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn health(&self) -> ApiResult<BackendHealth> {
        self.client.get_from_origin("/health").await
    }
}
