use std::sync::Arc;

use super::segment;
use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{PaginationParams, User, UserUpdate},
};

/// Account administration, admin only on the backend.
#[derive(Clone)]
pub struct UsersApi {
    client: Arc<ApiClient>,
}

impl UsersApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// `page`, `limit`, `search` and `role` are honored.
    pub async fn list(&self, params: &PaginationParams) -> ApiResult<Vec<User>> {
        self.client.get_with("/users", &params.to_query()).await
    }

    pub async fn get(&self, id: &str) -> ApiResult<User> {
        self.client.get(&format!("/users/{}", segment(id))).await
    }

    pub async fn update(&self, id: &str, update: &UserUpdate) -> ApiResult<User> {
        self.client
            .put(&format!("/users/{}", segment(id)), update)
            .await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client.delete(&format!("/users/{}", segment(id))).await
    }
}

#[cfg(test)]
mod tests {
    use hyper::Method;

    use super::*;
    use crate::{
        api::{fixtures, test_support},
        core::session::Role,
        mocks::MockHttpClient,
    };

    #[tokio::test]
    async fn test_list_filters_by_role() {
        let http = MockHttpClient::new();
        http.respond_json(
            Method::GET,
            "/api/users",
            200,
            fixtures::data(serde_json::json!([fixtures::user("d-1", "driver")])),
        );
        let (client, _, _) = test_support::client(&http, Some(test_support::admin_session())).await;

        let params = PaginationParams {
            role: Some(Role::Driver),
            ..PaginationParams::default()
        };
        let users = UsersApi::new(client).list(&params).await.unwrap();

        assert_eq!(users[0].role, Role::Driver);
        assert_eq!(http.requests()[0].uri, "http://backend.test/api/users?role=driver");
    }

    #[tokio::test]
    async fn test_ids_are_escaped() {
        let http = MockHttpClient::new();
        http.respond_raw(Method::DELETE, "/api/users/a%2Fb", 200, r#"{"data":null}"#);
        let (client, _, _) = test_support::client(&http, Some(test_support::admin_session())).await;

        UsersApi::new(client).delete("a/b").await.unwrap();
        assert_eq!(http.request_count(Method::DELETE, "/api/users/a%2Fb"), 1);
    }
}
