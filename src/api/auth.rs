use std::sync::Arc;

use crate::{
    core::{api_client::ApiClient, error::ApiResult},
    models::{LoginCredentials, LoginResponse, RegisterData, User, UserUpdate},
};

/// Credential exchange and the signed-in user's own record.
///
/// Login and register only return the grant; storing it is up to the caller
/// (see [`crate::core::queries::Queries::login`]).
#[derive(Clone)]
pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> ApiResult<LoginResponse> {
        self.client.post("/users/login", credentials).await
    }

    pub async fn register(&self, data: &RegisterData) -> ApiResult<LoginResponse> {
        self.client.post("/users/register", data).await
    }

    /// The user behind the current token.
    pub async fn profile(&self) -> ApiResult<User> {
        self.client.get("/profile").await
    }

    pub async fn update_profile(&self, update: &UserUpdate) -> ApiResult<User> {
        self.client.put("/profile", update).await
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
    async fn test_login_posts_credentials() {
        let http = MockHttpClient::new();
        http.respond_json(
            Method::POST,
            "/api/users/login",
            200,
            fixtures::data(serde_json::json!({
                "user": fixtures::user("p-1", "parent"),
                "token": "jwt-1"
            })),
        );
        let (client, _, _) = test_support::client(&http, None).await;

        let granted = AuthApi::new(client)
            .login(&LoginCredentials {
                email: "p@school.test".into(),
                password: "hunter2".into(),
            })
            .await
            .unwrap();

        assert_eq!(granted.token, "jwt-1");
        assert_eq!(granted.user.role, Role::Parent);
        assert_eq!(http.requests()[0].body_json()["email"], "p@school.test");
    }
}
