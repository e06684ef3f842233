use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::session::{Role, Session};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial user update; only the set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl LoginResponse {
    /// The session this response grants.
    pub fn session(&self) -> Session {
        Session {
            token: self.token.clone(),
            role: self.user.role,
            user_id: self.user.id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_response_grants_session() {
        let response: LoginResponse = serde_json::from_value(serde_json::json!({
            "user": {
                "id": "d-3",
                "email": "dee@school.test",
                "name": "Dee",
                "role": "driver",
                "createdAt": "2024-01-01T08:00:00Z",
                "updatedAt": "2024-01-02T08:00:00Z"
            },
            "token": "jwt-xyz"
        }))
        .unwrap();

        let session = response.session();
        assert_eq!(session.token, "jwt-xyz");
        assert_eq!(session.role, Role::Driver);
        assert_eq!(session.user_id, "d-3");
    }

    #[test]
    fn test_update_sends_only_set_fields() {
        let update = UserUpdate {
            phone: Some("555-0100".into()),
            ..UserUpdate::default()
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({"phone": "555-0100"})
        );
    }
}
