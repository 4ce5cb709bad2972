use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_ROLE: &str = "user";

/// An authenticated identity as the auth provider reports it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
    /// Distinguishes one sign-in from the next of the same account.
    #[serde(skip)]
    pub session_id: String,
}

/// Account held by the in-process auth provider.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub password_hash: String,
    pub custom_claims: Map<String, Value>,
}

impl AuthUser {
    pub fn start_session(&self) -> Session {
        Session {
            uid: self.uid.clone(),
            email: self.email.clone(),
            session_id: Uuid::new_v4().simple().to_string(),
        }
    }
}

/// `role` custom claim, or `"user"` when it is absent or not a string.
pub fn role_from_claims(claims: Option<&Map<String, Value>>) -> String {
    claims
        .and_then(|c| c.get("role"))
        .and_then(Value::as_str)
        .filter(|role| !role.is_empty())
        .unwrap_or(DEFAULT_ROLE)
        .to_string()
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginUser {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleRequest {
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: String,
}
