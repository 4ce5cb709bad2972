use serde::{ Serialize, Deserialize };

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub uid: String,
    pub email: String,
}

impl AuthResponse {
    pub fn new(access_token: String, uid: String, email: String) -> Self {
        AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            uid,
            email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    /// Sign-in the token was issued for.
    pub sid: String,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
