use jsonwebtoken::{encode, Header, decode, Validation, TokenData, Algorithm};
use chrono::{Utc, Duration};
use crate::entities::token::Claims;
use crate::entities::user::Session;
use crate::repositories::token::TokenServiceRepository;
use crate::settings::{AppConfig, JwtKeys};
use crate::errors::AuthError;

const JWT_ALGORITHM: Algorithm = Algorithm::HS512;

/// Signs the bearer tokens handed out after a successful sign-in.
#[derive(Clone)]
pub struct JwtService {
    keys: JwtKeys,
    access_expiration: Duration,
}

impl JwtService {
    pub fn new(config: &AppConfig) -> Self {
        JwtService {
            keys: JwtKeys::from(config),
            access_expiration: Duration::minutes(config.jwt_expiration_minutes),
        }
    }

    pub fn create_jwt(&self, session: &Session, role: &str) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = (now + self.access_expiration).timestamp() as usize;

        let claims = Claims {
            sub: session.uid.clone(),
            email: session.email.clone(),
            role: role.to_string(),
            sid: session.session_id.clone(),
            exp,
            iat: now.timestamp() as usize,
        };

        encode(&Header::new(JWT_ALGORITHM), &claims, &self.keys.encoding).map_err(|e| {
            tracing::warn!("Failed to create JWT: {}", e);
            AuthError::TokenCreation
        })
    }

    pub fn decode_jwt(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<Claims>(token, &self.keys.decoding, &validation).map_err(AuthError::from)
    }
}

impl TokenServiceRepository for JwtService {
    fn create_jwt(&self, session: &Session, role: &str) -> Result<String, AuthError> {
        JwtService::create_jwt(self, session, role)
    }

    fn decode_jwt(&self, token: &str) -> Result<TokenData<Claims>, AuthError> {
        JwtService::decode_jwt(self, token)
    }
}
