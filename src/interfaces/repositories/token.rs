use jsonwebtoken::TokenData;
use crate::{entities::{token::Claims, user::Session}, errors::AuthError};

pub trait TokenServiceRepository: Send + Sync {
    /// Creates a bearer token for a signed-in session
    fn create_jwt(&self, session: &Session, role: &str) -> Result<String, AuthError>;

    /// Decodes a bearer token and returns the claims
    fn decode_jwt(&self, token: &str) -> Result<TokenData<Claims>, AuthError>;
}
