use std::sync::Arc;

use validator::Validate;

use crate::entities::token::AuthResponse;
use crate::entities::user::{role_from_claims, LoginUser};
use crate::errors::{AppError, AuthError};
use crate::repositories::auth_provider::AuthProvider;
use crate::repositories::token::TokenServiceRepository;

pub struct AuthHandler<T>
where
    T: TokenServiceRepository,
{
    pub provider: Arc<dyn AuthProvider>,
    pub token_service: T,
}

impl<T> AuthHandler<T>
where
    T: TokenServiceRepository,
{
    pub fn new(provider: Arc<dyn AuthProvider>, token_service: T) -> Self {
        AuthHandler {
            provider,
            token_service,
        }
    }

    /// Signs the user in with the provider and issues a bearer token
    /// carrying their role.
    pub async fn login(&self, request: LoginUser) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let session = self
            .provider
            .sign_in(&request.email, &request.password)
            .await
            .map_err(|e| {
                tracing::warn!("Login failed: {}", e);
                login_error(e)
            })?;

        let role = self.user_role(&session.uid).await?;
        let access_token = self.token_service.create_jwt(&session, &role)?;

        tracing::info!(uid = %session.uid, "User logged in successfully");
        Ok(AuthResponse::new(access_token, session.uid, session.email))
    }

    pub async fn logout(&self, uid: &str) -> Result<(), AuthError> {
        self.provider.sign_out(uid).await?;
        tracing::info!(uid = %uid, "User logged out");
        Ok(())
    }

    pub async fn password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(AuthError::MissingResetEmail);
        }

        self.provider.send_password_reset(email).await.map_err(|e| match e {
            AuthError::ResetUserNotFound => e,
            other => {
                tracing::error!("Password reset failed: {}", other);
                AuthError::ResetFailed
            }
        })
    }

    /// `role` custom claim of the account, `"user"` when it has none.
    pub async fn user_role(&self, uid: &str) -> Result<String, AuthError> {
        let claims = self.provider.custom_claims(uid).await?;
        Ok(role_from_claims(claims.as_ref()))
    }

    /// Whether `session_id` is still the live sign-in of `uid`. Tokens from
    /// an earlier sign-in stay dead after the account signs in again.
    pub fn is_session_active(&self, uid: &str, session_id: &str) -> bool {
        self.provider
            .current_session(uid)
            .is_some_and(|session| session.session_id == session_id)
    }
}

/// Provider faults surface as the generic credentials message.
fn login_error(err: AuthError) -> AppError {
    match err {
        AuthError::PasswordError(_) | AuthError::Provider(_) => AuthError::WrongCredentials.into(),
        other => other.into(),
    }
}
