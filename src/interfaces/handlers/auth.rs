use actix_web::{post, web, HttpResponse, Responder, ResponseError};

use crate::entities::user::{LoginUser, PasswordResetRequest};
use crate::use_cases::extractors::AuthClaims;
use crate::AppState;

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    user: web::Json<LoginUser>
) -> impl Responder {
    match state.auth_handler.login(user.into_inner()).await {
        Ok(auth_response) => HttpResponse::Ok().json(auth_response),
        Err(e) => e.to_http_response(),
    }
}

#[post("/password-reset")]
pub async fn password_reset(
    state: web::Data<AppState>,
    request: web::Json<PasswordResetRequest>,
) -> impl Responder {
    match state.auth_handler.password_reset(&request.email).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "message": "Password reset link sent! Check your email inbox."
        })),
        Err(e) => e.error_response(),
    }
}

/// Ends the provider session. The auth-state subscription then unmounts
/// the caller's dashboard.
#[post("/logout")]
pub async fn logout(
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    match state.auth_handler.logout(claims.uid()).await {
        Ok(()) => {
            state.dashboards.unmount(claims.uid());
            HttpResponse::Ok().json(serde_json::json!({"message": "Logged out successfully"}))
        }
        Err(e) => e.error_response(),
    }
}
