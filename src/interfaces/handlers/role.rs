use actix_web::{http::StatusCode, web, HttpResponse, Responder};

use crate::entities::user::{RoleRequest, RoleResponse};
use crate::AppState;

fn message(status: StatusCode, text: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "message": text }))
}

/// `POST /api/get-user-role`. Any body that does not carry a non-empty
/// `uid` counts as a missing id.
pub async fn get_user_role(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> impl Responder {
    let uid = serde_json::from_slice::<RoleRequest>(&body)
        .ok()
        .and_then(|request| request.uid)
        .filter(|uid| !uid.trim().is_empty());

    let Some(uid) = uid else {
        return message(StatusCode::BAD_REQUEST, "Missing user ID");
    };

    match state.auth_handler.user_role(&uid).await {
        Ok(role) => HttpResponse::Ok().json(RoleResponse { role }),
        Err(e) => {
            tracing::error!(uid = %uid, "Error fetching user role: {}", e);
            message(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

pub async fn method_not_allowed() -> impl Responder {
    message(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}
