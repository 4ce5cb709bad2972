use actix_multipart::form::MultipartForm;
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Responder, ResponseError};
use serde::Deserialize;
use validator::Validate;

use crate::{
    entities::{
        image::PhotoForm,
        location::LocationRequest,
        plant::{DraftPatch, ScanRequest},
    },
    errors::{AppError, WizardError},
    handlers::{
        dashboard::{client_is_mobile, dashboard_or_respond},
        json_error::json_error,
    },
    use_cases::{extractors::AuthClaims, wizard::WizardState},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ExitRequest {
    #[serde(default)]
    pub confirmed: bool,
}

const EXIT_PROMPT: &str = "Are you sure you want to leave? Your progress in the form will be lost and the plant will not be submitted.";

fn wizard_response(req: &HttpRequest, result: Result<WizardState, WizardError>) -> HttpResponse {
    match result {
        Ok(state) => HttpResponse::Ok().json(state.view(client_is_mobile(req))),
        Err(e) => {
            tracing::debug!("Wizard action rejected: {}", e);
            e.error_response()
        }
    }
}

pub async fn get_wizard(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, Ok(dashboard.wizard_state()))
}

pub async fn open_new(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, dashboard.open_new())
}

pub async fn open_edit(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    plant_id: web::Path<String>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, dashboard.open_edit(&plant_id))
}

pub async fn update_draft(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    body: web::Json<DraftPatch>,
) -> impl Responder {
    let patch = body.into_inner();
    if let Err(e) = patch.validate() {
        return AppError::from(e).to_http_response();
    }

    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, dashboard.update_draft(patch))
}

pub async fn upload_photo(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    form: Result<MultipartForm<PhotoForm>, actix_web::Error>,
) -> impl Responder {
    let form = match form {
        Ok(form) => form.into_inner(),
        Err(e) => {
            return json_error(
                StatusCode::BAD_REQUEST,
                "Photo upload error",
                &e.to_string(),
            );
        }
    };

    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, dashboard.attach_photo(form.into()))
}

pub async fn scan(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    body: web::Json<ScanRequest>,
) -> impl Responder {
    let request = body.into_inner();
    if let Err(e) = request.validate() {
        return AppError::from(e).to_http_response();
    }

    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, dashboard.scan(request.code))
}

pub async fn capture_location(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    body: web::Json<LocationRequest>,
) -> impl Responder {
    let location = body.into_inner();
    if let Err(e) = location.validate() {
        return AppError::from(e).to_http_response();
    }

    let dashboard = dashboard_or_respond!(state, claims);
    let result = dashboard.capture_location(location.latitude, location.longitude).await;
    wizard_response(&req, result)
}

pub async fn next_step(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, dashboard.next_step())
}

pub async fn previous_step(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    wizard_response(&req, dashboard.previous_step())
}

pub async fn submit(
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);

    match dashboard.submit().await {
        Ok(receipt) => HttpResponse::Ok().json(receipt),
        Err(e) => e.error_response(),
    }
}

/// Without `confirmed` the form stays open and the discard warning is
/// returned for the page to show.
pub async fn exit(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    body: Option<web::Json<ExitRequest>>,
) -> impl Responder {
    let confirmed = body.map(|b| b.confirmed).unwrap_or(false);
    let dashboard = dashboard_or_respond!(state, claims);

    match dashboard.exit(confirmed) {
        Ok(wizard) if !confirmed => HttpResponse::Ok().json(serde_json::json!({
            "confirmation_required": true,
            "prompt": EXIT_PROMPT,
            "wizard": wizard.view(client_is_mobile(&req)),
        })),
        result => wizard_response(&req, result),
    }
}
