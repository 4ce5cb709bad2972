use actix_web::{
    http::header::{self, ContentDisposition, DispositionParam, DispositionType},
    web, HttpRequest, HttpResponse, Responder, ResponseError,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    domain::device::is_mobile,
    errors::AppError,
    use_cases::{extractors::AuthClaims, table::FilterUpdate},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteSelectedRequest {
    #[serde(default)]
    pub confirmed: bool,
}

pub(crate) fn client_is_mobile(req: &HttpRequest) -> bool {
    is_mobile(
        req.headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok()),
    )
}

/// Resolves the caller's dashboard or answers with the mount error.
macro_rules! dashboard_or_respond {
    ($state:expr, $claims:expr) => {
        match $state.dashboards.get_or_mount($claims.uid()).await {
            Ok(dashboard) => dashboard,
            Err(e) => return e.error_response(),
        }
    };
}
pub(crate) use dashboard_or_respond;

pub async fn get_dashboard(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    HttpResponse::Ok().json(dashboard.view(client_is_mobile(&req)))
}

pub async fn update_filters(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    body: web::Json<FilterUpdate>,
) -> impl Responder {
    let update = body.into_inner();
    if let Err(e) = update.validate() {
        return AppError::from(e).to_http_response();
    }

    let dashboard = dashboard_or_respond!(state, claims);
    dashboard.update_filters(update);
    HttpResponse::Ok().json(dashboard.view(client_is_mobile(&req)))
}

pub async fn clear_filters(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    dashboard.clear_filters();
    HttpResponse::Ok().json(dashboard.view(client_is_mobile(&req)))
}

pub async fn request_sort(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    key: web::Path<String>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    dashboard.request_sort(&key);
    HttpResponse::Ok().json(dashboard.view(client_is_mobile(&req)))
}

pub async fn toggle_row(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
    plant_id: web::Path<String>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    dashboard.toggle_row(&plant_id);
    HttpResponse::Ok().json(dashboard.view(client_is_mobile(&req)))
}

pub async fn toggle_select_all(
    req: HttpRequest,
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);
    dashboard.toggle_select_all();
    HttpResponse::Ok().json(dashboard.view(client_is_mobile(&req)))
}

pub async fn delete_selected(
    claims: AuthClaims,
    state: web::Data<AppState>,
    body: Option<web::Json<DeleteSelectedRequest>>,
) -> impl Responder {
    let confirmed = body.map(|b| b.confirmed).unwrap_or(false);
    let dashboard = dashboard_or_respond!(state, claims);

    match dashboard.delete_selected(confirmed).await {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => e.error_response(),
    }
}

pub async fn export(
    claims: AuthClaims,
    state: web::Data<AppState>,
) -> impl Responder {
    let dashboard = dashboard_or_respond!(state, claims);

    match dashboard.export() {
        Ok(file) => HttpResponse::Ok()
            .content_type(file.content_type)
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(file.filename.to_string())],
            })
            .body(file.bytes),
        Err(e) => e.error_response(),
    }
}
