use actix_web::{
    error::JsonPayloadError,
    http::StatusCode,
    web, HttpResponse, ResponseError,
};
use derive_more::Display;

/// Malformed or oversized JSON bodies answer with the service's JSON error
/// envelope instead of actix's plain-text default.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        JsonBodyError::from(err).into()
    }));
}

#[derive(Debug, Display)]
#[display("{message}")]
pub struct JsonBodyError {
    message: String,
    status: StatusCode,
}

impl ResponseError for JsonBodyError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(serde_json::json!({ "error": self.message }))
    }
}

impl From<JsonPayloadError> for JsonBodyError {
    fn from(err: JsonPayloadError) -> Self {
        let status = match &err {
            JsonPayloadError::OverflowKnownLength { .. } | JsonPayloadError::Overflow { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            JsonPayloadError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };

        JsonBodyError {
            message: format!("JSON payload error: {}", err),
            status,
        }
    }
}
