use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use jsonwebtoken::errors::{ErrorKind, Error as JwtError};
use derive_more::Display;
use serde::Serialize;
use validator::ValidationErrors;

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    Auth(AuthError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::Auth(err) => write!(f, "{}", err),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Auth(err) => return err.error_response(),
            AppError::ValidationError(errors) => {
                serde_json::json!({
                    "error": "Validation failed",
                    "details": errors
                })
            }
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(err) => err.status_code(),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(|e| FieldError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();

        AppError::ValidationError(field_errors)
    }
}

impl AppError {
    pub fn to_http_response(&self) -> HttpResponse {
        self.error_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

/// Login, reset and token failures. The login/reset variants carry the exact
/// text shown to the person at the keyboard.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum AuthError {
    #[display("User not found. Please register or check the email address.")]
    UserNotFound,

    #[display("Invalid password. Try resetting your password.")]
    WrongPassword,

    #[display("Invalid login credentials. Please check your email and password.")]
    WrongCredentials,

    #[display("No account found with that email.")]
    ResetUserNotFound,

    #[display("Error sending reset link. Please ensure the email is valid and registered.")]
    ResetFailed,

    #[display("Please enter your email address for the reset link.")]
    MissingResetEmail,

    #[display("Invalid token")]
    InvalidToken,

    #[display("Token creation error")]
    TokenCreation,

    #[display("Token expired")]
    TokenExpired,

    #[display("Session has ended")]
    SessionEnded,

    #[display("Missing credentials")]
    MissingCredentials,

    #[display("Missing JWT service")]
    MissingJwtService,

    #[display("Password error: {_0}")]
    PasswordError(String),

    #[display("Forbidden: {_0}")]
    Forbidden(String),

    #[display("Auth provider error: {_0}")]
    Provider(String),
}

impl ResponseError for AuthError {
    fn error_response(&self) -> HttpResponse {
        let error_message = match self {
            AuthError::TokenExpired => "Token has expired".to_string(),
            _ => self.to_string(),
        };
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"error": error_message}))
    }
    fn status_code(&self) -> StatusCode {
        match *self {
            AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthError::WrongPassword => StatusCode::UNAUTHORIZED,
            AuthError::WrongCredentials => StatusCode::UNAUTHORIZED,
            AuthError::ResetUserNotFound => StatusCode::NOT_FOUND,
            AuthError::ResetFailed => StatusCode::BAD_REQUEST,
            AuthError::MissingResetEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::TokenCreation => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
            AuthError::SessionEnded => StatusCode::UNAUTHORIZED,
            AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::MissingJwtService => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::PasswordError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Forbidden(_) => StatusCode::FORBIDDEN,
            AuthError::Provider(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::PasswordError(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum PasswordError {
    #[display("Invalid password parameters: {_0}")]
    InvalidParameters(String),

    #[display("Password hashing failed: {_0}")]
    HashingError(String),

    #[display("Invalid password hash format: {_0}")]
    InvalidHashFormat(String),

    #[display("Password verification failed: {_0}")]
    VerificationError(String),
}

/// Write, delete and subscription failures against the document store.
/// Reported once to the caller; nothing retries them.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum PersistenceError {
    #[display("Failed to save plant {id}: {reason}")]
    Write { id: String, reason: String },

    #[display("Failed to delete plant {id}: {reason}")]
    Delete { id: String, reason: String },

    #[display("Failed to subscribe to {path}: {reason}")]
    Subscribe { path: String, reason: String },

    #[display("Stored document {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },

    #[display("Document store unavailable: {_0}")]
    Unavailable(String),
}

impl ResponseError for PersistenceError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"error": self.to_string()}))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PersistenceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        PersistenceError::Unavailable(err.to_string())
    }
}

/// Step gates and rejected wizard transitions.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum WizardError {
    #[display("The Plant ID must be scanned or manually entered to proceed.")]
    MissingPlantId,

    #[display("A plant image is required to proceed.")]
    MissingImage,

    #[display("Location must be detected (Lat/Long) or manually entered (Address) to proceed.")]
    MissingLocation,

    #[display("Please ensure Plant ID and Plant Image are provided.")]
    IncompleteRecord,

    #[display("Image file is too large (max {}MB).", _0 / (1024 * 1024))]
    ImageTooLarge(usize),

    #[display("Failed to read image file.")]
    UnreadableImage,

    #[display("Already on the first step.")]
    NoPreviousStep,

    #[display("Use submit to finish from the review step.")]
    NoNextStep,

    #[display("Submit is only available from the review step.")]
    NotAtReview,

    #[display("A submission is already in progress.")]
    SubmitInFlight,

    #[display("The plant form is not open.")]
    NotOpen,

    #[display("The plant form is already open.")]
    AlreadyOpen,

    #[display("Plant {_0} was not found.")]
    UnknownPlant(String),
}

impl ResponseError for WizardError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"error": self.to_string()}))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            WizardError::SubmitInFlight
            | WizardError::NotOpen
            | WizardError::AlreadyOpen
            | WizardError::NotAtReview
            | WizardError::NoNextStep
            | WizardError::NoPreviousStep => StatusCode::CONFLICT,
            WizardError::ImageTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            WizardError::UnknownPlant(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Camera and QR scanner failures, shown inline next to the preview.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum CaptureError {
    #[display("Scanner mount point is not ready")]
    NotMounted,

    #[display("Failed to start camera: {_0}")]
    CameraStart(String),

    #[display("Scanner error: {_0}")]
    Scanner(String),

    #[display("Failed to stop camera: {_0}")]
    Stop(String),
}

impl CaptureError {
    /// Stop calls racing an already-removed element report "not found";
    /// those carry no information.
    pub fn is_not_found(&self) -> bool {
        match self {
            CaptureError::Stop(msg) => msg.contains("Not Found") || msg.contains("NotFoundError"),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ExportError {
    #[display("No data to export.")]
    Empty,

    #[display("Failed to write export: {_0}")]
    Csv(String),
}

impl ResponseError for ExportError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({"error": self.to_string()}))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ExportError::Empty => StatusCode::UNPROCESSABLE_ENTITY,
            ExportError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Everything a dashboard operation can report back to the page.
#[derive(Debug, Display, Clone, PartialEq)]
pub enum DashboardError {
    #[display("{_0}")]
    Wizard(WizardError),

    #[display("{_0}")]
    Persistence(PersistenceError),

    #[display("{_0}")]
    Auth(AuthError),

    #[display("{_0}")]
    Export(ExportError),

    #[display("Select at least one plant to delete.")]
    NothingSelected,
}

impl ResponseError for DashboardError {
    fn error_response(&self) -> HttpResponse {
        match self {
            DashboardError::Wizard(e) => e.error_response(),
            DashboardError::Persistence(e) => e.error_response(),
            DashboardError::Auth(e) => e.error_response(),
            DashboardError::Export(e) => e.error_response(),
            DashboardError::NothingSelected => HttpResponse::build(self.status_code())
                .json(serde_json::json!({"error": self.to_string()})),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            DashboardError::Wizard(e) => e.status_code(),
            DashboardError::Persistence(e) => e.status_code(),
            DashboardError::Auth(e) => e.status_code(),
            DashboardError::Export(e) => e.status_code(),
            DashboardError::NothingSelected => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<WizardError> for DashboardError {
    fn from(err: WizardError) -> Self {
        DashboardError::Wizard(err)
    }
}

impl From<PersistenceError> for DashboardError {
    fn from(err: PersistenceError) -> Self {
        DashboardError::Persistence(err)
    }
}

impl From<AuthError> for DashboardError {
    fn from(err: AuthError) -> Self {
        DashboardError::Auth(err)
    }
}

impl From<ExportError> for DashboardError {
    fn from(err: ExportError) -> Self {
        DashboardError::Export(err)
    }
}
