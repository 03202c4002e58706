use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;
use validator::ValidationErrors;

use crate::models::db_operations::DbError;

/// Whether 500 responses carry the underlying cause. Set once at startup.
static EXPOSE_DETAILS: OnceLock<bool> = OnceLock::new();

pub fn set_expose_details(expose: bool) {
    let _ = EXPOSE_DETAILS.set(expose);
}

fn expose_details() -> bool {
    *EXPOSE_DETAILS.get().unwrap_or(&false)
}

/// Field name -> list of messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Error type returned by every HTTP handler.
///
/// Each variant maps to one status code and always renders as
/// `{"error": "..."}`; validation failures add a `details` object.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Validation error: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Internal { message: String, cause: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn internal(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        ApiError::Internal {
            message: message.into(),
            cause: cause.to_string(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        ApiError::Validation(errors)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(details) => json!({
                "error": self.to_string(),
                "details": details,
            }),
            ApiError::Internal { message, cause } => {
                log::error!("{}: {}", message, cause);
                if expose_details() {
                    json!({ "error": message, "details": cause })
                } else {
                    json!({ "error": message })
                }
            }
            other => json!({ "error": other.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("invalid {}", field))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        ApiError::Validation(details)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(entity) => ApiError::NotFound(format!("{} not found", entity)),
            other => ApiError::internal("Internal server error", other),
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> Self {
        ApiError::internal("Database unavailable", err)
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        ApiError::internal("Internal server error", err)
    }
}
