use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<String>,
    },

    #[error("Duplicate entry detected")]
    DuplicateKey,

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Body(#[from] JsonRejection),
}

impl AppError {
    /// Validation failure carrying one message per offending field.
    pub fn validation(errors: Vec<String>) -> Self {
        AppError::Validation {
            message: "Validation Error".to_string(),
            errors,
        }
    }

    /// Validation failure with a single top-level message.
    pub fn invalid(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

/// Failure side of the response envelope.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

impl ErrorBody {
    fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: None,
            errors: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody::new(message)),
            AppError::Validation { message, errors } => {
                let mut body = ErrorBody::new(message);
                if !errors.is_empty() {
                    body.errors = Some(errors);
                }
                (StatusCode::BAD_REQUEST, body)
            }
            AppError::DuplicateKey => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("Duplicate entry detected"),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {}", e);
                let mut body = ErrorBody::new(e.to_string());
                body.error = Some(e.to_string());
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            AppError::Body(rejection) => {
                tracing::warn!("Rejected request body: {}", rejection.body_text());
                (rejection.status(), ErrorBody::new(rejection.body_text()))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        if err.is_duplicate_key() {
            AppError::DuplicateKey
        } else {
            AppError::Store(err)
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
