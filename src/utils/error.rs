use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::utils::response::error as error_response;
use crate::utils::validation::FieldErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error")]
    ValidationError(FieldErrors),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    /// Wraps a storage failure with the message shown to the caller.
    pub fn database(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseError {
            message: message.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn log(&self) {
        match self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) | AppError::Conflict(msg) => {
                debug!(message = %msg, "Request rejected");
            }
            AppError::ValidationError(fields) => {
                debug!(?fields, "Request validation failed");
            }
            AppError::AuthError(msg) | AppError::Forbidden(msg) => {
                warn!(message = %msg, "Authentication rejected");
            }
            AppError::DatabaseError { message, source } => {
                error!(error = ?source, message = %message, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(message = %msg, "Internal server error");
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(source: sqlx::Error) -> Self {
        AppError::database("A database error occurred", source)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        self.log();

        match self {
            AppError::ValidationError(fields) => {
                let errors = serde_json::to_value(fields).ok();
                error_response("Validation Failed", errors, status)
            }
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InternalServerError(msg) => error_response(msg, None, status),
            // The storage error stays in the log
            AppError::DatabaseError { message, .. } => error_response(message, None, status),
        }
    }
}
