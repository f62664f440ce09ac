//! Global application error types and handlers.
//!
//! This module defines the error type used across the entire backend
//! application and the mapping from each error category to an HTTP status
//! and a consistent JSON body:
//!
//! ```json
//! { "error": { "category": "validation", "message": "..." } }
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use salon_adapters::AdapterError;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::config::ConfigError;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    /// Input failed a business rule; the message is shown to the user.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("mail error: {0}")]
    Mail(#[from] AdapterError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Auth(err) => err.status(),
            AppError::Database(rusqlite::Error::QueryReturnedNoRows) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Mail(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Forbidden(_) => "permission",
            AppError::Auth(_) => "authentication",
            AppError::Database(rusqlite::Error::QueryReturnedNoRows) => "not_found",
            AppError::Database(_) => "database",
            AppError::Mail(_) => "mail",
            AppError::Config(_) | AppError::Internal(_) => "internal",
        }
    }

    /// Message exposed to clients. Server-side failures are not echoed.
    fn public_message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "internal server error".to_string(),
            StatusCode::NOT_FOUND if matches!(self, AppError::Database(_)) => {
                "resource not found".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        let body = serde_json::json!({
            "error": {
                "category": self.category(),
                "message": self.public_message(),
            }
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::Auth(AuthError::InvalidCredentials).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Database(rusqlite::Error::QueryReturnedNoRows).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_message_is_hidden() {
        let err = AppError::Internal("secret detail".into());
        assert_eq!(err.public_message(), "internal server error");
        let err = AppError::validation("Enter a valid 10-digit phone number.");
        assert_eq!(err.public_message(), "Enter a valid 10-digit phone number.");
    }
}
