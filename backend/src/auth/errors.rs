//! Custom error types specific to authentication failures.
//!
//! This module defines the errors that can occur while logging in, issuing
//! and validating tokens, and the HTTP status each one maps to.

use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Your account is inactive.")]
    Inactive,

    /// No Authorization header or bearer token present.
    #[error("missing authentication token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token has expired")]
    Expired,

    #[error("token has been revoked")]
    Revoked,

    #[error("expected a {0} token")]
    WrongTokenType(&'static str),

    /// Token subject no longer exists.
    #[error("unknown user")]
    UnknownUser,

    #[error("failed to issue token: {0}")]
    Issue(String),
}

impl AuthError {
    /// Whether this error is the caller's fault (vs. a 500).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AuthError::Issue(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Inactive => StatusCode::FORBIDDEN,
            AuthError::Issue(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(AuthError::Inactive.to_string(), "Your account is inactive.");
        assert_eq!(
            AuthError::WrongTokenType("refresh").to_string(),
            "expected a refresh token"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AuthError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Inactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::Issue("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!AuthError::Issue("x".into()).is_client_error());
        assert!(AuthError::Revoked.is_client_error());
    }
}
