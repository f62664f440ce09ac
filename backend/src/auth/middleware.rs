//! Middleware for protecting authenticated routes and handling authorization.
//!
//! Authentication is expressed as axum extractors: a handler that takes an
//! [`AuthUser`] only runs for a request carrying a valid bearer access token
//! of an active user. The role-specific wrappers add the authorization check.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::warn;

use super::errors::AuthError;
use super::models::{Claims, TokenType};
use crate::database::models::{Role, User};
use crate::database::queries;
use crate::errors::AppError;
use crate::server::AppState;

/// Extract the bearer token from the Authorization header. The scheme name
/// is case-insensitive.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim_start().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim()).filter(|t| !t.is_empty())
}

/// Any authenticated, active user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let claims = state.tokens.decode(token, TokenType::Access).map_err(|e| {
            warn!("Authentication failed: {}", e);
            e
        })?;
        let user = state
            .db
            .with_conn(|conn| Ok(queries::get_user(conn, &claims.sub)?))?
            .ok_or(AuthError::UnknownUser)?;
        if !user.is_active {
            return Err(AuthError::Inactive.into());
        }
        Ok(AuthUser { user, claims })
    }
}

/// A customer account; everyone else gets 403.
#[derive(Debug, Clone)]
pub struct CustomerUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CustomerUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if auth.user.role != Role::Customer {
            return Err(AppError::forbidden("Only customers can perform this action."));
        }
        Ok(CustomerUser(auth.user))
    }
}

/// Admin, staff or superuser.
#[derive(Debug, Clone)]
pub struct PanelUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for PanelUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.user.is_panel_user() {
            return Err(AppError::forbidden(
                "You do not have permission to access the admin panel.",
            ));
        }
        Ok(PanelUser(auth.user))
    }
}

/// Admin or superuser.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !(auth.user.is_superuser || auth.user.role == Role::Admin) {
            return Err(AppError::forbidden("Only administrators can manage users."));
        }
        Ok(AdminUser(auth.user))
    }
}
