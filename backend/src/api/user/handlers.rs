//! Handler functions for the signed-in user's profile.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::auth::service::{hash_password_blocking, verify_password_blocking};
use crate::auth::AuthUser;
use crate::database::models::User;
use crate::database::queries;
use crate::errors::{AppError, AppResult};
use crate::server::AppState;
use crate::utils::is_valid_phone;

pub async fn me(AuthUser { user, .. }: AuthUser) -> Json<User> {
    Json(user)
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

pub async fn update_me(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<User>> {
    let first_name = update
        .first_name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&user.first_name);
    let last_name = update
        .last_name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&user.last_name);
    let phone = match update.phone.as_deref().map(str::trim) {
        Some("") => None,
        Some(phone) if is_valid_phone(phone) => Some(phone),
        Some(_) => return Err(AppError::validation("Enter a valid 10-digit phone number.")),
        None => user.phone.as_deref(),
    };

    let new_hash = match (&update.current_password, &update.new_password) {
        (_, None) => None,
        (Some(current), Some(new)) => {
            if !verify_password_blocking(current.clone(), user.password_hash.clone()).await? {
                return Err(AppError::validation("Current password is incorrect."));
            }
            if new.is_empty() {
                return Err(AppError::validation("Password is required."));
            }
            Some(hash_password_blocking(new.clone(), state.config.auth.password_iterations).await?)
        }
        (None, Some(_)) => return Err(AppError::validation("Current password is incorrect.")),
    };

    let updated = state.db.with_tx(|tx| {
        queries::update_user_profile(tx, &user.id, first_name, last_name, phone)?;
        if let Some(hash) = &new_hash {
            queries::update_user_password(tx, &user.id, hash)?;
            info!("Password changed for {}", user.email);
        }
        queries::get_user(tx, &user.id)?.ok_or_else(|| AppError::not_found("User not found."))
    })?;
    Ok(Json(updated))
}
