//! Staff profiles, user accounts and customers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::auth::service::{create_account_hashed, NewAccount};
use crate::auth::{AdminUser, PanelUser};
use crate::database::models::{Role, StaffMember, User};
use crate::database::queries::{self, CustomerSummary};
use crate::errors::{AppError, AppResult};
use crate::server::AppState;
use crate::services::staff::{self, StaffUpdate};

pub async fn list_staff(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<Vec<StaffMember>>> {
    let members = state
        .db
        .with_conn(|conn| Ok(queries::list_staff_members(conn)?))?;
    Ok(Json(members))
}

pub async fn update_staff(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(update): Json<StaffUpdate>,
) -> AppResult<Json<StaffMember>> {
    let member = state.db.with_conn(|conn| {
        staff::update_staff_profile(conn, id, &update)?;
        queries::get_staff_member(conn, id)?
            .ok_or_else(|| AppError::not_found("Staff member not found."))
    })?;
    Ok(Json(member))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<Vec<User>>> {
    let users = state
        .db
        .with_conn(|conn| Ok(queries::list_users(conn, query.role)?))?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub is_superuser: bool,
}

pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<User>)> {
    if body.is_superuser && !admin.is_superuser {
        return Err(AppError::forbidden("Only a superuser can create another superuser."));
    }
    let iterations = state.config.auth.password_iterations;
    let account = NewAccount {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
        role: body.role,
        is_superuser: body.is_superuser,
    };
    let user = create_account_hashed(&state.db, iterations, &account).await?;
    info!("{} created {} account {}", admin.email, user.role, user.email);
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Default, Deserialize)]
pub struct AccessUpdate {
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Changes role or active flag, then brings the staff profile in line.
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(update): Json<AccessUpdate>,
) -> AppResult<Json<User>> {
    if id == admin.id && update.is_active == Some(false) {
        return Err(AppError::validation("You cannot deactivate your own account."));
    }
    let user = state.db.with_tx(|tx| {
        let user = queries::get_user(tx, &id)?
            .ok_or_else(|| AppError::not_found("User not found."))?;
        if user.is_superuser && !admin.is_superuser {
            return Err(AppError::forbidden("Only a superuser can change a superuser account."));
        }
        let role = update.role.unwrap_or(user.role);
        let is_active = update.is_active.unwrap_or(user.is_active);
        queries::update_user_access(tx, &user.id, role, is_active)?;

        let user = queries::get_user(tx, &id)?
            .ok_or_else(|| AppError::not_found("User not found."))?;
        staff::sync_staff_profile(tx, &user)?;
        Ok(user)
    })?;
    info!(
        "{} updated {}: role={} active={}",
        admin.email, user.email, user.role, user.is_active
    );
    Ok(Json(user))
}

pub async fn list_customers(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<Vec<CustomerSummary>>> {
    let customers = state
        .db
        .with_conn(|conn| Ok(queries::list_customers(conn)?))?;
    Ok(Json(customers))
}
