//! HTTP handlers for the authentication endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use super::models::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
use super::service;
use crate::errors::AppResult;
use crate::server::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let resp = service::register(
        &state.db,
        &state.tokens,
        state.config.auth.password_iterations,
        &req,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(service::login(&state.db, &state.tokens, &req).await?))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<TokenPair>> {
    Ok(Json(service::refresh(&state.db, &state.tokens, &req.refresh_token)?))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<Value>> {
    service::logout(&state.db, &state.tokens, &req.refresh_token)?;
    Ok(Json(json!({ "success": true })))
}
