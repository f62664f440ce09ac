//! Route table for `/api/auth`.

use axum::routing::post;
use axum::Router;

use super::handlers;
use crate::server::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
}
