use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use crate::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/appointments", post(handlers::book))
        .route("/appointments/options", get(handlers::options))
        .route("/appointments/history", get(handlers::history))
        .route("/appointments/:id/cancel", post(handlers::cancel))
        .route("/dashboard", get(handlers::dashboard))
}
