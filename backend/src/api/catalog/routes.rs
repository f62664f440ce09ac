use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use crate::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/site", get(handlers::site))
        .route("/about", get(handlers::about))
        .route("/home", get(handlers::home))
        .route("/services", get(handlers::services))
        .route("/contact", post(handlers::contact))
        .route("/products", get(handlers::products))
}
