use axum::routing::get;
use axum::Router;

use super::handlers;
use crate::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/user/me", get(handlers::me).patch(handlers::update_me))
}
