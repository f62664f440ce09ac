use axum::routing::get;
use axum::Router;

use super::handlers;
use crate::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/orders", get(handlers::my_orders).post(handlers::place_order))
}
