use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::CustomerUser;
use crate::database::models::OrderWithItems;
use crate::errors::AppResult;
use crate::server::AppState;
use crate::services::orders::{self, PlaceOrderRequest};

pub async fn place_order(
    State(state): State<AppState>,
    CustomerUser(customer): CustomerUser,
    Json(req): Json<PlaceOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderWithItems>)> {
    let order = state
        .db
        .with_tx(|tx| orders::place_order(tx, &customer, &req))?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn my_orders(
    State(state): State<AppState>,
    CustomerUser(customer): CustomerUser,
) -> AppResult<Json<Vec<OrderWithItems>>> {
    let orders = state
        .db
        .with_conn(|conn| orders::list_orders(conn, Some(customer.id.as_str()), None))?;
    Ok(Json(orders))
}
