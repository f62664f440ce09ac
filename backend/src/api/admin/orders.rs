//! Shop orders.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::auth::PanelUser;
use crate::database::models::{OrderStatus, OrderWithItems};
use crate::errors::AppResult;
use crate::server::AppState;
use crate::services::orders;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<Vec<OrderWithItems>>> {
    let rows = state
        .db
        .with_conn(|conn| orders::list_orders(conn, None, query.status))?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

pub async fn update_status(
    State(state): State<AppState>,
    PanelUser(user): PanelUser,
    Path(id): Path<i64>,
    Json(body): Json<OrderStatusUpdate>,
) -> AppResult<Json<OrderWithItems>> {
    let order = state
        .db
        .with_tx(|tx| orders::update_order_status(tx, id, body.status))?;
    info!("{} moved order {} to {}", user.email, id, body.status);
    Ok(Json(order))
}
