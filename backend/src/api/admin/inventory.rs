//! Product inventory and stock movements.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::PanelUser;
use crate::database::models::{Product, StockTransaction, StockTransactionKind};
use crate::database::queries;
use crate::errors::AppResult;
use crate::server::AppState;
use crate::services::inventory::{
    self, InventoryFilter, InventoryItem, InventoryStats, ProductInput, ProductUpdate,
};

const DEFAULT_TRANSACTION_LIMIT: i64 = 50;

pub async fn list(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Query(filter): Query<InventoryFilter>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    let items = state
        .db
        .with_conn(|conn| inventory::list_inventory(conn, &filter))?;
    Ok(Json(items))
}

pub async fn stats(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<InventoryStats>> {
    let products = state
        .db
        .with_conn(|conn| Ok(queries::list_products(conn, None, None, false)?))?;
    Ok(Json(inventory::inventory_stats(&products)))
}

pub async fn low_stock(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.db.with_conn(inventory::low_stock)?))
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    pub product_id: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn transactions(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let limit = query.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT).clamp(1, 500);
    let rows = state.db.with_conn(|conn| {
        Ok(queries::list_stock_transactions(conn, query.product_id, limit)?)
    })?;
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Json(input): Json<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = state
        .db
        .with_conn(|conn| inventory::create_product(conn, &input))?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(update): Json<ProductUpdate>,
) -> AppResult<Json<Product>> {
    let product = state
        .db
        .with_conn(|conn| inventory::update_product(conn, id, &update))?;
    Ok(Json(product))
}

pub async fn delete(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state
        .db
        .with_conn(|conn| inventory::delete_product(conn, id))?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustment {
    pub quantity: i64,
    #[serde(default = "default_kind")]
    pub kind: StockTransactionKind,
}

fn default_kind() -> StockTransactionKind {
    StockTransactionKind::Adjustment
}

pub async fn adjust(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(body): Json<StockAdjustment>,
) -> AppResult<Json<StockTransaction>> {
    let tx = state
        .db
        .with_tx(|tx| inventory::adjust_stock(tx, id, body.quantity, body.kind))?;
    Ok(Json(tx))
}
