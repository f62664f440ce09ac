//! Availability slots.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::PanelUser;
use crate::database::models::{hm_time, AvailableSlot};
use crate::database::queries;
use crate::errors::{AppError, AppResult};
use crate::server::AppState;
use crate::services::staff;

#[derive(Debug, Default, Deserialize)]
pub struct SlotQuery {
    #[serde(default, deserialize_with = "crate::utils::deserialize_opt_date")]
    pub date: Option<NaiveDate>,
    pub staff_id: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<Vec<AvailableSlot>>> {
    let slots = state
        .db
        .with_conn(|conn| Ok(queries::list_slots(conn, query.date, query.staff_id)?))?;
    Ok(Json(slots))
}

#[derive(Debug, Deserialize)]
pub struct NewSlot {
    pub staff_id: i64,
    pub date: NaiveDate,
    #[serde(with = "hm_time")]
    pub start_time: NaiveTime,
    #[serde(with = "hm_time")]
    pub end_time: NaiveTime,
}

pub async fn create(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Json(body): Json<NewSlot>,
) -> AppResult<(StatusCode, Json<AvailableSlot>)> {
    if body.start_time >= body.end_time {
        return Err(AppError::validation("Slot must start before it ends."));
    }
    let slot = state.db.with_conn(|conn| {
        queries::get_staff(conn, body.staff_id)?
            .ok_or_else(|| AppError::not_found("Staff member not found."))?;
        if queries::slot_exists(conn, body.staff_id, body.date, body.start_time)? {
            return Err(AppError::conflict(
                "A slot already exists for this staff member at that time.",
            ));
        }
        Ok(queries::insert_slot(
            conn,
            body.staff_id,
            body.date,
            body.start_time,
            body.end_time,
        )?)
    })?;
    info!(
        "Created slot {} for staff {} on {} {}-{}",
        slot.id, body.staff_id, slot.date, slot.start_time, slot.end_time
    );
    Ok((StatusCode::CREATED, Json(slot)))
}

#[derive(Debug, Deserialize)]
pub struct GenerateSlots {
    pub staff_id: i64,
    pub date: NaiveDate,
}

pub async fn generate(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Json(body): Json<GenerateSlots>,
) -> AppResult<(StatusCode, Json<Vec<AvailableSlot>>)> {
    let created = state
        .db
        .with_tx(|tx| staff::generate_daily_slots(tx, body.staff_id, body.date))?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
pub struct SlotToggle {
    pub is_available: bool,
}

pub async fn update(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(body): Json<SlotToggle>,
) -> AppResult<Json<AvailableSlot>> {
    let slot = state.db.with_conn(|conn| {
        queries::get_slot(conn, id)?.ok_or_else(|| AppError::not_found("Slot not found."))?;
        queries::set_slot_available(conn, id, body.is_available)?;
        queries::get_slot(conn, id)?.ok_or_else(|| AppError::not_found("Slot not found."))
    })?;
    Ok(Json(slot))
}

pub async fn delete(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.db.with_conn(|conn| {
        if !queries::delete_slot(conn, id)? {
            return Err(AppError::not_found("Slot not found."));
        }
        Ok(())
    })?;
    Ok(Json(json!({ "success": true })))
}
