//! Appointment management.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::PanelUser;
use crate::database::models::{Appointment, AppointmentDetail, AppointmentStatus};
use crate::database::queries::{self, AppointmentFilter};
use crate::errors::{AppError, AppResult};
use crate::server::AppState;
use crate::services::booking::{self, BookingResult};
use crate::utils::{PageParams, PAGE_SIZE};

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<bool>,
    #[serde(default, deserialize_with = "crate::utils::deserialize_opt_date")]
    pub date: Option<NaiveDate>,
    pub q: Option<String>,
    pub page: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page<Appointment>>> {
    let page = PageParams {
        page: query.page.unwrap_or(1).max(1),
    };
    let filter = AppointmentFilter {
        status: query.status,
        payment_status: query.payment_status,
        date: query.date,
        q: query.q,
    };
    let (items, total) = state
        .db
        .with_conn(|conn| Ok(queries::list_appointments(conn, &filter, page.offset())?))?;
    Ok(Json(Page {
        items,
        total,
        page: page.page,
        page_size: PAGE_SIZE,
    }))
}

pub async fn detail(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
) -> AppResult<Json<AppointmentDetail>> {
    let detail = state
        .db
        .with_conn(|conn| booking::appointment_detail(conn, id))?;
    Ok(Json(detail))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

pub async fn update_status(
    State(state): State<AppState>,
    PanelUser(user): PanelUser,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> AppResult<Json<Appointment>> {
    let appointment = state.db.with_tx(|tx| {
        booking::change_status(tx, id, update.status, update.reason.as_deref())
    })?;
    info!("{} set appointment {} to {}", user.email, id, appointment.status);
    Ok(Json(appointment))
}

#[derive(Debug, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: bool,
}

pub async fn update_payment(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(update): Json<PaymentUpdate>,
) -> AppResult<Json<Appointment>> {
    let appointment = state.db.with_conn(|conn| {
        queries::get_appointment(conn, id)?
            .ok_or_else(|| AppError::not_found("Appointment not found."))?;
        queries::set_payment_status(conn, id, update.payment_status)?;
        queries::get_appointment(conn, id)?
            .ok_or_else(|| AppError::not_found("Appointment not found."))
    })?;
    Ok(Json(appointment))
}

#[derive(Debug, Deserialize)]
pub struct StaffAssignment {
    pub staff_id: i64,
}

pub async fn assign_staff(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(body): Json<StaffAssignment>,
) -> AppResult<Json<Appointment>> {
    let appointment = state
        .db
        .with_tx(|tx| booking::assign_staff(tx, id, body.staff_id))?;
    Ok(Json(appointment))
}

pub async fn reconcile(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BookingResult>> {
    let result = booking::reconcile(&state.db, state.mailer.as_ref(), &state.config, id).await?;
    Ok(Json(result))
}
