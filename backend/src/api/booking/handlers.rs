use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::catalog::handlers::active_catalog;
use crate::auth::{AuthUser, CustomerUser};
use crate::database::models::{Appointment, AppointmentDetail, PaymentMethod, Role, ServiceWithTypes};
use crate::database::queries;
use crate::errors::{AppError, AppResult};
use crate::server::AppState;
use crate::services::booking::{self, BookingRequest, BookingResult};
use crate::services::data_aggregator::{self, CustomerDashboard};

pub async fn book(
    State(state): State<AppState>,
    CustomerUser(customer): CustomerUser,
    Json(req): Json<BookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResult>)> {
    let result = booking::create_booking(
        &state.db,
        state.mailer.as_ref(),
        &state.config,
        &customer,
        &req,
        state.now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Serialize)]
pub struct BookingOptions {
    pub services: Vec<ServiceWithTypes>,
    pub payment_methods: Vec<PaymentMethod>,
}

/// Data for rendering the booking form.
pub async fn options(
    State(state): State<AppState>,
    CustomerUser(_): CustomerUser,
) -> AppResult<Json<BookingOptions>> {
    let options = state.db.with_conn(|conn| {
        Ok(BookingOptions {
            services: active_catalog(conn)?,
            payment_methods: queries::list_payment_methods(conn, true)?,
        })
    })?;
    Ok(Json(options))
}

pub async fn history(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> AppResult<Json<Vec<AppointmentDetail>>> {
    if user.role != Role::Customer {
        return Err(AppError::not_found("Page not found"));
    }
    let history = state
        .db
        .with_conn(|conn| data_aggregator::appointment_history(conn, &user.email))?;
    Ok(Json(history))
}

pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser { user, .. }: AuthUser,
) -> AppResult<Json<CustomerDashboard>> {
    if user.role != Role::Customer || user.is_superuser {
        return Err(AppError::not_found("Page not found"));
    }
    let today = state.today();
    let limit = state.config.booking.upcoming_limit;
    let dashboard = state
        .db
        .with_conn(|conn| data_aggregator::customer_dashboard(conn, &user.email, today, limit))?;
    Ok(Json(dashboard))
}

pub async fn cancel(
    State(state): State<AppState>,
    CustomerUser(customer): CustomerUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Appointment>> {
    let now = state.now();
    let appointment = state
        .db
        .with_tx(|tx| booking::cancel_by_customer(tx, &customer, id, now))?;
    Ok(Json(appointment))
}
