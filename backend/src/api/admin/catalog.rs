//! Services, service types and payment methods.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::PanelUser;
use crate::database::models::{PaymentMethod, Service, ServiceType, ServiceWithTypes};
use crate::database::queries::{self, NewServiceType};
use crate::errors::{AppError, AppResult};
use crate::server::AppState;

fn required_name(name: &str, what: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation(format!("{} name is required.", what)));
    }
    Ok(name.to_string())
}

fn check_price(price_cents: i64) -> AppResult<()> {
    if price_cents < 0 {
        return Err(AppError::validation("Price cannot be negative."));
    }
    Ok(())
}

fn check_duration(duration_minutes: Option<i64>) -> AppResult<()> {
    match duration_minutes {
        Some(minutes) if minutes <= 0 => {
            Err(AppError::validation("Duration must be a positive number of minutes."))
        }
        _ => Ok(()),
    }
}

/// Every service with every type, inactive ones included.
fn full_catalog(conn: &Connection) -> AppResult<Vec<ServiceWithTypes>> {
    queries::list_services(conn, false)?
        .into_iter()
        .map(|service| {
            let types = queries::list_service_types(conn, service.id, false)?;
            Ok(ServiceWithTypes { service, types })
        })
        .collect()
}

pub async fn list_services(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<Vec<ServiceWithTypes>>> {
    Ok(Json(state.db.with_conn(full_catalog)?))
}

#[derive(Debug, Deserialize)]
pub struct ServiceInput {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

pub async fn create_service(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Json(input): Json<ServiceInput>,
) -> AppResult<(StatusCode, Json<Service>)> {
    let name = required_name(&input.name, "Service")?;
    let service = state.db.with_conn(|conn| {
        let id = queries::insert_service(conn, &name, input.description.as_deref(), input.is_active)?;
        queries::get_service(conn, id)?.ok_or_else(|| AppError::Internal("service vanished".into()))
    })?;
    info!("Created service {} ({})", service.name, service.id);
    Ok((StatusCode::CREATED, Json(service)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ServicePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update_service(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(patch): Json<ServicePatch>,
) -> AppResult<Json<Service>> {
    let service = state.db.with_conn(|conn| {
        let mut service = queries::get_service(conn, id)?
            .ok_or_else(|| AppError::not_found("Service not found."))?;
        if let Some(name) = &patch.name {
            service.name = required_name(name, "Service")?;
        }
        if let Some(description) = &patch.description {
            service.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(active) = patch.is_active {
            service.is_active = active;
        }
        queries::update_service(conn, &service)?;
        Ok(service)
    })?;
    Ok(Json(service))
}

pub async fn delete_service(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.db.with_conn(|conn| {
        if !queries::delete_service(conn, id)? {
            return Err(AppError::not_found("Service not found."));
        }
        Ok(())
    })?;
    info!("Deleted service {}", id);
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ServiceTypeInput {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub duration_minutes: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

pub async fn create_service_type(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(service_id): Path<i64>,
    Json(input): Json<ServiceTypeInput>,
) -> AppResult<(StatusCode, Json<ServiceType>)> {
    let name = required_name(&input.name, "Service type")?;
    check_price(input.price_cents)?;
    check_duration(input.duration_minutes)?;

    let service_type = state.db.with_conn(|conn| {
        queries::get_service(conn, service_id)?
            .ok_or_else(|| AppError::not_found("Service not found."))?;
        let id = queries::insert_service_type(
            conn,
            &NewServiceType {
                service_id,
                name: name.clone(),
                description: input.description.clone(),
                price_cents: input.price_cents,
                duration_minutes: input.duration_minutes,
                is_active: input.is_active,
            },
        )?;
        queries::get_service_type(conn, id)?
            .ok_or_else(|| AppError::Internal("service type vanished".into()))
    })?;
    Ok((StatusCode::CREATED, Json(service_type)))
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceTypePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub duration_minutes: Option<i64>,
    pub is_active: Option<bool>,
}

pub async fn update_service_type(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(patch): Json<ServiceTypePatch>,
) -> AppResult<Json<ServiceType>> {
    let service_type = state.db.with_conn(|conn| {
        let mut st = queries::get_service_type(conn, id)?
            .ok_or_else(|| AppError::not_found("Service type not found."))?;
        if let Some(name) = &patch.name {
            st.name = required_name(name, "Service type")?;
        }
        if let Some(description) = &patch.description {
            st.description = Some(description.clone()).filter(|d| !d.trim().is_empty());
        }
        if let Some(price) = patch.price_cents {
            check_price(price)?;
            st.price_cents = price;
        }
        if patch.duration_minutes.is_some() {
            check_duration(patch.duration_minutes)?;
            st.duration_minutes = patch.duration_minutes;
        }
        if let Some(active) = patch.is_active {
            st.is_active = active;
        }
        queries::update_service_type(conn, &st)?;
        Ok(st)
    })?;
    Ok(Json(service_type))
}

pub async fn delete_service_type(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    state.db.with_conn(|conn| {
        if !queries::delete_service_type(conn, id)? {
            return Err(AppError::not_found("Service type not found."));
        }
        Ok(())
    })?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_payment_methods(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<Vec<PaymentMethod>>> {
    let methods = state
        .db
        .with_conn(|conn| Ok(queries::list_payment_methods(conn, false)?))?;
    Ok(Json(methods))
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodInput {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_fee_cents: i64,
}

pub async fn create_payment_method(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Json(input): Json<PaymentMethodInput>,
) -> AppResult<(StatusCode, Json<PaymentMethod>)> {
    let name = required_name(&input.name, "Payment method")?;
    let code = input.code.trim().to_lowercase();
    if code.is_empty() {
        return Err(AppError::validation("Payment method code is required."));
    }
    check_price(input.service_fee_cents)?;

    let method = state.db.with_conn(|conn| {
        if queries::get_payment_method_by_code(conn, &code)?.is_some() {
            return Err(AppError::conflict(format!(
                "Payment method with code '{}' already exists.",
                code
            )));
        }
        let id = queries::insert_payment_method(
            conn,
            &name,
            &code,
            input.description.trim(),
            input.service_fee_cents,
        )?;
        queries::get_payment_method(conn, id)?
            .ok_or_else(|| AppError::Internal("payment method vanished".into()))
    })?;
    info!("Created payment method {}", method.code);
    Ok((StatusCode::CREATED, Json(method)))
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentMethodPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub service_fee_cents: Option<i64>,
}

pub async fn update_payment_method(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Path(id): Path<i64>,
    Json(patch): Json<PaymentMethodPatch>,
) -> AppResult<Json<PaymentMethod>> {
    let method = state.db.with_conn(|conn| {
        let mut method = queries::get_payment_method(conn, id)?
            .ok_or_else(|| AppError::not_found("Payment method not found."))?;
        if let Some(name) = &patch.name {
            method.name = required_name(name, "Payment method")?;
        }
        if let Some(description) = &patch.description {
            method.description = description.trim().to_string();
        }
        if let Some(active) = patch.is_active {
            method.is_active = active;
        }
        if let Some(fee) = patch.service_fee_cents {
            check_price(fee)?;
            method.service_fee_cents = fee;
        }
        queries::update_payment_method(conn, &method)?;
        Ok(method)
    })?;
    Ok(Json(method))
}
