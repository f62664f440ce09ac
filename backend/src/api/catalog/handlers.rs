use axum::extract::{Query, State};
use axum::Json;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::database::models::{Product, ProductCategory, ServiceWithTypes};
use crate::database::queries;
use crate::errors::{AppError, AppResult};
use crate::server::AppState;
use crate::utils::is_valid_email;

/// Active services, each with its active types.
pub fn active_catalog(conn: &Connection) -> AppResult<Vec<ServiceWithTypes>> {
    queries::list_services(conn, true)?
        .into_iter()
        .map(|service| {
            let types = queries::list_service_types(conn, service.id, true)?;
            Ok(ServiceWithTypes { service, types })
        })
        .collect()
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn site(State(state): State<AppState>) -> Json<Value> {
    let business = &state.config.business;
    Json(json!({
        "name": business.name,
        "email": business.email,
        "phone": business.phone,
        "address": business.address,
    }))
}

pub async fn about(State(state): State<AppState>) -> Json<Value> {
    let business = &state.config.business;
    Json(json!({
        "title": "About Us",
        "description": "We provide professional beauty services with expert staff.",
        "experience_years": business.experience_years,
        "team_size": business.team_size,
    }))
}

#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub title: &'static str,
    pub description: Option<&'static str>,
    pub services: Vec<ServiceWithTypes>,
}

pub async fn home(State(state): State<AppState>) -> AppResult<Json<CatalogPage>> {
    let services = state.db.with_conn(active_catalog)?;
    Ok(Json(CatalogPage {
        title: "Welcome to Beauty Parlour",
        description: Some("Book beauty services easily and quickly"),
        services,
    }))
}

pub async fn services(State(state): State<AppState>) -> AppResult<Json<CatalogPage>> {
    let services = state.db.with_conn(active_catalog)?;
    Ok(Json(CatalogPage {
        title: "Our Services",
        description: None,
        services,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    fn validate(&self) -> AppResult<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Name is required."));
        }
        if name.chars().count() > 20 {
            return Err(AppError::validation("Name must be at most 20 characters."));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("Enter a valid email address."));
        }
        if self.subject.trim().chars().count() > 350 {
            return Err(AppError::validation("Subject must be at most 350 characters."));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::validation("Message is required."));
        }
        Ok(())
    }
}

pub async fn contact(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> AppResult<Json<Value>> {
    form.validate()?;
    let id = state.db.with_conn(|conn| {
        Ok(queries::insert_contact(
            conn,
            form.name.trim(),
            form.email.trim(),
            form.subject.trim(),
            form.message.trim(),
        )?)
    })?;
    info!("Contact message {} from {}", id, form.email.trim());
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<ProductCategory>,
    pub search: Option<String>,
}

pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = state.db.with_conn(|conn| {
        Ok(queries::list_products(
            conn,
            query.search.as_deref(),
            query.category,
            true,
        )?)
    })?;
    Ok(Json(products))
}
