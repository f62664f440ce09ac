//! Route table for `/api/admin`.

use axum::routing::{get, patch, post};
use axum::Router;

use super::{appointments, catalog, inventory, orders, overview, people, slots};
use crate::server::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(overview::dashboard))
        .route("/reports", get(overview::reports))
        .route("/settings", get(overview::settings))
        .route("/profile", get(overview::profile))
        .route("/contacts", get(overview::contacts))
        // appointments
        .route("/appointments", get(appointments::list))
        .route("/appointments/:id", get(appointments::detail))
        .route("/appointments/:id/status", patch(appointments::update_status))
        .route("/appointments/:id/payment", patch(appointments::update_payment))
        .route("/appointments/:id/staff", patch(appointments::assign_staff))
        .route("/appointments/:id/reconcile", post(appointments::reconcile))
        // services and payment methods
        .route("/services", get(catalog::list_services).post(catalog::create_service))
        .route(
            "/services/:id",
            patch(catalog::update_service).delete(catalog::delete_service),
        )
        .route("/services/:id/types", post(catalog::create_service_type))
        .route(
            "/service-types/:id",
            patch(catalog::update_service_type).delete(catalog::delete_service_type),
        )
        .route(
            "/payment-methods",
            get(catalog::list_payment_methods).post(catalog::create_payment_method),
        )
        .route("/payment-methods/:id", patch(catalog::update_payment_method))
        // people
        .route("/staff", get(people::list_staff))
        .route("/staff/:id", patch(people::update_staff))
        .route("/users", get(people::list_users).post(people::create_user))
        .route("/users/:id", patch(people::update_user))
        .route("/customers", get(people::list_customers))
        // slots
        .route("/slots", get(slots::list).post(slots::create))
        .route("/slots/generate", post(slots::generate))
        .route("/slots/:id", patch(slots::update).delete(slots::delete))
        // inventory
        .route("/inventory", get(inventory::list).post(inventory::create))
        .route("/inventory/stats", get(inventory::stats))
        .route("/inventory/low-stock", get(inventory::low_stock))
        .route("/inventory/transactions", get(inventory::transactions))
        .route(
            "/inventory/:id",
            patch(inventory::update).delete(inventory::delete),
        )
        .route("/inventory/:id/adjust", post(inventory::adjust))
        // orders
        .route("/orders", get(orders::list))
        .route("/orders/:id/status", patch(orders::update_status))
}
