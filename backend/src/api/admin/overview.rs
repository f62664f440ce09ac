//! Dashboard, reports, contact messages and the panel user's own pages.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::PanelUser;
use crate::database::models::{ContactMessage, Role, Staff, User};
use crate::database::queries;
use crate::errors::AppResult;
use crate::server::AppState;
use crate::services::data_aggregator::{self, AdminDashboard, MonthlyReport};

pub async fn dashboard(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<AdminDashboard>> {
    let today = state.today();
    let dashboard = state
        .db
        .with_conn(|conn| data_aggregator::admin_dashboard(conn, today))?;
    Ok(Json(dashboard))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// `YYYY-MM`; defaults to the current month.
    pub month: Option<String>,
}

pub async fn reports(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<MonthlyReport>> {
    let month = query
        .month
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.today().format("%Y-%m").to_string());
    let report = state
        .db
        .with_conn(|conn| data_aggregator::monthly_report(conn, &month))?;
    Ok(Json(report))
}

pub async fn contacts(
    State(state): State<AppState>,
    PanelUser(_): PanelUser,
) -> AppResult<Json<Vec<ContactMessage>>> {
    let messages = state
        .db
        .with_conn(|conn| Ok(queries::list_contacts(conn)?))?;
    Ok(Json(messages))
}

/// Read-only view of the business and booking settings.
pub async fn settings(State(state): State<AppState>, PanelUser(_): PanelUser) -> Json<Value> {
    Json(json!({
        "business": state.config.business,
        "booking": state.config.booking,
    }))
}

pub async fn profile(
    State(state): State<AppState>,
    PanelUser(user): PanelUser,
) -> AppResult<Json<Value>> {
    let staff = if user.role == Role::Staff {
        let user_id = user.id.clone();
        state
            .db
            .with_conn(|conn| Ok(queries::get_staff_by_user(conn, &user_id)?))?
    } else {
        None
    };
    Ok(Json(profile_body(&user, staff)))
}

fn profile_body(user: &User, staff: Option<Staff>) -> Value {
    json!({
        "user": user,
        "display_name": user.display_name(),
        "staff": staff,
    })
}
