//! Logic for collecting and aggregating salon data for dashboards and reports.
//!
//! This module gathers counts and sums from the database and shapes them for
//! the customer dashboard, the admin dashboard and the monthly report.

use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use super::booking::detail_for;
use crate::database::models::{
    Appointment, AppointmentDetail, AppointmentStatus, Role,
};
use crate::database::queries::{self, AppointmentCounts, PopularService};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDashboard {
    pub upcoming: Vec<AppointmentDetail>,
    #[serde(flatten)]
    pub counts: AppointmentCounts,
}

pub fn customer_dashboard(
    conn: &Connection,
    email: &str,
    today: NaiveDate,
    upcoming_limit: i64,
) -> AppResult<CustomerDashboard> {
    let upcoming = queries::upcoming_appointments_by_email(conn, email, today, upcoming_limit)?
        .into_iter()
        .map(|a| detail_for(conn, a))
        .collect::<AppResult<Vec<_>>>()?;
    let counts = queries::appointment_counts_by_email(conn, email, today)?;
    Ok(CustomerDashboard { upcoming, counts })
}

pub fn appointment_history(conn: &Connection, email: &str) -> AppResult<Vec<AppointmentDetail>> {
    queries::list_appointments_by_email(conn, email)?
        .into_iter()
        .map(|a| detail_for(conn, a))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_appointments: i64,
    pub pending_approvals: i64,
    pub total_services: i64,
    pub total_customers: i64,
    pub upcoming: Vec<Appointment>,
}

/// Upcoming covers today and the following seven days.
pub fn admin_dashboard(conn: &Connection, today: NaiveDate) -> AppResult<AdminDashboard> {
    Ok(AdminDashboard {
        total_appointments: queries::count_appointments(conn, None)?,
        pending_approvals: queries::count_appointments(conn, Some(AppointmentStatus::Pending))?,
        total_services: queries::count_active_services(conn)?,
        total_customers: queries::count_users_by_role(conn, Role::Customer)?,
        upcoming: queries::upcoming_appointments_between(conn, today, today + Duration::days(7))?,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: AppointmentStatus,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    /// `YYYY-MM`.
    pub month: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub service_revenue_cents: i64,
    pub paid_appointments: i64,
    pub appointments_by_status: Vec<StatusCount>,
    pub popular_services: Vec<PopularService>,
    pub order_revenue_cents: i64,
}

/// First and last day of the month given as `YYYY-MM`.
pub fn month_bounds(month: &str) -> AppResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid month '{}', expected YYYY-MM.", month)))?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    }
    .ok_or_else(|| AppError::validation(format!("Invalid month '{}'.", month)))?;
    Ok((first, next - Duration::days(1)))
}

pub fn monthly_report(conn: &Connection, month: &str) -> AppResult<MonthlyReport> {
    let (from, to) = month_bounds(month)?;
    let month = from.format("%Y-%m").to_string();
    Ok(MonthlyReport {
        service_revenue_cents: queries::completed_service_revenue(conn, from, to)?,
        paid_appointments: queries::paid_appointments_between(conn, from, to)?,
        appointments_by_status: queries::appointment_status_counts_between(conn, from, to)?
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect(),
        popular_services: queries::popular_services_between(conn, from, to, 3)?,
        order_revenue_cents: queries::delivered_order_revenue(conn, &month)?,
        month,
        from,
        to,
    })
}
