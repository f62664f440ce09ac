//! Database query functions (Data Access Objects).
//!
//! This module centralizes all direct database operations, providing reusable
//! functions for interacting with the database and abstracting the query logic
//! from higher-level services and API handlers. Every function takes a
//! `&Connection`, so it works the same inside or outside a transaction.

use chrono::{NaiveDate, NaiveTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, ToSql};

use super::models::{
    Appointment, AppointmentStatus, AvailableSlot, BookedService, ContactMessage, Order,
    OrderItem, OrderStatus, PaymentMethod, Product, ProductCategory, RefreshTokenRecord, Role,
    Service, ServiceType, Staff, StaffMember, StockTransaction, StockTransactionKind, User,
};
use crate::utils::{format_date, format_time, timestamp, PAGE_SIZE};

fn now() -> String {
    timestamp(Utc::now())
}

/// True when the error is a UNIQUE/CHECK/FK constraint violation.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_superuser: bool,
    pub password_hash: String,
}

pub fn insert_user(conn: &Connection, new: &NewUser) -> rusqlite::Result<User> {
    let id = uuid::Uuid::new_v4().to_string();
    let ts = now();
    conn.execute(
        "INSERT INTO users (id, username, email, first_name, last_name, phone, role,
                            is_active, is_superuser, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?10, ?10)",
        params![
            id,
            new.username,
            new.email,
            new.first_name,
            new.last_name,
            new.phone,
            new.role.as_str(),
            new.is_superuser,
            new.password_hash,
            ts
        ],
    )?;
    get_user(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_user(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row("SELECT * FROM users WHERE id = ?1", [id], User::from_row)
        .optional()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT * FROM users WHERE email = ?1 COLLATE NOCASE",
        [email],
        User::from_row,
    )
    .optional()
}

pub fn username_exists(conn: &Connection, username: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [username],
        |row| row.get(0),
    )
}

pub fn count_users(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}

pub fn count_users_by_role(conn: &Connection, role: Role) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        [role.as_str()],
        |row| row.get(0),
    )
}

pub fn list_users(conn: &Connection, role: Option<Role>) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM users WHERE (?1 IS NULL OR role = ?1) ORDER BY email",
    )?;
    let rows = stmt.query_map([role.map(|r| r.as_str())], User::from_row)?;
    rows.collect()
}

pub fn touch_last_login(conn: &Connection, id: &str) -> rusqlite::Result<()> {
    let ts = now();
    conn.execute(
        "UPDATE users SET last_login = ?2, updated_at = ?2 WHERE id = ?1",
        params![id, ts],
    )?;
    Ok(())
}

pub fn update_user_profile(
    conn: &Connection,
    id: &str,
    first_name: &str,
    last_name: &str,
    phone: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET first_name = ?2, last_name = ?3, phone = ?4, updated_at = ?5
         WHERE id = ?1",
        params![id, first_name, last_name, phone, now()],
    )?;
    Ok(())
}

pub fn update_user_access(
    conn: &Connection,
    id: &str,
    role: Role,
    is_active: bool,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET role = ?2, is_active = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, role.as_str(), is_active, now()],
    )?;
    Ok(())
}

pub fn update_user_password(conn: &Connection, id: &str, password_hash: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, password_hash, now()],
    )?;
    Ok(())
}

/// Customer row for the admin customers view.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CustomerSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub total_visits: i64,
}

pub fn list_customers(conn: &Connection) -> rusqlite::Result<Vec<CustomerSummary>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, TRIM(u.first_name || ' ' || u.last_name) AS name, u.email, u.phone,
                (SELECT COUNT(*) FROM appointments a WHERE a.email = u.email) AS total_visits
         FROM users u
         WHERE u.role = 'customer'
         ORDER BY u.created_at DESC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(CustomerSummary {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            total_visits: row.get("total_visits")?,
        })
    })?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Refresh tokens
// ---------------------------------------------------------------------------

pub fn insert_refresh_token(
    conn: &Connection,
    jti: &str,
    user_id: &str,
    expires_at: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO refresh_tokens (jti, user_id, expires_at, revoked, created_at)
         VALUES (?1, ?2, ?3, 0, ?4)",
        params![jti, user_id, expires_at, now()],
    )?;
    Ok(())
}

pub fn get_refresh_token(conn: &Connection, jti: &str) -> rusqlite::Result<Option<RefreshTokenRecord>> {
    conn.query_row(
        "SELECT * FROM refresh_tokens WHERE jti = ?1",
        [jti],
        RefreshTokenRecord::from_row,
    )
    .optional()
}

/// Returns whether a live token was revoked by this call.
pub fn revoke_refresh_token(conn: &Connection, jti: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?1 AND revoked = 0",
        [jti],
    )?;
    Ok(changed > 0)
}

// ---------------------------------------------------------------------------
// Services and service types
// ---------------------------------------------------------------------------

pub fn list_services(conn: &Connection, active_only: bool) -> rusqlite::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM services WHERE (?1 = 0 OR is_active = 1) ORDER BY name",
    )?;
    let rows = stmt.query_map([active_only], Service::from_row)?;
    rows.collect()
}

pub fn get_service(conn: &Connection, id: i64) -> rusqlite::Result<Option<Service>> {
    conn.query_row("SELECT * FROM services WHERE id = ?1", [id], Service::from_row)
        .optional()
}

pub fn insert_service(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    is_active: bool,
) -> rusqlite::Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO services (name, description, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![name, description, is_active, ts],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_service(conn: &Connection, service: &Service) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE services SET name = ?2, description = ?3, is_active = ?4, updated_at = ?5
         WHERE id = ?1",
        params![service.id, service.name, service.description, service.is_active, now()],
    )?;
    Ok(())
}

pub fn delete_service(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM services WHERE id = ?1", [id])? > 0)
}

pub fn count_active_services(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM services WHERE is_active = 1",
        [],
        |row| row.get(0),
    )
}

pub fn list_service_types(
    conn: &Connection,
    service_id: i64,
    active_only: bool,
) -> rusqlite::Result<Vec<ServiceType>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM service_types
         WHERE service_id = ?1 AND (?2 = 0 OR is_active = 1)
         ORDER BY price_cents, name",
    )?;
    let rows = stmt.query_map(params![service_id, active_only], ServiceType::from_row)?;
    rows.collect()
}

pub fn get_service_type(conn: &Connection, id: i64) -> rusqlite::Result<Option<ServiceType>> {
    conn.query_row(
        "SELECT * FROM service_types WHERE id = ?1",
        [id],
        ServiceType::from_row,
    )
    .optional()
}

#[derive(Debug, Clone)]
pub struct NewServiceType {
    pub service_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub duration_minutes: Option<i64>,
    pub is_active: bool,
}

pub fn insert_service_type(conn: &Connection, new: &NewServiceType) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO service_types
            (service_id, name, description, price_cents, duration_minutes, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.service_id,
            new.name,
            new.description,
            new.price_cents,
            new.duration_minutes,
            new.is_active,
            now()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_service_type(conn: &Connection, st: &ServiceType) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE service_types
         SET name = ?2, description = ?3, price_cents = ?4, duration_minutes = ?5, is_active = ?6
         WHERE id = ?1",
        params![
            st.id,
            st.name,
            st.description,
            st.price_cents,
            st.duration_minutes,
            st.is_active
        ],
    )?;
    Ok(())
}

pub fn delete_service_type(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM service_types WHERE id = ?1", [id])? > 0)
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

pub fn get_staff(conn: &Connection, id: i64) -> rusqlite::Result<Option<Staff>> {
    conn.query_row("SELECT * FROM staff WHERE id = ?1", [id], Staff::from_row)
        .optional()
}

pub fn get_staff_by_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Option<Staff>> {
    conn.query_row(
        "SELECT * FROM staff WHERE user_id = ?1",
        [user_id],
        Staff::from_row,
    )
    .optional()
}

pub fn insert_staff(conn: &Connection, user_id: &str) -> rusqlite::Result<Staff> {
    let ts = now();
    conn.execute(
        "INSERT INTO staff (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
        params![user_id, ts],
    )?;
    let id = conn.last_insert_rowid();
    get_staff(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn set_staff_flags(
    conn: &Connection,
    id: i64,
    is_active: bool,
    is_available: bool,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE staff SET is_active = ?2, is_available = ?3, updated_at = ?4 WHERE id = ?1",
        params![id, is_active, is_available, now()],
    )?;
    Ok(())
}

pub fn update_staff(conn: &Connection, staff: &Staff) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE staff
         SET specialization = ?2, experience_years = ?3, is_available = ?4, is_active = ?5,
             working_hours_start = ?6, working_hours_end = ?7, updated_at = ?8
         WHERE id = ?1",
        params![
            staff.id,
            staff.specialization,
            staff.experience_years,
            staff.is_available,
            staff.is_active,
            format_time(staff.working_hours_start),
            format_time(staff.working_hours_end),
            now()
        ],
    )?;
    Ok(())
}

pub fn delete_staff(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM staff WHERE id = ?1", [id])?;
    Ok(())
}

pub fn staff_has_appointments(conn: &Connection, staff_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM appointments WHERE staff_id = ?1)",
        [staff_id],
        |row| row.get(0),
    )
}

pub fn count_bookable_staff(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM staff WHERE is_active = 1 AND is_available = 1",
        [],
        |row| row.get(0),
    )
}

fn staff_member_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StaffMember> {
    let first: String = row.get("first_name")?;
    let last: String = row.get("last_name")?;
    Ok(StaffMember {
        staff: Staff::from_row(row)?,
        name: format!("{} {}", first, last).trim().to_string(),
        email: row.get("email")?,
    })
}

pub fn list_staff_members(conn: &Connection) -> rusqlite::Result<Vec<StaffMember>> {
    let mut stmt = conn.prepare(
        "SELECT s.*, u.first_name, u.last_name, u.email
         FROM staff s JOIN users u ON u.id = s.user_id
         ORDER BY u.first_name, u.last_name",
    )?;
    let rows = stmt.query_map([], staff_member_from_row)?;
    rows.collect()
}

pub fn get_staff_member(conn: &Connection, id: i64) -> rusqlite::Result<Option<StaffMember>> {
    conn.query_row(
        "SELECT s.*, u.first_name, u.last_name, u.email
         FROM staff s JOIN users u ON u.id = s.user_id
         WHERE s.id = ?1",
        [id],
        staff_member_from_row,
    )
    .optional()
}

// ---------------------------------------------------------------------------
// Payment methods
// ---------------------------------------------------------------------------

pub fn list_payment_methods(conn: &Connection, active_only: bool) -> rusqlite::Result<Vec<PaymentMethod>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM payment_methods WHERE (?1 = 0 OR is_active = 1) ORDER BY name",
    )?;
    let rows = stmt.query_map([active_only], PaymentMethod::from_row)?;
    rows.collect()
}

pub fn get_payment_method(conn: &Connection, id: i64) -> rusqlite::Result<Option<PaymentMethod>> {
    conn.query_row(
        "SELECT * FROM payment_methods WHERE id = ?1",
        [id],
        PaymentMethod::from_row,
    )
    .optional()
}

pub fn get_payment_method_by_code(
    conn: &Connection,
    code: &str,
) -> rusqlite::Result<Option<PaymentMethod>> {
    conn.query_row(
        "SELECT * FROM payment_methods WHERE code = ?1",
        [code],
        PaymentMethod::from_row,
    )
    .optional()
}

pub fn insert_payment_method(
    conn: &Connection,
    name: &str,
    code: &str,
    description: &str,
    service_fee_cents: i64,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO payment_methods (name, code, description, is_active, service_fee_cents, created_at)
         VALUES (?1, ?2, ?3, 1, ?4, ?5)",
        params![name, code, description, service_fee_cents, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_payment_method(conn: &Connection, method: &PaymentMethod) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE payment_methods
         SET name = ?2, description = ?3, is_active = ?4, service_fee_cents = ?5
         WHERE id = ?1",
        params![
            method.id,
            method.name,
            method.description,
            method.is_active,
            method.service_fee_cents
        ],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub customer_id: Option<String>,
    pub payment_method_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub notes: String,
}

pub fn insert_appointment(conn: &Connection, new: &NewAppointment) -> rusqlite::Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO appointments
            (customer_id, payment_method_id, name, email, phone, appointment_date,
             appointment_time, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?9, ?9)",
        params![
            new.customer_id,
            new.payment_method_id,
            new.name,
            new.email,
            new.phone,
            format_date(new.date),
            format_time(new.time),
            new.notes,
            ts
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn link_appointment_service(
    conn: &Connection,
    appointment_id: i64,
    service_type_id: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO appointment_services (appointment_id, service_type_id)
         VALUES (?1, ?2)",
        params![appointment_id, service_type_id],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: i64) -> rusqlite::Result<Option<Appointment>> {
    conn.query_row(
        "SELECT * FROM appointments WHERE id = ?1",
        [id],
        Appointment::from_row,
    )
    .optional()
}

pub fn booked_services(conn: &Connection, appointment_id: i64) -> rusqlite::Result<Vec<BookedService>> {
    let mut stmt = conn.prepare(
        "SELECT st.id AS service_type_id, s.id AS service_id, s.name AS service_name,
                st.name AS type_name, st.price_cents, st.duration_minutes
         FROM appointment_services aps
         JOIN service_types st ON st.id = aps.service_type_id
         JOIN services s ON s.id = st.service_id
         WHERE aps.appointment_id = ?1
         ORDER BY s.name, st.name",
    )?;
    let rows = stmt.query_map([appointment_id], BookedService::from_row)?;
    rows.collect()
}

/// Another pending/confirmed appointment at exactly the same date and time.
pub fn has_schedule_conflict(
    conn: &Connection,
    date: NaiveDate,
    time: NaiveTime,
    exclude_id: i64,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM appointments
            WHERE appointment_date = ?1 AND appointment_time = ?2
              AND status IN ('pending', 'confirmed') AND id != ?3)",
        params![format_date(date), format_time(time), exclude_id],
        |row| row.get(0),
    )
}

pub fn cancel_appointment(conn: &Connection, id: i64, reason: &str) -> rusqlite::Result<()> {
    let ts = now();
    conn.execute(
        "UPDATE appointments
         SET status = 'cancelled', cancelled_reason = ?2, cancelled_at = ?3, updated_at = ?3
         WHERE id = ?1",
        params![id, reason, ts],
    )?;
    Ok(())
}

pub fn confirm_appointment(
    conn: &Connection,
    id: i64,
    staff_id: Option<i64>,
    slot_id: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE appointments
         SET status = 'confirmed', staff_id = ?2, slot_id = ?3, updated_at = ?4
         WHERE id = ?1",
        params![id, staff_id, slot_id, now()],
    )?;
    Ok(())
}

pub fn set_appointment_status(
    conn: &Connection,
    id: i64,
    status: AppointmentStatus,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE appointments SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status.as_str(), now()],
    )?;
    Ok(())
}

pub fn clear_appointment_slot(conn: &Connection, id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE appointments SET slot_id = NULL, updated_at = ?2 WHERE id = ?1",
        params![id, now()],
    )?;
    Ok(())
}

pub fn set_payment_status(conn: &Connection, id: i64, paid: bool) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE appointments SET payment_status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, paid, now()],
    )?;
    Ok(())
}

pub fn assign_staff(conn: &Connection, id: i64, staff_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE appointments SET staff_id = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, staff_id, now()],
    )?;
    Ok(())
}

/// Newest first by schedule.
pub fn list_appointments_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM appointments WHERE email = ?1
         ORDER BY appointment_date DESC, appointment_time DESC",
    )?;
    let rows = stmt.query_map([email], Appointment::from_row)?;
    rows.collect()
}

pub fn upcoming_appointments_by_email(
    conn: &Connection,
    email: &str,
    today: NaiveDate,
    limit: i64,
) -> rusqlite::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM appointments
         WHERE email = ?1 AND appointment_date >= ?2 AND status IN ('pending', 'confirmed')
         ORDER BY appointment_date, appointment_time
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![email, format_date(today), limit], Appointment::from_row)?;
    rows.collect()
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AppointmentCounts {
    pub total: i64,
    pub upcoming: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub services_booked: i64,
}

pub fn appointment_counts_by_email(
    conn: &Connection,
    email: &str,
    today: NaiveDate,
) -> rusqlite::Result<AppointmentCounts> {
    let counts = conn.query_row(
        "SELECT COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN appointment_date >= ?2
                                   AND status IN ('pending', 'confirmed') THEN 1 ELSE 0 END), 0) AS upcoming,
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS completed,
                COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0) AS cancelled
         FROM appointments WHERE email = ?1",
        params![email, format_date(today)],
        |row| {
            Ok(AppointmentCounts {
                total: row.get("total")?,
                upcoming: row.get("upcoming")?,
                completed: row.get("completed")?,
                cancelled: row.get("cancelled")?,
                services_booked: 0,
            })
        },
    )?;
    let services_booked = conn.query_row(
        "SELECT COUNT(DISTINCT st.service_id)
         FROM appointments a
         JOIN appointment_services aps ON aps.appointment_id = a.id
         JOIN service_types st ON st.id = aps.service_type_id
         WHERE a.email = ?1",
        [email],
        |row| row.get(0),
    )?;
    Ok(AppointmentCounts {
        services_booked,
        ..counts
    })
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<bool>,
    #[serde(default, deserialize_with = "crate::utils::deserialize_opt_date")]
    pub date: Option<NaiveDate>,
    /// Matches name, email or phone.
    pub q: Option<String>,
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
    offset: i64,
) -> rusqlite::Result<(Vec<Appointment>, i64)> {
    let mut clauses = Vec::new();
    let mut args: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        args.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", args.len()));
    }
    if let Some(paid) = filter.payment_status {
        args.push(Box::new(paid));
        clauses.push(format!("payment_status = ?{}", args.len()));
    }
    if let Some(date) = filter.date {
        args.push(Box::new(format_date(date)));
        clauses.push(format!("appointment_date = ?{}", args.len()));
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        args.push(Box::new(format!("%{}%", q)));
        let n = args.len();
        clauses.push(format!("(name LIKE ?{n} OR email LIKE ?{n} OR phone LIKE ?{n})"));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let arg_refs: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM appointments {}", where_sql),
        arg_refs.as_slice(),
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT * FROM appointments {} ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
        where_sql, PAGE_SIZE, offset
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(arg_refs.as_slice(), Appointment::from_row)?;
    Ok((rows.collect::<rusqlite::Result<Vec<_>>>()?, total))
}

pub fn upcoming_appointments_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<Vec<Appointment>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM appointments
         WHERE appointment_date BETWEEN ?1 AND ?2 AND status IN ('pending', 'confirmed')
         ORDER BY appointment_date, appointment_time",
    )?;
    let rows = stmt.query_map(params![format_date(from), format_date(to)], Appointment::from_row)?;
    rows.collect()
}

pub fn count_appointments(conn: &Connection, status: Option<AppointmentStatus>) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM appointments WHERE (?1 IS NULL OR status = ?1)",
        [status.map(|s| s.as_str())],
        |row| row.get(0),
    )
}

// ---------------------------------------------------------------------------
// Availability slots
// ---------------------------------------------------------------------------

pub fn insert_slot(
    conn: &Connection,
    staff_id: i64,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> rusqlite::Result<AvailableSlot> {
    conn.execute(
        "INSERT INTO available_slots (staff_id, date, start_time, end_time, is_available)
         VALUES (?1, ?2, ?3, ?4, 1)",
        params![staff_id, format_date(date), format_time(start), format_time(end)],
    )?;
    let id = conn.last_insert_rowid();
    get_slot(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_slot(conn: &Connection, id: i64) -> rusqlite::Result<Option<AvailableSlot>> {
    conn.query_row(
        "SELECT * FROM available_slots WHERE id = ?1",
        [id],
        AvailableSlot::from_row,
    )
    .optional()
}

pub fn slot_exists(
    conn: &Connection,
    staff_id: i64,
    date: NaiveDate,
    start: NaiveTime,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM available_slots
                       WHERE staff_id = ?1 AND date = ?2 AND start_time = ?3)",
        params![staff_id, format_date(date), format_time(start)],
        |row| row.get(0),
    )
}

pub fn list_slots(
    conn: &Connection,
    date: Option<NaiveDate>,
    staff_id: Option<i64>,
) -> rusqlite::Result<Vec<AvailableSlot>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM available_slots
         WHERE (?1 IS NULL OR date = ?1) AND (?2 IS NULL OR staff_id = ?2)
         ORDER BY date, start_time, id",
    )?;
    let rows = stmt.query_map(
        params![date.map(format_date), staff_id],
        AvailableSlot::from_row,
    )?;
    rows.collect()
}

/// First free slot on `date` covering `[start, end]` whose staff member is
/// active. Times are zero-padded `HH:MM`, so text comparison orders them.
pub fn find_covering_slot(
    conn: &Connection,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> rusqlite::Result<Option<AvailableSlot>> {
    conn.query_row(
        "SELECT sl.* FROM available_slots sl
         LEFT JOIN staff s ON s.id = sl.staff_id
         WHERE sl.date = ?1 AND sl.start_time <= ?2 AND sl.end_time >= ?3
           AND sl.is_available = 1
           AND (sl.staff_id IS NULL OR s.is_active = 1)
         ORDER BY sl.id
         LIMIT 1",
        params![format_date(date), format_time(start), format_time(end)],
        AvailableSlot::from_row,
    )
    .optional()
}

pub fn set_slot_available(conn: &Connection, id: i64, available: bool) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE available_slots SET is_available = ?2 WHERE id = ?1",
        params![id, available],
    )?;
    Ok(())
}

pub fn delete_slot(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM available_slots WHERE id = ?1", [id])? > 0)
}

// ---------------------------------------------------------------------------
// Products (inventory) and stock transactions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub brand: Option<String>,
    pub supplier: Option<String>,
    pub price_cents: i64,
    pub quantity: i64,
    pub reorder_level: i64,
    pub image_url: Option<String>,
}

pub fn insert_product(conn: &Connection, new: &NewProduct) -> rusqlite::Result<Product> {
    let ts = now();
    conn.execute(
        "INSERT INTO products
            (sku, name, description, category, brand, supplier, price_cents, quantity,
             reorder_level, image_url, is_active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?11)",
        params![
            new.sku,
            new.name,
            new.description,
            new.category.as_str(),
            new.brand,
            new.supplier,
            new.price_cents,
            new.quantity,
            new.reorder_level,
            new.image_url,
            ts
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_product(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

pub fn get_product(conn: &Connection, id: i64) -> rusqlite::Result<Option<Product>> {
    conn.query_row("SELECT * FROM products WHERE id = ?1", [id], Product::from_row)
        .optional()
}

pub fn update_product(conn: &Connection, product: &Product) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE products
         SET sku = ?2, name = ?3, description = ?4, category = ?5, brand = ?6, supplier = ?7,
             price_cents = ?8, reorder_level = ?9, image_url = ?10, is_active = ?11,
             updated_at = ?12
         WHERE id = ?1",
        params![
            product.id,
            product.sku,
            product.name,
            product.description,
            product.category.as_str(),
            product.brand,
            product.supplier,
            product.price_cents,
            product.reorder_level,
            product.image_url,
            product.is_active,
            now()
        ],
    )?;
    Ok(())
}

pub fn set_product_quantity(conn: &Connection, id: i64, quantity: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE products SET quantity = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, quantity, now()],
    )?;
    Ok(())
}

pub fn delete_product(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM products WHERE id = ?1", [id])? > 0)
}

pub fn list_products(
    conn: &Connection,
    search: Option<&str>,
    category: Option<ProductCategory>,
    active_only: bool,
) -> rusqlite::Result<Vec<Product>> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s));
    let mut stmt = conn.prepare(
        "SELECT * FROM products
         WHERE (?1 IS NULL OR name LIKE ?1 OR COALESCE(description, '') LIKE ?1 OR sku LIKE ?1)
           AND (?2 IS NULL OR category = ?2)
           AND (?3 = 0 OR is_active = 1)
         ORDER BY name",
    )?;
    let rows = stmt.query_map(
        params![pattern, category.map(|c| c.as_str()), active_only],
        Product::from_row,
    )?;
    rows.collect()
}

pub fn insert_stock_transaction(
    conn: &Connection,
    product: &Product,
    kind: StockTransactionKind,
    new_quantity: i64,
) -> rusqlite::Result<StockTransaction> {
    conn.execute(
        "INSERT INTO stock_transactions
            (product_id, product_name, kind, old_quantity, new_quantity, difference, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            product.id,
            product.name,
            kind.as_str(),
            product.quantity,
            new_quantity,
            new_quantity - product.quantity,
            now()
        ],
    )?;
    let id = conn.last_insert_rowid();
    conn.query_row(
        "SELECT * FROM stock_transactions WHERE id = ?1",
        [id],
        StockTransaction::from_row,
    )
}

pub fn list_stock_transactions(
    conn: &Connection,
    product_id: Option<i64>,
    limit: i64,
) -> rusqlite::Result<Vec<StockTransaction>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM stock_transactions
         WHERE (?1 IS NULL OR product_id = ?1)
         ORDER BY id DESC
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![product_id, limit], StockTransaction::from_row)?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub fn insert_order(
    conn: &Connection,
    customer_id: &str,
    shipping_address: Option<&str>,
) -> rusqlite::Result<i64> {
    let ts = now();
    conn.execute(
        "INSERT INTO orders (customer_id, total_cents, status, shipping_address, created_at, updated_at)
         VALUES (?1, 0, 'pending', ?2, ?3, ?3)",
        params![customer_id, shipping_address, ts],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_order_item(
    conn: &Connection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    price_cents: i64,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO order_items (order_id, product_id, quantity, price_cents)
         VALUES (?1, ?2, ?3, ?4)",
        params![order_id, product_id, quantity, price_cents],
    )?;
    Ok(())
}

pub fn set_order_total(conn: &Connection, order_id: i64, total_cents: i64) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE orders SET total_cents = ?2, updated_at = ?3 WHERE id = ?1",
        params![order_id, total_cents, now()],
    )?;
    Ok(())
}

pub fn set_order_status(conn: &Connection, order_id: i64, status: OrderStatus) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![order_id, status.as_str(), now()],
    )?;
    Ok(())
}

pub fn get_order(conn: &Connection, id: i64) -> rusqlite::Result<Option<Order>> {
    conn.query_row("SELECT * FROM orders WHERE id = ?1", [id], Order::from_row)
        .optional()
}

pub fn list_orders(
    conn: &Connection,
    customer_id: Option<&str>,
    status: Option<OrderStatus>,
) -> rusqlite::Result<Vec<Order>> {
    let mut stmt = conn.prepare(
        "SELECT * FROM orders
         WHERE (?1 IS NULL OR customer_id = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map(
        params![customer_id, status.map(|s| s.as_str())],
        Order::from_row,
    )?;
    rows.collect()
}

pub fn order_items(conn: &Connection, order_id: i64) -> rusqlite::Result<Vec<OrderItem>> {
    let mut stmt = conn.prepare("SELECT * FROM order_items WHERE order_id = ?1 ORDER BY id")?;
    let rows = stmt.query_map([order_id], OrderItem::from_row)?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

pub fn insert_contact(
    conn: &Connection,
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO contacts (name, email, subject, message, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, email, subject, message, now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_contacts(conn: &Connection) -> rusqlite::Result<Vec<ContactMessage>> {
    let mut stmt = conn.prepare("SELECT * FROM contacts ORDER BY created_at DESC, id DESC")?;
    let rows = stmt.query_map([], ContactMessage::from_row)?;
    rows.collect()
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Sum of service type prices over completed appointments in `[from, to]`.
pub fn completed_service_revenue(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(st.price_cents), 0)
         FROM appointments a
         JOIN appointment_services aps ON aps.appointment_id = a.id
         JOIN service_types st ON st.id = aps.service_type_id
         WHERE a.status = 'completed' AND a.appointment_date BETWEEN ?1 AND ?2",
        params![format_date(from), format_date(to)],
        |row| row.get(0),
    )
}

pub fn appointment_status_counts_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<Vec<(AppointmentStatus, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM appointments
         WHERE appointment_date BETWEEN ?1 AND ?2
         GROUP BY status ORDER BY status",
    )?;
    let rows = stmt.query_map(params![format_date(from), format_date(to)], |row| {
        let raw: String = row.get(0)?;
        let status = raw.parse::<AppointmentStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
        })?;
        Ok((status, row.get(1)?))
    })?;
    rows.collect()
}

pub fn paid_appointments_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE payment_status = 1 AND appointment_date BETWEEN ?1 AND ?2",
        params![format_date(from), format_date(to)],
        |row| row.get(0),
    )
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PopularService {
    pub service_id: i64,
    pub name: String,
    pub bookings: i64,
}

pub fn popular_services_between(
    conn: &Connection,
    from: NaiveDate,
    to: NaiveDate,
    limit: i64,
) -> rusqlite::Result<Vec<PopularService>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.name, COUNT(*) AS bookings
         FROM appointments a
         JOIN appointment_services aps ON aps.appointment_id = a.id
         JOIN service_types st ON st.id = aps.service_type_id
         JOIN services s ON s.id = st.service_id
         WHERE a.status != 'cancelled' AND a.appointment_date BETWEEN ?1 AND ?2
         GROUP BY s.id, s.name
         ORDER BY bookings DESC, s.name
         LIMIT ?3",
    )?;
    let rows = stmt.query_map(params![format_date(from), format_date(to), limit], |row| {
        Ok(PopularService {
            service_id: row.get(0)?,
            name: row.get(1)?,
            bookings: row.get(2)?,
        })
    })?;
    rows.collect()
}

/// Revenue of delivered orders created in the given `YYYY-MM` month.
pub fn delivered_order_revenue(conn: &Connection, month: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(SUM(total_cents), 0) FROM orders
         WHERE status = 'delivered' AND substr(created_at, 1, 7) = ?1",
        [month],
        |row| row.get(0),
    )
}
