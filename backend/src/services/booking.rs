//! Appointment booking and slot reconciliation.
//!
//! A booking is created as `pending` and immediately reconciled against the
//! staff roster, other appointments and the availability slots by
//! [`process_appointment_slot`]. The appointment insert and reconciliation
//! share one transaction, so two concurrent requests cannot both take the
//! same slot. The resulting email is sent only after the commit.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;
use salon_adapters::MailAdapter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::notifications::{deliver, AppointmentNotice, NotificationKind};
use crate::config::{AppConfig, BookingConfig};
use crate::database::models::{
    Appointment, AppointmentDetail, AppointmentStatus, BookedService, ServiceType, User,
};
use crate::database::queries::{self, NewAppointment};
use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::utils::{is_valid_phone, parse_date, parse_time};

pub const REASON_NO_STAFF: &str = "No staff available";
pub const REASON_SLOT_TAKEN: &str = "Time slot already booked";
pub const REASON_NO_STAFF_FOR_TIME: &str = "No staff available for selected time";

pub const MSG_CONFIRMED: &str = "Your appointment has been booked and confirmed! \
     A confirmation email has been sent to you.";
pub const MSG_NOT_AVAILABLE: &str = "The selected time slot is not available. \
     Please check your email and book another appointment.";

/// Result of reconciling one appointment.
#[derive(Debug, Clone, Serialize)]
pub struct SlotOutcome {
    pub confirmed: bool,
    pub reason: Option<String>,
    #[serde(skip)]
    pub notification: Option<AppointmentNotice>,
}

/// Sum of the booked types' durations; `default_minutes` when none is set.
pub fn appointment_duration(services: &[BookedService], default_minutes: i64) -> Duration {
    let total: i64 = services.iter().filter_map(|s| s.duration_minutes).sum();
    if total > 0 {
        Duration::minutes(total)
    } else {
        Duration::minutes(default_minutes)
    }
}

fn notice(appointment: &Appointment, kind: NotificationKind) -> AppointmentNotice {
    AppointmentNotice {
        kind,
        name: appointment.name.clone(),
        email: appointment.email.clone(),
        date: appointment.appointment_date,
        time: appointment.appointment_time,
    }
}

/// Decides whether a freshly created appointment is confirmed or cancelled.
///
/// Must run inside the transaction that created the appointment. The
/// returned notification (if any) is for the caller to send after commit.
pub fn process_appointment_slot(
    conn: &Connection,
    appointment_id: i64,
    duration: Duration,
) -> AppResult<SlotOutcome> {
    let appointment = queries::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppError::not_found("Appointment not found."))?;

    if queries::count_bookable_staff(conn)? == 0 {
        queries::cancel_appointment(conn, appointment.id, REASON_NO_STAFF)?;
        info!("Appointment {} cancelled: {}", appointment.id, REASON_NO_STAFF);
        return Ok(SlotOutcome {
            confirmed: false,
            reason: Some(REASON_NO_STAFF.to_string()),
            notification: None,
        });
    }

    let start = appointment
        .appointment_date
        .and_time(appointment.appointment_time);
    let end = start + duration;

    if queries::has_schedule_conflict(
        conn,
        appointment.appointment_date,
        appointment.appointment_time,
        appointment.id,
    )? {
        queries::cancel_appointment(conn, appointment.id, REASON_SLOT_TAKEN)?;
        info!("Appointment {} cancelled: {}", appointment.id, REASON_SLOT_TAKEN);
        return Ok(SlotOutcome {
            confirmed: false,
            reason: Some(REASON_SLOT_TAKEN.to_string()),
            notification: Some(notice(&appointment, NotificationKind::SlotAlreadyBooked)),
        });
    }

    // Slots are single-day windows.
    let slot = if end.date() == start.date() {
        queries::find_covering_slot(conn, start.date(), start.time(), end.time())?
    } else {
        None
    };

    let Some(slot) = slot else {
        queries::cancel_appointment(conn, appointment.id, REASON_NO_STAFF_FOR_TIME)?;
        info!(
            "Appointment {} cancelled: {}",
            appointment.id, REASON_NO_STAFF_FOR_TIME
        );
        return Ok(SlotOutcome {
            confirmed: false,
            reason: Some(REASON_NO_STAFF_FOR_TIME.to_string()),
            notification: Some(notice(&appointment, NotificationKind::NoStaffForTime)),
        });
    };

    queries::confirm_appointment(conn, appointment.id, slot.staff_id, slot.id)?;
    queries::set_slot_available(conn, slot.id, false)?;
    info!(
        "Appointment {} confirmed in slot {} ({} {}-{})",
        appointment.id, slot.id, slot.date, slot.start_time, slot.end_time
    );
    Ok(SlotOutcome {
        confirmed: true,
        reason: None,
        notification: Some(notice(&appointment, NotificationKind::Confirmed)),
    })
}

/// Loads an appointment with its booked services and staff name.
pub fn appointment_detail(conn: &Connection, id: i64) -> AppResult<AppointmentDetail> {
    let appointment = queries::get_appointment(conn, id)?
        .ok_or_else(|| AppError::not_found("Appointment not found."))?;
    detail_for(conn, appointment)
}

pub fn detail_for(conn: &Connection, appointment: Appointment) -> AppResult<AppointmentDetail> {
    let services = queries::booked_services(conn, appointment.id)?;
    let staff_name = match appointment.staff_id {
        Some(staff_id) => queries::get_staff_member(conn, staff_id)?.map(|m| m.name),
        None => None,
    };
    Ok(AppointmentDetail {
        appointment,
        services,
        staff_name,
    })
}

/// The appointments form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    #[serde(default)]
    pub phone: String,
    /// Chosen type per service: service id -> service type id.
    #[serde(default)]
    pub services: BTreeMap<i64, Option<i64>>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub appointment_time: Option<String>,
    /// Code of an active payment method, e.g. `cash`.
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone)]
struct ValidBooking {
    phone: String,
    service_types: Vec<ServiceType>,
    date: NaiveDate,
    time: NaiveTime,
    payment_method_id: Option<i64>,
}

fn opening_hours_message(config: &BookingConfig) -> String {
    format!(
        "Appointments are available only between {} and {}.",
        config.opening_time.format("%-I:%M %p"),
        config.closing_time.format("%-I:%M %p")
    )
}

fn validate_booking(
    conn: &Connection,
    req: &BookingRequest,
    config: &BookingConfig,
    now: NaiveDateTime,
) -> AppResult<ValidBooking> {
    let phone = req.phone.trim();
    if !is_valid_phone(phone) {
        return Err(AppError::validation("Enter a valid 10-digit phone number."));
    }

    let mut service_types = Vec::new();
    for service in queries::list_services(conn, true)? {
        let Some(type_id) = req.services.get(&service.id).copied().flatten() else {
            continue;
        };
        let service_type = queries::get_service_type(conn, type_id)?
            .filter(|st| st.is_active && st.service_id == service.id)
            .ok_or_else(|| AppError::validation("Invalid service type selection."))?;
        service_types.push(service_type);
    }
    if service_types.is_empty() {
        return Err(AppError::validation("Please select at least one service type."));
    }

    let (Some(date), Some(time)) = (
        req.appointment_date.as_deref().map(str::trim).filter(|s| !s.is_empty()),
        req.appointment_time.as_deref().map(str::trim).filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::validation("Please select appointment date and time."));
    };
    let date = parse_date(date)?;
    let time = parse_time(time)?;

    if time < config.opening_time || time > config.closing_time {
        return Err(AppError::validation(opening_hours_message(config)));
    }

    let requested = date.and_time(time);
    if date < now.date() || (date == now.date() && requested <= now) {
        return Err(AppError::validation("Please select a future time."));
    }
    if date == now.date() && requested < now + Duration::hours(config.same_day_lead_hours) {
        return Err(AppError::validation(format!(
            "Same-day appointments must be booked at least {} hours in advance.",
            config.same_day_lead_hours
        )));
    }

    let payment_method_id = match req
        .payment_method
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(code) => {
            let method = queries::get_payment_method_by_code(conn, code)?
                .filter(|m| m.is_active)
                .ok_or_else(|| AppError::validation("Invalid payment method."))?;
            Some(method.id)
        }
        None => None,
    };

    Ok(ValidBooking {
        phone: phone.to_string(),
        service_types,
        date,
        time,
        payment_method_id,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingResult {
    pub appointment: AppointmentDetail,
    pub confirmed: bool,
    pub reason: Option<String>,
    /// Whether the notification email was handed to the mailer.
    pub notified: bool,
    pub message: String,
}

/// Validates and stores a booking, reconciles it and emails the customer.
pub async fn create_booking(
    db: &Database,
    mailer: &dyn MailAdapter,
    config: &AppConfig,
    customer: &User,
    req: &BookingRequest,
    now: NaiveDateTime,
) -> AppResult<BookingResult> {
    let (detail, outcome) = db.with_tx(|tx| {
        let valid = validate_booking(tx, req, &config.booking, now)?;
        let name = match customer.full_name() {
            full if full.is_empty() => customer.username.clone(),
            full => full,
        };
        let id = queries::insert_appointment(
            tx,
            &NewAppointment {
                customer_id: Some(customer.id.clone()),
                payment_method_id: valid.payment_method_id,
                name,
                email: customer.email.clone(),
                phone: valid.phone,
                date: valid.date,
                time: valid.time,
                notes: req.notes.trim().to_string(),
            },
        )?;
        for service_type in &valid.service_types {
            queries::link_appointment_service(tx, id, service_type.id)?;
        }

        let services = queries::booked_services(tx, id)?;
        let duration = appointment_duration(&services, config.booking.default_duration_minutes);
        debug!("Appointment {} needs {} minutes", id, duration.num_minutes());
        let outcome = process_appointment_slot(tx, id, duration)?;
        Ok((appointment_detail(tx, id)?, outcome))
    })?;

    let notified = match &outcome.notification {
        Some(notice) => deliver(mailer, &config.mail.from, notice).await,
        None => false,
    };

    Ok(BookingResult {
        confirmed: outcome.confirmed,
        reason: outcome.reason,
        notified,
        message: if outcome.confirmed {
            MSG_CONFIRMED.to_string()
        } else {
            MSG_NOT_AVAILABLE.to_string()
        },
        appointment: detail,
    })
}

/// Frees the slot an appointment was holding.
fn release_slot(conn: &Connection, appointment: &Appointment) -> AppResult<()> {
    if let Some(slot_id) = appointment.slot_id {
        queries::set_slot_available(conn, slot_id, true)?;
        queries::clear_appointment_slot(conn, appointment.id)?;
        debug!("Released slot {} from appointment {}", slot_id, appointment.id);
    }
    Ok(())
}

/// A customer cancelling one of their own upcoming appointments.
pub fn cancel_by_customer(
    conn: &Connection,
    customer: &User,
    appointment_id: i64,
    now: NaiveDateTime,
) -> AppResult<Appointment> {
    let appointment = queries::get_appointment(conn, appointment_id)?
        .filter(|a| a.email.eq_ignore_ascii_case(&customer.email))
        .ok_or_else(|| AppError::not_found("Appointment not found."))?;

    if !appointment.status.is_open() {
        return Err(AppError::validation(
            "Only pending or confirmed appointments can be cancelled.",
        ));
    }
    if appointment
        .appointment_date
        .and_time(appointment.appointment_time)
        <= now
    {
        return Err(AppError::validation("Past appointments cannot be cancelled."));
    }

    queries::cancel_appointment(conn, appointment.id, "Cancelled by customer")?;
    release_slot(conn, &appointment)?;
    info!("Appointment {} cancelled by {}", appointment.id, customer.email);
    queries::get_appointment(conn, appointment.id)?
        .ok_or_else(|| AppError::not_found("Appointment not found."))
}

/// Status change from the admin panel. Completed and cancelled appointments
/// are final. Leaving `confirmed` for anything but `completed` frees the slot.
pub fn change_status(
    conn: &Connection,
    appointment_id: i64,
    status: AppointmentStatus,
    reason: Option<&str>,
) -> AppResult<Appointment> {
    let current = queries::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppError::not_found("Appointment not found."))?;

    if current.status != status {
        if !current.status.is_open() {
            return Err(AppError::validation(format!(
                "A {} appointment cannot be changed.",
                current.status
            )));
        }
        match status {
            AppointmentStatus::Cancelled => {
                let reason = reason
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .unwrap_or("Cancelled by salon");
                queries::cancel_appointment(conn, current.id, reason)?;
                release_slot(conn, &current)?;
            }
            AppointmentStatus::Completed if current.status != AppointmentStatus::Confirmed => {
                return Err(AppError::validation(
                    "Only confirmed appointments can be completed.",
                ));
            }
            AppointmentStatus::Completed => {
                queries::set_appointment_status(conn, current.id, status)?;
            }
            _ => {
                queries::set_appointment_status(conn, current.id, status)?;
                release_slot(conn, &current)?;
            }
        }
        info!(
            "Appointment {} status {} -> {}",
            current.id, current.status, status
        );
    }

    queries::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppError::not_found("Appointment not found."))
}

pub fn assign_staff(conn: &Connection, appointment_id: i64, staff_id: i64) -> AppResult<Appointment> {
    queries::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppError::not_found("Appointment not found."))?;
    let staff = queries::get_staff(conn, staff_id)?
        .ok_or_else(|| AppError::not_found("Staff member not found."))?;
    if !staff.is_active {
        return Err(AppError::validation("Selected staff member is not active."));
    }
    queries::assign_staff(conn, appointment_id, staff.id)?;
    queries::get_appointment(conn, appointment_id)?
        .ok_or_else(|| AppError::not_found("Appointment not found."))
}

/// Re-runs reconciliation for a pending appointment and sends the result.
pub async fn reconcile(
    db: &Database,
    mailer: &dyn MailAdapter,
    config: &AppConfig,
    appointment_id: i64,
) -> AppResult<BookingResult> {
    let (detail, outcome) = db.with_tx(|tx| {
        let appointment = queries::get_appointment(tx, appointment_id)?
            .ok_or_else(|| AppError::not_found("Appointment not found."))?;
        if appointment.status != AppointmentStatus::Pending {
            return Err(AppError::validation(
                "Only pending appointments can be reconciled.",
            ));
        }
        let services = queries::booked_services(tx, appointment_id)?;
        let duration = appointment_duration(&services, config.booking.default_duration_minutes);
        let outcome = process_appointment_slot(tx, appointment_id, duration)?;
        Ok((appointment_detail(tx, appointment_id)?, outcome))
    })?;

    let notified = match &outcome.notification {
        Some(notice) => deliver(mailer, &config.mail.from, notice).await,
        None => {
            warn!("Appointment {} reconciled without notification", appointment_id);
            false
        }
    };

    Ok(BookingResult {
        confirmed: outcome.confirmed,
        reason: outcome.reason,
        notified,
        message: if outcome.confirmed {
            MSG_CONFIRMED.to_string()
        } else {
            MSG_NOT_AVAILABLE.to_string()
        },
        appointment: detail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::service::{create_account, hash_password, NewAccount};
    use crate::database::models::Role;
    use crate::database::queries::NewServiceType;
    use salon_adapters::MemoryAdapter;

    struct Fixture {
        db: Database,
        config: AppConfig,
        customer: User,
        staff_id: i64,
        haircut: (i64, i64),
    }

    fn t(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    /// Monday morning, well before opening.
    fn now() -> NaiveDateTime {
        d("2026-05-04").and_time(t("07:00"))
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        let (customer, staff_id, haircut) = db
            .with_tx(|tx| {
                let account = |email: &str, role| NewAccount {
                    email: email.to_string(),
                    password: "pw".into(),
                    first_name: "Jane".into(),
                    last_name: "Doe".into(),
                    phone: None,
                    role,
                    is_superuser: false,
                };
                let hash = hash_password("pw", 1)?;
                let customer = create_account(tx, &account("jane@example.com", Role::Customer), &hash)?;
                let stylist = create_account(tx, &account("sita@example.com", Role::Staff), &hash)?;
                let staff_id = queries::get_staff_by_user(tx, &stylist.id)?.unwrap().id;
                let service_id = queries::insert_service(tx, "Hair", None, true)?;
                let type_id = queries::insert_service_type(
                    tx,
                    &NewServiceType {
                        service_id,
                        name: "Haircut".into(),
                        description: None,
                        price_cents: 1500,
                        duration_minutes: None,
                        is_active: true,
                    },
                )?;
                queries::insert_payment_method(tx, "Cash", "cash", "Pay at the salon", 0)?;
                Ok((customer, staff_id, (service_id, type_id)))
            })
            .unwrap();
        Fixture {
            db,
            config: AppConfig::default(),
            customer,
            staff_id,
            haircut,
        }
    }

    impl Fixture {
        fn slot(&self, date: &str, start: &str, end: &str) -> i64 {
            self.db
                .with_conn(|conn| Ok(queries::insert_slot(conn, self.staff_id, d(date), t(start), t(end))?.id))
                .unwrap()
        }

        fn request(&self, date: &str, time: &str) -> BookingRequest {
            BookingRequest {
                phone: "9812345678".into(),
                services: BTreeMap::from([(self.haircut.0, Some(self.haircut.1))]),
                appointment_date: Some(date.into()),
                appointment_time: Some(time.into()),
                payment_method: None,
                notes: String::new(),
            }
        }

        async fn book(&self, mailer: &MemoryAdapter, req: &BookingRequest) -> AppResult<BookingResult> {
            create_booking(&self.db, mailer, &self.config, &self.customer, req, now()).await
        }
    }

    #[tokio::test]
    async fn test_booking_confirms_and_blocks_slot() {
        let fx = fixture();
        let slot_id = fx.slot("2026-05-05", "09:00", "12:00");
        let mailer = MemoryAdapter::new();

        let result = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        assert!(result.confirmed);
        assert!(result.notified);
        assert_eq!(result.message, MSG_CONFIRMED);
        let appt = &result.appointment.appointment;
        assert_eq!(appt.status, AppointmentStatus::Confirmed);
        assert_eq!(appt.staff_id, Some(fx.staff_id));
        assert_eq!(appt.slot_id, Some(slot_id));
        assert_eq!(appt.name, "Jane Doe");
        assert_eq!(result.appointment.services.len(), 1);

        let slot = fx.db.with_conn(|c| Ok(queries::get_slot(c, slot_id)?)).unwrap().unwrap();
        assert!(!slot.is_available);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Appointment Confirmed – Glamour Touch");
        assert!(sent[0].body.contains("Dear Jane Doe"));
    }

    #[tokio::test]
    async fn test_same_time_twice_is_a_conflict() {
        let fx = fixture();
        fx.slot("2026-05-05", "09:00", "12:00");
        fx.slot("2026-05-05", "09:00", "12:00");
        let mailer = MemoryAdapter::new();
        let req = fx.request("2026-05-05", "10:00");

        assert!(fx.book(&mailer, &req).await.unwrap().confirmed);
        let second = fx.book(&mailer, &req).await.unwrap();
        assert!(!second.confirmed);
        assert_eq!(second.reason.as_deref(), Some(REASON_SLOT_TAKEN));
        assert_eq!(second.message, MSG_NOT_AVAILABLE);
        assert_eq!(second.appointment.appointment.status, AppointmentStatus::Cancelled);
        assert!(second.appointment.appointment.cancelled_at.is_some());

        let sent = mailer.sent();
        assert_eq!(sent[1].subject, "Appointment Not Available – Glamour Touch");
        assert!(sent[1].body.contains("already been booked"));
    }

    #[tokio::test]
    async fn test_no_covering_slot_cancels() {
        let fx = fixture();
        fx.slot("2026-05-05", "09:00", "10:30");
        let mailer = MemoryAdapter::new();

        let result = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        assert!(!result.confirmed);
        assert_eq!(result.reason.as_deref(), Some(REASON_NO_STAFF_FOR_TIME));
        assert!(mailer.sent()[0].body.contains("do not have staff availability"));
    }

    #[tokio::test]
    async fn test_no_bookable_staff_cancels_silently() {
        let fx = fixture();
        fx.slot("2026-05-05", "09:00", "12:00");
        fx.db
            .with_conn(|c| Ok(queries::set_staff_flags(c, fx.staff_id, true, false)?))
            .unwrap();
        let mailer = MemoryAdapter::new();

        let result = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        assert!(!result.confirmed);
        assert_eq!(result.reason.as_deref(), Some(REASON_NO_STAFF));
        assert!(!result.notified);
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_mail_failure_keeps_booking() {
        let fx = fixture();
        fx.slot("2026-05-05", "09:00", "12:00");
        let mailer = MemoryAdapter::failing();

        let result = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        assert!(result.confirmed);
        assert!(!result.notified);
    }

    #[tokio::test]
    async fn test_service_durations_extend_the_window() {
        let fx = fixture();
        fx.slot("2026-05-05", "09:00", "11:00");
        fx.db
            .with_conn(|c| {
                let mut st = queries::get_service_type(c, fx.haircut.1)?.unwrap();
                st.duration_minutes = Some(90);
                Ok(queries::update_service_type(c, &st)?)
            })
            .unwrap();
        let mailer = MemoryAdapter::new();

        let late = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        assert_eq!(late.reason.as_deref(), Some(REASON_NO_STAFF_FOR_TIME));
        let early = fx.book(&mailer, &fx.request("2026-05-05", "09:30")).await.unwrap();
        assert!(early.confirmed);
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let fx = fixture();
        let mailer = MemoryAdapter::new();
        let message = |r: AppResult<BookingResult>| match r {
            Err(AppError::Validation(m)) => m,
            other => panic!("expected validation error, got {:?}", other.map(|r| r.confirmed)),
        };

        let mut req = fx.request("2026-05-05", "10:00");
        req.phone = "12345".into();
        assert_eq!(message(fx.book(&mailer, &req).await), "Enter a valid 10-digit phone number.");

        let mut req = fx.request("2026-05-05", "10:00");
        req.services.clear();
        assert_eq!(message(fx.book(&mailer, &req).await), "Please select at least one service type.");

        let mut req = fx.request("2026-05-05", "10:00");
        req.services.insert(fx.haircut.0, Some(9999));
        assert_eq!(message(fx.book(&mailer, &req).await), "Invalid service type selection.");

        let mut req = fx.request("2026-05-05", "10:00");
        req.appointment_time = None;
        assert_eq!(message(fx.book(&mailer, &req).await), "Please select appointment date and time.");

        let req = fx.request("2026-05-05", "18:30");
        assert_eq!(
            message(fx.book(&mailer, &req).await),
            "Appointments are available only between 9:00 AM and 6:00 PM."
        );

        let req = fx.request("2026-05-03", "10:00");
        assert_eq!(message(fx.book(&mailer, &req).await), "Please select a future time.");

        let mut req = fx.request("2026-05-05", "10:00");
        req.payment_method = Some("bitcoin".into());
        assert_eq!(message(fx.book(&mailer, &req).await), "Invalid payment method.");

        let none_saved = fx
            .db
            .with_conn(|c| Ok(queries::count_appointments(c, None)?))
            .unwrap();
        assert_eq!(none_saved, 0);
    }

    #[tokio::test]
    async fn test_same_day_lead_time() {
        let fx = fixture();
        fx.slot("2026-05-04", "09:00", "18:00");
        let mailer = MemoryAdapter::new();
        let at_noon = d("2026-05-04").and_time(t("12:00"));
        let book = |time: &str| {
            let req = fx.request("2026-05-04", time);
            let fx = &fx;
            let mailer = &mailer;
            async move {
                create_booking(&fx.db, mailer, &fx.config, &fx.customer, &req, at_noon).await
            }
        };

        assert!(matches!(book("11:00").await, Err(AppError::Validation(m)) if m == "Please select a future time."));
        assert!(matches!(
            book("13:30").await,
            Err(AppError::Validation(m)) if m == "Same-day appointments must be booked at least 2 hours in advance."
        ));
        assert!(book("14:00").await.unwrap().confirmed);
    }

    #[tokio::test]
    async fn test_customer_cancel_releases_slot() {
        let fx = fixture();
        let slot_id = fx.slot("2026-05-05", "09:00", "12:00");
        let mailer = MemoryAdapter::new();
        let booked = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        let id = booked.appointment.appointment.id;

        let cancelled = fx
            .db
            .with_tx(|tx| cancel_by_customer(tx, &fx.customer, id, now()))
            .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.slot_id, None);
        let slot = fx.db.with_conn(|c| Ok(queries::get_slot(c, slot_id)?)).unwrap().unwrap();
        assert!(slot.is_available);

        assert!(matches!(
            fx.db.with_tx(|tx| cancel_by_customer(tx, &fx.customer, id, now())),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_admin_status_rules() {
        let fx = fixture();
        fx.slot("2026-05-05", "09:00", "12:00");
        let mailer = MemoryAdapter::new();
        let id = fx
            .book(&mailer, &fx.request("2026-05-05", "10:00"))
            .await
            .unwrap()
            .appointment
            .appointment
            .id;

        let done = fx
            .db
            .with_tx(|tx| change_status(tx, id, AppointmentStatus::Completed, None))
            .unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert!(matches!(
            fx.db.with_tx(|tx| change_status(tx, id, AppointmentStatus::Pending, None)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            fx.db.with_tx(|tx| change_status(tx, id, AppointmentStatus::Cancelled, None)),
            Err(AppError::Validation(_))
        ));
        let after = fx.db.with_conn(|c| Ok(queries::get_appointment(c, id)?)).unwrap().unwrap();
        assert_eq!(after.status, AppointmentStatus::Completed);
        assert!(after.cancelled_reason.is_none());
    }

    #[tokio::test]
    async fn test_back_to_pending_frees_the_slot() {
        let fx = fixture();
        let slot_id = fx.slot("2026-05-05", "09:00", "12:00");
        let mailer = MemoryAdapter::new();
        let booked = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        assert!(booked.confirmed);
        let id = booked.appointment.appointment.id;

        let pending = fx
            .db
            .with_tx(|tx| change_status(tx, id, AppointmentStatus::Pending, None))
            .unwrap();
        assert_eq!(pending.status, AppointmentStatus::Pending);
        assert_eq!(pending.slot_id, None);
        let slot = fx.db.with_conn(|c| Ok(queries::get_slot(c, slot_id)?)).unwrap().unwrap();
        assert!(slot.is_available);

        // Reconciling claims it again.
        let result = reconcile(&fx.db, &mailer, &fx.config, id).await.unwrap();
        assert!(result.confirmed);
    }

    #[tokio::test]
    async fn test_reconcile_requires_pending() {
        let fx = fixture();
        let mailer = MemoryAdapter::new();
        let result = fx.book(&mailer, &fx.request("2026-05-05", "10:00")).await.unwrap();
        let id = result.appointment.appointment.id;
        assert!(matches!(
            reconcile(&fx.db, &mailer, &fx.config, id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_duration_falls_back_to_default() {
        let line = |minutes| BookedService {
            service_type_id: 1,
            service_id: 1,
            service_name: "Hair".into(),
            type_name: "Cut".into(),
            price_cents: 0,
            duration_minutes: minutes,
        };
        assert_eq!(appointment_duration(&[], 60), Duration::minutes(60));
        assert_eq!(appointment_duration(&[line(None)], 60), Duration::minutes(60));
        assert_eq!(
            appointment_duration(&[line(Some(30)), line(None), line(Some(45))], 60),
            Duration::minutes(75)
        );
    }

    #[test]
    fn test_window_crossing_midnight_never_matches() {
        let fx = fixture();
        fx.slot("2026-05-05", "00:00", "23:59");
        fx.db
            .with_tx(|tx| {
                let id = queries::insert_appointment(
                    tx,
                    &NewAppointment {
                        customer_id: None,
                        payment_method_id: None,
                        name: "Late".into(),
                        email: "late@example.com".into(),
                        phone: "9812345678".into(),
                        date: d("2026-05-05"),
                        time: t("23:30"),
                        notes: String::new(),
                    },
                )?;
                let outcome = process_appointment_slot(tx, id, Duration::minutes(60))?;
                assert!(!outcome.confirmed);
                assert_eq!(outcome.reason.as_deref(), Some(REASON_NO_STAFF_FOR_TIME));
                Ok(())
            })
            .unwrap();
    }
}
