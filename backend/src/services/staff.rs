//! Staff profiles and their availability slots.

use chrono::{Duration, NaiveDate, NaiveTime};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::{debug, info};

use crate::database::models::{AvailableSlot, Role, Staff, User};
use crate::database::queries;
use crate::errors::{AppError, AppResult};

/// Keeps the staff profile in step with the user's role. Runs on every user
/// save.
///
/// A staff user always ends up with an active profile. For any other role an
/// existing profile is disabled if appointments reference it, otherwise
/// deleted.
pub fn sync_staff_profile(conn: &Connection, user: &User) -> AppResult<()> {
    let existing = queries::get_staff_by_user(conn, &user.id)?;

    if user.role == Role::Staff {
        match existing {
            None => {
                let staff = queries::insert_staff(conn, &user.id)?;
                info!("Created staff profile {} for {}", staff.id, user.email);
            }
            Some(staff) if !staff.is_active => {
                queries::set_staff_flags(conn, staff.id, true, true)?;
                info!("Reactivated staff profile {} for {}", staff.id, user.email);
            }
            Some(_) => {}
        }
        return Ok(());
    }

    let Some(staff) = existing else {
        return Ok(());
    };
    if queries::staff_has_appointments(conn, staff.id)? {
        queries::set_staff_flags(conn, staff.id, false, false)?;
        info!("Disabled staff profile {} ({} is now {})", staff.id, user.email, user.role);
    } else {
        queries::delete_staff(conn, staff.id)?;
        info!("Removed staff profile {} ({} is now {})", staff.id, user.email, user.role);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffUpdate {
    pub specialization: Option<String>,
    pub experience_years: Option<i64>,
    pub is_available: Option<bool>,
    #[serde(default, deserialize_with = "crate::utils::deserialize_opt_time")]
    pub working_hours_start: Option<NaiveTime>,
    #[serde(default, deserialize_with = "crate::utils::deserialize_opt_time")]
    pub working_hours_end: Option<NaiveTime>,
}

pub fn update_staff_profile(conn: &Connection, staff_id: i64, update: &StaffUpdate) -> AppResult<Staff> {
    let mut staff = queries::get_staff(conn, staff_id)?
        .ok_or_else(|| AppError::not_found("Staff member not found."))?;

    if let Some(specialization) = &update.specialization {
        staff.specialization = Some(specialization.trim().to_string()).filter(|s| !s.is_empty());
    }
    if let Some(years) = update.experience_years {
        if years < 0 {
            return Err(AppError::validation("Experience years cannot be negative."));
        }
        staff.experience_years = years;
    }
    if let Some(available) = update.is_available {
        staff.is_available = available;
    }
    if let Some(start) = update.working_hours_start {
        staff.working_hours_start = start;
    }
    if let Some(end) = update.working_hours_end {
        staff.working_hours_end = end;
    }
    if staff.working_hours_start >= staff.working_hours_end {
        return Err(AppError::validation(
            "Working hours must start before they end.",
        ));
    }

    queries::update_staff(conn, &staff)?;
    queries::get_staff(conn, staff_id)?.ok_or_else(|| AppError::not_found("Staff member not found."))
}

/// Creates one-hour slots covering the staff member's working hours on
/// `date`. Existing slots are left alone; only new ones are returned.
pub fn generate_daily_slots(
    conn: &Connection,
    staff_id: i64,
    date: NaiveDate,
) -> AppResult<Vec<AvailableSlot>> {
    let staff = queries::get_staff(conn, staff_id)?
        .ok_or_else(|| AppError::not_found("Staff member not found."))?;
    if !staff.is_active {
        return Err(AppError::validation("Cannot create slots for an inactive staff member."));
    }

    let mut created = Vec::new();
    let mut start = staff.working_hours_start;
    loop {
        let (end, wrapped) = start.overflowing_add_signed(Duration::hours(1));
        if wrapped != 0 || end > staff.working_hours_end {
            break;
        }
        if !queries::slot_exists(conn, staff.id, date, start)? {
            created.push(queries::insert_slot(conn, staff.id, date, start, end)?);
        }
        start = end;
    }
    debug!(
        "Generated {} slots for staff {} on {}",
        created.len(),
        staff.id,
        date
    );
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::queries::{NewAppointment, NewUser};
    use crate::database::Database;
    use crate::utils::{parse_date, parse_time};

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn user(conn: &Connection, role: Role) -> User {
        queries::insert_user(
            conn,
            &NewUser {
                username: "sita".into(),
                email: "sita@example.com".into(),
                first_name: "Sita".into(),
                last_name: String::new(),
                phone: None,
                role,
                is_superuser: false,
                password_hash: "x".into(),
            },
        )
        .unwrap()
    }

    fn change_role(conn: &Connection, user: &User, role: Role) -> User {
        queries::update_user_access(conn, &user.id, role, true).unwrap();
        let user = queries::get_user(conn, &user.id).unwrap().unwrap();
        sync_staff_profile(conn, &user).unwrap();
        user
    }

    #[test]
    fn test_staff_role_creates_and_reactivates_profile() {
        let db = db();
        db.with_conn(|conn| {
            let user = user(conn, Role::Staff);
            sync_staff_profile(conn, &user)?;
            let staff = queries::get_staff_by_user(conn, &user.id)?.unwrap();
            assert!(staff.is_active && staff.is_available);

            queries::set_staff_flags(conn, staff.id, false, false)?;
            sync_staff_profile(conn, &user)?;
            let again = queries::get_staff_by_user(conn, &user.id)?.unwrap();
            assert_eq!(again.id, staff.id);
            assert!(again.is_active && again.is_available);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_role_change_deletes_unused_profile() {
        let db = db();
        db.with_conn(|conn| {
            let user = user(conn, Role::Staff);
            sync_staff_profile(conn, &user)?;
            change_role(conn, &user, Role::Customer);
            assert!(queries::get_staff_by_user(conn, &user.id)?.is_none());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_role_change_soft_disables_profile_with_appointments() {
        let db = db();
        db.with_conn(|conn| {
            let user = user(conn, Role::Staff);
            sync_staff_profile(conn, &user)?;
            let staff = queries::get_staff_by_user(conn, &user.id)?.unwrap();
            let id = queries::insert_appointment(
                conn,
                &NewAppointment {
                    customer_id: None,
                    payment_method_id: None,
                    name: "Jane".into(),
                    email: "jane@example.com".into(),
                    phone: "9812345678".into(),
                    date: parse_date("2026-05-04").unwrap(),
                    time: parse_time("10:00").unwrap(),
                    notes: String::new(),
                },
            )?;
            queries::assign_staff(conn, id, staff.id)?;

            let user = change_role(conn, &user, Role::Admin);
            let disabled = queries::get_staff_by_user(conn, &user.id)?.unwrap();
            assert!(!disabled.is_active && !disabled.is_available);

            change_role(conn, &user, Role::Staff);
            assert!(queries::get_staff_by_user(conn, &user.id)?.unwrap().is_active);
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_generate_daily_slots_is_hourly_and_skips_existing() {
        let db = db();
        db.with_conn(|conn| {
            let user = user(conn, Role::Staff);
            sync_staff_profile(conn, &user)?;
            let staff = queries::get_staff_by_user(conn, &user.id)?.unwrap();
            let date = parse_date("2026-05-04").unwrap();

            let slots = generate_daily_slots(conn, staff.id, date)?;
            assert_eq!(slots.len(), 9);
            assert_eq!(slots[0].start_time, parse_time("09:00").unwrap());
            assert_eq!(slots[8].end_time, parse_time("18:00").unwrap());

            assert!(generate_daily_slots(conn, staff.id, date)?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_update_profile_rejects_inverted_hours() {
        let db = db();
        db.with_conn(|conn| {
            let user = user(conn, Role::Staff);
            sync_staff_profile(conn, &user)?;
            let staff = queries::get_staff_by_user(conn, &user.id)?.unwrap();
            let update = StaffUpdate {
                working_hours_start: Some(parse_time("17:00").unwrap()),
                working_hours_end: Some(parse_time("10:00").unwrap()),
                ..Default::default()
            };
            assert!(matches!(
                update_staff_profile(conn, staff.id, &update),
                Err(AppError::Validation(_))
            ));

            let update = StaffUpdate {
                specialization: Some("Hair".into()),
                experience_years: Some(4),
                ..Default::default()
            };
            let updated = update_staff_profile(conn, staff.id, &update)?;
            assert_eq!(updated.specialization.as_deref(), Some("Hair"));
            assert_eq!(updated.experience_years, 4);
            Ok(())
        })
        .unwrap();
    }
}
