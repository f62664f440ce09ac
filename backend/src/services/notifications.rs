//! Customer-facing appointment emails.
//!
//! Messages are composed from the appointment record and handed to the
//! configured [`MailAdapter`]. Delivery happens after the database work is
//! committed; a failed send never undoes a booking.

use chrono::{NaiveDate, NaiveTime};
use salon_adapters::{EmailMessage, MailAdapter};
use serde::Serialize;
use tracing::{error, info};

use crate::utils::{format_date, format_time};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Confirmed,
    SlotAlreadyBooked,
    NoStaffForTime,
}

impl NotificationKind {
    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::Confirmed => "Appointment Confirmed – Glamour Touch",
            NotificationKind::SlotAlreadyBooked | NotificationKind::NoStaffForTime => {
                "Appointment Not Available – Glamour Touch"
            }
        }
    }
}

/// A pending email about one appointment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentNotice {
    pub kind: NotificationKind,
    pub name: String,
    pub email: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl AppointmentNotice {
    pub fn body(&self) -> String {
        let schedule = format!(
            "📅 Date: {}\n⏰ Time: {}",
            format_date(self.date),
            format_time(self.time)
        );
        match self.kind {
            NotificationKind::Confirmed => format!(
                "Dear {},\n\n\
                 Your appointment has been CONFIRMED successfully.\n\n\
                 {}\n\n\
                 Please arrive at the salon at least 30 minutes before your scheduled time.\n\n\
                 Thank you for choosing Glamour Touch.\n\
                 We look forward to serving you!",
                self.name, schedule
            ),
            NotificationKind::SlotAlreadyBooked => format!(
                "Dear {},\n\n\
                 The appointment slot you selected has already been booked.\n\n\
                 {}\n\n\
                 Please choose another available time slot.\n\n\
                 Thank you for your understanding.\n\
                 Glamour Touch",
                self.name, schedule
            ),
            NotificationKind::NoStaffForTime => format!(
                "Dear {},\n\n\
                 Unfortunately, we do not have staff availability for your selected time.\n\n\
                 {}\n\n\
                 Please book another appointment at a different time.\n\n\
                 Glamour Touch",
                self.name, schedule
            ),
        }
    }

    pub fn to_message(&self, from: &str) -> EmailMessage {
        EmailMessage::new(
            from,
            vec![self.email.clone()],
            self.kind.subject(),
            self.body(),
        )
    }
}

/// Sends the notice; returns whether it was delivered.
pub async fn deliver(mailer: &dyn MailAdapter, from: &str, notice: &AppointmentNotice) -> bool {
    let message = notice.to_message(from);
    match mailer.send(&message).await {
        Ok(()) => {
            info!(
                "Sent '{}' to {} via {}",
                message.subject,
                notice.email,
                mailer.name()
            );
            true
        }
        Err(err) => {
            error!("Failed to send '{}' to {}: {}", message.subject, notice.email, err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salon_adapters::MemoryAdapter;

    fn notice(kind: NotificationKind) -> AppointmentNotice {
        AppointmentNotice {
            kind,
            name: "Jane Doe".into(),
            email: "jane@example.com".into(),
            date: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
            time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_bodies_carry_name_and_schedule() {
        for kind in [
            NotificationKind::Confirmed,
            NotificationKind::SlotAlreadyBooked,
            NotificationKind::NoStaffForTime,
        ] {
            let body = notice(kind).body();
            assert!(body.starts_with("Dear Jane Doe,"));
            assert!(body.contains("Date: 2026-05-04"));
            assert!(body.contains("Time: 10:30"));
        }
        assert!(notice(NotificationKind::SlotAlreadyBooked)
            .body()
            .contains("already been booked"));
        assert!(notice(NotificationKind::NoStaffForTime)
            .body()
            .contains("do not have staff availability"));
    }

    #[test]
    fn test_subjects() {
        assert_eq!(
            NotificationKind::Confirmed.subject(),
            "Appointment Confirmed – Glamour Touch"
        );
        assert_eq!(
            NotificationKind::NoStaffForTime.subject(),
            NotificationKind::SlotAlreadyBooked.subject()
        );
    }

    #[tokio::test]
    async fn test_deliver_reports_failure() {
        let ok = MemoryAdapter::new();
        assert!(deliver(&ok, "salon@example.com", &notice(NotificationKind::Confirmed)).await);
        let sent = ok.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, vec!["jane@example.com".to_string()]);

        let failing = MemoryAdapter::failing();
        assert!(!deliver(&failing, "salon@example.com", &notice(NotificationKind::Confirmed)).await);
    }
}
