//! Small parsing and validation helpers shared by services and handlers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer};

use crate::errors::{AppError, AppResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Default page size for admin list views.
pub const PAGE_SIZE: i64 = 10;

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| AppError::validation(format!("Invalid date '{}', expected YYYY-MM-DD.", value)))
}

/// Parses `HH:MM` or `HH:MM:SS`; seconds are dropped.
pub fn parse_time(value: &str) -> AppResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map(truncate_to_minute)
        .map_err(|_| AppError::validation(format!("Invalid time '{}', expected HH:MM.", value)))
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    use chrono::Timelike;
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Serde helper for optional `HH:MM` fields in request bodies.
pub fn deserialize_opt_time<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
    Option::<String>::deserialize(d)?
        .map(|raw| parse_time(&raw))
        .transpose()
        .map_err(serde::de::Error::custom)
}

pub fn deserialize_opt_date<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
    Option::<String>::deserialize(d)?
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_date(&raw))
        .transpose()
        .map_err(serde::de::Error::custom)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}

/// Current wall-clock time in the salon's timezone.
pub fn local_now(tz: Tz) -> NaiveDateTime {
    Utc::now().with_timezone(&tz).naive_local()
}

/// A phone number is valid when it is exactly ten ASCII digits.
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Splits "Jane Mary Doe" into ("Jane", "Mary Doe").
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl PageParams {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * PAGE_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_accepts_seconds() {
        assert_eq!(parse_time("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(parse_time("09:30:45").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(parse_time("9.30").is_err());
        assert!(parse_time("25:00").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert!(parse_date("01/03/2026").is_err());
    }

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("9812345678"));
        assert!(!is_valid_phone("981234567"));
        assert!(!is_valid_phone("98123456789"));
        assert!(!is_valid_phone("98123-5678"));
        assert!(!is_valid_phone(""));
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("jane@example.com"));
        assert!(!is_valid_email("jane@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jane doe@example.com"));
    }

    #[test]
    fn test_split_full_name() {
        assert_eq!(split_full_name("Jane Mary Doe"), ("Jane".into(), "Mary Doe".into()));
        assert_eq!(split_full_name("  Jane  "), ("Jane".into(), String::new()));
        assert_eq!(split_full_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(PageParams { page: 1 }.offset(), 0);
        assert_eq!(PageParams { page: 3 }.offset(), 20);
        assert_eq!(PageParams { page: 0 }.offset(), 0);
    }
}
