//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Each table struct has a `from_row` constructor used by
//! `database::queries`. Dates are stored as `YYYY-MM-DD`, times as `HH:MM`.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Type;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

use crate::utils::{DATE_FORMAT, TIME_FORMAT};

/// Declares a string-backed enum with `as_str`, `FromStr` and `Display`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(Role {
    Admin => "admin",
    Staff => "staff",
    Customer => "customer",
});

string_enum!(AppointmentStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl AppointmentStatus {
    /// Statuses that occupy a time slot.
    pub fn is_open(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

string_enum!(OrderStatus {
    Pending => "pending",
    Confirmed => "confirmed",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

string_enum!(ProductCategory {
    Hair => "hair",
    Skin => "skin",
    Nails => "nails",
    Makeup => "makeup",
});

string_enum!(StockTransactionKind {
    Adjustment => "adjustment",
    Restock => "restock",
    Sale => "sale",
});

/// Serde helpers for `HH:MM` times.
pub mod hm_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&crate::utils::format_time(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        crate::utils::parse_time(&raw).map_err(serde::de::Error::custom)
    }
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn column_index(row: &Row<'_>, column: &str) -> usize {
    row.as_ref().column_index(column).unwrap_or_default()
}

fn enum_col<T: FromStr<Err = String>>(row: &Row<'_>, column: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(column)?;
    raw.parse()
        .map_err(|e| conversion_error(column_index(row, column), e))
}

fn date_col(row: &Row<'_>, column: &str) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(column)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| conversion_error(column_index(row, column), e.to_string()))
}

fn time_col(row: &Row<'_>, column: &str) -> rusqlite::Result<NaiveTime> {
    let raw: String = row.get(column)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|e| conversion_error(column_index(row, column), e.to_string()))
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_superuser: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub last_login: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
            phone: row.get("phone")?,
            role: enum_col(row, "role")?,
            is_active: row.get("is_active")?,
            is_superuser: row.get("is_superuser")?,
            password_hash: row.get("password_hash")?,
            last_login: row.get("last_login")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// "First Last" when either part is set, otherwise the email.
    pub fn display_name(&self) -> String {
        let full = self.full_name();
        if full.is_empty() {
            self.email.clone()
        } else {
            full
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Superusers and every non-customer role may use the admin panel.
    pub fn is_panel_user(&self) -> bool {
        self.is_superuser || self.role != Role::Customer
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Service {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceType {
    pub id: i64,
    pub service_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub duration_minutes: Option<i64>,
    pub is_active: bool,
    pub created_at: String,
}

impl ServiceType {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            service_id: row.get("service_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            price_cents: row.get("price_cents")?,
            duration_minutes: row.get("duration_minutes")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// A service with its bookable types, as shown on the catalogue pages.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceWithTypes {
    #[serde(flatten)]
    pub service: Service,
    pub types: Vec<ServiceType>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Staff {
    pub id: i64,
    pub user_id: String,
    pub specialization: Option<String>,
    pub experience_years: i64,
    pub is_available: bool,
    pub is_active: bool,
    #[serde(with = "hm_time")]
    pub working_hours_start: NaiveTime,
    #[serde(with = "hm_time")]
    pub working_hours_end: NaiveTime,
    pub created_at: String,
    pub updated_at: String,
}

impl Staff {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            specialization: row.get("specialization")?,
            experience_years: row.get("experience_years")?,
            is_available: row.get("is_available")?,
            is_active: row.get("is_active")?,
            working_hours_start: time_col(row, "working_hours_start")?,
            working_hours_end: time_col(row, "working_hours_end")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Staff profile joined with the owning user's name and email.
#[derive(Debug, Clone, Serialize)]
pub struct StaffMember {
    #[serde(flatten)]
    pub staff: Staff,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub is_active: bool,
    pub service_fee_cents: i64,
    pub created_at: String,
}

impl PaymentMethod {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            code: row.get("code")?,
            description: row.get("description")?,
            is_active: row.get("is_active")?,
            service_fee_cents: row.get("service_fee_cents")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub id: i64,
    pub customer_id: Option<String>,
    pub staff_id: Option<i64>,
    pub slot_id: Option<i64>,
    pub payment_method_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub appointment_date: NaiveDate,
    #[serde(with = "hm_time")]
    pub appointment_time: NaiveTime,
    pub payment_status: bool,
    pub status: AppointmentStatus,
    pub notes: String,
    pub cancelled_reason: Option<String>,
    pub cancelled_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Appointment {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            customer_id: row.get("customer_id")?,
            staff_id: row.get("staff_id")?,
            slot_id: row.get("slot_id")?,
            payment_method_id: row.get("payment_method_id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            phone: row.get("phone")?,
            appointment_date: date_col(row, "appointment_date")?,
            appointment_time: time_col(row, "appointment_time")?,
            payment_status: row.get("payment_status")?,
            status: enum_col(row, "status")?,
            notes: row.get("notes")?,
            cancelled_reason: row.get("cancelled_reason")?,
            cancelled_at: row.get("cancelled_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Service type line of an appointment, with its parent service name.
#[derive(Debug, Clone, Serialize)]
pub struct BookedService {
    pub service_type_id: i64,
    pub service_id: i64,
    pub service_name: String,
    pub type_name: String,
    pub price_cents: i64,
    pub duration_minutes: Option<i64>,
}

impl BookedService {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            service_type_id: row.get("service_type_id")?,
            service_id: row.get("service_id")?,
            service_name: row.get("service_name")?,
            type_name: row.get("type_name")?,
            price_cents: row.get("price_cents")?,
            duration_minutes: row.get("duration_minutes")?,
        })
    }

    /// "Service - Type".
    pub fn label(&self) -> String {
        format!("{} - {}", self.service_name, self.type_name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDetail {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub services: Vec<BookedService>,
    pub staff_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlot {
    pub id: i64,
    pub staff_id: Option<i64>,
    pub date: NaiveDate,
    #[serde(with = "hm_time")]
    pub start_time: NaiveTime,
    #[serde(with = "hm_time")]
    pub end_time: NaiveTime,
    pub is_available: bool,
}

impl AvailableSlot {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            staff_id: row.get("staff_id")?,
            date: date_col(row, "date")?,
            start_time: time_col(row, "start_time")?,
            end_time: time_col(row, "end_time")?,
            is_available: row.get("is_available")?,
        })
    }

    /// Whether `[start, end]` lies within this slot.
    pub fn covers(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.start_time <= start && self.end_time >= end
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: i64,
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
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Product {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            sku: row.get("sku")?,
            name: row.get("name")?,
            description: row.get("description")?,
            category: enum_col(row, "category")?,
            brand: row.get("brand")?,
            supplier: row.get("supplier")?,
            price_cents: row.get("price_cents")?,
            quantity: row.get("quantity")?,
            reorder_level: row.get("reorder_level")?,
            image_url: row.get("image_url")?,
            is_active: row.get("is_active")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StockTransaction {
    pub id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub kind: StockTransactionKind,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub difference: i64,
    pub created_at: String,
}

impl StockTransaction {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            product_id: row.get("product_id")?,
            product_name: row.get("product_name")?,
            kind: enum_col(row, "kind")?,
            old_quantity: row.get("old_quantity")?,
            new_quantity: row.get("new_quantity")?,
            difference: row.get("difference")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: Option<String>,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub shipping_address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Order {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            customer_id: row.get("customer_id")?,
            total_cents: row.get("total_cents")?,
            status: enum_col(row, "status")?,
            shipping_address: row.get("shipping_address")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub quantity: i64,
    pub price_cents: i64,
}

impl OrderItem {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            order_id: row.get("order_id")?,
            product_id: row.get("product_id")?,
            quantity: row.get("quantity")?,
            price_cents: row.get("price_cents")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: String,
}

impl ContactMessage {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            subject: row.get("subject")?,
            message: row.get("message")?,
            created_at: row.get("created_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub jti: String,
    pub user_id: String,
    pub expires_at: i64,
    pub revoked: bool,
}

impl RefreshTokenRecord {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            jti: row.get("jti")?,
            user_id: row.get("user_id")?,
            expires_at: row.get("expires_at")?,
            revoked: row.get("revoked")?,
        })
    }
}
