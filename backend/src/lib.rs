//! Glamour Touch salon backend.
//!
//! Booking, staff scheduling, inventory and a small shop behind a JSON API.
//! The binary in `main.rs` wires configuration, the database and the mail
//! adapter together and serves [`server::router`].

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod middleware;
pub mod server;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use database::Database;
pub use errors::{AppError, AppResult};
pub use server::{router, AppState};
