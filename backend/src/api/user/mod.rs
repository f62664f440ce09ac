//! Module for user profile API endpoints.
//!
//! This module handles functionalities related to user information that is
//! distinct from the core authentication process, such as reading and
//! editing the signed-in user's own profile.

pub mod handlers;
pub mod routes;

pub use routes::routes;
