//! Central module for organizing the application's main API endpoints.
//!
//! This module acts as a top-level container for the API domains: the public
//! catalog pages, customer bookings and orders, the signed-in user's profile
//! and the admin panel. Authentication routes live in [`crate::auth`].

pub mod admin;
pub mod booking;
pub mod catalog;
pub mod shop;
pub mod user;
