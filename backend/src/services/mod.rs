//! Module for core business logic services.
//!
//! This module encapsulates services that perform specific business operations
//! and orchestrate interactions between different parts of the application,
//! such as reconciling bookings against staff slots or aggregating data for
//! dashboards.

pub mod booking;
pub mod data_aggregator;
pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod staff;
