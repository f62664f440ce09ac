//! Admin panel API.
//!
//! Every handler requires a panel user (admin, staff or superuser); user
//! management additionally requires an administrator.

pub mod appointments;
pub mod catalog;
pub mod inventory;
pub mod orders;
pub mod overview;
pub mod people;
pub mod routes;
pub mod slots;

pub use routes::routes;
