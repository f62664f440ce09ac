//! Customer appointment endpoints: the booking form, dashboard, history and
//! self-service cancellation.

pub mod handlers;
pub mod routes;

pub use routes::routes;
