//! Public site content: services catalogue, business information, contact
//! form and the product listing. No authentication required.

pub mod handlers;
pub mod routes;

pub use routes::routes;
