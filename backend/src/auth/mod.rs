//! Authentication module for managing user accounts, sessions, and access control.
//!
//! This module provides the public interface for user authentication-related functionalities
//! such as login, registration, token management, and authorization extractors.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;

// Re-exports for convenience
pub use errors::AuthError;
pub use middleware::{AdminUser, AuthUser, CustomerUser, PanelUser};
pub use models::{Claims, TokenPair, TokenType};
pub use routes::auth_routes;
pub use service::{hash_password, verify_password, TokenService};
