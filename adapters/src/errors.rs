//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur while validating or delivering
//! a message, providing a unified error type for all mail adapters.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("message has no recipients")]
    NoRecipients,

    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("invalid sender address: {0}")]
    InvalidSender(String),

    #[error("mail backend misconfigured: {0}")]
    Configuration(String),

    #[error("unknown mail backend: {0}")]
    UnknownBackend(String),

    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("outbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),
}
