//! Generic data models for the `adapters` crate.
//!
//! These models are the transport-independent representation of an outgoing
//! email, shared by every adapter implementation.

use serde::{Deserialize, Serialize};

use crate::errors::AdapterError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(
        from: impl Into<String>,
        to: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to,
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Checks that there is at least one recipient and that every recipient
    /// looks like `local@domain`.
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.to.is_empty() {
            return Err(AdapterError::NoRecipients);
        }
        for recipient in &self.to {
            let trimmed = recipient.trim();
            match trimmed.split_once('@') {
                Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
                _ => return Err(AdapterError::InvalidRecipient(recipient.clone())),
            }
        }
        Ok(())
    }
}
