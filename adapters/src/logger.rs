//! Log-only adapter.
//!
//! Writes every message to the application log instead of delivering it.
//! This is the default backend in development.

use async_trait::async_trait;

use crate::{errors::AdapterError, models::EmailMessage, MailAdapter};

#[derive(Debug, Default, Clone)]
pub struct LogAdapter;

impl LogAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailAdapter for LogAdapter {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), AdapterError> {
        message.validate()?;
        log::info!(
            "mail from={} to={} subject={:?}\n{}",
            message.from,
            message.to.join(","),
            message.subject,
            message.body
        );
        Ok(())
    }
}
