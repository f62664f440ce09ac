//! In-memory adapter.
//!
//! Keeps every delivered message in a vector. Used by tests to assert on
//! notifications, and optionally configured to fail every delivery.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{errors::AdapterError, models::EmailMessage, MailAdapter};

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter whose every delivery fails after validation.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Snapshot of the messages delivered so far.
    pub fn sent(&self) -> Vec<EmailMessage> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl MailAdapter for MemoryAdapter {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), AdapterError> {
        message.validate()?;
        if self.fail {
            return Err(AdapterError::Delivery("memory adapter configured to fail".into()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| AdapterError::Delivery("mailbox lock poisoned".into()))?;
        sent.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> EmailMessage {
        EmailMessage::new(
            "salon@example.com",
            vec!["jane@example.com".to_string()],
            "Appointment Confirmed",
            "See you soon",
        )
    }

    #[tokio::test]
    async fn test_records_sent_messages() {
        let adapter = MemoryAdapter::new();
        adapter.send(&message()).await.unwrap();
        let sent = adapter.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Appointment Confirmed");

        adapter.clear();
        assert!(adapter.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failing_adapter_records_nothing() {
        let adapter = MemoryAdapter::failing();
        assert!(matches!(
            adapter.send(&message()).await,
            Err(AdapterError::Delivery(_))
        ));
        assert!(adapter.sent().is_empty());
    }
}
