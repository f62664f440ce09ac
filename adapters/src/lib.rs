//! Core `adapters` crate for abstracting outgoing mail delivery.
//!
//! This crate defines the `MailAdapter` trait, which outlines the single
//! capability the salon backend needs from a mail transport, and provides
//! concrete implementations (SMTP relay, log, file outbox, in-memory) plus a
//! factory that picks one by name.

pub mod errors;
pub mod file;
pub mod logger;
pub mod memory;
pub mod models;
pub mod smtp;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

pub use errors::AdapterError;
pub use file::FileAdapter;
pub use logger::LogAdapter;
pub use memory::MemoryAdapter;
pub use models::EmailMessage;
pub use smtp::{SmtpAdapter, SmtpSettings};

/// A transport capable of delivering an [`EmailMessage`].
#[async_trait]
pub trait MailAdapter: Send + Sync {
    /// Short identifier used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Deliver a message. Implementations validate recipients first.
    async fn send(&self, message: &EmailMessage) -> Result<(), AdapterError>;
}

/// Build an adapter from its configuration name.
///
/// `outbox_path` is only used by the `file` adapter and `smtp` only by the
/// `smtp` adapter.
pub fn build_adapter(
    kind: &str,
    outbox_path: impl AsRef<Path>,
    smtp: &SmtpSettings,
) -> Result<Arc<dyn MailAdapter>, AdapterError> {
    match kind {
        "smtp" => Ok(Arc::new(SmtpAdapter::new(smtp)?)),
        "log" => Ok(Arc::new(LogAdapter::new())),
        "file" => Ok(Arc::new(FileAdapter::new(outbox_path.as_ref()))),
        "memory" => Ok(Arc::new(MemoryAdapter::new())),
        other => Err(AdapterError::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.gmail.com".into(),
            port: 587,
            username: None,
            password: None,
        }
    }

    #[tokio::test]
    async fn test_build_known_adapters() {
        assert_eq!(build_adapter("log", "unused", &relay()).unwrap().name(), "log");
        assert_eq!(build_adapter("memory", "unused", &relay()).unwrap().name(), "memory");
        assert_eq!(build_adapter("file", "outbox.jsonl", &relay()).unwrap().name(), "file");
        assert_eq!(build_adapter("smtp", "unused", &relay()).unwrap().name(), "smtp");
    }

    #[test]
    fn test_build_unknown_adapter() {
        let err = build_adapter("pigeon", "unused", &relay()).err().unwrap();
        assert!(matches!(err, AdapterError::UnknownBackend(ref k) if k == "pigeon"));
    }

    #[test]
    fn test_build_smtp_without_host() {
        let err = build_adapter("smtp", "unused", &SmtpSettings::default()).err().unwrap();
        assert!(matches!(err, AdapterError::Configuration(_)));
    }
}
