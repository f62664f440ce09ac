//! SMTP adapter.
//!
//! Relays messages through an SMTP server over STARTTLS using `lettre`'s
//! tokio transport. The connection is opened lazily on the first send.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{errors::AdapterError, models::EmailMessage, MailAdapter};

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for [`SmtpAdapter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

pub struct SmtpAdapter {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpAdapter {
    pub fn new(settings: &SmtpSettings) -> Result<Self, AdapterError> {
        if settings.host.trim().is_empty() {
            return Err(AdapterError::Configuration("smtp host is empty".into()));
        }
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(settings.host.trim())
            .map_err(|e| AdapterError::Configuration(e.to_string()))?
            .port(settings.port)
            .timeout(Some(SEND_TIMEOUT));
        match (&settings.username, &settings.password) {
            (Some(username), Some(password)) => {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            (Some(_), None) => {
                return Err(AdapterError::Configuration(
                    "smtp username given without a password".into(),
                ))
            }
            _ => {}
        }
        Ok(Self {
            transport: builder.build(),
            host: settings.host.trim().to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

/// Converts to a plain-text MIME message.
pub fn to_mime(message: &EmailMessage) -> Result<Message, AdapterError> {
    message.validate()?;
    let from: Mailbox = message
        .from
        .parse()
        .map_err(|_| AdapterError::InvalidSender(message.from.clone()))?;
    let mut builder = Message::builder()
        .from(from)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for recipient in &message.to {
        let mailbox: Mailbox = recipient
            .trim()
            .parse()
            .map_err(|_| AdapterError::InvalidRecipient(recipient.clone()))?;
        builder = builder.to(mailbox);
    }
    builder
        .body(message.body.clone())
        .map_err(|e| AdapterError::Delivery(e.to_string()))
}

#[async_trait]
impl MailAdapter for SmtpAdapter {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), AdapterError> {
        let mime = to_mime(message)?;
        self.transport
            .send(mime)
            .await
            .map_err(|e| AdapterError::Delivery(e.to_string()))?;
        log::debug!("relayed mail to {} via {}", message.to.join(","), self.host);
        Ok(())
    }
}
