//! File outbox adapter.
//!
//! Appends each message as one JSON line to an outbox file, so another
//! process (or a human) can pick the messages up later.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{errors::AdapterError, models::EmailMessage, MailAdapter};

pub struct FileAdapter {
    path: PathBuf,
    // serializes appends from concurrent requests
    write_lock: Mutex<()>,
}

impl FileAdapter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MailAdapter for FileAdapter {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), AdapterError> {
        message.validate()?;

        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        log::debug!("queued mail to {} in {}", message.to.join(","), self.path.display());
        Ok(())
    }
}
