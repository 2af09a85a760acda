use crate::error::{RelayError, Result};
use crate::relay::ChatMessage;
use crate::store::MessageStore;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only JSON Lines file store
///
/// Each message becomes one line of JSON. Appends are serialized so lines
/// from concurrent writers never interleave.
pub struct JsonlMessageStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlMessageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MessageStore for JsonlMessageStore {
    async fn append(&self, message: &ChatMessage) -> Result<()> {
        let mut line = serde_json::to_vec(message)
            .map_err(|e| RelayError::persistence(format!("Failed to encode message: {}", e)))?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(
            message_id = %message.id,
            room_id = %message.room_id,
            path = %self.path.display(),
            "Message appended"
        );
        Ok(())
    }
}
