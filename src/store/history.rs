//! Append-only chat history.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::HistoryError;

/// One prompt/response linkage, recorded after every successful exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub prompt: String,
    pub conversation_id: String,
    pub message_id: String,
    pub space_id: String,
    pub timestamp: DateTime<Utc>,
    pub user: String,
}

/// Append-only history sink. Entries are never updated or deleted; ordering
/// is insertion order.
#[async_trait]
pub trait HistorySink: Send + Sync {
    /// Append one entry.
    async fn record(&self, entry: &HistoryEntry) -> Result<(), HistoryError>;

    /// The most recent `limit` entries, oldest first.
    async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError>;
}

/// File-backed sink writing one JSON object per line.
///
/// Appends are serialized through a mutex so concurrent sessions sharing one
/// sink cannot interleave partial lines.
pub struct JsonlHistory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl HistorySink for JsonlHistory {
    async fn record(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for line in raw.lines().filter(|line| !line.trim().is_empty()) {
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable history line: {e}"),
            }
        }
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }
}

/// In-process sink for ephemeral sessions and tests.
#[derive(Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistorySink for MemoryHistory {
    async fn record(&self, entry: &HistoryEntry) -> Result<(), HistoryError> {
        self.entries.lock().await.push(entry.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let entries = self.entries.lock().await;
        let skip = entries.len().saturating_sub(limit);
        Ok(entries[skip..].to_vec())
    }
}
