//! Per-domain activity log.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error_handling::LedgerError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Timestamped messages produced while processing one domain.
#[derive(Debug, Clone)]
pub struct LogEntry {
    domain: String,
    messages: Vec<(DateTime<Local>, String)>,
}

impl LogEntry {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            messages: Vec::new(),
        }
    }

    /// Appends a message stamped with the current local time.
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push((Local::now(), message.into()));
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(|(_, message)| message.as_str())
    }

    /// The block written to the activity log:
    ///
    /// ```text
    /// Processing example.com
    /// [2024-05-01 12:00:00] Fetching certificate
    /// [2024-05-01 12:00:01] Certificate stored
    ///
    /// ```
    pub fn render(&self) -> String {
        let mut block = format!("Processing {}\n", self.domain);
        for (at, message) in &self.messages {
            block.push_str(&format!("[{}] {}\n", at.format(TIMESTAMP_FORMAT), message));
        }
        block.push('\n');
        block
    }
}

/// Append-only activity log shared by all workers.
///
/// Each entry is written and flushed while holding the lock, so blocks from
/// different domains never interleave.
pub struct ActivityLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ActivityLog {
    /// Opens `path` for appending, creating it if needed.
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| LedgerError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub async fn append(&self, entry: &LogEntry) -> Result<(), LedgerError> {
        let block = entry.render();
        let mut file = self.file.lock().await;
        file.write_all(block.as_bytes())
            .await
            .map_err(|source| self.write_error(source))?;
        file.flush().await.map_err(|source| self.write_error(source))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Write {
            path: self.path.display().to_string(),
            source,
        }
    }
}
