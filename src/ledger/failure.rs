//! Ledger of permanently failed domains.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error_handling::LedgerError;

/// Append-only file listing one permanently failed domain per line.
pub struct FailureLedger {
    path: PathBuf,
    file: Mutex<File>,
}

impl FailureLedger {
    /// Reads the domains recorded in `path`. A missing file is an empty ledger.
    pub async fn load(path: &Path) -> Result<HashSet<String>, LedgerError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashSet::new()),
            Err(source) => Err(LedgerError::Open {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Opens `path` for appending, creating it if needed.
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        // A previous run may have died mid-line; don't glue the next domain onto it
        let unterminated = match tokio::fs::read(path).await {
            Ok(bytes) => bytes.last().is_some_and(|b| *b != b'\n'),
            Err(_) => false,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|source| LedgerError::Open {
                path: path.display().to_string(),
                source,
            })?;

        if unterminated {
            file.write_all(b"\n")
                .await
                .map_err(|source| LedgerError::Write {
                    path: path.display().to_string(),
                    source,
                })?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub async fn append(&self, domain: &str) -> Result<(), LedgerError> {
        let line = format!("{domain}\n");
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes())
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
