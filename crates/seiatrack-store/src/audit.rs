//! Append-only JSONL audit log of process state transitions.
//!
//! One line per transition, never edited or deleted. The log is shared by
//! every process the tracker touches; readers filter by process id.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use seiatrack_core::AuditEntry;
use tracing::debug;

use crate::StoreError;

pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Open or create the log file at the given path.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let line = serde_json::to_string(entry)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")?;
        debug!(process = %entry.process_id, from = %entry.from, to = %entry.to, "audit entry appended");
        Ok(())
    }

    /// Every entry in append order. An absent file reads as empty.
    pub fn read_all(&self) -> Result<Vec<AuditEntry>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(line)?);
        }
        Ok(entries)
    }

    /// Entries for one process, in append order.
    pub fn read_for(&self, process_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|e| e.process_id == process_id)
            .collect())
    }
}
