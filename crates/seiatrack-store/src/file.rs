//! File-backed aggregate store: one JSON document per process.
//!
//! The whole aggregate (process + rounds + observations + adendas +
//! responses) is written in one atomic tempfile-and-rename step, together
//! with a monotonically increasing revision. Saves carry the revision the
//! caller last read; a mismatch fails without writing, which is the
//! optimistic-concurrency check the tracker's single-writer-per-process
//! model rests on.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use seiatrack_core::Process;
use tracing::debug;

use crate::StoreError;

/// A persisted process aggregate with its revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProcess {
    pub revision: u64,
    pub process: Process,
}

/// Directory of process aggregates, one `<project_id>.json` each.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open or create the store directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("{project_id}.json"))
    }

    /// Persist a brand-new aggregate at revision 1.
    pub fn create(&self, process: &Process) -> Result<StoredProcess, StoreError> {
        let path = self.path_for(&process.project_id);
        if path.exists() {
            return Err(StoreError::AlreadyExists(process.project_id.clone()));
        }
        let stored = StoredProcess {
            revision: 1,
            process: process.clone(),
        };
        self.write_atomic(&path, &stored)?;
        debug!(project = %process.project_id, "process aggregate created");
        Ok(stored)
    }

    pub fn load(&self, project_id: &str) -> Result<StoredProcess, StoreError> {
        let path = self.path_for(project_id);
        if !path.exists() {
            return Err(StoreError::NotFound(project_id.to_string()));
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Save an aggregate the caller mutated after reading
    /// `expected_revision`. Fails without writing when someone else has
    /// written in between.
    pub fn save(
        &self,
        expected_revision: u64,
        process: &Process,
    ) -> Result<StoredProcess, StoreError> {
        let current = self.load(&process.project_id)?;
        if current.revision != expected_revision {
            return Err(StoreError::StaleRevision {
                expected: expected_revision,
                found: current.revision,
            });
        }
        let stored = StoredProcess {
            revision: expected_revision + 1,
            process: process.clone(),
        };
        self.write_atomic(&self.path_for(&process.project_id), &stored)?;
        debug!(
            project = %process.project_id,
            revision = stored.revision,
            "process aggregate saved"
        );
        Ok(stored)
    }

    /// Project ids of every stored aggregate, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = name.strip_suffix(".json") {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn write_atomic(&self, path: &Path, stored: &StoredProcess) -> Result<(), StoreError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(serde_json::to_string_pretty(stored)?.as_bytes())?;
        tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }
}
