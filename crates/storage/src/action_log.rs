// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action audit-log store
//!
//! One JSON document per entry, grouped by resource. Entries are appended
//! at action start and rewritten in place when finalized by the completion
//! path or the self-heal timeout sweep.

use crate::lock::sanitize_key;
use crate::StorageError;
use capstan_core::log::ActionLogEntry;
use capstan_core::resource::ResourceId;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Durable store of action audit entries
#[derive(Debug, Clone)]
pub struct ActionLogStore {
    dir: PathBuf,
}

impl ActionLogStore {
    /// Open a store rooted at the given directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Append a new entry
    pub fn append(&self, entry: &ActionLogEntry) -> Result<(), StorageError> {
        self.save(entry)
    }

    /// Write an entry, replacing any previous version by id
    pub fn save(&self, entry: &ActionLogEntry) -> Result<(), StorageError> {
        let path = self.path_for(&entry.resource_ref, &entry.id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(entry)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load one entry by id
    pub fn load(&self, resource: &ResourceId, id: &str) -> Result<ActionLogEntry, StorageError> {
        let path = self.path_for(resource, id);
        let json = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    kind: "action_log".to_string(),
                    id: id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// All entries for a resource, oldest first
    pub fn list(&self, resource: &ResourceId) -> Result<Vec<ActionLogEntry>, StorageError> {
        let dir = self.dir.join(sanitize_key(resource.as_str()));
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let json = fs::read_to_string(&path)?;
                entries.push(serde_json::from_str::<ActionLogEntry>(&json)?);
            }
        }
        entries.sort_by_key(|e| e.start_date);
        Ok(entries)
    }

    /// Entries still open for a resource, for the timeout sweep
    pub fn in_progress(&self, resource: &ResourceId) -> Result<Vec<ActionLogEntry>, StorageError> {
        Ok(self
            .list(resource)?
            .into_iter()
            .filter(|e| e.is_open())
            .collect())
    }

    fn path_for(&self, resource: &ResourceId, id: &str) -> PathBuf {
        self.dir
            .join(sanitize_key(resource.as_str()))
            .join(format!("{}.json", sanitize_key(id)))
    }
}

#[cfg(test)]
#[path = "action_log_tests.rs"]
mod tests;
