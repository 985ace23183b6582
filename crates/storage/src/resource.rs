// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed-resource row store
//!
//! One JSON document per resource. Writes go through a temp file and a
//! rename so each state transition lands as a single atomic row update.

use crate::lock::sanitize_key;
use crate::StorageError;
use capstan_core::resource::{ManagedResource, ResourceId};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Durable store of managed-resource rows
#[derive(Debug, Clone)]
pub struct ResourceStore {
    dir: PathBuf,
}

impl ResourceStore {
    /// Open a store rooted at the given directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persist a resource row atomically
    pub fn save(&self, resource: &ManagedResource) -> Result<(), StorageError> {
        let path = self.path_for(&resource.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(resource)?;
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load a resource row
    pub fn load(&self, id: &ResourceId) -> Result<ManagedResource, StorageError> {
        let path = self.path_for(id);
        let json = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    kind: "resource".to_string(),
                    id: id.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }

    /// Remove a resource row
    pub fn delete(&self, id: &ResourceId) -> Result<(), StorageError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn exists(&self, id: &ResourceId) -> bool {
        self.path_for(id).exists()
    }

    /// List all stored resource IDs
    pub fn list(&self) -> Result<Vec<ResourceId>, StorageError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                let json = fs::read_to_string(&path)?;
                let resource: ManagedResource = serde_json::from_str(&json)?;
                ids.push(resource.id);
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    fn path_for(&self, id: &ResourceId) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(id.as_str())))
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
