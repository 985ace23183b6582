// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory lock store
//!
//! A cooperative mutex: one JSON row per lock key, created on acquire and
//! deleted on release. Insertion relies on `OpenOptions::create_new`
//! (`O_CREAT|O_EXCL`), whose atomicity makes the lock valid across every
//! process sharing the data directory. A row held longer than its stale
//! timeout is presumed abandoned and reclaimed on the next acquire.
//!
//! Non-fair and non-reentrant: correctness depends on every caller going
//! through `acquire` and holding the returned guard for the duration of
//! its critical section.

use crate::StorageError;
use capstan_core::clock::Clock;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A persisted lock row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRow {
    pub id: String,
    /// Epoch seconds at acquisition
    pub acquired_at: i64,
}

/// Errors from lock acquisition
#[derive(Debug, Error)]
pub enum LockError {
    /// Another holder owns the row; caller-retryable
    #[error("lock busy: {key} (held for {held_for_secs}s)")]
    Busy { key: String, held_for_secs: i64 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Durable advisory lock store
#[derive(Debug, Clone)]
pub struct LockStore {
    dir: PathBuf,
}

impl LockStore {
    /// Open a lock store rooted at the given directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Acquire the lock for `key`
    ///
    /// An existing row older than `stale_timeout` is deleted and the
    /// acquisition proceeds as if it were absent. A concurrent racer
    /// winning the insert is reported as `Busy`, never retried here.
    pub fn acquire(
        &self,
        key: &str,
        stale_timeout: Duration,
        clock: &impl Clock,
    ) -> Result<LockGuard, LockError> {
        match self.try_insert(key, clock) {
            Ok(()) => return Ok(self.guard(key)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(StorageError::Io(e).into()),
        }

        let held_for_secs = match self.read(key)? {
            Some(row) => clock.epoch_secs().saturating_sub(row.acquired_at),
            // Row vanished between insert and read, or was torn; treat as
            // abandoned.
            None => i64::MAX,
        };
        if held_for_secs <= stale_timeout.as_secs() as i64 {
            return Err(LockError::Busy {
                key: key.to_string(),
                held_for_secs,
            });
        }

        // Stale: reclaim and retry the insert exactly once. Losing the
        // re-insert race is Busy like any other contention.
        self.release(key)?;
        match self.try_insert(key, clock) {
            Ok(()) => Ok(self.guard(key)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(LockError::Busy {
                key: key.to_string(),
                held_for_secs: 0,
            }),
            Err(e) => Err(StorageError::Io(e).into()),
        }
    }

    /// Delete the row for `key` if present
    pub fn release(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Read the current row for `key`, if any
    ///
    /// A row that cannot be parsed is reported as absent: a torn write has
    /// no acquisition time and is treated as abandoned.
    pub fn read(&self, key: &str) -> Result<Option<LockRow>, StorageError> {
        let path = self.path_for(key);
        let json = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json).ok())
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.path_for(key).exists()
    }

    fn try_insert(&self, key: &str, clock: &impl Clock) -> io::Result<()> {
        let row = LockRow {
            id: key.to_string(),
            acquired_at: clock.epoch_secs(),
        };
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.path_for(key))?;
        let json = serde_json::to_string(&row).map_err(io::Error::other)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    fn guard(&self, key: &str) -> LockGuard {
        LockGuard {
            store: self.clone(),
            key: key.to_string(),
            released: false,
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

/// Scoped lock ownership with guaranteed release
///
/// Dropping the guard releases the lock on every exit path, including
/// panics; `release` reports the deletion error on the happy path.
#[derive(Debug)]
pub struct LockGuard {
    store: LockStore,
    key: String,
    released: bool,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release explicitly, surfacing any storage error
    pub fn release(mut self) -> Result<(), StorageError> {
        self.released = true;
        self.store.release(&self.key)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.store.release(&self.key);
        }
    }
}

/// Map a lock key to a safe file name
///
/// Keys look like `"action:vm-1"`. Anything outside a conservative
/// character set is replaced, and a checksum of the original key is
/// appended whenever the replacement changed it so distinct keys cannot
/// collide on the same file.
pub fn sanitize_key(key: &str) -> String {
    let cleaned: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    };

    if cleaned == key {
        cleaned
    } else {
        format!("{}-{:08x}", cleaned, crc32fast::hash(key.as_bytes()))
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
