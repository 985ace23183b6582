// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! capstan-storage: Durable stores for the orchestration core
//!
//! All stores are JSON rows on the filesystem under one data directory.
//! Cloning a store is cheap and yields an independent handle, which is how
//! completion callbacks running on other execution contexts get fresh
//! access to the same data. The advisory lock store's mutual exclusion
//! rests on the atomicity of `O_CREAT|O_EXCL`, so it holds across every
//! process sharing the data directory.

pub mod action_log;
pub mod lock;
pub mod resource;

use std::io;
use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("not found: {kind}/{id}")]
    NotFound { kind: String, id: String },
}

pub use action_log::ActionLogStore;
pub use lock::{LockError, LockGuard, LockRow, LockStore};
pub use resource::ResourceStore;
