// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the orchestration engine

use capstan_core::action::RegistryError;
use capstan_storage::StorageError;
use thiserror::Error;

/// Errors surfaced to callers of the orchestrator
#[derive(Debug, Error)]
pub enum EngineError {
    /// Another action is already in flight on this resource; retryable
    #[error("lock busy: {key}")]
    LockBusy { key: String },
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    #[error("invalid action registry: {0}")]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EngineError {
    /// Whether the caller should retry after backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::LockBusy { .. })
    }
}
