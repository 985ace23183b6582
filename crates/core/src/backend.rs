// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed result of a Backend Operation
//!
//! The orchestration core treats the remote infrastructure call as opaque;
//! all it sees is this result. Failures carry a structured cause so that
//! audit-log contents stay machine-parseable instead of a stringified
//! exception.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification of a backend failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendErrorKind {
    /// The remote system reported an error
    Remote,
    /// The dispatch task was cancelled before the operation completed
    Cancelled,
    /// Detected after the fact by self-heal
    TimedOut,
    /// A local fault (panicked operation, lost worker)
    Internal,
}

impl std::fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BackendErrorKind::Remote => "remote",
            BackendErrorKind::Cancelled => "cancelled",
            BackendErrorKind::TimedOut => "timed_out",
            BackendErrorKind::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

/// A backend failure with a structured cause
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Remote, message)
    }

    pub fn cancelled() -> Self {
        Self::new(BackendErrorKind::Cancelled, "backend operation cancelled")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Internal, message)
    }
}

/// What a successful Backend Operation reports back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReport {
    /// The remote system's reported state, mirrored into the resource row
    pub backend_status: Option<String>,
    /// Free-form diagnostic detail for the audit log
    pub detail: Option<String>,
}

impl BackendReport {
    pub fn with_backend_status(status: impl Into<String>) -> Self {
        Self {
            backend_status: Some(status.into()),
            detail: None,
        }
    }
}

/// Outcome of one Backend Operation
pub type BackendResult = Result<BackendReport, BackendError>;
