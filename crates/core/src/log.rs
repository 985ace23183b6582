// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action audit-log entries
//!
//! One entry per action performed against a resource. Created IN_PROGRESS
//! when the action starts and finalized by the completion path, or by the
//! self-heal timeout sweep when the completion never arrives. `contents`
//! is a structured document; failures embed the typed backend cause so the
//! record stays machine-parseable.

use crate::backend::{BackendError, BackendErrorKind, BackendResult};
use crate::clock::Clock;
use crate::heal::TIMED_OUT_ERROR;
use crate::resource::ResourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Outcome recorded on an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionOutcome {
    InProgress,
    Succeeded,
    Failed,
    TimedOut,
}

/// One audit record of an action performed against a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub id: String,
    pub resource_ref: ResourceId,
    pub action: String,
    pub status: ActionOutcome,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub contents: serde_json::Value,
}

impl ActionLogEntry {
    /// Open an entry at action start
    pub fn begin(resource_ref: ResourceId, action: impl Into<String>, clock: &impl Clock) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            resource_ref,
            action: action.into(),
            status: ActionOutcome::InProgress,
            start_date: clock.now_utc(),
            end_date: None,
            contents: json!({}),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == ActionOutcome::InProgress
    }

    /// Finalize from the backend operation's result
    pub fn finish(&mut self, result: &BackendResult, clock: &impl Clock) {
        match result {
            Ok(report) => {
                self.status = ActionOutcome::Succeeded;
                self.contents = json!({
                    "backend_status": report.backend_status,
                    "detail": report.detail,
                });
            }
            Err(error) => {
                self.status = ActionOutcome::Failed;
                self.contents = json!({
                    "error": error,
                    "status": "FAILED",
                });
            }
        }
        self.end_date = Some(clock.now_utc());
    }

    /// Finalize a dangling entry found by the timeout sweep
    pub fn finish_timed_out(&mut self, clock: &impl Clock) {
        self.status = ActionOutcome::TimedOut;
        self.contents = json!({
            "error": BackendError::new(BackendErrorKind::TimedOut, TIMED_OUT_ERROR),
            "status": "TIMED_OUT",
        });
        self.end_date = Some(clock.now_utc());
    }
}
