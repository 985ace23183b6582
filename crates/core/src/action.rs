// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Action registry, timeout policy, and recovery table
//!
//! An action is a named operation against a resource ("create compute",
//! "delete backup file") with a maximum expected duration. The duration
//! bounds how long the resource's advisory lock may legitimately be held
//! and decides when a LOCKED resource must be force-recovered. The registry
//! replaces per-kind string dispatch chains; it is validated at startup so
//! an action can never silently skip timeout protection.

use crate::resource::ResourceStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Conservative bound applied to actions with no registered timeout
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(3600);

/// What an action does to its resource, for recovery purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Brings the resource into existence; a failure is unrecoverable
    Create,
    Update,
    Delete,
    Other,
}

/// Registered behavior of one named action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub kind: ActionKind,
    /// Maximum expected duration
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Status the resource settles into when the action succeeds
    pub on_success: ResourceStatus,
}

impl ActionSpec {
    pub fn new(kind: ActionKind, timeout: Duration, on_success: ResourceStatus) -> Self {
        Self {
            kind,
            timeout,
            on_success,
        }
    }
}

/// Safe statuses a recovered resource settles into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryTargets {
    pub on_error: ResourceStatus,
    pub on_timeout: ResourceStatus,
}

/// Shared recovery table
///
/// A failed or timed-out creation leaves nothing usable behind, so the
/// resource is marked FAILED; any other interrupted action re-enables the
/// resource and lets the operator retry.
pub fn recovery(kind: ActionKind) -> RecoveryTargets {
    match kind {
        ActionKind::Create => RecoveryTargets {
            on_error: ResourceStatus::Failed,
            on_timeout: ResourceStatus::Failed,
        },
        ActionKind::Update | ActionKind::Delete | ActionKind::Other => RecoveryTargets {
            on_error: ResourceStatus::Enabled,
            on_timeout: ResourceStatus::Enabled,
        },
    }
}

/// Registry validation errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("action has an empty name")]
    EmptyName,
    #[error("action {0:?} has a zero timeout")]
    ZeroTimeout(String),
}

/// Maps action names to their registered behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionRegistry {
    actions: HashMap<String, ActionSpec>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action, replacing any previous registration
    pub fn register(mut self, name: impl Into<String>, spec: ActionSpec) -> Self {
        self.actions.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ActionSpec> {
        self.actions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Timeout for an action, falling back to the conservative default
    ///
    /// The fallback covers resource rows written with actions that are no
    /// longer registered; `perform` itself rejects unregistered actions.
    pub fn timeout_for(&self, name: &str) -> Duration {
        self.actions
            .get(name)
            .map(|s| s.timeout)
            .unwrap_or(DEFAULT_ACTION_TIMEOUT)
    }

    /// Recovery targets for an action; unregistered actions recover as Other
    pub fn recovery_for(&self, name: &str) -> RecoveryTargets {
        let kind = self
            .actions
            .get(name)
            .map(|s| s.kind)
            .unwrap_or(ActionKind::Other);
        recovery(kind)
    }

    /// Validate the registry at startup
    pub fn validate(&self) -> Result<(), RegistryError> {
        for (name, spec) in &self.actions {
            if name.trim().is_empty() {
                return Err(RegistryError::EmptyName);
            }
            if spec.timeout.is_zero() {
                return Err(RegistryError::ZeroTimeout(name.clone()));
            }
        }
        Ok(())
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
