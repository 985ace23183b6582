// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed-resource status state machine
//!
//! A managed resource is a long-lived backend entity (compute instance,
//! network, load balancer, database cluster) whose row carries its status
//! and the metadata of the last action performed against it. The
//! `enter_busy`/`exit`/`admin_override` transitions are the only writers of
//! `status` and `action_state`; serialization of concurrent `enter_busy`
//! calls depends on the caller holding the resource's advisory lock first.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a managed resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Kind of backend infrastructure the resource represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Compute,
    Network,
    LoadBalancer,
    Database,
    SecurityGroup,
}

/// Resource status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Idle and usable
    Enabled,
    /// An action is in flight
    Locked,
    /// Terminal - an action (usually initial creation) failed unrecoverably
    Failed,
    /// Administratively suspended
    Disabled,
    /// Soft- or hard-removed
    Deleted,
}

/// Metadata of the last action performed against a resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    pub last_action: Option<String>,
    /// Epoch seconds when the last action started
    pub last_action_time: Option<i64>,
    pub last_error: Option<String>,
    /// Incremented by every `enter_busy`; a completion callback must present
    /// the stamp it captured at dispatch or its result is dropped
    pub generation: u64,
}

/// A managed backend resource row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedResource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub status: ResourceStatus,
    /// Free-text mirror of the remote system's reported state
    pub backend_status: Option<String>,
    pub action_state: ActionState,
}

impl ManagedResource {
    /// Create a new resource in the idle state
    pub fn new(id: impl Into<ResourceId>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            status: ResourceStatus::Enabled,
            backend_status: None,
            action_state: ActionState::default(),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.status == ResourceStatus::Locked
    }

    /// Mark the resource busy with an action in flight
    ///
    /// Allowed from any state. Records the action name and start time,
    /// clears any previous error, and returns the new generation stamp.
    /// The persisted write of this transition, not advisory-lock
    /// acquisition, is what other readers observe as "busy".
    pub fn enter_busy(
        &mut self,
        action: &str,
        backend_status: Option<&str>,
        clock: &impl Clock,
    ) -> u64 {
        self.action_state.last_action = Some(action.to_string());
        self.action_state.last_action_time = Some(clock.epoch_secs());
        self.action_state.last_error = None;
        self.action_state.generation += 1;
        if let Some(bs) = backend_status {
            self.backend_status = Some(bs.to_string());
        }
        self.status = ResourceStatus::Locked;
        self.action_state.generation
    }

    /// Leave the busy state once the action's outcome is known
    ///
    /// Applies only while the persisted status is still `Locked` and the
    /// generation matches the stamp captured at dispatch; otherwise the
    /// resource was administratively changed or already recovered by
    /// self-heal, and the late result must not be applied. Returns whether
    /// the transition was applied. `last_error` is set or cleared from
    /// `error` in either outcome.
    pub fn exit(
        &mut self,
        generation: u64,
        target: ResourceStatus,
        error: Option<&str>,
        backend_status: Option<&str>,
    ) -> bool {
        if self.status != ResourceStatus::Locked || self.action_state.generation != generation {
            return false;
        }
        self.apply_exit(target, error.map(str::to_string), backend_status);
        true
    }

    /// Self-heal's unconditional exit at the current generation
    ///
    /// Unlike `exit`, a `None` error keeps any recorded `last_error` rather
    /// than clearing it - recovery must not erase the diagnostic it is
    /// reacting to. Returns whether the resource was `Locked`.
    pub fn force_exit(
        &mut self,
        target: ResourceStatus,
        error: Option<&str>,
        backend_status: Option<&str>,
    ) -> bool {
        if self.status != ResourceStatus::Locked {
            return false;
        }
        let error = error
            .map(str::to_string)
            .or_else(|| self.action_state.last_error.clone());
        self.apply_exit(target, error, backend_status);
        true
    }

    /// Direct administrative transition, independent of the lock
    pub fn admin_override(&mut self, status: ResourceStatus) {
        self.status = status;
    }

    fn apply_exit(
        &mut self,
        target: ResourceStatus,
        error: Option<String>,
        backend_status: Option<&str>,
    ) {
        self.action_state.last_error = error;
        if let Some(bs) = backend_status {
            self.backend_status = Some(bs.to_string());
        }
        self.status = target;
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
