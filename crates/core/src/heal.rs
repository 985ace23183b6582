// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Self-heal decision for resources stuck in the busy state
//!
//! Dispatch has no durable retry: a worker crash or lost callback leaves a
//! resource LOCKED forever. Every read runs this assessment and
//! force-recovers the resource when the recorded action can no longer be
//! legitimately in flight. This is the sole liveness guarantee of the
//! orchestration core.

use crate::action::ActionRegistry;
use crate::clock::Clock;
use crate::resource::{ManagedResource, ResourceStatus};

/// Marker written to `backend_status` when recovery cannot know the remote state
pub const UNKNOWN_BACKEND_STATUS: &str = "unknown";

/// Diagnostic recorded when a timeout is detected
pub const TIMED_OUT_ERROR: &str = "action timed out";

/// Why a locked resource had to be recovered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealReason {
    /// An error was recorded but the status flip never happened
    RecordedError,
    /// The action outlived its maximum expected duration
    TimedOut,
}

/// Outcome of assessing a resource on read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealVerdict {
    /// Resource is not busy; nothing to do
    NotLocked,
    /// Action may still be legitimately in flight; leave the resource alone
    InFlight,
    /// Force the resource out of LOCKED
    Recover {
        target: ResourceStatus,
        /// Replacement for `last_error`; `None` keeps the recorded one
        error: Option<String>,
        reason: HealReason,
    },
}

/// Assess a resource against the action-timeout policy
pub fn assess(
    resource: &ManagedResource,
    registry: &ActionRegistry,
    clock: &impl Clock,
) -> HealVerdict {
    if resource.status != ResourceStatus::Locked {
        return HealVerdict::NotLocked;
    }

    let Some(action) = resource.action_state.last_action.as_deref() else {
        // Violates the LOCKED-implies-last-action invariant; the row was
        // written by something other than enter_busy. Recover conservatively.
        return HealVerdict::Recover {
            target: ResourceStatus::Enabled,
            error: Some("locked without an action record".to_string()),
            reason: HealReason::RecordedError,
        };
    };

    let targets = registry.recovery_for(action);

    if resource.action_state.last_error.is_some() {
        return HealVerdict::Recover {
            target: targets.on_error,
            error: None,
            reason: HealReason::RecordedError,
        };
    }

    let started = resource.action_state.last_action_time.unwrap_or(0);
    let elapsed = clock.epoch_secs().saturating_sub(started);
    if elapsed > registry.timeout_for(action).as_secs() as i64 {
        return HealVerdict::Recover {
            target: targets.on_timeout,
            error: Some(TIMED_OUT_ERROR.to_string()),
            reason: HealReason::TimedOut,
        };
    }

    HealVerdict::InFlight
}

#[cfg(test)]
#[path = "heal_tests.rs"]
mod tests;
