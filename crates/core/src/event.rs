// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Domain events emitted by the orchestrator

use crate::log::ActionOutcome;
use crate::resource::ResourceStatus;
use serde::{Deserialize, Serialize};

/// Events observers may subscribe to via a notifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A resource entered the busy state for an action
    ResourceLocked { resource: String, action: String },
    /// A completion flipped the resource out of the busy state
    ResourceReleased {
        resource: String,
        action: String,
        status: ResourceStatus,
    },
    /// Self-heal force-recovered a stuck resource
    ResourceRecovered {
        resource: String,
        action: Option<String>,
        status: ResourceStatus,
        reason: String,
    },
    /// An audit entry was finalized
    ActionFinished {
        resource: String,
        action: String,
        outcome: ActionOutcome,
    },
    /// An action was turned away because the resource was busy
    LockDenied { resource: String, action: String },
}

impl Event {
    /// Short name for structured logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::ResourceLocked { .. } => "resource:locked",
            Event::ResourceReleased { .. } => "resource:released",
            Event::ResourceRecovered { .. } => "resource:recovered",
            Event::ActionFinished { .. } => "action:finished",
            Event::LockDenied { .. } => "lock:denied",
        }
    }
}
