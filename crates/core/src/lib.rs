// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! capstan-core: Domain logic for the capstan orchestration backend
//!
//! This crate provides:
//! - The managed-resource status state machine and its action metadata
//! - Action registry, timeout policy, and the shared recovery table
//! - The pure self-heal decision applied on every resource read
//! - Action audit-log entries with structured, machine-parseable contents
//! - A clock abstraction for testable time handling
//!
//! Everything here is pure and synchronous; durable storage lives in
//! capstan-storage and the async orchestration layer in capstan-engine.

pub mod action;
pub mod backend;
pub mod clock;
pub mod event;
pub mod heal;
pub mod log;
pub mod resource;

// Re-exports
pub use action::{ActionKind, ActionRegistry, ActionSpec, RecoveryTargets, RegistryError};
pub use backend::{BackendError, BackendErrorKind, BackendReport, BackendResult};
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::Event;
pub use heal::{HealReason, HealVerdict};
pub use log::{ActionLogEntry, ActionOutcome};
pub use resource::{ActionState, ManagedResource, ResourceId, ResourceKind, ResourceStatus};
