// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! capstan-engine: Async orchestration layer
//!
//! Composes the domain state machines and durable stores into the
//! resource-action orchestration flow: acquire the advisory lock, mark the
//! resource busy, dispatch the backend operation on the configured
//! substrate, and reconcile on completion. Every read path runs self-heal.

mod config;
mod dispatch;
mod error;
mod notify;
mod orchestrator;

pub use config::{ConfigError, EngineConfig};
pub use dispatch::{BackendOp, CompletionFn, DispatchMode, Dispatched, Dispatcher, DispatcherConfig};
pub use error::EngineError;
pub use notify::{LogNotifier, Notifier};
pub use orchestrator::{Orchestrator, Performed};

#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotifier;
