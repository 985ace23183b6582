// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend-operation dispatcher
//!
//! Runs an opaque, possibly slow Backend Operation on one of several
//! concurrency substrates and delivers its result to a completion
//! callback. Constructed explicitly at startup with its pool sizes and
//! injected into the orchestrator; there is no ambient global executor.
//!
//! Background modes give no durable guarantee that the completion callback
//! runs - a process crash loses it. The self-heal pass on resource read is
//! the backstop, not this module.

use capstan_core::backend::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task;

/// An opaque call against external infrastructure
pub type BackendOp = Box<dyn FnOnce() -> BackendResult + Send + 'static>;

/// Receives the operation's result, possibly on another execution context
pub type CompletionFn = Box<dyn FnOnce(BackendResult) + Send + 'static>;

/// Concurrency substrate for one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Run inline; the caller observes the final resource state
    Sync,
    /// Bounded pool for ordinary background operations
    Thread,
    /// Separately bounded pool for heavy operations
    Process,
    /// Reserved for a future message-broker-backed mode. Currently accepts
    /// the work with no completion path at all; only self-heal recovers the
    /// resource. A known gap, not a feature.
    Queue,
}

/// Worker-pool sizes, injected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_thread_workers")]
    pub thread_workers: usize,
    #[serde(default = "default_process_workers")]
    pub process_workers: usize,
}

fn default_thread_workers() -> usize {
    8
}

fn default_process_workers() -> usize {
    2
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_workers: default_thread_workers(),
            process_workers: default_process_workers(),
        }
    }
}

/// What the caller learns from `run`
#[derive(Debug)]
pub enum Dispatched {
    /// Sync mode: the operation ran; completion has already been invoked
    Completed(BackendResult),
    /// Background mode: the operation was submitted
    Accepted,
}

/// Runs Backend Operations on bounded worker pools
#[derive(Debug, Clone)]
pub struct Dispatcher {
    thread_slots: Arc<Semaphore>,
    process_slots: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(config: &DispatcherConfig) -> Self {
        Self {
            thread_slots: Arc::new(Semaphore::new(config.thread_workers.max(1))),
            process_slots: Arc::new(Semaphore::new(config.process_workers.max(1))),
        }
    }

    /// Run an operation and deliver its result to `on_complete`
    ///
    /// Background modes return as soon as the work is submitted; the
    /// callback then runs on an unrelated execution context and must use
    /// its own store handles.
    pub async fn run(
        &self,
        op: BackendOp,
        mode: DispatchMode,
        on_complete: CompletionFn,
    ) -> Dispatched {
        match mode {
            DispatchMode::Sync => {
                let result = run_blocking(op).await;
                on_complete(result.clone());
                Dispatched::Completed(result)
            }
            DispatchMode::Thread => {
                self.submit(Arc::clone(&self.thread_slots), op, on_complete);
                Dispatched::Accepted
            }
            DispatchMode::Process => {
                self.submit(Arc::clone(&self.process_slots), op, on_complete);
                Dispatched::Accepted
            }
            DispatchMode::Queue => {
                tracing::warn!("queue dispatch mode has no completion path; relying on self-heal");
                Dispatched::Accepted
            }
        }
    }

    fn submit(&self, slots: Arc<Semaphore>, op: BackendOp, on_complete: CompletionFn) {
        let guard = CompletionGuard::new(on_complete);
        task::spawn(async move {
            // If this task is aborted, or the pool is shut down, the guard's
            // drop still delivers a synthetic cancellation.
            let _permit = match slots.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            tracing::debug!("backend operation started");
            let result = run_blocking(op).await;
            guard.complete(result);
        });
    }
}

async fn run_blocking(op: BackendOp) -> BackendResult {
    match task::spawn_blocking(op).await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => Err(BackendError::cancelled()),
        Err(_) => Err(BackendError::internal("backend operation panicked")),
    }
}

/// Guarantees the completion callback fires exactly once
///
/// Dropping an incomplete guard reports a synthetic cancellation so a
/// resource is never left busy merely because its dispatch task was
/// dropped.
pub(crate) struct CompletionGuard {
    on_complete: Option<CompletionFn>,
}

impl CompletionGuard {
    pub(crate) fn new(on_complete: CompletionFn) -> Self {
        Self {
            on_complete: Some(on_complete),
        }
    }

    pub(crate) fn complete(mut self, result: BackendResult) {
        if let Some(f) = self.on_complete.take() {
            f(result);
        }
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if let Some(f) = self.on_complete.take() {
            f(Err(BackendError::cancelled()));
        }
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
