// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification seam for orchestration events

use async_trait::async_trait;
use capstan_core::event::Event;

/// Delivers orchestration events to observers
///
/// Completion runs on arbitrary execution contexts, so implementations
/// must be cheap to share and must not block on delivery failures.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn publish(&self, event: &Event);
}

/// Default notifier: structured log only
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, event: &Event) {
        tracing::info!(event = event.name(), payload = ?event, "orchestration event");
    }
}

/// Recording notifier for tests
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct FakeNotifier {
    events: std::sync::Arc<std::sync::Mutex<Vec<Event>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events().iter().any(|e| e.name() == name)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Notifier for FakeNotifier {
    async fn publish(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
