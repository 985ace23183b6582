// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource-action orchestrator
//!
//! Ties the stores, the dispatcher, and the state machines together into
//! the canonical action flow:
//!
//! 1. acquire the resource's advisory lock
//! 2. flip the resource to LOCKED and persist the transition
//! 3. open an audit entry and dispatch the backend operation
//! 4. release the advisory lock (the persisted LOCKED row, not the
//!    advisory lock, is what excludes other actions for the duration)
//! 5. on completion, reconcile the resource and finalize the audit entry
//!
//! Every read goes through [`Orchestrator::load`], which runs the
//! self-heal assessment and force-recovers resources whose action can no
//! longer be in flight.

use crate::config::EngineConfig;
use crate::dispatch::{BackendOp, DispatchMode, Dispatched, Dispatcher};
use crate::error::EngineError;
use crate::notify::Notifier;
use capstan_core::action::ActionRegistry;
use capstan_core::backend::{BackendError, BackendResult};
use capstan_core::clock::Clock;
use capstan_core::event::Event;
use capstan_core::heal::{self, HealReason, HealVerdict, UNKNOWN_BACKEND_STATUS};
use capstan_core::log::ActionLogEntry;
use capstan_core::resource::{ManagedResource, ResourceId, ResourceStatus};
use capstan_storage::action_log::ActionLogStore;
use capstan_storage::lock::{LockError, LockGuard, LockStore};
use capstan_storage::resource::ResourceStore;
use std::sync::Arc;
use std::time::Duration;

/// What the caller learns from [`Orchestrator::perform`]
#[derive(Debug)]
pub struct Performed {
    /// The action was dispatched; failures to start (busy lock, unknown
    /// action) surface as errors instead
    pub accepted: bool,
    /// Sync mode only: the operation's error, attached for the caller to
    /// surface; background modes have not completed yet
    pub error: Option<BackendError>,
}

/// Orchestrates actions against managed resources
pub struct Orchestrator<C, N> {
    resources: ResourceStore,
    locks: LockStore,
    logs: ActionLogStore,
    registry: Arc<ActionRegistry>,
    dispatcher: Dispatcher,
    notifier: Arc<N>,
    clock: C,
    lock_wait_timeout: Option<Duration>,
    lock_poll_interval: Duration,
}

impl<C, N> Orchestrator<C, N>
where
    C: Clock + 'static,
    N: Notifier,
{
    /// Build an orchestrator from configuration
    ///
    /// Validates the action registry up front so a misregistered action
    /// fails at startup rather than on first dispatch.
    pub fn new(
        config: &EngineConfig,
        registry: ActionRegistry,
        notifier: N,
        clock: C,
    ) -> Result<Self, EngineError> {
        registry.validate()?;
        Ok(Self {
            resources: ResourceStore::open(config.data_dir.join("resources"))?,
            locks: LockStore::open(config.data_dir.join("locks"))?,
            logs: ActionLogStore::open(config.data_dir.join("actions"))?,
            registry: Arc::new(registry),
            dispatcher: Dispatcher::new(&config.dispatcher),
            notifier: Arc::new(notifier),
            clock,
            lock_wait_timeout: config.lock_wait_timeout,
            lock_poll_interval: config.lock_poll_interval,
        })
    }

    /// Persist a new resource row
    pub fn insert(&self, resource: &ManagedResource) -> Result<(), EngineError> {
        self.resources.save(resource)?;
        Ok(())
    }

    /// Audit entries for a resource, oldest first
    pub fn action_log(&self, id: &ResourceId) -> Result<Vec<ActionLogEntry>, EngineError> {
        Ok(self.logs.list(id)?)
    }

    /// All known resource IDs
    pub fn list(&self) -> Result<Vec<ResourceId>, EngineError> {
        Ok(self.resources.list()?)
    }

    /// Perform a registered action against a resource
    ///
    /// Serializes against concurrent actions via the advisory lock, then
    /// via the persisted LOCKED row; a resource already busy yields
    /// [`EngineError::LockBusy`]. In background modes the returned
    /// [`Performed`] only acknowledges submission; completion reconciles
    /// the resource out of band.
    pub async fn perform(
        &self,
        id: &ResourceId,
        action: &str,
        op: BackendOp,
        mode: DispatchMode,
    ) -> Result<Performed, EngineError> {
        let spec = self
            .registry
            .get(action)
            .ok_or_else(|| EngineError::UnknownAction(action.to_string()))?;
        let on_success = spec.on_success;
        let lock_timeout = spec.timeout;

        let key = format!("action:{id}");
        let guard = match self.acquire_with_wait(&key, lock_timeout).await {
            Ok(guard) => guard,
            Err(e @ EngineError::LockBusy { .. }) => {
                self.deny(id, action).await;
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        // Heal-on-read happens before the busy check so a stuck resource
        // does not wall off new work forever.
        let mut resource = self.load(id).await?;
        if resource.is_locked() {
            self.deny(id, action).await;
            return Err(EngineError::LockBusy { key });
        }

        let generation = resource.enter_busy(action, None, &self.clock);
        self.resources.save(&resource)?;
        self.notifier
            .publish(&Event::ResourceLocked {
                resource: id.to_string(),
                action: action.to_string(),
            })
            .await;

        let entry = ActionLogEntry::begin(id.clone(), action, &self.clock);
        self.logs.append(&entry)?;
        tracing::info!(resource = %id, action, entry = %entry.id, ?mode, "action dispatched");

        let ctx = CompletionCtx {
            resources: self.resources.clone(),
            logs: self.logs.clone(),
            registry: Arc::clone(&self.registry),
            notifier: Arc::clone(&self.notifier),
            clock: self.clock.clone(),
            resource_id: id.clone(),
            action: action.to_string(),
            generation,
            entry_id: entry.id,
            on_success,
        };
        let on_complete = Box::new(move |result: BackendResult| {
            let notifier = Arc::clone(&ctx.notifier);
            let events = ctx.reconcile(&result);
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    for event in events {
                        notifier.publish(&event).await;
                    }
                });
            }
        });

        let dispatched = self.dispatcher.run(op, mode, on_complete).await;
        guard.release()?;

        let error = match dispatched {
            Dispatched::Completed(result) => result.err(),
            Dispatched::Accepted => None,
        };
        Ok(Performed {
            accepted: true,
            error,
        })
    }

    /// Load a resource, self-healing it first if its action is dead
    ///
    /// Recovery also sweeps the resource's open audit entries closed, so a
    /// lost completion still leaves a finalized record.
    pub async fn load(&self, id: &ResourceId) -> Result<ManagedResource, EngineError> {
        let mut resource = match self.resources.load(id) {
            Ok(r) => r,
            Err(capstan_storage::StorageError::NotFound { .. }) => {
                return Err(EngineError::ResourceNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let verdict = heal::assess(&resource, &self.registry, &self.clock);
        let HealVerdict::Recover {
            target,
            error,
            reason,
        } = verdict
        else {
            return Ok(resource);
        };

        let action = resource.action_state.last_action.clone();
        resource.force_exit(target, error.as_deref(), Some(UNKNOWN_BACKEND_STATUS));
        self.resources.save(&resource)?;
        self.sweep_open_entries(id, reason)?;

        tracing::warn!(
            resource = %id,
            action = action.as_deref().unwrap_or("<none>"),
            ?reason,
            ?target,
            "recovered stuck resource"
        );
        self.notifier
            .publish(&Event::ResourceRecovered {
                resource: id.to_string(),
                action,
                status: target,
                reason: format!("{reason:?}"),
            })
            .await;

        Ok(resource)
    }

    /// Direct administrative status change, bypassing the action flow
    pub fn admin_override(
        &self,
        id: &ResourceId,
        status: ResourceStatus,
    ) -> Result<ManagedResource, EngineError> {
        let mut resource = match self.resources.load(id) {
            Ok(r) => r,
            Err(capstan_storage::StorageError::NotFound { .. }) => {
                return Err(EngineError::ResourceNotFound(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        resource.admin_override(status);
        self.resources.save(&resource)?;
        tracing::info!(resource = %id, ?status, "administrative override");
        Ok(resource)
    }

    async fn deny(&self, id: &ResourceId, action: &str) {
        self.notifier
            .publish(&Event::LockDenied {
                resource: id.to_string(),
                action: action.to_string(),
            })
            .await;
    }

    /// Close every open audit entry for a recovered resource
    fn sweep_open_entries(&self, id: &ResourceId, reason: HealReason) -> Result<(), EngineError> {
        for mut entry in self.logs.in_progress(id)? {
            match reason {
                HealReason::TimedOut => entry.finish_timed_out(&self.clock),
                HealReason::RecordedError => {
                    let cause = Err(BackendError::internal("action never completed"));
                    entry.finish(&cause, &self.clock);
                }
            }
            self.logs.save(&entry)?;
        }
        Ok(())
    }

    /// Acquire the advisory lock, polling until the configured wait timeout
    /// elapses; no timeout means a single attempt.
    async fn acquire_with_wait(
        &self,
        key: &str,
        stale_timeout: Duration,
    ) -> Result<LockGuard, EngineError> {
        let deadline = self.lock_wait_timeout.map(|t| self.clock.now() + t);
        loop {
            match self.locks.acquire(key, stale_timeout, &self.clock) {
                Ok(guard) => return Ok(guard),
                Err(LockError::Busy { .. }) => match deadline {
                    Some(deadline) if self.clock.now() < deadline => {
                        tokio::time::sleep(self.lock_poll_interval).await;
                    }
                    _ => {
                        return Err(EngineError::LockBusy {
                            key: key.to_string(),
                        })
                    }
                },
                Err(LockError::Storage(e)) => return Err(e.into()),
            }
        }
    }
}

/// Everything a completion callback needs to reconcile a resource
///
/// Cloned store handles, not references: the callback may run on an
/// execution context that outlives the `perform` call.
pub(crate) struct CompletionCtx<C, N> {
    resources: ResourceStore,
    logs: ActionLogStore,
    registry: Arc<ActionRegistry>,
    notifier: Arc<N>,
    clock: C,
    resource_id: ResourceId,
    action: String,
    generation: u64,
    entry_id: String,
    on_success: ResourceStatus,
}

impl<C, N> CompletionCtx<C, N>
where
    C: Clock,
{
    /// Apply a backend result to the resource and its audit entry
    ///
    /// The resource transition is generation-guarded: if self-heal or an
    /// administrator moved the resource since dispatch, the late result is
    /// dropped rather than clobbering the newer state. Storage failures are
    /// logged and swallowed - there is no caller to raise them to.
    pub(crate) fn reconcile(&self, result: &BackendResult) -> Vec<Event> {
        let mut events = Vec::new();

        let target = match result {
            Ok(_) => self.on_success,
            Err(_) => self.registry.recovery_for(&self.action).on_error,
        };
        let error = result.as_ref().err().map(ToString::to_string);
        let backend_status = result
            .as_ref()
            .ok()
            .and_then(|report| report.backend_status.as_deref());

        match self.resources.load(&self.resource_id) {
            Ok(mut resource) => {
                let applied =
                    resource.exit(self.generation, target, error.as_deref(), backend_status);
                if applied {
                    if let Err(e) = self.resources.save(&resource) {
                        tracing::error!(resource = %self.resource_id, error = %e, "failed to persist completion");
                        return events;
                    }
                    events.push(Event::ResourceReleased {
                        resource: self.resource_id.to_string(),
                        action: self.action.clone(),
                        status: target,
                    });
                } else {
                    tracing::warn!(
                        resource = %self.resource_id,
                        action = %self.action,
                        generation = self.generation,
                        "stale completion dropped"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(resource = %self.resource_id, error = %e, "completion for missing resource");
            }
        }

        // Finalize the audit entry even when the resource transition was
        // stale, unless the timeout sweep already closed it.
        match self.logs.load(&self.resource_id, &self.entry_id) {
            Ok(mut entry) if entry.is_open() => {
                entry.finish(result, &self.clock);
                if let Err(e) = self.logs.save(&entry) {
                    tracing::error!(entry = %self.entry_id, error = %e, "failed to finalize audit entry");
                } else {
                    events.push(Event::ActionFinished {
                        resource: self.resource_id.to_string(),
                        action: self.action.clone(),
                        outcome: entry.status,
                    });
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(entry = %self.entry_id, error = %e, "audit entry missing at completion");
            }
        }

        events
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
