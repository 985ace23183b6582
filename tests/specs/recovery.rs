//! Self-heal: resources stuck busy are recovered on read.

use crate::prelude::*;
use capstan_core::backend::BackendReport;
use capstan_core::heal::{TIMED_OUT_ERROR, UNKNOWN_BACKEND_STATUS};
use capstan_core::log::ActionOutcome;
use capstan_core::resource::{ResourceId, ResourceStatus};
use capstan_engine::DispatchMode;
use std::time::Duration;

#[tokio::test]
async fn queued_action_with_no_completion_heals_on_timeout() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    // Queue mode accepts the work but has no completion path at all;
    // the resource stays busy until the timeout sweep catches it
    let performed = w
        .orchestrator
        .perform(
            &id,
            "reboot compute",
            Box::new(|| Ok(BackendReport::default())),
            DispatchMode::Queue,
        )
        .await
        .unwrap();
    assert!(performed.accepted);

    let resource = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(resource.status, ResourceStatus::Locked);

    w.clock.advance(Duration::from_secs(31));

    let healed = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(healed.status, ResourceStatus::Enabled);
    assert_eq!(
        healed.action_state.last_error.as_deref(),
        Some(TIMED_OUT_ERROR)
    );
    assert_eq!(
        healed.backend_status.as_deref(),
        Some(UNKNOWN_BACKEND_STATUS)
    );

    let log = w.orchestrator.action_log(&id).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, ActionOutcome::TimedOut);
    assert!(w.notifier.contains("resource:recovered"));
}

#[tokio::test]
async fn recorded_error_without_a_status_flip_heals_on_read() {
    let w = world();
    let id = ResourceId::from("vm-1");

    // A row written by a worker that recorded the failure but died before
    // flipping the status
    let mut resource = compute("vm-1");
    resource.enter_busy("reboot compute", None, &w.clock);
    resource.action_state.last_error = Some("hypervisor unreachable".to_string());
    w.orchestrator.insert(&resource).unwrap();

    let healed = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(healed.status, ResourceStatus::Enabled);
    // Recovery keeps the diagnostic it reacted to
    assert_eq!(
        healed.action_state.last_error.as_deref(),
        Some("hypervisor unreachable")
    );
    assert!(w.notifier.contains("resource:recovered"));
}

#[tokio::test]
async fn interrupted_creation_heals_to_failed() {
    let w = world();
    let id = ResourceId::from("vm-1");

    let mut resource = compute("vm-1");
    resource.enter_busy("create compute", None, &w.clock);
    w.orchestrator.insert(&resource).unwrap();

    w.clock.advance(Duration::from_secs(121));

    // A timed-out creation leaves nothing usable behind
    let healed = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(healed.status, ResourceStatus::Failed);
}

#[tokio::test]
async fn heal_runs_once_per_incident() {
    let w = world();
    let id = ResourceId::from("vm-1");

    let mut resource = compute("vm-1");
    resource.enter_busy("reboot compute", None, &w.clock);
    w.orchestrator.insert(&resource).unwrap();
    w.clock.advance(Duration::from_secs(31));

    w.orchestrator.load(&id).await.unwrap();
    w.orchestrator.load(&id).await.unwrap();

    let recovered = w
        .notifier
        .events()
        .iter()
        .filter(|e| e.name() == "resource:recovered")
        .count();
    assert_eq!(recovered, 1);
}

#[tokio::test]
async fn recovered_resource_accepts_new_actions() {
    let w = world();
    let id = ResourceId::from("vm-1");

    let mut resource = compute("vm-1");
    resource.enter_busy("reboot compute", None, &w.clock);
    w.orchestrator.insert(&resource).unwrap();
    w.clock.advance(Duration::from_secs(31));

    // perform heals on read before checking the busy row
    let performed = w
        .orchestrator
        .perform(
            &id,
            "reboot compute",
            Box::new(|| Ok(BackendReport::with_backend_status("ACTIVE"))),
            DispatchMode::Sync,
        )
        .await
        .unwrap();

    assert!(performed.error.is_none());
    let settled = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(settled.status, ResourceStatus::Enabled);
    assert!(settled.action_state.last_error.is_none());
}
