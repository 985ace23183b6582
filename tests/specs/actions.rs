//! End-to-end action flows and the audit trail.

use crate::prelude::*;
use capstan_core::backend::{BackendError, BackendReport};
use capstan_core::log::ActionOutcome;
use capstan_core::resource::{ResourceId, ResourceStatus};
use capstan_engine::DispatchMode;
use std::time::Duration;

#[tokio::test]
async fn sync_creation_provisions_the_resource() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    let performed = w
        .orchestrator
        .perform(
            &id,
            "create compute",
            Box::new(|| Ok(BackendReport::with_backend_status("ACTIVE"))),
            DispatchMode::Sync,
        )
        .await
        .unwrap();

    assert!(performed.accepted);
    assert!(performed.error.is_none());

    let resource = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(resource.status, ResourceStatus::Enabled);
    assert_eq!(resource.backend_status.as_deref(), Some("ACTIVE"));

    let log = w.orchestrator.action_log(&id).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, ActionOutcome::Succeeded);
    assert_eq!(log[0].action, "create compute");
    assert!(log[0].end_date.is_some());
}

#[tokio::test]
async fn sync_failure_records_a_machine_parseable_cause() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    let performed = w
        .orchestrator
        .perform(
            &id,
            "reboot compute",
            Box::new(|| Err(BackendError::remote("hypervisor unreachable"))),
            DispatchMode::Sync,
        )
        .await
        .unwrap();

    assert!(performed.error.is_some());

    let resource = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(resource.status, ResourceStatus::Enabled);
    assert!(resource
        .action_state
        .last_error
        .as_deref()
        .unwrap()
        .contains("hypervisor unreachable"));

    // The audit entry embeds the typed cause, not a flattened string
    let log = w.orchestrator.action_log(&id).unwrap();
    assert_eq!(log[0].status, ActionOutcome::Failed);
    let cause: BackendError = serde_json::from_value(log[0].contents["error"].clone()).unwrap();
    assert_eq!(cause, BackendError::remote("hypervisor unreachable"));
}

#[tokio::test]
async fn deletion_settles_the_resource_deleted() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    w.orchestrator
        .perform(
            &id,
            "delete compute",
            Box::new(|| Ok(BackendReport::default())),
            DispatchMode::Sync,
        )
        .await
        .unwrap();

    let resource = w.orchestrator.load(&id).await.unwrap();
    assert_eq!(resource.status, ResourceStatus::Deleted);
}

#[tokio::test]
async fn background_action_reconciles_after_return() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    let performed = w
        .orchestrator
        .perform(
            &id,
            "reboot compute",
            Box::new(|| Ok(BackendReport::with_backend_status("ACTIVE"))),
            DispatchMode::Thread,
        )
        .await
        .unwrap();
    assert!(performed.accepted);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let resource = w.orchestrator.load(&id).await.unwrap();
            if resource.status == ResourceStatus::Enabled {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("background completion never landed");

    let log = w.orchestrator.action_log(&id).unwrap();
    assert_eq!(log[0].status, ActionOutcome::Succeeded);
    eventually(|| w.notifier.contains("resource:released")).await;
    eventually(|| w.notifier.contains("action:finished")).await;
}

#[tokio::test]
async fn audit_trail_is_ordered_oldest_first() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    w.orchestrator
        .perform(
            &id,
            "create compute",
            Box::new(|| Ok(BackendReport::default())),
            DispatchMode::Sync,
        )
        .await
        .unwrap();

    w.clock.advance(Duration::from_secs(10));

    w.orchestrator
        .perform(
            &id,
            "reboot compute",
            Box::new(|| Ok(BackendReport::default())),
            DispatchMode::Sync,
        )
        .await
        .unwrap();

    let log = w.orchestrator.action_log(&id).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].action, "create compute");
    assert_eq!(log[1].action, "reboot compute");
    assert!(log[0].start_date < log[1].start_date);
}

#[tokio::test]
async fn consecutive_actions_reuse_the_released_lock() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    for _ in 0..3 {
        let performed = w
            .orchestrator
            .perform(
                &id,
                "reboot compute",
                Box::new(|| Ok(BackendReport::default())),
                DispatchMode::Sync,
            )
            .await
            .unwrap();
        assert!(performed.error.is_none());
    }

    let log = w.orchestrator.action_log(&id).unwrap();
    assert_eq!(log.len(), 3);
    assert!(log.iter().all(|e| e.status == ActionOutcome::Succeeded));
}
