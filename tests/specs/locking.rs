//! Advisory locking across independent store handles.

use crate::prelude::*;
use capstan_core::backend::BackendReport;
use capstan_core::resource::{ResourceId, ResourceStatus};
use capstan_engine::{DispatchMode, EngineError};
use capstan_storage::lock::{LockError, LockStore};
use std::time::Duration;

#[tokio::test]
async fn advisory_lock_has_a_single_winner() {
    let w = world();
    let dir = w.dir.path().join("locks");
    let a = LockStore::open(&dir).unwrap();
    let b = LockStore::open(&dir).unwrap();

    let guard = a
        .acquire("action:vm-1", Duration::from_secs(60), &w.clock)
        .unwrap();
    let err = b
        .acquire("action:vm-1", Duration::from_secs(60), &w.clock)
        .unwrap_err();

    assert!(matches!(err, LockError::Busy { .. }));

    guard.release().unwrap();
    b.acquire("action:vm-1", Duration::from_secs(60), &w.clock)
        .unwrap();
}

#[tokio::test]
async fn abandoned_lock_is_reclaimed_after_staleness() {
    let w = world();
    let dir = w.dir.path().join("locks");
    let a = LockStore::open(&dir).unwrap();
    let b = LockStore::open(&dir).unwrap();

    // Simulate a crashed holder: the guard never runs its release
    let guard = a
        .acquire("action:vm-1", Duration::from_secs(60), &w.clock)
        .unwrap();
    std::mem::forget(guard);

    w.clock.advance(Duration::from_secs(61));
    let reclaimed = b.acquire("action:vm-1", Duration::from_secs(60), &w.clock);
    assert!(reclaimed.is_ok());
}

#[tokio::test]
async fn busy_resource_rejects_actions_from_another_handle() {
    let w = world();
    let id = ResourceId::from("vm-1");
    w.orchestrator.insert(&compute("vm-1")).unwrap();

    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    let performed = w
        .orchestrator
        .perform(
            &id,
            "reboot compute",
            Box::new(move || {
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
                Ok(BackendReport::default())
            }),
            DispatchMode::Thread,
        )
        .await
        .unwrap();
    assert!(performed.accepted);

    // A second orchestrator on the same data directory sees the busy row
    let other = attach(&w);
    let err = other
        .perform(
            &id,
            "delete compute",
            Box::new(|| Ok(BackendReport::default())),
            DispatchMode::Sync,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::LockBusy { .. }));
    assert!(err.is_retryable());

    release_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let resource = other.load(&id).await.unwrap();
            if resource.status == ResourceStatus::Enabled {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("completion never reconciled the resource");
}
