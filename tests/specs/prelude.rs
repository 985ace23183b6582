//! Shared harness for scenario tests.

use capstan_core::action::{ActionKind, ActionRegistry, ActionSpec};
use capstan_core::clock::FakeClock;
use capstan_core::resource::{ManagedResource, ResourceKind, ResourceStatus};
use capstan_engine::{EngineConfig, FakeNotifier, Orchestrator};
use std::time::Duration;

pub struct World {
    pub dir: tempfile::TempDir,
    pub orchestrator: Orchestrator<FakeClock, FakeNotifier>,
    pub clock: FakeClock,
    pub notifier: FakeNotifier,
}

/// The registry every scenario shares: a creation, a destructive action,
/// and a quick maintenance action with a short timeout.
pub fn registry() -> ActionRegistry {
    ActionRegistry::new()
        .register(
            "create compute",
            ActionSpec::new(
                ActionKind::Create,
                Duration::from_secs(120),
                ResourceStatus::Enabled,
            ),
        )
        .register(
            "delete compute",
            ActionSpec::new(
                ActionKind::Delete,
                Duration::from_secs(120),
                ResourceStatus::Deleted,
            ),
        )
        .register(
            "reboot compute",
            ActionSpec::new(
                ActionKind::Other,
                Duration::from_secs(30),
                ResourceStatus::Enabled,
            ),
        )
}

pub fn world() -> World {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let notifier = FakeNotifier::new();
    let orchestrator = Orchestrator::new(
        &EngineConfig::with_data_dir(dir.path()),
        registry(),
        notifier.clone(),
        clock.clone(),
    )
    .unwrap();
    World {
        dir,
        orchestrator,
        clock,
        notifier,
    }
}

/// A second orchestrator sharing the same data directory, as another
/// process would.
pub fn attach(world: &World) -> Orchestrator<FakeClock, FakeNotifier> {
    Orchestrator::new(
        &EngineConfig::with_data_dir(world.dir.path()),
        registry(),
        world.notifier.clone(),
        world.clock.clone(),
    )
    .unwrap()
}

pub fn compute(id: &str) -> ManagedResource {
    ManagedResource::new(id, ResourceKind::Compute)
}

/// Poll until `condition` holds, failing after a generous real-time bound.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
