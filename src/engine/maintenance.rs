//! Background cache sweep.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::EngineInner;

/// Handle to the periodic sweep task. Dropping it stops the task.
#[must_use = "the sweep task stops when this handle is dropped"]
#[derive(Debug)]
pub struct MaintenanceHandle {
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Stop the sweep task now.
    pub fn stop(self) {}

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the sweep loop.
///
/// The task holds a weak reference and exits once the engine is gone.
pub(super) fn spawn(inner: &Arc<EngineInner>, period: Duration) -> MaintenanceHandle {
    let engine: Weak<EngineInner> = Arc::downgrade(inner);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(inner) = engine.upgrade() else {
                debug!("engine dropped, cache sweep stopping");
                break;
            };
            let evicted = inner.cache.sweep();
            debug!(evicted, remaining = inner.cache.len(), "cache sweep");
        }
    });
    MaintenanceHandle { task }
}
