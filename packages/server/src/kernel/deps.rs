//! Server dependencies for refresh activities (using traits for testability)
//!
//! This module provides the central dependency container used by every
//! trigger surface. External services sit behind trait objects so tests can
//! swap in the in-memory store and mock generator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domains::refresh::{ContentGenerator, RecordStore, RefreshSettings};

/// Server dependencies accessible to activities
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn RecordStore>,
    pub generator: Arc<dyn ContentGenerator>,
    pub settings: RefreshSettings,
    /// Held for the duration of a refresh cycle in this process
    cycle_lock: Arc<Mutex<()>>,
    /// Mirrors `cycle_lock` for readers that must not contend for it
    cycle_running: Arc<AtomicBool>,
}

/// Proof that this process is running a refresh cycle. Dropping it ends
/// the cycle.
pub struct CycleGuard {
    _lock: OwnedMutexGuard<()>,
    running: Arc<AtomicBool>,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn RecordStore>,
        generator: Arc<dyn ContentGenerator>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            store,
            generator,
            settings,
            cycle_lock: Arc::new(Mutex::new(())),
            cycle_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Claim the in-process cycle slot, or `None` if a cycle is running.
    ///
    /// Cross-process overlap is handled by the store's conditional writes.
    pub fn try_begin_cycle(&self) -> Option<CycleGuard> {
        let lock = self.cycle_lock.clone().try_lock_owned().ok()?;
        self.cycle_running.store(true, Ordering::SeqCst);
        Some(CycleGuard {
            _lock: lock,
            running: self.cycle_running.clone(),
        })
    }

    /// Whether a cycle is running in this process. Never blocks or claims
    /// the cycle slot.
    pub fn is_cycle_running(&self) -> bool {
        self.cycle_running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::refresh::InMemoryRecordStore;
    use crate::kernel::MockContentGenerator;

    fn deps() -> ServerDeps {
        ServerDeps::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(MockContentGenerator::new()),
            RefreshSettings::default(),
        )
    }

    #[test]
    fn running_state_follows_the_guard() {
        let deps = deps();
        assert!(!deps.is_cycle_running());

        let guard = deps.try_begin_cycle().unwrap();
        assert!(deps.is_cycle_running());
        assert!(deps.clone().try_begin_cycle().is_none());

        drop(guard);
        assert!(!deps.is_cycle_running());
        assert!(deps.try_begin_cycle().is_some());
    }

    #[test]
    fn checking_running_state_leaves_the_slot_free() {
        let deps = deps();

        for _ in 0..3 {
            assert!(!deps.is_cycle_running());
        }

        assert!(deps.try_begin_cycle().is_some());
    }
}
