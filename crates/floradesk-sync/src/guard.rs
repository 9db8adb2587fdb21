use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process overlap guard: at most one pass per guard at a time.
///
/// Clones share the same lock. This does nothing for passes started by other
/// processes.
#[derive(Debug, Clone, Default)]
pub struct SyncGuard {
    lock: Arc<Mutex<()>>,
}

/// Held for the duration of a pass; dropping it frees the guard.
#[derive(Debug)]
pub struct SyncPermit {
    _held: OwnedMutexGuard<()>,
}

impl SyncGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `None` when a pass already holds the guard.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SyncPermit> {
        Arc::clone(&self.lock)
            .try_lock_owned()
            .ok()
            .map(|held| SyncPermit { _held: held })
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_permit_dropped() {
        let guard = SyncGuard::new();
        let permit = guard.try_acquire().expect("first acquire");
        assert!(guard.is_running());
        assert!(guard.clone().try_acquire().is_none());

        drop(permit);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }
}
