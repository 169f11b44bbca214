//! Per-server mutual exclusion
//!
//! The store itself does no locking: two writers on one record race at the
//! file level. Pollers that may touch the same server concurrently hold a
//! [`ServerGuard`] across the whole read, probe, write cycle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Keyed async locks, one per server identifier
#[derive(Debug, Default)]
pub struct ServerLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held while a server's record is being updated
#[derive(Debug)]
pub struct ServerGuard {
    id: String,
    _guard: OwnedMutexGuard<()>,
}

impl ServerGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl ServerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a server
    pub async fn acquire(&self, id: &str) -> ServerGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id.to_string()).or_default())
        };

        ServerGuard {
            id: id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Try to get exclusive access without waiting
    pub fn try_acquire(&self, id: &str) -> Option<ServerGuard> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id.to_string()).or_default())
        };

        lock.try_lock_owned().ok().map(|guard| ServerGuard {
            id: id.to_string(),
            _guard: guard,
        })
    }

    /// Drop locks nobody holds or waits on, returning how many were removed
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    /// Number of tracked lock entries
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
