//! Common test utilities

use std::sync::Arc;
use tempfile::TempDir;
use teerank::scheduler::FixedClock;
use teerank::storage::{PathResolver, RecordCodec, ServerStore};

/// Creation time used across scenarios
pub const T0: u64 = 1_700_000_000;

/// Store rooted in a fresh temporary directory, driven by a manual clock
pub fn temp_store(clock: Arc<FixedClock>) -> (TempDir, ServerStore) {
    let dir = TempDir::new().unwrap();
    let store = ServerStore::new(PathResolver::new(dir.path()), RecordCodec::default())
        .with_clock(clock);
    store.init().unwrap();
    (dir, store)
}
