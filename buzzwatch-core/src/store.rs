//! Dataset store: the single holder of the currently published snapshot.
//!
//! Publication is one `Arc` pointer replacement under a write lock held only
//! for that store. Readers clone the `Arc` under a read lock and then work on
//! the snapshot with no lock held, so a reader can never observe a price table
//! and a volume table from different cycles.

use crate::tables::Snapshot;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug)]
pub struct DatasetStore {
    current: RwLock<Arc<Snapshot>>,
}

impl DatasetStore {
    /// A store serving the empty snapshot.
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::empty())
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Publish `next`, returning the snapshot it replaced.
    pub fn swap(&self, next: Snapshot) -> Arc<Snapshot> {
        let next = Arc::new(next);
        // The guarded value is a single pointer, so a poisoned lock still
        // holds a complete snapshot.
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, next)
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}
