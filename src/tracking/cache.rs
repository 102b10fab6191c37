use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::{data_types::progress::Snapshot, logvbln};

/// The one piece of shared mutable state: the latest snapshot behind a
/// reader/writer lock. Readers get an `Arc` to an immutable snapshot, so a
/// write only ever swaps a pointer.
pub struct FreshnessCache {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl FreshnessCache {
    const CC: &'static str = "Cache";

    pub fn new(initial: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn read_snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.snapshot.read())
    }

    pub fn replace_snapshot(&self, snapshot: Snapshot) {
        let next = Arc::new(snapshot);
        let vessels = next.len();

        let previous = {
            let mut guard = self.snapshot.write();
            std::mem::replace(&mut *guard, next)
        };
        // The old snapshot is released outside the lock.
        drop(previous);

        logvbln!("Committed snapshot with {} vessels", vessels);
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.snapshot.read().last_updated
    }
}
