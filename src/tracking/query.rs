use std::sync::Arc;

use chrono::Utc;

use crate::{
    data_types::progress::{ProgressRecord, Snapshot},
    tracking::{activity::ActivityMonitor, cache::FreshnessCache},
};

/// Read path for request handlers. Every call counts as activity, which is
/// what keeps the poller awake; no call ever waits on telemetry.
#[derive(Clone)]
pub struct QuerySurface {
    cache: Arc<FreshnessCache>,
    activity: Arc<ActivityMonitor>,
    minimum_ferries: usize,
}

impl QuerySurface {
    pub fn new(cache: Arc<FreshnessCache>, activity: Arc<ActivityMonitor>, minimum_ferries: usize) -> Self {
        Self {
            cache,
            activity,
            minimum_ferries,
        }
    }

    pub fn progress(&self) -> Arc<Snapshot> {
        self.activity.touch();

        let snapshot = self.cache.read_snapshot();
        if snapshot.len() >= self.minimum_ferries {
            return snapshot;
        }

        let mut padded = Snapshot::clone(&snapshot);
        padded.fill_to_minimum(self.minimum_ferries, Utc::now());
        Arc::new(padded)
    }

    pub fn vessel(&self, vessel_key: &str) -> Option<ProgressRecord> {
        self.progress().get(vessel_key).cloned()
    }

    pub fn minimum_ferries(&self) -> usize {
        self.minimum_ferries
    }

    pub fn request_count(&self) -> u64 {
        self.activity.request_count()
    }
}
