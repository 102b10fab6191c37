use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{sync::Notify, time::Instant};

/// Request activity as seen by the poller. Written by every request, read
/// (and awaited) by the poller while it is idle.
pub struct ActivityMonitor {
    last_activity: Mutex<Instant>,
    wake: Notify,
    requests: AtomicU64,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self {
            last_activity: Mutex::new(Instant::now()),
            wake: Notify::new(),
            requests: AtomicU64::new(0),
        }
    }

    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
        self.requests.fetch_add(1, Ordering::Relaxed);
        // Stores a permit when the poller is not waiting yet.
        self.wake.notify_one();
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    pub fn idle_for(&self) -> Duration {
        Instant::now().saturating_duration_since(self.last_activity())
    }

    pub async fn wait_for_activity(&self) {
        self.wake.notified().await;
    }

    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl Default for ActivityMonitor {
    fn default() -> Self {
        ActivityMonitor::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn touch_resets_idle_time_and_wakes_a_waiter() {
        let monitor = ActivityMonitor::new();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(monitor.idle_for() >= Duration::from_secs(30));

        monitor.touch();
        assert_eq!(monitor.idle_for(), Duration::ZERO);
        assert_eq!(monitor.request_count(), 1);

        // The stored permit lets a later waiter through immediately.
        tokio::time::timeout(Duration::from_secs(1), monitor.wait_for_activity())
            .await
            .unwrap();
    }
}
