use std::{fmt::Display, time::Duration};

use tokio::time::Instant;

/// Wall time of a labelled operation, logged when it goes out of scope.
pub struct Benchmark {
    time: Instant,
    label: &'static str,
}

impl Benchmark {
    pub fn start(label: &'static str) -> Self {
        Self {
            label,
            time: Instant::now(),
        }
    }
}

impl Drop for Benchmark {
    fn drop(&mut self) {
        tracing::debug!(benchmark = self.label, "{}: {}", self.label, self);
    }
}

impl Display for Benchmark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.time.elapsed();

        if duration.as_secs() > 60 {
            write!(
                f,
                "{:0>2}:{:0>2}min",
                duration.as_secs() / 60,
                duration.as_secs() % 60
            )
        } else {
            write!(f, "{}ms", duration.as_millis())
        }
    }
}

/// Longest period any configured interval or timeout may take.
pub const MAX_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

/// Seconds from configuration as a `Duration`; negative or NaN becomes zero
/// and anything longer than `MAX_PERIOD` is capped.
pub fn secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds)
        .map(|duration| duration.min(MAX_PERIOD))
        .unwrap_or(if seconds > 0.0 { MAX_PERIOD } else { Duration::ZERO })
}
