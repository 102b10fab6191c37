use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{sleep_until, timeout, Instant},
};

use crate::{
    config::Configuration,
    data_types::{
        progress::{Progress, ProgressRecord, Snapshot},
        vessel::{VesselFix, Voyage},
    },
    error::{FerryError, TelemetryError},
    logln, logvbln, logwarn,
    processors::fix_projector::FixProjector,
    tracking::{activity::ActivityMonitor, cache::FreshnessCache},
    util::time::{secs, Benchmark, MAX_PERIOD},
    wsf::TelemetrySource,
};

// Floor for any computed interval so a zero budget cannot spin the loop.
const MIN_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub struct PollerSettings {
    pub update_frequency: Duration,
    pub idle_after: Duration,
    /// `None` disables staleness compensation.
    pub max_staleness: Option<Duration>,
    pub min_update_interval: Duration,
    pub fetch_timeout: Duration,
    pub minimum_ferries: usize,
}

impl PollerSettings {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            update_frequency: secs(config.update_frequency),
            idle_after: secs(config.idle_after),
            max_staleness: config
                .staleness_compensation()
                .then(|| secs(config.max_data_staleness)),
            min_update_interval: secs(config.min_update_interval),
            fetch_timeout: secs(config.fetch_timeout),
            minimum_ferries: config.minimum_ferries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerPhase {
    Idle,
    Polling,
}

#[derive(Debug, Clone)]
pub struct PollerState {
    pub phase: PollerPhase,
    pub interval: Duration,
    pub last_success: Option<Instant>,
    /// Newest source timestamp among the fixes of the last successful poll.
    pub newest_fix: Option<DateTime<Utc>>,
    pub fetches: u64,
    pub failures: u64,
    pub skipped_ticks: u64,
}

#[derive(Debug, Clone, Copy)]
struct VoyageProgress {
    voyage: Option<Voyage>,
    progress: f64,
}

/// Background loop that keeps the cache fresh while requests keep coming.
pub struct Poller<S: TelemetrySource> {
    source: S,
    projector: FixProjector,
    cache: Arc<FreshnessCache>,
    activity: Arc<ActivityMonitor>,
    settings: PollerSettings,
    state: PollerState,
    voyages: HashMap<String, VoyageProgress>,
}

/// Owner side of a running poller. Dropping it also stops the loop, at its
/// next wait, without waiting for it to finish.
pub struct PollerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    const CC: &'static str = "PollerHandle";

    /// Asks the loop to stop between ticks and waits for it.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            logwarn!("Poller task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<S: TelemetrySource + 'static> Poller<S> {
    const CC: &'static str = "Poller";

    pub fn new(
        source: S,
        projector: FixProjector,
        cache: Arc<FreshnessCache>,
        activity: Arc<ActivityMonitor>,
        settings: PollerSettings,
    ) -> Self {
        let state = PollerState {
            phase: PollerPhase::Polling,
            interval: settings.update_frequency,
            last_success: None,
            newest_fix: None,
            fetches: 0,
            failures: 0,
            skipped_ticks: 0,
        };

        Self {
            source,
            projector,
            cache,
            activity,
            settings,
            state,
            voyages: HashMap::new(),
        }
    }

    pub fn spawn(self) -> PollerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));

        PollerHandle { shutdown, task }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        logln!(
            "Polling every {:?}, idling after {:?} without requests",
            self.settings.update_frequency,
            self.settings.idle_after
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            if self.activity.idle_for() >= self.settings.idle_after {
                if self.state.phase == PollerPhase::Polling {
                    logln!("No requests for {:?}, pausing updates", self.settings.idle_after);
                    self.state.phase = PollerPhase::Idle;
                }

                tokio::select! {
                    _ = self.activity.wait_for_activity() => {}
                    _ = shutdown.changed() => break,
                }
                // Wake-ups from stale permits fall through to the idle check again.
                continue;
            }

            if self.state.phase == PollerPhase::Idle {
                logln!("Request received, resuming updates");
                self.state.phase = PollerPhase::Polling;
            }

            let tick_started = Instant::now();
            match self.poll_once().await {
                Ok(vessels) => logvbln!("Poll #{} updated {} vessels", self.state.fetches, vessels),
                Err(e) => {
                    self.state.failures += 1;
                    logwarn!("Keeping the previous snapshot: {}", e);
                }
            }

            self.state.interval = self.next_interval(Utc::now(), Instant::now());
            let next_tick = self.skip_missed_ticks(tick_started, Instant::now());

            tokio::select! {
                _ = sleep_until(next_tick) => {}
                _ = shutdown.changed() => break,
            }
        }

        logln!(
            "Poller stopped after {} fetches ({} failed)",
            self.state.fetches,
            self.state.failures
        );
    }

    /// One fetch, projection and commit. The cache is untouched on failure.
    pub async fn poll_once(&mut self) -> Result<usize, FerryError> {
        let _bench = Benchmark::start("poll cycle");
        self.state.fetches += 1;

        let fixes = match timeout(self.settings.fetch_timeout, self.source.fetch()).await {
            Ok(fetched) => fetched?,
            Err(_) => return Err(TelemetryError::Timeout(self.settings.fetch_timeout).into()),
        };

        let snapshot = self.assemble(fixes, Utc::now());
        let vessels = snapshot.len();

        self.cache.replace_snapshot(snapshot);
        self.state.last_success = Some(Instant::now());

        Ok(vessels)
    }

    fn assemble(&mut self, fixes: Vec<VesselFix>, now: DateTime<Utc>) -> Snapshot {
        let mut snapshot = Snapshot::new(now);

        if let Some(newest) = fixes.iter().map(|fix| fix.timestamp).max() {
            self.state.newest_fix = Some(newest);
        }

        for fix in &fixes {
            let mut record = self.projector.project(fix, now);
            self.hold_monotonic(fix, &mut record);
            snapshot.insert(record);
        }

        self.voyages.retain(|key, _| snapshot.records.contains_key(key));
        snapshot.fill_to_minimum(self.settings.minimum_ferries, now);

        snapshot
    }

    // Progress on one voyage never moves backwards; a new voyage starts over.
    fn hold_monotonic(&mut self, fix: &VesselFix, record: &mut ProgressRecord) {
        let Some(progress) = record.progress.value() else {
            return;
        };
        let voyage = fix.voyage();

        match self.voyages.get_mut(&record.vessel_key) {
            Some(previous) if voyage.is_some() && previous.voyage == voyage && progress < previous.progress => {
                logvbln!(
                    "{} moved back from {:.4} to {:.4}, holding",
                    fix.name,
                    previous.progress,
                    progress
                );
                record.progress = Progress::Matched(previous.progress);
            }
            Some(previous) => {
                previous.voyage = voyage;
                previous.progress = progress;
            }
            None => {
                self.voyages
                    .insert(record.vessel_key.clone(), VoyageProgress { voyage, progress });
            }
        }
    }

    /// Poll period for the next tick. With staleness compensation on, the
    /// period shrinks so the data never gets older than the budget, but never
    /// below `min_update_interval`.
    pub fn next_interval(&self, now_wall: DateTime<Utc>, now: Instant) -> Duration {
        let base = self.settings.update_frequency.max(MIN_TICK);

        let Some(max_staleness) = self.settings.max_staleness else {
            return base;
        };

        let data_age = match (self.state.newest_fix, self.state.last_success) {
            (Some(newest), _) => (now_wall - newest).to_std().unwrap_or(Duration::ZERO),
            (None, Some(success)) => now.saturating_duration_since(success),
            (None, None) => Duration::ZERO,
        };

        let floor = self.settings.min_update_interval.max(MIN_TICK);
        base.min(max_staleness.saturating_sub(data_age)).max(floor)
    }

    // Ticks that passed during a slow fetch are dropped rather than run late.
    fn skip_missed_ticks(&mut self, tick_started: Instant, now: Instant) -> Instant {
        let interval = self.state.interval.clamp(MIN_TICK, MAX_PERIOD);
        let mut next_tick = tick_started + interval;

        while next_tick <= now {
            next_tick += interval;
            self.state.skipped_ticks += 1;
        }

        next_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_types::progress::Snapshot, processors::route_model::RouteModel, util::geo::GeoUtils,
    };
    use geo_types::Coord;

    struct NoTelemetry;

    #[rocket::async_trait]
    impl TelemetrySource for NoTelemetry {
        async fn fetch(&self) -> Result<Vec<VesselFix>, TelemetryError> {
            Ok(Vec::new())
        }
    }

    const ORIGIN: Coord = Coord { x: -122.4, y: 47.6 };

    fn settings(max_staleness: Option<u64>) -> PollerSettings {
        PollerSettings {
            update_frequency: Duration::from_secs(15),
            idle_after: Duration::from_secs(60),
            max_staleness: max_staleness.map(Duration::from_secs),
            min_update_interval: Duration::from_secs(2),
            fetch_timeout: Duration::from_secs(5),
            minimum_ferries: 2,
        }
    }

    fn poller(max_staleness: Option<u64>) -> Poller<NoTelemetry> {
        let route = RouteModel::build(&[ORIGIN, GeoUtils::offset_north(ORIGIN, 1000.0)], 100.0)
            .unwrap()
            .with_terminals(7, 3);
        let projector = FixProjector::new(Arc::new(route), 500.0);

        Poller::new(
            NoTelemetry,
            projector,
            Arc::new(FreshnessCache::new(Snapshot::default())),
            Arc::new(ActivityMonitor::new()),
            settings(max_staleness),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_interval_without_staleness_budget() {
        let mut poller = poller(None);
        poller.state.newest_fix = Some(Utc::now() - chrono::Duration::seconds(60));

        assert_eq!(poller.next_interval(Utc::now(), Instant::now()), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn staleness_budget_shortens_the_interval() {
        let mut poller = poller(Some(18));
        let now = Utc::now();

        poller.state.newest_fix = Some(now - chrono::Duration::seconds(10));
        assert_eq!(poller.next_interval(now, Instant::now()), Duration::from_secs(8));

        poller.state.newest_fix = Some(now - chrono::Duration::seconds(1));
        assert_eq!(poller.next_interval(now, Instant::now()), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_stops_at_the_floor() {
        let mut poller = poller(Some(18));
        let now = Utc::now();

        poller.state.newest_fix = Some(now - chrono::Duration::seconds(40));
        assert_eq!(poller.next_interval(now, Instant::now()), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn budget_falls_back_to_time_since_last_success() {
        let mut poller = poller(Some(18));
        poller.state.last_success = Some(Instant::now());
        tokio::time::advance(Duration::from_secs(12)).await;

        assert_eq!(poller.next_interval(Utc::now(), Instant::now()), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_ticks_are_skipped_not_stacked() {
        let mut poller = poller(None);
        poller.state.interval = Duration::from_secs(15);

        let started = Instant::now();
        let next = poller.skip_missed_ticks(started, started + Duration::from_secs(40));

        assert_eq!(next, started + Duration::from_secs(45));
        assert_eq!(poller.state.skipped_ticks, 2);
    }

    fn fix(progress_m: f64, voyage: (u32, u32)) -> VesselFix {
        VesselFix {
            vessel_id: 18,
            name: "Puyallup".to_string(),
            position: GeoUtils::offset_north(ORIGIN, progress_m),
            timestamp: Utc::now(),
            departing_terminal: Some(voyage.0),
            arriving_terminal: Some(voyage.1),
            at_dock: false,
            speed: 17.0,
            heading: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn backward_jitter_is_held_on_the_same_voyage() {
        let mut poller = poller(None);

        let first = poller.assemble(vec![fix(500.0, (7, 3))], Utc::now());
        assert!((first.get("18").unwrap().progress.value().unwrap() - 0.5).abs() < 1e-3);

        let jitter = poller.assemble(vec![fix(480.0, (7, 3))], Utc::now());
        assert!((jitter.get("18").unwrap().progress.value().unwrap() - 0.5).abs() < 1e-3);

        let onward = poller.assemble(vec![fix(600.0, (7, 3))], Utc::now());
        assert!((onward.get("18").unwrap().progress.value().unwrap() - 0.6).abs() < 1e-3);
    }

    #[tokio::test(start_paused = true)]
    async fn new_voyage_resets_progress() {
        let mut poller = poller(None);
        poller.assemble(vec![fix(950.0, (7, 3))], Utc::now());

        // Same position on the way back is 5% into the return crossing.
        let back = poller.assemble(vec![fix(950.0, (3, 7))], Utc::now());
        assert!((back.get("18").unwrap().progress.value().unwrap() - 0.05).abs() < 1e-3);
    }

    #[tokio::test(start_paused = true)]
    async fn assembled_snapshots_meet_the_minimum() {
        let mut poller = poller(None);
        let snapshot = poller.assemble(vec![fix(100.0, (7, 3))], Utc::now());

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.defaulted_count(), 1);
        assert!(snapshot.last_updated.is_some());
    }
}
