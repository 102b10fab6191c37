#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use ferry_progress::{
    config::Configuration,
    data_types::{route::ReferenceRoute, vessel::VesselFix},
    error::TelemetryError,
    util::geo::GeoUtils,
    wsf::TelemetrySource,
};
use geo_types::Coord;
use parking_lot::Mutex;

pub const ORIGIN: Coord = Coord { x: -122.4, y: 47.6 };
pub const START_TERMINAL: u32 = 7;
pub const END_TERMINAL: u32 = 3;

/// Counters shared between a test and the source it handed to the poller.
#[derive(Clone, Default)]
pub struct SourceProbe {
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SourceProbe {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

// Decrements on drop so fetches abandoned by a timeout are accounted for.
struct InFlight<'a>(&'a SourceProbe);

impl<'a> InFlight<'a> {
    fn enter(probe: &'a SourceProbe) -> Self {
        let now = probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        probe.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(probe)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Plays back scripted results, then keeps answering with `fallback`.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Vec<VesselFix>, TelemetryError>>>,
    fallback: Vec<VesselFix>,
    delay: Option<Duration>,
    probe: SourceProbe,
}

impl ScriptedSource {
    pub fn new(fallback: Vec<VesselFix>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: None,
            probe: SourceProbe::default(),
        }
    }

    pub fn then(self, result: Result<Vec<VesselFix>, TelemetryError>) -> Self {
        self.script.lock().push_back(result);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }
}

#[rocket::async_trait]
impl TelemetrySource for ScriptedSource {
    async fn fetch(&self) -> Result<Vec<VesselFix>, TelemetryError> {
        self.probe.calls.fetch_add(1, Ordering::SeqCst);
        let _in_flight = InFlight::enter(&self.probe);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// A straight 1 km route running due north from `ORIGIN`.
pub fn straight_route() -> ReferenceRoute {
    let end = GeoUtils::offset_north(ORIGIN, 1000.0);

    ReferenceRoute {
        name: "Test crossing".to_string(),
        start_terminal: START_TERMINAL,
        end_terminal: END_TERMINAL,
        waypoints: vec![[ORIGIN.y, ORIGIN.x], [end.y, end.x]],
    }
}

/// Deterministic timing: one poll per second, idle after five, no
/// staleness compensation.
pub fn test_config() -> Configuration {
    Configuration {
        access_code: "test-access-code".to_string(),
        bind: "127.0.0.1:0".to_string(),
        terminal: START_TERMINAL,
        update_frequency: 1.0,
        idle_after: 5.0,
        subdivided_segment_max_size: 100.0,
        minimum_ferries: 2,
        max_data_staleness: -1.0,
        min_update_interval: 0.5,
        fetch_timeout: 2.0,
        route: straight_route(),
        ..Configuration::default()
    }
}

pub fn fix_at(vessel_id: u32, meters_north: f64, departing: u32, arriving: u32) -> VesselFix {
    VesselFix {
        vessel_id,
        name: format!("Vessel {}", vessel_id),
        position: GeoUtils::offset_north(ORIGIN, meters_north),
        timestamp: Utc::now(),
        departing_terminal: Some(departing),
        arriving_terminal: Some(arriving),
        at_dock: false,
        speed: 15.0,
        heading: 0.0,
    }
}
