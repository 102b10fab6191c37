use std::sync::Arc;

use chrono::Utc;

use config::Configuration;
use data_types::progress::Snapshot;
use error::FerryError;
use processors::{fix_projector::FixProjector, route_model::RouteModel};
use tracking::{ActivityMonitor, FreshnessCache, Poller, PollerHandle, PollerSettings, QuerySurface};
use wsf::TelemetrySource;

pub mod config;
pub mod data_types;
pub mod error;
pub mod processors;
pub mod server;
pub mod tracking;
pub mod util;
pub mod wsf;

/// The wired-up service: the route model, the cache and the activity signal
/// shared by the poller and the request handlers.
pub struct FerryTracker {
    config: Arc<Configuration>,
    route: Arc<RouteModel>,
    cache: Arc<FreshnessCache>,
    activity: Arc<ActivityMonitor>,
}

impl FerryTracker {
    const CC: &'static str = "FerryTracker";

    pub fn new(config: Configuration) -> Result<Self, FerryError> {
        config.validate()?;

        if !config.route.serves(config.terminal) {
            logwarn!(
                "Terminal {} is not an end of the {} route, progress will be meaningless",
                config.terminal,
                config.route.name
            );
        }

        let route = RouteModel::from_reference(&config.route, config.subdivided_segment_max_size)?;
        let cache = FreshnessCache::new(Snapshot::placeholders(config.minimum_ferries, Utc::now()));

        logln!("Tracking terminal {} on the {} route", config.terminal, config.route.name);

        Ok(Self {
            config: Arc::new(config),
            route: Arc::new(route),
            cache: Arc::new(cache),
            activity: Arc::new(ActivityMonitor::new()),
        })
    }

    pub fn config(&self) -> &Arc<Configuration> {
        &self.config
    }

    pub fn route(&self) -> &Arc<RouteModel> {
        &self.route
    }

    pub fn cache(&self) -> &Arc<FreshnessCache> {
        &self.cache
    }

    pub fn activity(&self) -> &Arc<ActivityMonitor> {
        &self.activity
    }

    pub fn projector(&self) -> FixProjector {
        FixProjector::new(Arc::clone(&self.route), self.config.max_match_distance)
    }

    pub fn query_surface(&self) -> QuerySurface {
        QuerySurface::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.activity),
            self.config.minimum_ferries,
        )
    }

    pub fn poller<S: TelemetrySource + 'static>(&self, source: S) -> Poller<S> {
        Poller::new(
            source,
            self.projector(),
            Arc::clone(&self.cache),
            Arc::clone(&self.activity),
            PollerSettings::from_config(&self.config),
        )
    }

    /// Starts the background poller. Must be called inside a tokio runtime.
    pub fn start_poller<S: TelemetrySource + 'static>(&self, source: S) -> PollerHandle {
        self.poller(source).spawn()
    }
}
