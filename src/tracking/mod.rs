pub mod activity;
pub mod cache;
pub mod poller;
pub mod query;

pub use activity::ActivityMonitor;
pub use cache::FreshnessCache;
pub use poller::{Poller, PollerHandle, PollerPhase, PollerSettings};
pub use query::QuerySurface;
