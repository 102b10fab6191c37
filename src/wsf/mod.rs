use crate::{data_types::vessel::VesselFix, error::TelemetryError};

pub mod api;
pub mod vessel_location;

pub use api::WsfClient;

/// Anything that can produce the current set of vessel fixes for the route.
#[rocket::async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<VesselFix>, TelemetryError>;
}
