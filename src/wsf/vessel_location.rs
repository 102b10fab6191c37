use geo_types::Coord;
use serde_derive::Deserialize;

use crate::{
    data_types::{
        route::TerminalId,
        vessel::{VesselFix, VesselId},
    },
    util::DateTimeUtils,
};

/// One entry of the WSF `vessellocations` response. Only the fields the
/// tracker needs are kept.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct VesselLocation {
    #[serde(rename = "VesselID")]
    pub vessel_id: VesselId,
    pub vessel_name: String,

    #[serde(rename = "DepartingTerminalID", default)]
    pub departing_terminal_id: Option<TerminalId>,
    #[serde(rename = "ArrivingTerminalID", default)]
    pub arriving_terminal_id: Option<TerminalId>,

    pub latitude: f64,
    pub longitude: f64,

    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub heading: f64,
    #[serde(default = "default_in_service")]
    pub in_service: bool,
    #[serde(default)]
    pub at_dock: bool,

    pub time_stamp: String,
}

fn default_in_service() -> bool {
    true
}

impl VesselLocation {
    pub fn touches_terminal(&self, terminal: TerminalId) -> bool {
        self.departing_terminal_id == Some(terminal) || self.arriving_terminal_id == Some(terminal)
    }

    /// `None` when the timestamp cannot be read.
    pub fn to_fix(&self) -> Option<VesselFix> {
        Some(VesselFix {
            vessel_id: self.vessel_id,
            name: self.vessel_name.clone(),
            position: Coord {
                x: self.longitude,
                y: self.latitude,
            },
            timestamp: DateTimeUtils::wsf_date_to_utc(&self.time_stamp)?,
            departing_terminal: self.departing_terminal_id,
            arriving_terminal: self.arriving_terminal_id,
            at_dock: self.at_dock,
            speed: self.speed,
            heading: self.heading,
        })
    }
}
