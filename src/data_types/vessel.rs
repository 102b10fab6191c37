use chrono::{DateTime, Utc};
use geo_types::Coord;
use serde_derive::{Deserialize, Serialize};

use super::route::TerminalId;

pub type VesselId = u32;

/// Crossing identified by (departing, arriving) terminal.
pub type Voyage = (TerminalId, TerminalId);

#[derive(Debug, Clone, PartialEq)]
pub struct VesselFix {
    pub vessel_id: VesselId,
    pub name: String,
    pub position: Coord,
    pub timestamp: DateTime<Utc>,

    pub departing_terminal: Option<TerminalId>,
    pub arriving_terminal: Option<TerminalId>,
    pub at_dock: bool,
    pub speed: f64,
    pub heading: f64,
}

impl VesselFix {
    pub fn key(&self) -> String {
        self.vessel_id.to_string()
    }

    pub fn voyage(&self) -> Option<Voyage> {
        Some((self.departing_terminal?, self.arriving_terminal?))
    }
}

/// Direction of travel relative to the order of the route's waypoints.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    FromStart,
    FromEnd,
    #[default]
    Unknown,
}

impl Direction {
    pub fn of(fix: &VesselFix, start_terminal: TerminalId, end_terminal: TerminalId) -> Self {
        if fix.departing_terminal == Some(start_terminal) || fix.arriving_terminal == Some(end_terminal) {
            Direction::FromStart
        } else if fix.departing_terminal == Some(end_terminal) || fix.arriving_terminal == Some(start_terminal) {
            Direction::FromEnd
        } else {
            Direction::Unknown
        }
    }

    /// Turns progress measured from the route start into progress measured
    /// from the terminal the vessel departed.
    pub fn orient(self, route_progress: f64) -> f64 {
        match self {
            Direction::FromEnd => 1.0 - route_progress,
            Direction::FromStart | Direction::Unknown => route_progress,
        }
    }
}
