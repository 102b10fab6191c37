use geo_types::Coord;
use serde_derive::{Deserialize, Serialize};

pub type TerminalId = u32;

/// `[latitude, longitude]` in degrees.
pub type LatLng = [f64; 2];

pub const SEATTLE_TERMINAL: TerminalId = 7;
pub const BAINBRIDGE_TERMINAL: TerminalId = 3;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ReferenceRoute {
    pub name: String,
    pub start_terminal: TerminalId,
    pub end_terminal: TerminalId,
    pub waypoints: Vec<LatLng>,
}

impl ReferenceRoute {
    /// Colman Dock to the Bainbridge Island terminal, following the usual
    /// crossing through Elliott Bay and into Eagle Harbor.
    pub fn seattle_bainbridge() -> Self {
        Self {
            name: "Seattle - Bainbridge Island".to_string(),
            start_terminal: SEATTLE_TERMINAL,
            end_terminal: BAINBRIDGE_TERMINAL,
            waypoints: vec![
                [47.602_680, -122.339_750],
                [47.602_950, -122.345_200],
                [47.603_900, -122.356_800],
                [47.605_700, -122.380_000],
                [47.608_300, -122.412_500],
                [47.610_900, -122.444_000],
                [47.613_000, -122.468_500],
                [47.615_300, -122.485_300],
                [47.618_200, -122.494_600],
                [47.620_400, -122.500_900],
                [47.621_900, -122.505_600],
                [47.622_800, -122.509_300],
            ],
        }
    }

    pub fn coords(&self) -> Vec<Coord> {
        self.waypoints
            .iter()
            .map(|latlng| Coord {
                x: latlng[1],
                y: latlng[0],
            })
            .collect()
    }

    pub fn serves(&self, terminal: TerminalId) -> bool {
        terminal == self.start_terminal || terminal == self.end_terminal
    }
}

impl Default for ReferenceRoute {
    fn default() -> Self {
        ReferenceRoute::seattle_bainbridge()
    }
}
