use geo_types::Coord;
use serde_derive::Serialize;

use crate::{
    data_types::route::{ReferenceRoute, TerminalId},
    error::FerryError,
    logln,
    util::{geo::GeoUtils, time::Benchmark},
};

// Keeps float noise from turning an exact multiple of the max length into an
// extra sliver segment.
const SUBDIVISION_SLACK: f64 = 1e-9;

#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Coord,
    pub end: Coord,
    /// Distance from the route start to `start`, in metres.
    pub start_distance: f64,
    pub length: f64,
}

impl Segment {
    pub fn end_distance(&self) -> f64 {
        self.start_distance + self.length
    }

    pub fn midpoint(&self) -> Coord {
        GeoUtils::interpolate(self.start, self.end, 0.5)
    }
}

/// The reference route cut into short, contiguous segments. Built once at
/// startup and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct RouteModel {
    segments: Vec<Segment>,
    total_length: f64,
    terminals: Option<(TerminalId, TerminalId)>,
}

impl RouteModel {
    const CC: &'static str = "RouteModel";

    pub fn build(waypoints: &[Coord], max_segment_length: f64) -> Result<Self, FerryError> {
        if waypoints.len() < 2 {
            return Err(FerryError::InvalidRoute(format!(
                "a route needs at least two waypoints, got {}",
                waypoints.len()
            )));
        }

        if !max_segment_length.is_finite() || max_segment_length <= 0.0 {
            return Err(FerryError::InvalidRoute(format!(
                "maximum segment size must be a positive number of metres, got {}",
                max_segment_length
            )));
        }

        if let Some(bad) = waypoints.iter().find(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(FerryError::InvalidRoute(format!("waypoint {:?} is not a coordinate", bad)));
        }

        let _bench = Benchmark::start("route model build");

        let mut segments: Vec<Segment> = Vec::new();
        let mut covered = 0.0;

        waypoints.windows(2).for_each(|pair| {
            RouteModel::subdivide(pair[0], pair[1], max_segment_length)
                .windows(2)
                .for_each(|piece| {
                    let length = GeoUtils::distance(piece[0], piece[1]);
                    segments.push(Segment {
                        start: piece[0],
                        end: piece[1],
                        start_distance: covered,
                        length,
                    });

                    covered += length;
                });
        });

        if covered <= 0.0 {
            return Err(FerryError::InvalidRoute("route has zero length".to_string()));
        }

        let model = Self {
            segments,
            total_length: covered,
            terminals: None,
        };

        logln!(
            "Built route model: {} waypoints -> {} segments, {:.0}m long",
            waypoints.len(),
            model.segments.len(),
            model.total_length
        );

        Ok(model)
    }

    pub fn from_reference(route: &ReferenceRoute, max_segment_length: f64) -> Result<Self, FerryError> {
        let model = RouteModel::build(&route.coords(), max_segment_length)?;
        Ok(model.with_terminals(route.start_terminal, route.end_terminal))
    }

    pub fn with_terminals(mut self, start: TerminalId, end: TerminalId) -> Self {
        self.terminals = Some((start, end));
        self
    }

    // A pair already shorter than the max length stays a single segment.
    fn pieces_between(distance: f64, max_segment_length: f64) -> usize {
        let pieces = (distance / max_segment_length * (1.0 - SUBDIVISION_SLACK)).ceil();
        pieces.max(1.0) as usize
    }

    /// Evenly interpolated points from `from` to `to`, both included. Linear
    /// interpolation in degrees is not perfectly even in metres, so the piece
    /// count grows until every piece fits.
    fn subdivide(from: Coord, to: Coord, max_segment_length: f64) -> Vec<Coord> {
        let limit = max_segment_length * (1.0 + SUBDIVISION_SLACK);
        let mut pieces = RouteModel::pieces_between(GeoUtils::distance(from, to), max_segment_length);

        loop {
            let points: Vec<Coord> = (0..=pieces)
                .map(|piece| match piece {
                    0 => from,
                    p if p == pieces => to,
                    p => GeoUtils::interpolate(from, to, p as f64 / pieces as f64),
                })
                .collect();

            if points.windows(2).all(|w| GeoUtils::distance(w[0], w[1]) <= limit) {
                return points;
            }
            pieces += 1;
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn total_length(&self) -> f64 {
        self.total_length
    }

    pub fn terminals(&self) -> Option<(TerminalId, TerminalId)> {
        self.terminals
    }

    /// Dense coordinate list: every segment start plus the final end.
    pub fn coordinates(&self) -> Vec<Coord> {
        let mut coords: Vec<Coord> = self.segments.iter().map(|segment| segment.start).collect();
        if let Some(last) = self.segments.last() {
            coords.push(last.end);
        }
        coords
    }

    pub fn polyline(&self) -> Result<String, String> {
        GeoUtils::encode_polyline(&self.coordinates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Coord = Coord { x: -122.4, y: 47.6 };

    #[test]
    fn pieces_round_up_but_not_on_exact_multiples() {
        assert_eq!(RouteModel::pieces_between(1000.0, 100.0), 10);
        assert_eq!(RouteModel::pieces_between(1000.5, 100.0), 11);
        assert_eq!(RouteModel::pieces_between(40.0, 100.0), 1);
        assert_eq!(RouteModel::pieces_between(0.0, 100.0), 1);
    }

    #[test]
    fn segments_are_contiguous() {
        let waypoints = vec![
            ORIGIN,
            GeoUtils::offset_north(ORIGIN, 750.0),
            GeoUtils::offset_east(GeoUtils::offset_north(ORIGIN, 750.0), 420.0),
        ];
        let model = RouteModel::build(&waypoints, 100.0).unwrap();

        model.segments().windows(2).for_each(|pair| {
            assert_eq!(pair[0].end, pair[1].start);
            assert!((pair[0].end_distance() - pair[1].start_distance).abs() < 1e-9);
        });

        let last = model.segments().last().unwrap();
        assert!((last.end_distance() - model.total_length()).abs() < 1e-9);
        assert_eq!(model.coordinates().len(), model.segments().len() + 1);
    }

    #[test]
    fn rejects_non_positive_segment_size() {
        let waypoints = vec![ORIGIN, GeoUtils::offset_north(ORIGIN, 100.0)];
        assert!(matches!(RouteModel::build(&waypoints, 0.0), Err(FerryError::InvalidRoute(_))));
        assert!(matches!(RouteModel::build(&waypoints, f64::NAN), Err(FerryError::InvalidRoute(_))));
    }

    #[test]
    fn rejects_zero_length_routes() {
        assert!(matches!(RouteModel::build(&[ORIGIN, ORIGIN], 10.0), Err(FerryError::InvalidRoute(_))));
    }

    #[test]
    fn builtin_route_keeps_its_terminals() {
        let reference = ReferenceRoute::seattle_bainbridge();
        let model = RouteModel::from_reference(&reference, 10.0).unwrap();

        assert_eq!(model.terminals(), Some((reference.start_terminal, reference.end_terminal)));
        // Roughly 13km across the sound
        assert!(model.total_length() > 10_000.0 && model.total_length() < 16_000.0);
        assert!(model.segments().iter().all(|s| s.length <= 10.0 + 1e-6));
    }
}
