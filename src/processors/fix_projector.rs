use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo_types::Coord;

use crate::{
    data_types::{
        progress::{Progress, ProgressRecord},
        vessel::{Direction, VesselFix},
    },
    logvbln,
    processors::route_model::RouteModel,
    util::geo::GeoUtils,
};

/// Fixes farther than this from every segment are reported as `NoData`.
pub const DEFAULT_MAX_MATCH_DISTANCE_M: f64 = 1000.0;

// Two candidates closer than this are a tie; the earlier segment wins.
const TIE_TOLERANCE_M: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteMatch {
    pub segment_index: usize,
    /// Fix to projected point, in metres.
    pub distance_m: f64,
    /// Route start to projected point, in metres.
    pub along_m: f64,
    /// `along_m` over the total route length, in [0, 1].
    pub progress: f64,
}

#[derive(Clone)]
pub struct FixProjector {
    route: Arc<RouteModel>,
    max_match_distance: f64,
}

impl FixProjector {
    const CC: &'static str = "FixProjector";

    pub fn new(route: Arc<RouteModel>, max_match_distance: f64) -> Self {
        Self {
            route,
            max_match_distance,
        }
    }

    pub fn route(&self) -> &Arc<RouteModel> {
        &self.route
    }

    /// Nearest segment to `position`, whatever the distance.
    pub fn nearest(&self, position: Coord) -> Option<RouteMatch> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return None;
        }

        let mut best: Option<RouteMatch> = None;

        for (segment_index, segment) in self.route.segments().iter().enumerate() {
            let (t, distance_m) = GeoUtils::project_onto_segment(segment.start, segment.end, position);

            let closer = match &best {
                None => true,
                Some(current) => distance_m < current.distance_m - TIE_TOLERANCE_M,
            };

            if closer {
                let along_m = segment.start_distance + t * segment.length;
                best = Some(RouteMatch {
                    segment_index,
                    distance_m,
                    along_m,
                    progress: (along_m / self.route.total_length()).clamp(0.0, 1.0),
                });
            }
        }

        best
    }

    /// Nearest segment, or `None` when the fix is off the route.
    pub fn locate(&self, position: Coord) -> Option<RouteMatch> {
        self.within_threshold(self.nearest(position))
    }

    fn within_threshold(&self, nearest: Option<RouteMatch>) -> Option<RouteMatch> {
        nearest.filter(|found| found.distance_m <= self.max_match_distance)
    }

    pub fn project(&self, fix: &VesselFix, computed_at: DateTime<Utc>) -> ProgressRecord {
        let direction = match self.route.terminals() {
            Some((start, end)) => Direction::of(fix, start, end),
            None => Direction::Unknown,
        };

        let nearest = self.nearest(fix.position);
        let located = self.within_threshold(nearest);

        if located.is_none() {
            logvbln!(
                "{} ({}) is {:.0}m from the route, reporting no data",
                fix.name,
                fix.vessel_id,
                nearest.map_or(f64::NAN, |n| n.distance_m)
            );
        }

        ProgressRecord {
            vessel_key: fix.key(),
            vessel_name: fix.name.clone(),
            progress: located.map_or(Progress::NoData, |found| {
                Progress::Matched(direction.orient(found.progress))
            }),
            direction,
            at_dock: fix.at_dock,
            defaulted: false,
            computed_at,
            source_timestamp: Some(fix.timestamp),
            position: Some(fix.position),
            segment_index: located.map(|found| found.segment_index),
            match_distance_m: nearest.map(|found| found.distance_m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Coord = Coord { x: -122.4, y: 47.6 };

    fn straight_route() -> Arc<RouteModel> {
        let waypoints = vec![ORIGIN, GeoUtils::offset_north(ORIGIN, 1000.0)];
        Arc::new(RouteModel::build(&waypoints, 100.0).unwrap())
    }

    #[test]
    fn side_offset_does_not_change_progress() {
        let projector = FixProjector::new(straight_route(), DEFAULT_MAX_MATCH_DISTANCE_M);
        let fix = GeoUtils::offset_east(GeoUtils::offset_north(ORIGIN, 250.0), 80.0);

        let found = projector.locate(fix).unwrap();
        assert!((found.progress - 0.25).abs() < 1e-3);
        assert!((found.distance_m - 80.0).abs() < 0.1);
        assert_eq!(found.segment_index, 2);
    }

    #[test]
    fn points_past_the_ends_clamp() {
        let projector = FixProjector::new(straight_route(), DEFAULT_MAX_MATCH_DISTANCE_M);

        let before = projector.locate(GeoUtils::offset_north(ORIGIN, -50.0)).unwrap();
        assert_eq!(before.progress, 0.0);

        let after = projector.locate(GeoUtils::offset_north(ORIGIN, 1050.0)).unwrap();
        assert_eq!(after.progress, 1.0);
    }

    #[test]
    fn non_finite_positions_never_match() {
        let projector = FixProjector::new(straight_route(), DEFAULT_MAX_MATCH_DISTANCE_M);
        assert!(projector.nearest(Coord { x: f64::NAN, y: 47.6 }).is_none());
    }

    #[test]
    fn threshold_is_inclusive() {
        let projector = FixProjector::new(straight_route(), 100.0);
        let near = GeoUtils::offset_east(GeoUtils::offset_north(ORIGIN, 500.0), 99.0);
        let far = GeoUtils::offset_east(GeoUtils::offset_north(ORIGIN, 500.0), 101.0);

        assert!(projector.locate(near).is_some());
        assert!(projector.locate(far).is_none());
    }

    #[test]
    fn project_and_locate_agree_on_the_threshold() {
        let projector = FixProjector::new(straight_route(), 100.0);

        for offset in [0.0, 50.0, 99.0, 101.0, 250.0] {
            let position = GeoUtils::offset_east(GeoUtils::offset_north(ORIGIN, 500.0), offset);
            let fix = VesselFix {
                vessel_id: 1,
                name: "Tillikum".to_string(),
                position,
                timestamp: Utc::now(),
                departing_terminal: None,
                arriving_terminal: None,
                at_dock: false,
                speed: 0.0,
                heading: 0.0,
            };

            let record = projector.project(&fix, Utc::now());
            assert_eq!(record.progress.is_matched(), projector.locate(position).is_some());
            assert_eq!(record.segment_index, projector.locate(position).map(|m| m.segment_index));
        }
    }
}
