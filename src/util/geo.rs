use geo_types::Coord;

// Coordinates are `x = longitude`, `y = latitude`, in degrees.

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point in a local tangent plane, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarPoint {
    pub east: f64,
    pub north: f64,
}

pub struct GeoUtils;

impl GeoUtils {
    /// Great-circle distance in metres (haversine).
    pub fn distance(p1: Coord, p2: Coord) -> f64 {
        let lat1 = GeoUtils::deg2rad(p1.y);
        let lat2 = GeoUtils::deg2rad(p2.y);
        let d_lat = lat2 - lat1;
        let d_long = GeoUtils::deg2rad(p2.x - p1.x);

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_long / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }

    pub fn deg2rad(deg: f64) -> f64 {
        deg * std::f64::consts::PI / 180.0
    }

    pub fn rad2deg(rad: f64) -> f64 {
        rad * 180.0 / std::f64::consts::PI
    }

    /// Linear interpolation between two coordinates, `t` in [0, 1].
    pub fn interpolate(from: Coord, to: Coord, t: f64) -> Coord {
        Coord {
            x: from.x + (to.x - from.x) * t,
            y: from.y + (to.y - from.y) * t,
        }
    }

    /// Equirectangular projection of `point` around `origin`. Accurate to well
    /// under a metre over the few kilometres a single segment spans.
    pub fn to_local_plane(origin: Coord, point: Coord) -> PlanarPoint {
        let mean_lat = GeoUtils::deg2rad((origin.y + point.y) / 2.0);

        PlanarPoint {
            east: GeoUtils::deg2rad(point.x - origin.x) * mean_lat.cos() * EARTH_RADIUS_M,
            north: GeoUtils::deg2rad(point.y - origin.y) * EARTH_RADIUS_M,
        }
    }

    /// Clamped projection of `point` onto the segment `start`-`end`.
    /// Returns the segment parameter in [0, 1] and the distance in metres from
    /// `point` to the projected position.
    pub fn project_onto_segment(start: Coord, end: Coord, point: Coord) -> (f64, f64) {
        let seg = GeoUtils::to_local_plane(start, end);
        let pnt = GeoUtils::to_local_plane(start, point);

        let seg_len_sq = seg.east * seg.east + seg.north * seg.north;
        let t = if seg_len_sq <= f64::EPSILON {
            0.0
        } else {
            ((pnt.east * seg.east + pnt.north * seg.north) / seg_len_sq).clamp(0.0, 1.0)
        };

        let d_east = pnt.east - seg.east * t;
        let d_north = pnt.north - seg.north * t;

        (t, (d_east * d_east + d_north * d_north).sqrt())
    }

    /// Point `meters` due north of `from`.
    pub fn offset_north(from: Coord, meters: f64) -> Coord {
        Coord {
            x: from.x,
            y: from.y + GeoUtils::rad2deg(meters / EARTH_RADIUS_M),
        }
    }

    /// Point `meters` due east of `from`.
    pub fn offset_east(from: Coord, meters: f64) -> Coord {
        let lat = GeoUtils::deg2rad(from.y);
        Coord {
            x: from.x + GeoUtils::rad2deg(meters / (EARTH_RADIUS_M * lat.cos())),
            y: from.y,
        }
    }

    pub fn encode_polyline(coords: &[Coord]) -> Result<String, String> {
        polyline::encode_coordinates(coords.iter().copied(), 5)
    }
}
