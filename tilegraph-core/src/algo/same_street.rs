//! Heuristic deciding whether two dangling street ends continue each other.

use geo::{Coord, Distance, Euclidean, LineString, Point};
use serde::{Deserialize, Serialize};

use super::geometry::{approach_direction, line_offset};
use crate::model::Endpoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SameStreetThresholds {
    pub max_distance_m: f64,
    pub max_angle_deg: f64,
    pub max_offset_m: f64,
}

impl Default for SameStreetThresholds {
    fn default() -> Self {
        Self {
            max_distance_m: 150_000.0,
            max_angle_deg: 30.0,
            max_offset_m: 250.0,
        }
    }
}

/// Returns true when the end `a_end` of `a` and the end `b_end` of `b` look
/// like two pieces of the same straight street with a gap in between.
///
/// The last steps arriving at the two ends must be antiparallel and each
/// must point at the other end (within `max_angle_deg`). The two lines may
/// be offset sideways by at most `max_offset_m`.
pub fn same_street(
    a: &LineString<f64>,
    a_end: Endpoint,
    b: &LineString<f64>,
    b_end: Endpoint,
    units_per_meter: f64,
    thresholds: &SameStreetThresholds,
) -> bool {
    let (Some(ca), Some(cb)) = (endpoint_coord(a, a_end), endpoint_coord(b, b_end)) else {
        return false;
    };
    let max_dist = thresholds.max_distance_m * units_per_meter;
    let gap = Euclidean.distance(Point::from(ca), Point::from(cb));
    if gap > max_dist {
        return false;
    }
    let (Some(va), Some(vb)) = (approach_direction(a, a_end), approach_direction(b, b_end)) else {
        return false;
    };
    // continuing lines leave their ends in opposite directions
    if angle_deg(va, -vb) > thresholds.max_angle_deg {
        return false;
    }
    if gap > 0.0
        && (angle_deg(va, cb - ca) > thresholds.max_angle_deg
            || angle_deg(vb, ca - cb) > thresholds.max_angle_deg)
    {
        return false;
    }
    let offset = (line_offset(cb, ca, va) + line_offset(ca, cb, vb)) / 2.0;
    offset < thresholds.max_offset_m * units_per_meter
}

/// Angle between two non-zero vectors in degrees, `0..=180`.
fn angle_deg(u: Coord<f64>, v: Coord<f64>) -> f64 {
    (u.x * v.y - u.y * v.x)
        .atan2(u.x * v.x + u.y * v.y)
        .abs()
        .to_degrees()
}

fn endpoint_coord(line: &LineString<f64>, endpoint: Endpoint) -> Option<Coord<f64>> {
    match endpoint {
        Endpoint::Zero => line.0.first().copied(),
        Endpoint::One => line.0.last().copied(),
    }
}
