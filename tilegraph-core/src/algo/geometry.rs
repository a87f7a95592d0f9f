//! Direction helpers for street ends, in map units.
//!
//! Distances and lengths come from `geo`'s [`Euclidean`](geo::Euclidean)
//! metric space; only what it lacks lives here.

use geo::{Coord, LineString};

use crate::model::Endpoint;

/// Direction of the last vertex step arriving at `endpoint` of `line`.
pub fn approach_direction(line: &LineString<f64>, endpoint: Endpoint) -> Option<Coord<f64>> {
    let coords = &line.0;
    let n = coords.len();
    if n < 2 {
        return None;
    }
    let dir = match endpoint {
        Endpoint::Zero => coords[0] - coords[1],
        Endpoint::One => coords[n - 1] - coords[n - 2],
    };
    (dir.x != 0.0 || dir.y != 0.0).then_some(dir)
}

/// Perpendicular distance from `p` to the infinite line through `origin`
/// along `dir`.
pub fn line_offset(p: Coord<f64>, origin: Coord<f64>, dir: Coord<f64>) -> f64 {
    let d = p - origin;
    (dir.x * d.y - dir.y * d.x).abs() / (dir.x * dir.x + dir.y * dir.y).sqrt()
}
