use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{ConvexHull, Coord, MultiPoint, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::model::MapFeature;
use crate::store::ItemStore;

/// Where a coordinate lies relative to the tile boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BoundaryPosition {
    Outside = 0,
    OnBoundary = 1,
    Inside = 2,
}

/// Outline of the area a tile covers.
#[derive(Debug, Clone, PartialEq)]
pub struct TileBoundary {
    polygon: Polygon<f64>,
}

impl TileBoundary {
    pub fn new(polygon: Polygon<f64>) -> Self {
        Self { polygon }
    }

    /// Convex hull of every coordinate in the store, `None` for fewer than
    /// three coordinates.
    pub fn convex_hull(store: &ItemStore) -> Option<Self> {
        let points: MultiPoint<f64> = store
            .iter()
            .flat_map(|(_, f)| f.geometry().iter().flat_map(|ring| ring.points()))
            .collect::<Vec<Point<f64>>>()
            .into();
        if points.0.len() < 3 {
            return None;
        }
        Some(Self::new(points.convex_hull()))
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn classify(&self, coord: Coord<f64>) -> BoundaryPosition {
        match self.polygon.coordinate_position(&coord) {
            CoordPos::Outside => BoundaryPosition::Outside,
            CoordPos::OnBoundary => BoundaryPosition::OnBoundary,
            CoordPos::Inside => BoundaryPosition::Inside,
        }
    }
}
