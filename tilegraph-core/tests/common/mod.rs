#![allow(dead_code)]

use geo::{Coord, LineString};
use tilegraph_core::prelude::*;

pub fn line(coords: &[(f64, f64)]) -> LineString<f64> {
    LineString::new(coords.iter().map(|&(x, y)| Coord { x, y }).collect())
}

pub fn street(name: &str, coords: &[(f64, f64)]) -> StreetSegment {
    let mut segment = StreetSegment::new(line(coords));
    if !name.is_empty() {
        segment.base.names.push(Name::official("en", name));
    }
    segment
}

pub fn builder() -> TileBuilder {
    TileBuilder::new(TileConfig::default())
}

/// `n` by `n` grid of 100 m blocks, horizontal streets named by row.
pub fn grid(builder: &mut TileBuilder, n: usize) -> Vec<FeatureId> {
    let mut ids = Vec::new();
    for i in 0..n {
        for j in 0..n - 1 {
            let (x0, x1, y) = (j as f64 * 100.0, (j + 1) as f64 * 100.0, i as f64 * 100.0);
            let name = format!("Row {i}");
            ids.push(
                builder
                    .add_feature(street(&name, &[(x0, y), (x1, y)]))
                    .unwrap(),
            );
            ids.push(
                builder
                    .add_feature(street("", &[(y, x0), (y, x1)]))
                    .unwrap(),
            );
        }
    }
    ids
}
