//! JSON rendering of a compiled tile.

use std::io::Write;

use serde::Serialize;
use tilegraph_core::model::{
    CrossingKind, Endpoint, EntryRestriction, FeatureKind, JunctionType, MapFeature, Name, NodeRef,
    TurnDirection,
};
use tilegraph_core::spatial::BoundaryPosition;
use tilegraph_core::{BuildStats, ExternalConnection, TileBuilder};

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct TileDocument<'a> {
    pub features: Vec<FeatureRecord<'a>>,
    pub nodes: Vec<NodeRecord>,
    pub boundary_segments: Vec<BoundaryRecord<'a>>,
    pub multi_connections: Vec<MultiConnectionRecord>,
    pub streets: Vec<StreetRecord<'a>>,
    pub stats: &'a BuildStats,
}

#[derive(Debug, Serialize)]
pub struct FeatureRecord<'a> {
    pub id: u32,
    pub kind: FeatureKind,
    pub names: &'a [Name],
    pub groups: &'a [u32],
    pub coordinates: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Serialize)]
pub struct NodeRecord {
    pub id: u32,
    pub level: i8,
    pub junction: JunctionType,
    pub entry: EntryRestriction,
    pub speed_limit: u8,
    pub connections: Vec<ConnectionRecord>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionRecord {
    pub to: u32,
    pub restriction: u16,
    pub turn: TurnDirection,
    pub crossing: CrossingKind,
    pub cost: u32,
}

#[derive(Debug, Serialize)]
pub struct BoundaryRecord<'a> {
    pub virtual_id: u32,
    pub real: u32,
    pub close_node: u32,
    /// Position of the segment relative to the tile outline
    pub position: Option<BoundaryPosition>,
    pub external: [&'a [ExternalConnection]; 2],
}

#[derive(Debug, Serialize)]
pub struct MultiConnectionRecord {
    pub first: u32,
    pub last: u32,
    pub via: Vec<u32>,
}

#[derive(Debug, Serialize)]
pub struct StreetRecord<'a> {
    pub id: u32,
    pub names: &'a [Name],
    pub segments: Vec<u32>,
}

fn packed(nodes: &[NodeRef]) -> Vec<u32> {
    nodes.iter().map(|n| n.packed()).collect()
}

/// Collects everything the builder knows about the tile.
pub fn tile_document(builder: &TileBuilder) -> TileDocument<'_> {
    let store = builder.store();
    let mut features = Vec::new();
    let mut nodes = Vec::new();
    for (id, feature) in store.iter() {
        features.push(FeatureRecord {
            id: id.packed(),
            kind: feature.kind(),
            names: feature.names(),
            groups: feature.groups(),
            coordinates: feature
                .geometry()
                .iter()
                .map(|line| line.coords().map(|c| [c.x, c.y]).collect())
                .collect(),
        });
        let Some(feature_nodes) = feature.nodes() else {
            continue;
        };
        for endpoint in Endpoint::BOTH {
            let node = &feature_nodes[endpoint.index()];
            nodes.push(NodeRecord {
                id: NodeRef::new(id, endpoint).packed(),
                level: node.level,
                junction: node.junction,
                entry: node.entry,
                speed_limit: node.speed_limit,
                connections: node
                    .connections()
                    .iter()
                    .map(|c| ConnectionRecord {
                        to: c.to.packed(),
                        restriction: c.restriction.bits(),
                        turn: c.turn,
                        crossing: c.crossing,
                        cost: c.cost,
                    })
                    .collect(),
            });
        }
    }

    let outline = builder.tile_boundary();
    let boundary_segments = builder
        .boundary()
        .iter()
        .map(|segment| {
            let close = segment.close_node();
            let position = outline.as_ref().and_then(|outline| {
                let feature = store.get(segment.virtual_id).ok()?;
                let coord = feature.endpoints()?[close.endpoint.index()];
                Some(outline.classify(coord))
            });
            BoundaryRecord {
                virtual_id: segment.virtual_id.packed(),
                real: segment.real.packed(),
                close_node: close.packed(),
                position,
                external: [
                    segment.external(Endpoint::Zero),
                    segment.external(Endpoint::One),
                ],
            }
        })
        .collect();

    let multi_connections = builder
        .multi_connections()
        .iter()
        .map(|(first, last, via)| MultiConnectionRecord {
            first: first.packed(),
            last: last.packed(),
            via: packed(via),
        })
        .collect();

    let streets = builder
        .streets()
        .map(|(id, street)| StreetRecord {
            id: id.packed(),
            names: street.names(),
            segments: street.segments().iter().map(|s| s.packed()).collect(),
        })
        .collect();

    TileDocument {
        features,
        nodes,
        boundary_segments,
        multi_connections,
        streets,
        stats: builder.stats(),
    }
}

/// Writes the tile as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialization or the writer fails.
pub fn write_json(builder: &TileBuilder, writer: impl Write) -> Result<(), CliError> {
    serde_json::to_writer_pretty(writer, &tile_document(builder))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use geo::line_string;
    use tilegraph_core::TileConfig;
    use tilegraph_core::model::StreetSegment;

    use super::*;

    #[test]
    fn document_lists_nodes_and_connections() {
        let mut builder = TileBuilder::new(TileConfig::default());
        builder
            .add_feature(StreetSegment::new(line_string![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
            ]))
            .unwrap();
        builder
            .add_feature(StreetSegment::new(line_string![
                (x: 10.5, y: 0.0),
                (x: 20.0, y: 0.0),
            ]))
            .unwrap();
        builder.compile().unwrap();

        let document = tile_document(&builder);
        assert_eq!(document.features.len(), 2);
        assert_eq!(document.nodes.len(), 4);
        let linked = document
            .nodes
            .iter()
            .filter(|n| !n.connections.is_empty())
            .count();
        assert_eq!(linked, 2);

        let mut out = Vec::new();
        write_json(&builder, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["features"].as_array().map(Vec::len), Some(2));
        assert!(value["stats"]["connections"].as_u64().unwrap() >= 2);
    }
}
