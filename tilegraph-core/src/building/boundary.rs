//! Boundary segments: zero-length copies of routeable features that anchor
//! connectivity at the edge of a tile.
//!
//! A boundary segment stands in for whatever continues the real feature in
//! the neighbouring tile. Later merges with data from that tile find the
//! segment through the registry instead of creating another one.

use hashbrown::HashMap;
use log::{debug, trace};
use serde::Serialize;

use super::tile::TileBuilder;
use crate::BuildError;
use crate::model::{
    Connection, CrossingKind, Endpoint, FeatureId, MapFeature, NodeRef, TurnDirection,
};

/// A node in another tile connecting into a boundary segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExternalConnection {
    pub from_map: u32,
    /// Packed node id in the other tile
    pub from_node: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundarySegment {
    pub real: FeatureId,
    pub virtual_id: FeatureId,
    /// End of the real feature the segment sits on
    pub close: Endpoint,
    external: [Vec<ExternalConnection>; 2],
}

impl BoundarySegment {
    fn new(real: FeatureId, virtual_id: FeatureId, close: Endpoint) -> Self {
        Self {
            real,
            virtual_id,
            close,
            external: [Vec::new(), Vec::new()],
        }
    }

    /// Node of the virtual segment anchored to the real feature.
    pub fn close_node(&self) -> NodeRef {
        NodeRef::new(self.virtual_id, self.close)
    }

    pub fn far_node(&self) -> NodeRef {
        self.close_node().opposite()
    }

    pub fn external(&self, endpoint: Endpoint) -> &[ExternalConnection] {
        &self.external[endpoint.index()]
    }
}

/// Boundary segments of a tile, sorted by virtual id.
#[derive(Debug, Clone, Default)]
pub struct BoundaryRegistry {
    segments: Vec<BoundarySegment>,
    by_real: HashMap<(FeatureId, Endpoint), FeatureId>,
}

impl BoundaryRegistry {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundarySegment> {
        self.segments.iter()
    }

    pub fn get(&self, virtual_id: FeatureId) -> Option<&BoundarySegment> {
        let pos = self.position(virtual_id).ok()?;
        Some(&self.segments[pos])
    }

    pub fn is_virtual(&self, id: FeatureId) -> bool {
        self.position(id).is_ok()
    }

    /// The boundary segment standing in for `endpoint` of `real`, if any.
    pub fn virtual_for(&self, real: FeatureId, endpoint: Endpoint) -> Option<FeatureId> {
        self.by_real.get(&(real, endpoint)).copied()
    }

    pub(crate) fn virtuals_of(&self, real: FeatureId) -> Vec<FeatureId> {
        Endpoint::BOTH
            .into_iter()
            .filter_map(|e| self.virtual_for(real, e))
            .collect()
    }

    fn position(&self, virtual_id: FeatureId) -> Result<usize, usize> {
        self.segments
            .binary_search_by_key(&virtual_id, |s| s.virtual_id)
    }

    fn register(&mut self, segment: BoundarySegment) {
        self.by_real
            .insert((segment.real, segment.close), segment.virtual_id);
        if let Err(pos) = self.position(segment.virtual_id) {
            self.segments.insert(pos, segment);
        }
    }

    pub(crate) fn remove(&mut self, virtual_id: FeatureId) -> Option<BoundarySegment> {
        let pos = self.position(virtual_id).ok()?;
        let segment = self.segments.remove(pos);
        self.by_real.remove(&(segment.real, segment.close));
        Some(segment)
    }

    /// Records that `from_node` of tile `from_map` connects into `to`, a
    /// node of one of our boundary segments. Returns `false` for duplicates
    /// and unknown targets.
    pub fn add_external_connection(&mut self, from_map: u32, from_node: u32, to: NodeRef) -> bool {
        let Ok(pos) = self.position(to.feature) else {
            debug!("No boundary segment {} for external connection", to.feature);
            return false;
        };
        let external = &mut self.segments[pos].external[to.endpoint.index()];
        let connection = ExternalConnection {
            from_map,
            from_node,
        };
        if external.contains(&connection) {
            return false;
        }
        external.push(connection);
        true
    }

    /// Boundary segments reached from `node` of tile `map`.
    pub fn find_boundary_segments_from(&self, map: u32, node: u32) -> Vec<FeatureId> {
        self.segments
            .iter()
            .filter(|s| {
                s.external
                    .iter()
                    .flatten()
                    .any(|c| c.from_map == map && c.from_node == node)
            })
            .map(|s| s.virtual_id)
            .collect()
    }

    pub fn external_connection_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.external[0].len() + s.external[1].len())
            .sum()
    }
}

impl TileBuilder {
    /// Creates a boundary segment at `node` and anchors it with a single
    /// connection from `node`.
    ///
    /// Returns `None` if the endpoint already has a boundary segment.
    ///
    /// # Errors
    ///
    /// `node` must belong to a live routeable feature.
    pub fn add_to_boundary(&mut self, node: NodeRef) -> Result<Option<FeatureId>, BuildError> {
        if let Some(existing) = self.boundary.virtual_for(node.feature, node.endpoint) {
            trace!("Node {node} already anchored by {existing}");
            return Ok(None);
        }
        let virtual_id = self.mint_boundary_segment(node)?;
        let anchor = Connection::new(NodeRef::new(virtual_id, node.endpoint), 1)
            .with_turn(TurnDirection::Ahead, CrossingKind::NoCrossing);
        self.store.add_connection(node, anchor)?;
        Ok(Some(virtual_id))
    }

    /// Like [`TileBuilder::add_to_boundary`] but without the anchoring
    /// connection. Returns the node of the new segment that is not close to
    /// the boundary.
    ///
    /// # Errors
    ///
    /// `node` must belong to a live routeable feature.
    pub fn add_to_boundary_no_connection(
        &mut self,
        node: NodeRef,
    ) -> Result<Option<NodeRef>, BuildError> {
        if self.boundary.virtual_for(node.feature, node.endpoint).is_some() {
            return Ok(None);
        }
        let virtual_id = self.mint_boundary_segment(node)?;
        Ok(Some(NodeRef::new(virtual_id, node.endpoint.other())))
    }

    /// See [`BoundaryRegistry::add_external_connection`].
    pub fn add_external_connection(&mut self, from_map: u32, from_node: u32, to: NodeRef) -> bool {
        self.boundary.add_external_connection(from_map, from_node, to)
    }

    /// Copies the feature of `node` into a zero-length segment on the node.
    pub(crate) fn mint_boundary_segment(&mut self, node: NodeRef) -> Result<FeatureId, BuildError> {
        let real = self.store.get(node.feature)?;
        let coords = real
            .endpoints()
            .ok_or(BuildError::NotRouteable(node.feature))?;
        let level = self.store.node(node)?.level;
        let mut copy = real
            .boundary_copy(coords[node.endpoint.index()])
            .ok_or(BuildError::NotRouteable(node.feature))?;
        if let Some(nodes) = copy.nodes_mut() {
            for n in nodes {
                n.level = level;
            }
        }
        let virtual_id = self.store.insert(node.feature.zoom(), copy)?;
        self.boundary
            .register(BoundarySegment::new(node.feature, virtual_id, node.endpoint));
        self.stats.virtual_segments += 1;
        debug!("Created boundary segment {virtual_id} for node {node}");
        Ok(virtual_id)
    }
}

#[cfg(test)]
mod tests {
    use geo::line_string;

    use super::*;
    use crate::TileConfig;
    use crate::model::StreetSegment;

    fn builder() -> (TileBuilder, FeatureId) {
        let mut builder = TileBuilder::new(TileConfig::default());
        let mut segment = StreetSegment::new(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        segment.base.groups = vec![3];
        let id = builder.add_feature(segment).unwrap();
        (builder, id)
    }

    #[test]
    fn add_to_boundary_is_idempotent() {
        let (mut builder, id) = builder();
        let node = NodeRef::new(id, Endpoint::One);

        let first = builder.add_to_boundary(node).unwrap().unwrap();
        assert_eq!(builder.add_to_boundary(node).unwrap(), None);
        assert_eq!(builder.boundary().virtual_for(id, Endpoint::One), Some(first));
        assert_eq!(builder.boundary().len(), 1);
        assert_eq!(builder.stats().virtual_segments, 1);

        let virtual_feature = builder.store().get(first).unwrap();
        assert_eq!(virtual_feature.groups(), &[3]);
        let [a, b] = virtual_feature.endpoints().unwrap();
        assert_eq!((a.x, a.y), (10.0, 0.0));
        assert_eq!(a, b);

        let anchor = builder.store().node(node).unwrap().connections();
        assert_eq!(anchor.len(), 1);
        assert_eq!(anchor[0].to, NodeRef::new(first, Endpoint::One));
        assert_eq!(anchor[0].turn, TurnDirection::Ahead);
        assert_eq!(anchor[0].crossing, CrossingKind::NoCrossing);
        // the virtual side records nothing
        assert!(
            builder
                .store()
                .node(NodeRef::new(first, Endpoint::One))
                .unwrap()
                .connections()
                .is_empty()
        );
    }

    #[test]
    fn no_connection_variant_returns_far_node() {
        let (mut builder, id) = builder();
        let far = builder
            .add_to_boundary_no_connection(NodeRef::new(id, Endpoint::Zero))
            .unwrap()
            .unwrap();
        assert_eq!(far.endpoint, Endpoint::One);
        assert!(builder.boundary().is_virtual(far.feature));
        assert!(
            builder
                .store()
                .node(NodeRef::new(id, Endpoint::Zero))
                .unwrap()
                .connections()
                .is_empty()
        );
    }

    #[test]
    fn external_connections() {
        let (mut builder, id) = builder();
        let virtual_id = builder
            .add_to_boundary(NodeRef::new(id, Endpoint::One))
            .unwrap()
            .unwrap();
        let target = NodeRef::new(virtual_id, Endpoint::One);

        assert!(builder.boundary.add_external_connection(7, 42, target));
        assert!(!builder.boundary.add_external_connection(7, 42, target));
        assert!(builder.boundary.add_external_connection(7, 42, target.opposite()));
        assert!(!builder.boundary.add_external_connection(7, 42, NodeRef::new(id, Endpoint::One)));

        assert_eq!(builder.boundary().external_connection_count(), 2);
        assert_eq!(
            builder.boundary().find_boundary_segments_from(7, 42),
            vec![virtual_id]
        );
        assert!(builder.boundary().find_boundary_segments_from(8, 42).is_empty());
        assert_eq!(
            builder.boundary().get(virtual_id).unwrap().external(Endpoint::One)[0].from_node,
            42
        );
    }

    #[test]
    fn removing_the_real_feature_drops_its_boundary_segments() {
        let (mut builder, id) = builder();
        let virtual_id = builder
            .add_to_boundary(NodeRef::new(id, Endpoint::Zero))
            .unwrap()
            .unwrap();
        builder.remove_feature(id).unwrap();
        assert!(builder.boundary().is_empty());
        assert!(!builder.store().contains(virtual_id));
    }
}
