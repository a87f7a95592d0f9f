//! Feature, node and connection storage for one tile.

mod arena;

use geo::LineString;
use log::trace;

use crate::BuildError;
use crate::model::{
    Connection, Endpoint, Feature, FeatureId, MAX_SLOT, MAX_ZOOM, MapFeature, Node, NodeRef,
    unpack_node,
};
use arena::Arena;

/// Arena storage for all features of a tile, one arena per zoom level.
///
/// Every geometry mutation bumps [`ItemStore::generation`], which lets the
/// spatial index detect that it was built from an older state.
#[derive(Debug, Clone)]
pub struct ItemStore {
    levels: Vec<Arena<Feature>>,
    generation: u64,
}

impl Default for ItemStore {
    fn default() -> Self {
        Self {
            levels: (0..=MAX_ZOOM).map(|_| Arena::default()).collect(),
            generation: 0,
        }
    }
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Geometry generation counter. Features without geometry (streets) do
    /// not move it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.levels.iter().map(Arena::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores `feature` on `zoom` and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MalformedInput`] for an invalid zoom level, empty
    /// geometry on a feature that needs one, or a full zoom level.
    pub fn insert(&mut self, zoom: u8, feature: Feature) -> Result<FeatureId, BuildError> {
        if zoom > MAX_ZOOM {
            return Err(BuildError::MalformedInput(format!(
                "zoom level {zoom} exceeds {MAX_ZOOM}"
            )));
        }
        check_geometry(&feature)?;
        let arena = &mut self.levels[usize::from(zoom)];
        if arena.next_slot() > MAX_SLOT as usize {
            return Err(BuildError::MalformedInput(format!(
                "zoom level {zoom} has no free slots"
            )));
        }
        let has_geometry = !feature.geometry().is_empty();
        let (slot, generation) = arena.insert(feature);
        if has_geometry {
            self.generation += 1;
        }
        let id = FeatureId::new(zoom, slot, generation);
        trace!("Inserted feature {id}");
        Ok(id)
    }

    /// Removes a feature and every connection that points at its nodes.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownFeature`] if `id` is not live.
    pub fn remove(&mut self, id: FeatureId) -> Result<Feature, BuildError> {
        let feature = self.levels[usize::from(id.zoom())]
            .remove(id.slot(), id.generation())
            .ok_or(BuildError::UnknownFeature(id))?;
        if !feature.geometry().is_empty() {
            self.generation += 1;
        }
        for (_, feature) in self.iter_mut() {
            if let Some(nodes) = feature.nodes_mut() {
                for node in nodes {
                    node.connections.retain(|c| c.to.feature != id);
                }
            }
        }
        trace!("Removed feature {id}");
        Ok(feature)
    }

    /// # Errors
    ///
    /// Returns [`BuildError::UnknownFeature`] if `id` is not live.
    pub fn get(&self, id: FeatureId) -> Result<&Feature, BuildError> {
        self.levels
            .get(usize::from(id.zoom()))
            .and_then(|arena| arena.get(id.slot(), id.generation()))
            .ok_or(BuildError::UnknownFeature(id))
    }

    /// Mutable access to attributes and nodes. Geometry changes go through
    /// [`ItemStore::replace_geometry`].
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownFeature`] if `id` is not live.
    pub fn get_mut(&mut self, id: FeatureId) -> Result<&mut Feature, BuildError> {
        self.levels
            .get_mut(usize::from(id.zoom()))
            .and_then(|arena| arena.get_mut(id.slot(), id.generation()))
            .ok_or(BuildError::UnknownFeature(id))
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.get(id).is_ok()
    }

    /// # Errors
    ///
    /// Returns [`BuildError::UnknownFeature`] if `id` is not live and
    /// [`BuildError::MalformedInput`] if the new geometry is unusable.
    pub fn replace_geometry(
        &mut self,
        id: FeatureId,
        geometry: Vec<LineString<f64>>,
    ) -> Result<(), BuildError> {
        let feature = self.get_mut(id)?;
        let old = std::mem::replace(&mut feature.base_mut().geometry, geometry);
        if let Err(err) = check_geometry(feature) {
            feature.base_mut().geometry = old;
            return Err(err);
        }
        self.generation += 1;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`BuildError::UnknownFeature`] for dead ids and
    /// [`BuildError::NotRouteable`] for features without nodes.
    pub fn node(&self, node: NodeRef) -> Result<&Node, BuildError> {
        let nodes = self
            .get(node.feature)?
            .nodes()
            .ok_or(BuildError::NotRouteable(node.feature))?;
        Ok(&nodes[node.endpoint.index()])
    }

    /// # Errors
    ///
    /// Same as [`ItemStore::node`].
    pub fn node_mut(&mut self, node: NodeRef) -> Result<&mut Node, BuildError> {
        let nodes = self
            .get_mut(node.feature)?
            .nodes_mut()
            .ok_or(BuildError::NotRouteable(node.feature))?;
        Ok(&mut nodes[node.endpoint.index()])
    }

    /// Adds `connection` to the outgoing list of `from`. Returns `false` if an
    /// edge to the same node already exists.
    ///
    /// # Errors
    ///
    /// Both nodes must exist.
    pub fn add_connection(
        &mut self,
        from: NodeRef,
        connection: Connection,
    ) -> Result<bool, BuildError> {
        self.node(connection.to)?;
        Ok(self.node_mut(from)?.push_connection(connection))
    }

    pub fn has_connection(&self, from: NodeRef, to: NodeRef) -> bool {
        self.node(from)
            .is_ok_and(|node| node.connection_to(to).is_some())
    }

    /// # Errors
    ///
    /// `from` must exist.
    pub fn remove_connection(
        &mut self,
        from: NodeRef,
        to: NodeRef,
    ) -> Result<Option<Connection>, BuildError> {
        Ok(self.node_mut(from)?.remove_connection(to))
    }

    /// Number of connections in the tile that end at `node`.
    ///
    /// Linear in the number of connections.
    pub fn inbound_count(&self, node: NodeRef) -> usize {
        self.iter_connections().filter(|(_, c)| c.to == node).count()
    }

    /// Every `(from, connection)` pair in the tile.
    pub fn iter_connections(&self) -> impl Iterator<Item = (NodeRef, &Connection)> {
        self.iter().flat_map(|(id, feature)| {
            feature.nodes().into_iter().flat_map(move |nodes| {
                Endpoint::BOTH.into_iter().flat_map(move |endpoint| {
                    nodes[endpoint.index()]
                        .connections
                        .iter()
                        .map(move |c| (NodeRef::new(id, endpoint), c))
                })
            })
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, &Feature)> {
        self.levels.iter().enumerate().flat_map(|(zoom, arena)| {
            arena
                .iter()
                .map(move |(slot, generation, f)| (FeatureId::new(zoom as u8, slot, generation), f))
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (FeatureId, &mut Feature)> {
        self.levels.iter_mut().enumerate().flat_map(|(zoom, arena)| {
            arena
                .iter_mut()
                .map(move |(slot, generation, f)| (FeatureId::new(zoom as u8, slot, generation), f))
        })
    }

    /// Ids of all routeable features in slot order.
    pub fn routeable_ids(&self) -> Vec<FeatureId> {
        self.iter()
            .filter(|(_, f)| f.is_routeable())
            .map(|(id, _)| id)
            .collect()
    }

    /// Resolves a packed node id against the live store.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MalformedInput`] for invalid zoom bits and
    /// [`BuildError::UnknownFeature`] for a free slot.
    pub fn resolve_packed(&self, packed: u32) -> Result<NodeRef, BuildError> {
        let (zoom, slot, endpoint) = unpack_node(packed)?;
        let generation = self.levels[usize::from(zoom)]
            .live_generation(slot)
            .ok_or_else(|| {
                BuildError::UnknownFeature(FeatureId::new(zoom, slot, u32::MAX))
            })?;
        Ok(NodeRef::new(FeatureId::new(zoom, slot, generation), endpoint))
    }
}

fn check_geometry(feature: &Feature) -> Result<(), BuildError> {
    if let Feature::Street(_) = feature {
        return Ok(());
    }
    let geometry = feature.geometry();
    if geometry.is_empty() {
        return Err(BuildError::MalformedInput(format!(
            "{:?} feature without geometry",
            feature.kind()
        )));
    }
    if geometry.iter().any(|ring| ring.0.len() < 2) {
        return Err(BuildError::MalformedInput(format!(
            "{:?} feature with a ring of fewer than two coordinates",
            feature.kind()
        )));
    }
    if geometry
        .iter()
        .flat_map(|ring| ring.coords())
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(BuildError::MalformedInput(format!(
            "{:?} feature with non-finite coordinates",
            feature.kind()
        )));
    }
    Ok(())
}
