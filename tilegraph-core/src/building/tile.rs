use geo::LineString;
use log::{debug, info};

use super::boundary::BoundaryRegistry;
use super::config::TileConfig;
use super::connectivity::ConnectReport;
use super::multi_connection::MultiConnectionTable;
use super::stats::BuildStats;
use super::streets::AggregateReport;
use crate::BuildError;
use crate::model::{Feature, FeatureId, MapFeature, Node, NodeRef, RoutingGraph, Street};
use crate::spatial::{SpatialIndex, TileBoundary};
use crate::store::ItemStore;

/// Owns every piece of state needed to compile one tile.
#[derive(Debug, Clone, Default)]
pub struct TileBuilder {
    pub(crate) config: TileConfig,
    pub(crate) store: ItemStore,
    pub(crate) index: SpatialIndex,
    pub(crate) boundary: BoundaryRegistry,
    pub(crate) multi: MultiConnectionTable,
    pub(crate) stats: BuildStats,
    tile_boundary: Option<TileBoundary>,
}

/// Result of [`TileBuilder::compile`].
#[derive(Debug, Clone, Default)]
pub struct TileSummary {
    pub connect: ConnectReport,
    pub anchored: usize,
    pub level_mismatches: (usize, usize),
    pub streets: AggregateReport,
    pub islands: usize,
}

impl TileBuilder {
    pub fn new(config: TileConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    pub fn store(&self) -> &ItemStore {
        &self.store
    }

    pub fn index(&self) -> &SpatialIndex {
        &self.index
    }

    pub fn boundary(&self) -> &BoundaryRegistry {
        &self.boundary
    }

    pub fn multi_connections(&self) -> &MultiConnectionTable {
        &self.multi
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Adds a feature on the configured zoom level.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MalformedInput`] for unusable geometry.
    pub fn add_feature(&mut self, feature: impl Into<Feature>) -> Result<FeatureId, BuildError> {
        self.add_feature_at(self.config.zoom, feature)
    }

    /// # Errors
    ///
    /// Returns [`BuildError::MalformedInput`] for unusable geometry or zoom.
    pub fn add_feature_at(
        &mut self,
        zoom: u8,
        feature: impl Into<Feature>,
    ) -> Result<FeatureId, BuildError> {
        self.store.insert(zoom, feature.into())
    }

    /// Removes a feature together with the boundary segments standing in
    /// for it and the multi-connections passing through it.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownFeature`] for a dead id.
    pub fn remove_feature(&mut self, id: FeatureId) -> Result<Feature, BuildError> {
        let feature = self.store.remove(id)?;
        self.boundary.remove(id);
        self.multi.remove_feature(id);
        let mut pending = self.boundary.virtuals_of(id);
        while let Some(virtual_id) = pending.pop() {
            pending.extend(self.boundary.virtuals_of(virtual_id));
            self.boundary.remove(virtual_id);
            self.multi.remove_feature(virtual_id);
            self.store.remove(virtual_id)?;
        }
        Ok(feature)
    }

    /// # Errors
    ///
    /// See [`ItemStore::replace_geometry`].
    pub fn replace_geometry(
        &mut self,
        id: FeatureId,
        geometry: Vec<LineString<f64>>,
    ) -> Result<(), BuildError> {
        self.store.replace_geometry(id, geometry)
    }

    /// # Errors
    ///
    /// Returns an error if `node` does not name a live routeable feature.
    pub fn node_mut(&mut self, node: NodeRef) -> Result<&mut Node, BuildError> {
        self.store.node_mut(node)
    }

    /// Rebuilds the spatial index from the current store contents.
    pub fn rebuild_index(&mut self) {
        self.index = SpatialIndex::build(&self.store);
    }

    /// The tile outline; the convex hull of all features unless one was set.
    pub fn tile_boundary(&self) -> Option<TileBoundary> {
        self.tile_boundary
            .clone()
            .or_else(|| TileBoundary::convex_hull(&self.store))
    }

    pub fn set_tile_boundary(&mut self, boundary: TileBoundary) {
        self.tile_boundary = Some(boundary);
    }

    pub fn streets(&self) -> impl Iterator<Item = (FeatureId, &Street)> {
        self.store
            .iter()
            .filter_map(|(id, f)| f.as_street().map(|street| (id, street)))
    }

    pub fn routing_graph(&self) -> RoutingGraph {
        RoutingGraph::from_store(&self.store, self.config.units_per_meter)
    }

    /// Runs the whole pipeline on the features added so far.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; with validation enabled an inconsistent
    /// graph is reported as [`BuildError::Invariant`].
    pub fn compile(&mut self) -> Result<TileSummary, BuildError> {
        info!(
            "Compiling tile with {} features at zoom {}",
            self.store.len(),
            self.config.zoom
        );
        let mut summary = TileSummary::default();

        self.rebuild_index();
        let options = self.config.connect;
        summary.connect = self.update_all_connections(&options)?;

        if self.config.anchor_border_crossings {
            summary.anchored = self.anchor_border_crossings()?;
        }
        if self.config.remove_level_mismatches {
            summary.level_mismatches = self.remove_connections_with_different_level()?;
        }

        summary.streets = self.aggregate_streets()?;
        self.rebuild_index();

        let graph = self.routing_graph();
        summary.islands = graph.component_count();
        debug!(
            "Routing graph has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        self.refresh_stats(summary.islands);
        if self.config.validate {
            self.validate()?;
        }
        self.stats.log_summary();
        Ok(summary)
    }

    fn refresh_stats(&mut self, islands: usize) {
        self.stats.features = self.store.len();
        self.stats.routeable = self.store.iter().filter(|(_, f)| f.is_routeable()).count();
        self.stats.connections = self.store.iter_connections().count();
        self.stats.multi_connections = self.multi.len();
        self.stats.islands = islands;
    }
}
