//! R-tree over the segments of every feature in a tile.
//!
//! The tree stores one entry per vertex-to-vertex segment; the distance to a
//! feature is the distance to its closest segment. The index remembers the
//! store generation it was built from and refuses to answer once the store
//! has moved on.

mod region;

use geo::Coord;
use hashbrown::HashSet;
use rstar::RTree;
use rstar::primitives::{GeomWithData, Line};

use crate::BuildError;
use crate::model::{FeatureId, FeatureKind, MapFeature};
use crate::store::ItemStore;

pub use region::{BoundaryPosition, TileBoundary};

/// Set of feature kinds a query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeFilter(u8);

impl TypeFilter {
    pub const NONE: Self = Self(0);
    pub const ANY: Self = Self(u8::MAX);
    pub const STREET_SEGMENTS: Self = Self::NONE.with(FeatureKind::StreetSegment);
    pub const FERRIES: Self = Self::NONE.with(FeatureKind::Ferry);
    pub const ROUTEABLE: Self = Self::STREET_SEGMENTS.with(FeatureKind::Ferry);

    const fn bit(kind: FeatureKind) -> u8 {
        match kind {
            FeatureKind::StreetSegment => 1,
            FeatureKind::Ferry => 1 << 1,
            FeatureKind::Street => 1 << 2,
            FeatureKind::Park => 1 << 3,
            FeatureKind::Building => 1 << 4,
            FeatureKind::Water => 1 << 5,
            FeatureKind::Other(_) => 1 << 6,
        }
    }

    #[must_use]
    pub const fn with(self, kind: FeatureKind) -> Self {
        Self(self.0 | Self::bit(kind))
    }

    pub const fn allows(self, kind: FeatureKind) -> bool {
        self.0 & Self::bit(kind) != 0
    }
}

/// One vertex-to-vertex segment tagged with its feature.
type IndexedSegment = GeomWithData<Line<[f64; 2]>, (FeatureId, FeatureKind)>;

#[derive(Debug, Clone)]
pub struct SpatialIndex {
    tree: RTree<IndexedSegment>,
    built_generation: u64,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self {
            tree: RTree::new(),
            built_generation: 0,
        }
    }
}

impl SpatialIndex {
    /// Bulk-loads the index from every live feature in `store`.
    pub fn build(store: &ItemStore) -> Self {
        let segments: Vec<IndexedSegment> = store
            .iter()
            .flat_map(|(feature, f)| {
                let kind = f.kind();
                f.geometry().iter().flat_map(move |ring| {
                    ring.lines().map(move |line| {
                        IndexedSegment::new(
                            Line::new([line.start.x, line.start.y], [line.end.x, line.end.y]),
                            (feature, kind),
                        )
                    })
                })
            })
            .collect();
        log::debug!(
            "Built spatial index with {} segments at generation {}",
            segments.len(),
            store.generation()
        );
        Self {
            tree: RTree::bulk_load(segments),
            built_generation: store.generation(),
        }
    }

    pub fn built_generation(&self) -> u64 {
        self.built_generation
    }

    pub fn segment_count(&self) -> usize {
        self.tree.size()
    }

    /// # Errors
    ///
    /// Returns [`BuildError::StaleIndex`] if the store changed since the
    /// index was built.
    pub fn check(&self, store: &ItemStore) -> Result<(), BuildError> {
        if self.built_generation == store.generation() {
            Ok(())
        } else {
            Err(BuildError::StaleIndex {
                built: self.built_generation,
                current: store.generation(),
            })
        }
    }

    /// Nearest feature of an allowed kind with its squared distance.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::StaleIndex`] for an outdated index.
    pub fn query_nearest(
        &self,
        store: &ItemStore,
        point: Coord<f64>,
        allowed: TypeFilter,
    ) -> Result<Option<(FeatureId, f64)>, BuildError> {
        self.check(store)?;
        Ok(self
            .tree
            .nearest_neighbor_iter_with_distance_2(&[point.x, point.y])
            .find(|(segment, _)| allowed.allows(segment.data.1))
            .map(|(segment, d2)| (segment.data.0, d2)))
    }

    /// Up to `k` distinct features in ascending squared distance.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::StaleIndex`] for an outdated index.
    pub fn query_k_nearest(
        &self,
        store: &ItemStore,
        point: Coord<f64>,
        k: usize,
        allowed: TypeFilter,
    ) -> Result<Vec<(FeatureId, f64)>, BuildError> {
        self.check(store)?;
        let mut seen = HashSet::new();
        Ok(self
            .tree
            .nearest_neighbor_iter_with_distance_2(&[point.x, point.y])
            .filter(|(segment, _)| allowed.allows(segment.data.1))
            .filter(|(segment, _)| seen.insert(segment.data.0))
            .take(k)
            .map(|(segment, d2)| (segment.data.0, d2))
            .collect())
    }

    /// All features of an allowed kind within `radius` map units of `point`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::StaleIndex`] for an outdated index.
    pub fn query_within_radius(
        &self,
        store: &ItemStore,
        point: Coord<f64>,
        radius: f64,
        allowed: TypeFilter,
    ) -> Result<HashSet<FeatureId>, BuildError> {
        self.check(store)?;
        Ok(self
            .tree
            .locate_within_distance([point.x, point.y], radius * radius)
            .filter(|segment| allowed.allows(segment.data.1))
            .map(|segment| segment.data.0)
            .collect())
    }
}
