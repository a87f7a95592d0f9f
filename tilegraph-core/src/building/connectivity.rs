//! Geometric connectivity between routeable features.
//!
//! Two features are connected where one of their endpoints lies within the
//! connection distance of an endpoint of the other. Each endpoint only
//! connects to candidate nodes that are closer to it than to the feature's
//! opposite endpoint, so a short segment never links its far end to
//! something sitting at its near end.

use geo::{Coord, Distance, Euclidean, Point};
use log::{debug, info, trace, warn};

use super::config::ConnectOptions;
use super::tile::TileBuilder;
use crate::BuildError;
use crate::model::{
    Connection, Endpoint, FeatureId, JunctionType, MapFeature, NodeRef, VehicleRestriction,
};
use crate::spatial::TypeFilter;

/// Smallest radius of the tightened re-query, in map units.
const MIN_QUERY_RADIUS: f64 = 10.0;
/// Added to the squared distance of the opposite endpoint so exact ties
/// still connect, in squared map units.
const TIE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectReport {
    /// Features whose connections changed
    pub updated: usize,
    pub did_not_fit: Vec<FeatureId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectOutcome {
    Degenerate,
    NoFit,
    Fit { changed: bool },
}

#[derive(Debug, Clone, Copy)]
struct CandidatePair {
    from: NodeRef,
    to: NodeRef,
    gap_m: f64,
}

impl TileBuilder {
    /// Connects both endpoints of a routeable feature to its geometric
    /// neighbours.
    ///
    /// Returns whether any connection changed (or would change, with
    /// `allow_fake`). A feature for which neither endpoint fits this tile
    /// returns `false` and is left in place.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::StaleIndex`] if the index has not been rebuilt
    /// after a geometry change, and [`BuildError::NotRouteable`] /
    /// [`BuildError::UnknownFeature`] for a bad `id`.
    pub fn update_connections(
        &mut self,
        id: FeatureId,
        options: &ConnectOptions,
    ) -> Result<bool, BuildError> {
        Ok(matches!(
            self.connect_feature(id, options)?,
            ConnectOutcome::Fit { changed: true }
        ))
    }

    /// Runs [`TileBuilder::update_connections`] for every real routeable
    /// feature of the tile.
    ///
    /// # Errors
    ///
    /// Stops at the first error.
    pub fn update_all_connections(
        &mut self,
        options: &ConnectOptions,
    ) -> Result<ConnectReport, BuildError> {
        let mut report = ConnectReport::default();
        for id in self.store.routeable_ids() {
            if self.boundary.is_virtual(id) {
                continue;
            }
            match self.connect_feature(id, options)? {
                ConnectOutcome::Fit { changed: true } => report.updated += 1,
                ConnectOutcome::NoFit => report.did_not_fit.push(id),
                ConnectOutcome::Fit { changed: false } | ConnectOutcome::Degenerate => {}
            }
        }
        info!(
            "Updated connections of {} features, {} did not fit",
            report.updated,
            report.did_not_fit.len()
        );
        Ok(report)
    }

    fn connect_feature(
        &mut self,
        id: FeatureId,
        options: &ConnectOptions,
    ) -> Result<ConnectOutcome, BuildError> {
        let Some(pairs) = self.find_candidate_pairs(id, options)? else {
            warn!("Skipping zero-length routeable feature {id}");
            self.stats.degenerate_segments += 1;
            return Ok(ConnectOutcome::Degenerate);
        };
        let Some(pairs) = pairs else {
            debug!("Feature {id} does not fit this tile");
            self.stats.did_not_fit += 1;
            return Ok(ConnectOutcome::NoFit);
        };

        if options.allow_fake {
            let changed = pairs.iter().any(|p| {
                !self.store.has_connection(p.from, p.to) || !self.store.has_connection(p.to, p.from)
            });
            return Ok(ConnectOutcome::Fit { changed });
        }

        let minted = self.stats.virtual_segments;
        let mut changed = false;
        for pair in pairs {
            changed |= self.connect_pair(pair)?;
        }
        if self.stats.virtual_segments != minted {
            self.rebuild_index();
        }
        Ok(ConnectOutcome::Fit { changed })
    }

    /// Outer `None` for degenerate geometry, inner `None` when no endpoint
    /// fits.
    #[allow(clippy::type_complexity)]
    fn find_candidate_pairs(
        &self,
        id: FeatureId,
        options: &ConnectOptions,
    ) -> Result<Option<Option<Vec<CandidatePair>>>, BuildError> {
        let feature = self.store.get(id)?;
        let ends = feature.endpoints().ok_or(BuildError::NotRouteable(id))?;
        if ends[0] == ends[1] {
            return Ok(None);
        }

        let units = self.config.units_per_meter;
        let max_distance = options.max_distance_m * units;
        let filter = if options.ferries_only {
            TypeFilter::FERRIES
        } else {
            TypeFilter::ROUTEABLE
        };

        let mut fits = false;
        let mut pairs = Vec::new();
        for endpoint in Endpoint::BOTH {
            let here = ends[endpoint.index()];
            let opposite = ends[endpoint.other().index()];

            let mut candidates =
                self.index
                    .query_within_radius(&self.store, here, max_distance, filter)?;
            if !options.is_foreign {
                candidates.remove(&id);
            }
            if candidates.is_empty() {
                trace!("Endpoint {endpoint:?} of {id} has no candidates");
                continue;
            }
            fits = true;
            candidates.remove(&id);

            let nearest = candidates
                .iter()
                .filter_map(|c| self.store.get(*c).ok()?.endpoints())
                .flatten()
                .map(|c| Euclidean.distance(Point::from(here), Point::from(c)))
                .fold(f64::INFINITY, f64::min);
            let tightened = (nearest / 2.0).max(MIN_QUERY_RADIUS);
            if tightened < max_distance {
                candidates = self
                    .index
                    .query_within_radius(&self.store, here, tightened, filter)?;
                candidates.remove(&id);
            }

            let mut candidates: Vec<FeatureId> = candidates.into_iter().collect();
            candidates.sort_unstable();
            for candidate in candidates {
                // a boundary chain is entered at the close node of its head
                let targets = match self.boundary.get(candidate) {
                    None => Endpoint::BOTH.to_vec(),
                    Some(segment)
                        if options.allow_boundary && !self.boundary.is_virtual(segment.real) =>
                    {
                        vec![segment.close]
                    }
                    Some(_) => continue,
                };
                let Some(candidate_ends) = self.store.get(candidate)?.endpoints() else {
                    continue;
                };
                for candidate_end in targets {
                    let there = candidate_ends[candidate_end.index()];
                    if let Some(gap) = accept(here, opposite, there, max_distance) {
                        pairs.push(CandidatePair {
                            from: NodeRef::new(id, endpoint),
                            to: NodeRef::new(candidate, candidate_end),
                            gap_m: gap / units,
                        });
                    }
                }
            }
        }
        Ok(Some(fits.then_some(pairs)))
    }

    /// Adds both directions of a pair and shares group memberships.
    ///
    /// A boundary segment only ever receives the single edge from the real
    /// side, see [`TileBuilder::boundary_entry`].
    fn connect_pair(&mut self, pair: CandidatePair) -> Result<bool, BuildError> {
        let cost = (pair.gap_m.ceil() as u32).max(1);
        let from_virtual = self.boundary.is_virtual(pair.from.feature);
        let to_virtual = self.boundary.is_virtual(pair.to.feature);
        let (real, boundary) = match (from_virtual, to_virtual) {
            (false, false) => {
                let forward = self
                    .store
                    .add_connection(pair.from, Connection::new(pair.to, cost))?;
                let backward = self
                    .store
                    .add_connection(pair.to, Connection::new(pair.from, cost))?;
                if forward || backward {
                    trace!("Connected {} <-> {}", pair.from, pair.to);
                    self.share_groups(pair.from.feature, pair.to.feature)?;
                }
                return Ok(forward || backward);
            }
            (false, true) => (pair.from, pair.to),
            (true, false) => (pair.to, pair.from),
            (true, true) => {
                trace!("Not connecting boundary segments {} and {}", pair.from, pair.to);
                return Ok(false);
            }
        };

        let Some(target) = self.boundary_entry(real, boundary)? else {
            return Ok(false);
        };
        let added = self
            .store
            .add_connection(real, Connection::new(target, cost))?;
        if added {
            trace!("Connected {real} -> boundary node {target}");
        }
        Ok(added)
    }

    /// Boundary node that a new connection from `real` into `boundary`
    /// should end at, or `None` if `real` already reaches one along the
    /// chain of segments standing in for `boundary`.
    ///
    /// A node that already terminates a connection is passed over for the
    /// next boundary segment, which is created when missing.
    fn boundary_entry(
        &mut self,
        real: NodeRef,
        mut boundary: NodeRef,
    ) -> Result<Option<NodeRef>, BuildError> {
        loop {
            if self.store.has_connection(real, boundary) {
                return Ok(None);
            }
            if self.store.inbound_count(boundary) == 0 {
                return Ok(Some(boundary));
            }
            let next = match self.boundary.virtual_for(boundary.feature, boundary.endpoint) {
                Some(existing) => existing,
                None => self.mint_boundary_segment(boundary)?,
            };
            debug!("Redirected connection from {real} to boundary segment {next}");
            boundary = NodeRef::new(next, boundary.endpoint);
        }
    }

    fn share_groups(&mut self, a: FeatureId, b: FeatureId) -> Result<(), BuildError> {
        let groups_a = self.store.get(a)?.groups().to_vec();
        let groups_b = self.store.get(b)?.groups().to_vec();
        if groups_a.is_empty() && !groups_b.is_empty() {
            self.store.get_mut(a)?.base_mut().groups = groups_b;
        } else if groups_b.is_empty() && !groups_a.is_empty() {
            self.store.get_mut(b)?.base_mut().groups = groups_a;
        }
        Ok(())
    }

    /// Removes connections between nodes on different grade levels.
    ///
    /// A connection that is one hop of a multi-connection is kept and made
    /// impassable instead, in both directions. Returns `(removed, marked)`.
    ///
    /// # Errors
    ///
    /// Fails only on a store inconsistency.
    pub fn remove_connections_with_different_level(
        &mut self,
    ) -> Result<(usize, usize), BuildError> {
        let mut mismatched = Vec::new();
        for (from, connection) in self.store.iter_connections() {
            let to_level = self.store.node(connection.to)?.level;
            if self.store.node(from)?.level != to_level {
                mismatched.push((from, connection.to));
            }
        }

        let (mut removed, mut marked) = (0, 0);
        for (from, to) in mismatched {
            let in_maneuver = self.multi.is_part_of_multi_connection(from, to)
                || self.multi.is_part_of_multi_connection(to, from)
                || self.multi.contains(from, to);
            if in_maneuver {
                if let Some(connection) = self.store.node_mut(from)?.connection_to_mut(to) {
                    connection.restriction = VehicleRestriction::NONE;
                    marked += 1;
                }
            } else if self.store.remove_connection(from, to)?.is_some() {
                removed += 1;
            }
        }
        self.stats.level_connections_removed += removed;
        self.stats.level_connections_marked += marked;
        debug!("Level mismatches: removed {removed}, marked {marked}");
        Ok((removed, marked))
    }

    /// Anchors every border-crossing node to a boundary segment. Returns the
    /// number of segments created.
    ///
    /// # Errors
    ///
    /// See [`TileBuilder::add_to_boundary`].
    pub fn anchor_border_crossings(&mut self) -> Result<usize, BuildError> {
        let mut crossings = Vec::new();
        for (id, feature) in self.store.iter() {
            if self.boundary.is_virtual(id) {
                continue;
            }
            let Some(nodes) = feature.nodes() else {
                continue;
            };
            for endpoint in Endpoint::BOTH {
                if nodes[endpoint.index()].junction == JunctionType::BorderCrossing {
                    crossings.push(NodeRef::new(id, endpoint));
                }
            }
        }
        let mut created = 0;
        for node in crossings {
            if self.add_to_boundary(node)?.is_some() {
                created += 1;
            }
        }
        if created > 0 {
            info!("Anchored {created} border crossings");
        }
        Ok(created)
    }
}

/// Gap to `there` if `here` is the endpoint that should connect.
fn accept(here: Coord<f64>, opposite: Coord<f64>, there: Coord<f64>, max: f64) -> Option<f64> {
    let there = Point::from(there);
    let gap = Euclidean.distance(Point::from(here), there);
    if gap > max {
        return None;
    }
    let far = Euclidean.distance(Point::from(opposite), there);
    (gap * gap < far * far + TIE_EPSILON).then_some(gap)
}

#[cfg(test)]
mod tests {
    use geo::{coord, line_string};

    use super::*;
    use crate::TileConfig;
    use crate::model::{Ferry, StreetSegment, TurnDirection};

    fn street(x0: f64, y0: f64, x1: f64, y1: f64) -> StreetSegment {
        StreetSegment::new(line_string![(x: x0, y: y0), (x: x1, y: y1)])
    }

    #[test]
    fn accepts_only_the_closer_endpoint() {
        let here = coord! { x: 10.0, y: 0.0 };
        let opposite = coord! { x: 0.0, y: 0.0 };
        assert_eq!(accept(here, opposite, coord! { x: 10.0, y: 1.0 }, 2.0), Some(1.0));
        assert_eq!(accept(here, opposite, coord! { x: 10.0, y: 3.0 }, 2.0), None);
        // equidistant: the tie goes to connecting
        assert!(accept(here, opposite, coord! { x: 5.0, y: 0.0 }, 10.0).is_some());
    }

    #[test]
    fn shared_endpoint_creates_symmetric_pair() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        let b = builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        builder.rebuild_index();

        assert!(builder.update_connections(a, &ConnectOptions::default()).unwrap());
        let a1 = NodeRef::new(a, Endpoint::One);
        let b0 = NodeRef::new(b, Endpoint::Zero);
        assert!(builder.store().has_connection(a1, b0));
        assert!(builder.store().has_connection(b0, a1));
        assert!(!builder.store().has_connection(NodeRef::new(a, Endpoint::Zero), b0));
        assert_eq!(builder.store().node(a1).unwrap().connections()[0].cost, 1);

        // nothing new the second time round
        assert!(!builder.update_connections(b, &ConnectOptions::default()).unwrap());
    }

    #[test]
    fn lonely_feature_does_not_fit() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        builder.add_feature(street(500.0, 0.0, 510.0, 0.0)).unwrap();
        builder.rebuild_index();

        assert!(!builder.update_connections(a, &ConnectOptions::default()).unwrap());
        assert_eq!(builder.stats().did_not_fit, 1);
        assert!(builder.store().contains(a));
        assert_eq!(builder.store().iter_connections().count(), 0);
    }

    #[test]
    fn fake_run_reports_without_mutating() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        builder.add_feature(street(10.0, 1.0, 20.0, 1.0)).unwrap();
        builder.rebuild_index();
        let fake = ConnectOptions {
            allow_fake: true,
            ..ConnectOptions::default()
        };

        assert!(builder.update_connections(a, &fake).unwrap());
        assert_eq!(builder.store().iter_connections().count(), 0);
    }

    #[test]
    fn ferries_only_ignores_streets() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        let ferry = builder
            .add_feature(Ferry::new(line_string![(x: 0.0, y: 0.0), (x: -30.0, y: 0.0)]))
            .unwrap();
        builder.rebuild_index();
        let options = ConnectOptions {
            ferries_only: true,
            ..ConnectOptions::default()
        };

        assert!(builder.update_connections(a, &options).unwrap());
        let connected: Vec<_> = builder
            .store()
            .iter_connections()
            .map(|(from, c)| (from.feature, c.to.feature))
            .collect();
        assert!(connected.contains(&(a, ferry)));
        assert!(connected.iter().all(|&(x, y)| x == ferry || y == ferry));
    }

    #[test]
    fn groups_flow_to_the_side_without_them() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let mut grouped = street(0.0, 0.0, 10.0, 0.0);
        grouped.base.groups = vec![11];
        let a = builder.add_feature(grouped).unwrap();
        let b = builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        builder.rebuild_index();
        builder.update_connections(a, &ConnectOptions::default()).unwrap();
        assert_eq!(builder.store().get(b).unwrap().groups(), &[11]);
    }

    #[test]
    fn zero_length_feature_is_skipped() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(5.0, 5.0, 5.0, 5.0)).unwrap();
        builder.add_feature(street(5.0, 5.0, 15.0, 5.0)).unwrap();
        builder.rebuild_index();
        assert!(!builder.update_connections(a, &ConnectOptions::default()).unwrap());
        assert_eq!(builder.stats().degenerate_segments, 1);
    }

    #[test]
    fn boundary_segments_are_skipped_unless_allowed() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        let b = builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        builder
            .add_to_boundary(NodeRef::new(b, Endpoint::Zero))
            .unwrap()
            .unwrap();
        builder.rebuild_index();

        builder.update_connections(a, &ConnectOptions::default()).unwrap();
        let to_virtual = |builder: &TileBuilder| {
            builder
                .store()
                .iter_connections()
                .any(|(from, c)| from.feature == a && builder.boundary().is_virtual(c.to.feature))
        };
        assert!(!to_virtual(&builder));

        let allow = ConnectOptions {
            allow_boundary: true,
            ..ConnectOptions::default()
        };
        builder.update_connections(a, &allow).unwrap();
        assert!(to_virtual(&builder));
    }

    #[test]
    fn connecting_into_boundary_keeps_it_valid() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        let b = builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        let virtual_id = builder
            .add_to_boundary(NodeRef::new(b, Endpoint::Zero))
            .unwrap()
            .unwrap();
        builder.rebuild_index();
        let allow = ConnectOptions {
            allow_boundary: true,
            ..ConnectOptions::default()
        };

        assert!(builder.update_connections(a, &allow).unwrap());
        builder.validate().unwrap();

        // boundary nodes never point back into the tile
        let from_boundary = builder
            .store()
            .iter_connections()
            .filter(|(from, _)| builder.boundary().is_virtual(from.feature))
            .count();
        assert_eq!(from_boundary, 0);
        // the anchored node was taken, so a second segment stands in for it
        assert_eq!(builder.boundary().len(), 2);
        assert!(builder.boundary().virtual_for(virtual_id, Endpoint::Zero).is_some());

        let connections = builder.store().iter_connections().count();
        assert!(!builder.update_connections(a, &allow).unwrap());
        assert_eq!(builder.store().iter_connections().count(), connections);
        assert_eq!(builder.boundary().len(), 2);
        builder.validate().unwrap();
    }

    #[test]
    fn stale_index_is_reported() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        builder.rebuild_index();
        builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        let err = builder
            .update_connections(a, &ConnectOptions::default())
            .unwrap_err();
        assert!(matches!(err, BuildError::StaleIndex { .. }));
    }

    #[test]
    fn level_mismatch_removes_plain_connections_and_marks_maneuver_hops() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        let b = builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        let c = builder.add_feature(street(20.0, 0.0, 30.0, 0.0)).unwrap();
        let a1 = NodeRef::new(a, Endpoint::One);
        let b0 = NodeRef::new(b, Endpoint::Zero);
        let b1 = NodeRef::new(b, Endpoint::One);
        let c0 = NodeRef::new(c, Endpoint::Zero);
        builder.node_mut(b0).unwrap().level = 1;
        builder.node_mut(b1).unwrap().level = 1;
        builder.rebuild_index();
        builder
            .update_all_connections(&ConnectOptions::default())
            .unwrap();
        builder
            .add_multi_connection(
                NodeRef::new(a, Endpoint::Zero),
                NodeRef::new(c, Endpoint::One),
                vec![a1, b0, b1, c0],
                VehicleRestriction::ALL,
                TurnDirection::Ahead,
            )
            .unwrap();
        // both directions of every hop are kept
        let (removed, marked) = builder.remove_connections_with_different_level().unwrap();
        assert_eq!((removed, marked), (0, 4));
        let hop = builder.store().node(a1).unwrap().connection_to(b0).unwrap();
        assert!(hop.restriction.is_impassable());
    }

    #[test]
    fn level_mismatch_outside_maneuvers_is_removed() {
        let mut builder = TileBuilder::new(TileConfig::default());
        builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        let b = builder.add_feature(street(10.0, 0.0, 20.0, 0.0)).unwrap();
        builder.node_mut(NodeRef::new(b, Endpoint::Zero)).unwrap().level = -1;
        builder.rebuild_index();
        builder
            .update_all_connections(&ConnectOptions::default())
            .unwrap();
        assert_eq!(builder.store().iter_connections().count(), 2);

        let (removed, marked) = builder.remove_connections_with_different_level().unwrap();
        assert_eq!((removed, marked), (2, 0));
        assert_eq!(builder.store().iter_connections().count(), 0);
        assert_eq!(builder.stats().level_connections_removed, 2);
    }

    #[test]
    fn border_crossings_are_anchored_once() {
        let mut builder = TileBuilder::new(TileConfig::default());
        let a = builder.add_feature(street(0.0, 0.0, 10.0, 0.0)).unwrap();
        builder.node_mut(NodeRef::new(a, Endpoint::One)).unwrap().junction =
            JunctionType::BorderCrossing;
        assert_eq!(builder.anchor_border_crossings().unwrap(), 1);
        assert_eq!(builder.anchor_border_crossings().unwrap(), 0);
        assert_eq!(builder.boundary().len(), 1);
    }
}
