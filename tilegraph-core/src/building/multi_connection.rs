//! Maneuvers over several segments collapsed into one direct connection.

use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, warn};

use super::tile::TileBuilder;
use crate::BuildError;
use crate::model::{
    Connection, CrossingKind, FeatureId, NodeRef, TurnDirection, VehicleRestriction,
};

/// Expansion lists keyed by `(first, last)` node.
#[derive(Debug, Clone, Default)]
pub struct MultiConnectionTable {
    entries: BTreeMap<(NodeRef, NodeRef), Vec<NodeRef>>,
}

impl MultiConnectionTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(first, last, intermediates)` in key order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeRef, NodeRef, &[NodeRef])> {
        self.entries
            .iter()
            .map(|(&(first, last), via)| (first, last, via.as_slice()))
    }

    pub fn get(&self, first: NodeRef, last: NodeRef) -> Option<&[NodeRef]> {
        self.entries.get(&(first, last)).map(Vec::as_slice)
    }

    pub fn contains(&self, first: NodeRef, last: NodeRef) -> bool {
        self.entries.contains_key(&(first, last))
    }

    fn insert(&mut self, first: NodeRef, last: NodeRef, via: Vec<NodeRef>) -> bool {
        if self.contains(first, last) {
            return false;
        }
        self.entries.insert((first, last), via);
        true
    }

    pub(crate) fn remove_feature(&mut self, id: FeatureId) {
        self.entries.retain(|&(first, last), via| {
            first.feature != id && last.feature != id && via.iter().all(|n| n.feature != id)
        });
    }

    /// True if `(a, b)` are adjacent anywhere in the chain
    /// `first, intermediates.., last` of some entry.
    ///
    /// Scans the whole table.
    pub fn is_part_of_multi_connection(&self, a: NodeRef, b: NodeRef) -> bool {
        self.entries.iter().any(|(&(first, last), via)| {
            std::iter::once(first)
                .chain(via.iter().copied())
                .chain(std::iter::once(last))
                .tuple_windows()
                .any(|(x, y)| x == a && y == b)
        })
    }

    /// Last nodes of all multi-connections starting at `first`.
    pub fn multi_connections_from(&self, first: NodeRef) -> Vec<NodeRef> {
        self.entries
            .keys()
            .filter(|(f, _)| *f == first)
            .map(|&(_, last)| last)
            .collect()
    }

    /// Does any entry end at `last`?
    pub fn has_inbound(&self, last: NodeRef) -> bool {
        self.entries.keys().any(|&(_, l)| l == last)
    }

    /// Inserts the intermediate nodes between every consecutive pair of
    /// `path` that is a multi-connection. Returns the new length.
    pub fn expand_node_path(&self, path: &mut Vec<NodeRef>) -> usize {
        if path.len() < 2 || self.entries.is_empty() {
            return path.len();
        }
        let mut expanded = Vec::with_capacity(path.len());
        for (a, b) in path.iter().copied().tuple_windows() {
            expanded.push(a);
            if let Some(via) = self.get(a, b) {
                expanded.extend_from_slice(via);
            }
        }
        expanded.extend(path.last().copied());
        *path = expanded;
        path.len()
    }
}

impl TileBuilder {
    /// Registers a maneuver from `first` through `via` to `last` and adds
    /// the direct connection `first -> last`.
    ///
    /// Identical first and last nodes are rejected. A `last` node on a
    /// boundary segment that already terminates a connection is moved to a
    /// fresh boundary segment. Returns whether an entry was inserted.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Invariant`] if a node of the chain does not
    /// exist.
    pub fn add_multi_connection(
        &mut self,
        first: NodeRef,
        last: NodeRef,
        via: Vec<NodeRef>,
        restriction: VehicleRestriction,
        turn: TurnDirection,
    ) -> Result<bool, BuildError> {
        if first == last {
            warn!("Rejected multi-connection from {first} to itself");
            self.stats.rejected_multi_connections += 1;
            return Ok(false);
        }
        for node in std::iter::once(first).chain(via.iter().copied()).chain([last]) {
            if self.store.node(node).is_err() {
                return Err(BuildError::invariant(
                    "multi-connection node exists",
                    [node.packed()],
                ));
            }
        }

        if let Some(registered) = self.registered_target(first, last) {
            debug!("Multi-connection {first} -> {registered} already registered");
            return Ok(false);
        }
        let last = self.free_boundary_target(last)?;
        let cost = self.chain_cost(first, &via, last);
        if !self.multi.insert(first, last, via) {
            debug!("Multi-connection {first} -> {last} already registered");
            return Ok(false);
        }
        let direct = Connection::new(last, cost)
            .with_restriction(restriction)
            .with_turn(turn, CrossingKind::Undefined);
        self.store.add_connection(first, direct)?;
        Ok(true)
    }

    /// The node `first` already has a maneuver to, looking at `last` and the
    /// boundary segments standing in for it.
    fn registered_target(&self, first: NodeRef, mut last: NodeRef) -> Option<NodeRef> {
        loop {
            if self.multi.contains(first, last) {
                return Some(last);
            }
            if !self.boundary.is_virtual(last.feature) {
                return None;
            }
            let next = self.boundary.virtual_for(last.feature, last.endpoint)?;
            last = NodeRef::new(next, last.endpoint);
        }
    }

    /// Follows boundary segments standing in for `last` until one whose
    /// node has no inbound connection, minting a new one at the end.
    fn free_boundary_target(&mut self, mut last: NodeRef) -> Result<NodeRef, BuildError> {
        while self.boundary.is_virtual(last.feature) && self.store.inbound_count(last) > 0 {
            let next = match self.boundary.virtual_for(last.feature, last.endpoint) {
                Some(existing) => existing,
                None => self.mint_boundary_segment(last)?,
            };
            debug!("Redirected multi-connection target {last} to boundary segment {next}");
            last = NodeRef::new(next, last.endpoint);
        }
        Ok(last)
    }

    fn chain_cost(&self, first: NodeRef, via: &[NodeRef], last: NodeRef) -> u32 {
        std::iter::once(first)
            .chain(via.iter().copied())
            .chain([last])
            .tuple_windows()
            .map(|(a, b)| {
                self.store
                    .node(a)
                    .ok()
                    .and_then(|node| node.connection_to(b))
                    .map_or(1, |c| c.cost)
            })
            .sum()
    }
}
