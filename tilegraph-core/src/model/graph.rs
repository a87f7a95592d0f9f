//! Routing graph view of a compiled tile.

use geo::{Euclidean, Length};
use hashbrown::HashMap;
use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex};

use super::{Endpoint, MapFeature, NodeRef};
use crate::store::ItemStore;

/// Directed graph over all nodes of a tile.
///
/// Edges are the passable connections plus the traversal of each feature
/// between its two nodes, weighted in metres.
#[derive(Debug, Clone, Default)]
pub struct RoutingGraph {
    graph: DiGraph<NodeRef, u32>,
    nodes: HashMap<NodeRef, NodeIndex>,
}

impl RoutingGraph {
    pub fn from_store(store: &ItemStore, units_per_meter: f64) -> Self {
        let mut graph = DiGraph::new();
        let mut nodes = HashMap::new();
        for (id, feature) in store.iter() {
            if !feature.is_routeable() {
                continue;
            }
            let [a, b] = Endpoint::BOTH.map(|e| {
                let node = NodeRef::new(id, e);
                *nodes.entry(node).or_insert_with(|| graph.add_node(node))
            });
            let length = feature
                .geometry()
                .first()
                .map_or(0.0, |line| Euclidean.length(line));
            let weight = (length / units_per_meter).ceil() as u32;
            graph.add_edge(a, b, weight);
            graph.add_edge(b, a, weight);
        }
        for (from, connection) in store.iter_connections() {
            if connection.restriction.is_impassable() {
                continue;
            }
            if let (Some(&a), Some(&b)) = (nodes.get(&from), nodes.get(&connection.to)) {
                graph.add_edge(a, b, connection.cost);
            }
        }
        Self { graph, nodes }
    }

    pub fn graph(&self) -> &DiGraph<NodeRef, u32> {
        &self.graph
    }

    pub fn node_index(&self, node: NodeRef) -> Option<NodeIndex> {
        self.nodes.get(&node).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of weakly connected parts ("islands").
    pub fn component_count(&self) -> usize {
        connected_components(&self.graph)
    }
}
