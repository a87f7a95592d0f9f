//! Data model of a tile: features, their endpoint nodes and connections.

mod feature;
mod graph;
mod ids;
mod node;

pub use feature::{
    AddressRange, Area, Feature, FeatureBase, FeatureKind, Ferry, MapFeature, Name, NameKind,
    Street, StreetSegment,
};
pub use graph::RoutingGraph;
pub use ids::{Endpoint, FeatureId, MAX_SLOT, MAX_ZOOM, NodeRef, unpack_node};
pub use node::{
    Connection, CrossingKind, EntryRestriction, JunctionType, Node, TurnDirection,
    VehicleRestriction,
};
