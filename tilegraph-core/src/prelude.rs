pub use crate::BuildError;

// Building a tile
pub use crate::building::{
    AggregateReport, BuildStats, ConnectOptions, ConnectReport, StreetConfig, TileBuilder,
    TileConfig, TileSummary,
};
pub use crate::spatial::{BoundaryPosition, SpatialIndex, TileBoundary, TypeFilter};
pub use crate::store::ItemStore;

// Data model
pub use crate::model::{
    AddressRange, Area, Connection, CrossingKind, Endpoint, EntryRestriction, Feature, FeatureId,
    FeatureKind, Ferry, JunctionType, MapFeature, Name, NameKind, NodeRef, RoutingGraph, Street,
    StreetSegment, TurnDirection, VehicleRestriction,
};
