//! Road-network graph construction for map tiles.
//!
//! Features of one tile are added to a [`TileBuilder`], which derives
//! connectivity between street and ferry segments from their geometry,
//! anchors connectivity at the tile edge with boundary segments, keeps a
//! table of multi-segment maneuvers and aggregates segments into streets.

pub mod algo;
pub mod building;
mod error;
pub mod model;
pub mod prelude;
pub mod spatial;
pub mod store;

pub use building::{
    AggregateReport, BoundaryRegistry, BoundarySegment, BuildStats, ConnectOptions, ConnectReport,
    ExternalConnection, MultiConnectionTable, StreetConfig, TileBuilder, TileConfig, TileSummary,
};
pub use error::BuildError;
