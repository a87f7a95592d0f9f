//! Tile compilation: connectivity, boundary segments, multi-connections and
//! street aggregation, all driven through [`TileBuilder`].

mod boundary;
mod config;
mod connectivity;
mod multi_connection;
mod stats;
mod streets;
mod tile;
mod validate;

pub use boundary::{BoundaryRegistry, BoundarySegment, ExternalConnection};
pub use config::{ConnectOptions, StreetConfig, TileConfig};
pub use connectivity::ConnectReport;
pub use multi_connection::MultiConnectionTable;
pub use stats::BuildStats;
pub use streets::AggregateReport;
pub use tile::{TileBuilder, TileSummary};
