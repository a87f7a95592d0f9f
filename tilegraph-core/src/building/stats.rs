use log::{info, warn};
use serde::Serialize;

/// Counters collected while compiling a tile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub features: usize,
    pub routeable: usize,
    pub connections: usize,
    pub did_not_fit: usize,
    pub degenerate_segments: usize,
    pub virtual_segments: usize,
    pub multi_connections: usize,
    pub rejected_multi_connections: usize,
    pub level_connections_removed: usize,
    pub level_connections_marked: usize,
    pub streets: usize,
    pub streets_split: usize,
    pub streets_merged_on_line: usize,
    pub duplicate_streets: usize,
    pub islands: usize,
}

impl BuildStats {
    pub fn log_summary(&self) {
        info!(
            "Tile has {} features ({} routeable) with {} connections in {} islands",
            self.features, self.routeable, self.connections, self.islands
        );
        info!(
            "Created {} boundary segments and {} multi-connections",
            self.virtual_segments, self.multi_connections
        );
        info!(
            "Built {} streets ({} split, {} merged on line, {} duplicates merged)",
            self.streets, self.streets_split, self.streets_merged_on_line, self.duplicate_streets
        );
        if self.level_connections_removed + self.level_connections_marked > 0 {
            info!(
                "Level mismatches: {} connections removed, {} marked impassable",
                self.level_connections_removed, self.level_connections_marked
            );
        }
        if self.did_not_fit > 0 {
            warn!("{} segments did not fit this tile", self.did_not_fit);
        }
        if self.degenerate_segments > 0 {
            warn!(
                "{} routeable segments have zero length and were skipped",
                self.degenerate_segments
            );
        }
        if self.rejected_multi_connections > 0 {
            warn!(
                "{} multi-connections were rejected",
                self.rejected_multi_connections
            );
        }
    }
}
