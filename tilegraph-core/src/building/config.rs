use serde::{Deserialize, Serialize};

use crate::algo::SameStreetThresholds;

/// Options of a single connectivity pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Only report whether connections would change
    pub allow_fake: bool,
    pub max_distance_m: f64,
    /// The feature comes from outside this tile and may find itself as a
    /// candidate
    pub is_foreign: bool,
    pub ferries_only: bool,
    /// Allow connecting to boundary segments
    pub allow_boundary: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            allow_fake: false,
            max_distance_m: 2.0,
            is_foreign: false,
            ferries_only: false,
            allow_boundary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetConfig {
    /// Grouping distance per road class, class 0 first
    pub class_distances_m: [f64; 5],
    pub merge_on_line: bool,
    pub same_street: SameStreetThresholds,
}

impl Default for StreetConfig {
    fn default() -> Self {
        Self {
            class_distances_m: [2000.0, 1500.0, 1000.0, 700.0, 500.0],
            merge_on_line: false,
            same_street: SameStreetThresholds::default(),
        }
    }
}

impl StreetConfig {
    /// Grouping distance for two segments; the more important class wins.
    pub fn distance_for(&self, class_a: u8, class_b: u8) -> f64 {
        let class = class_a.min(class_b).min(4);
        self.class_distances_m[usize::from(class)]
    }
}

/// Configuration of one tile compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    pub zoom: u8,
    /// Map units per metre of the input coordinates
    pub units_per_meter: f64,
    pub connect: ConnectOptions,
    pub streets: StreetConfig,
    pub anchor_border_crossings: bool,
    pub remove_level_mismatches: bool,
    pub validate: bool,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            zoom: 13,
            units_per_meter: 1.0,
            connect: ConnectOptions::default(),
            streets: StreetConfig::default(),
            anchor_border_crossings: true,
            remove_level_mismatches: false,
            validate: true,
        }
    }
}
