//! TOML configuration of a compile run.
//!
//! ```toml
//! zoom = 13
//! units_per_meter = 1.0
//! max_connection_distance_m = 2.0
//! anchor_border_crossings = true
//! remove_level_mismatches = false
//!
//! [streets]
//! merge_on_line = false
//! class_distances_m = [2000.0, 1500.0, 1000.0, 700.0, 500.0]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tilegraph_core::model::MAX_ZOOM;
use tilegraph_core::{ConnectOptions, StreetConfig, TileConfig};

use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub zoom: u8,
    pub units_per_meter: f64,
    pub max_connection_distance_m: f64,
    pub anchor_border_crossings: bool,
    pub remove_level_mismatches: bool,
    pub streets: StreetSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreetSection {
    pub merge_on_line: bool,
    pub class_distances_m: [f64; 5],
}

impl Default for Config {
    fn default() -> Self {
        let tile = TileConfig::default();
        Self {
            zoom: tile.zoom,
            units_per_meter: tile.units_per_meter,
            max_connection_distance_m: tile.connect.max_distance_m,
            anchor_border_crossings: tile.anchor_border_crossings,
            remove_level_mismatches: tile.remove_level_mismatches,
            streets: StreetSection::default(),
        }
    }
}

impl Default for StreetSection {
    fn default() -> Self {
        let streets = StreetConfig::default();
        Self {
            merge_on_line: streets.merge_on_line,
            class_distances_m: streets.class_distances_m,
        }
    }
}

impl Config {
    /// Reads and checks a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or holds
    /// unusable values.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|e| CliError::io(path, e))?;
        let config: Config = toml::from_str(&text).map_err(|source| CliError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CliError> {
        if self.zoom > MAX_ZOOM {
            return Err(CliError::InvalidConfig(format!(
                "zoom {} exceeds {MAX_ZOOM}",
                self.zoom
            )));
        }
        if !(self.units_per_meter.is_finite() && self.units_per_meter > 0.0) {
            return Err(CliError::InvalidConfig(
                "units_per_meter must be positive".to_string(),
            ));
        }
        if !(self.max_connection_distance_m.is_finite() && self.max_connection_distance_m > 0.0) {
            return Err(CliError::InvalidConfig(
                "max_connection_distance_m must be positive".to_string(),
            ));
        }
        if self
            .streets
            .class_distances_m
            .iter()
            .any(|d| !d.is_finite() || *d < 0.0)
        {
            return Err(CliError::InvalidConfig(
                "class_distances_m must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tile_config(&self, validate: bool) -> TileConfig {
        TileConfig {
            zoom: self.zoom,
            units_per_meter: self.units_per_meter,
            connect: ConnectOptions {
                max_distance_m: self.max_connection_distance_m,
                ..ConnectOptions::default()
            },
            streets: StreetConfig {
                merge_on_line: self.streets.merge_on_line,
                class_distances_m: self.streets.class_distances_m,
                ..StreetConfig::default()
            },
            anchor_border_crossings: self.anchor_border_crossings,
            remove_level_mismatches: self.remove_level_mismatches,
            validate,
        }
    }
}
