//! Geometric algorithms used by the builder.

pub mod geometry;
pub mod same_street;

pub use same_street::{SameStreetThresholds, same_street};
