use thiserror::Error;

use crate::model::FeatureId;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invariant violated ({invariant}) for ids {ids:?}")]
    Invariant {
        invariant: &'static str,
        ids: Vec<u32>,
    },
    #[error("Unknown feature {0}")]
    UnknownFeature(FeatureId),
    #[error("Feature {0} is not routeable")]
    NotRouteable(FeatureId),
    #[error("Spatial index is stale (built at generation {built}, store is at {current})")]
    StaleIndex { built: u64, current: u64 },
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl BuildError {
    pub(crate) fn invariant(invariant: &'static str, ids: impl IntoIterator<Item = u32>) -> Self {
        Self::Invariant {
            invariant,
            ids: ids.into_iter().collect(),
        }
    }

    /// True for errors that must terminate the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant { .. } | Self::IoError(_))
    }
}
