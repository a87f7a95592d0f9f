//! Feature and node identities.
//!
//! A [`FeatureId`] names a slot in the store of one zoom level together with
//! the slot's generation, so an id that outlived its feature never resolves
//! to the feature that reused the slot. [`NodeRef`] addresses one of the two
//! endpoints of a routeable feature. The 32-bit packed form only exists at the
//! serialization boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::BuildError;

/// Highest zoom level a feature can live on.
pub const MAX_ZOOM: u8 = 14;

const SLOT_BITS: u32 = 27;
const SLOT_MASK: u32 = (1 << SLOT_BITS) - 1;
const ZOOM_MASK: u32 = 0xf;
const ENDPOINT_BIT: u32 = 0x8000_0000;

/// Largest slot index representable in a packed id.
pub const MAX_SLOT: u32 = SLOT_MASK;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureId {
    zoom: u8,
    slot: u32,
    generation: u32,
}

impl FeatureId {
    pub(crate) fn new(zoom: u8, slot: u32, generation: u32) -> Self {
        Self {
            zoom,
            slot,
            generation,
        }
    }

    pub fn zoom(self) -> u8 {
        self.zoom
    }

    pub fn slot(self) -> u32 {
        self.slot
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    /// `(zoom << 27) | slot`, the serialized form of the feature.
    pub fn packed(self) -> u32 {
        (u32::from(self.zoom) << SLOT_BITS) | self.slot
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}@{}", self.packed(), self.generation)
    }
}

/// One of the two ends of a routeable feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Endpoint {
    Zero,
    One,
}

impl Endpoint {
    pub const BOTH: [Endpoint; 2] = [Endpoint::Zero, Endpoint::One];

    pub fn other(self) -> Self {
        match self {
            Endpoint::Zero => Endpoint::One,
            Endpoint::One => Endpoint::Zero,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Endpoint::Zero => 0,
            Endpoint::One => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeRef {
    pub feature: FeatureId,
    pub endpoint: Endpoint,
}

impl NodeRef {
    pub fn new(feature: FeatureId, endpoint: Endpoint) -> Self {
        Self { feature, endpoint }
    }

    /// The node at the other end of the same feature.
    pub fn opposite(self) -> Self {
        Self::new(self.feature, self.endpoint.other())
    }

    /// Packed 32-bit node id; bit 31 selects endpoint one.
    pub fn packed(self) -> u32 {
        match self.endpoint {
            Endpoint::Zero => self.feature.packed(),
            Endpoint::One => self.feature.packed() | ENDPOINT_BIT,
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.packed())
    }
}

/// Splits a packed node id into `(zoom, slot, endpoint)`.
///
/// # Errors
///
/// Returns [`BuildError::MalformedInput`] if the zoom bits exceed [`MAX_ZOOM`].
pub fn unpack_node(packed: u32) -> Result<(u8, u32, Endpoint), BuildError> {
    let endpoint = if packed & ENDPOINT_BIT == 0 {
        Endpoint::Zero
    } else {
        Endpoint::One
    };
    let zoom = ((packed >> SLOT_BITS) & ZOOM_MASK) as u8;
    if zoom > MAX_ZOOM {
        return Err(BuildError::MalformedInput(format!(
            "packed node id {packed:#010x} has zoom {zoom}"
        )));
    }
    Ok((zoom, packed & SLOT_MASK, endpoint))
}
