//! Map features as stored in a tile.
//!
//! The set of feature kinds is closed: [`Feature`] is an enum over the
//! concrete kinds, and the behaviour the builder needs from any of them is
//! expressed by [`MapFeature`].

use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use super::{FeatureId, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FeatureKind {
    StreetSegment,
    Ferry,
    Street,
    Park,
    Building,
    Water,
    Other(u16),
}

impl FeatureKind {
    pub fn is_routeable(self) -> bool {
        matches!(self, FeatureKind::StreetSegment | FeatureKind::Ferry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NameKind {
    #[default]
    Official,
    Alternative,
    RoadNumber,
    Synonym,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Name {
    pub lang: String,
    pub kind: NameKind,
    pub text: String,
}

impl Name {
    pub fn official(lang: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            kind: NameKind::Official,
            text: text.into(),
        }
    }
}

/// Attributes shared by every feature kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureBase {
    pub names: Vec<Name>,
    /// Administrative groups the feature belongs to
    pub groups: Vec<u32>,
    pub(crate) geometry: Vec<LineString<f64>>,
}

impl FeatureBase {
    pub fn new(geometry: Vec<LineString<f64>>) -> Self {
        Self {
            names: Vec::new(),
            groups: Vec::new(),
            geometry,
        }
    }
}

/// House number ranges on both sides of a street segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub left_start: u16,
    pub left_end: u16,
    pub right_start: u16,
    pub right_end: u16,
}

impl AddressRange {
    pub fn span(&self) -> u32 {
        u32::from(self.left_end.abs_diff(self.left_start))
            + u32::from(self.right_end.abs_diff(self.right_start))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreetSegment {
    pub base: FeatureBase,
    /// 0 is the most important class, 4 the least
    pub road_class: u8,
    pub address: AddressRange,
    pub roundabout: bool,
    pub ramp: bool,
    pub(crate) nodes: [Node; 2],
}

impl StreetSegment {
    pub fn new(line: LineString<f64>) -> Self {
        Self {
            base: FeatureBase::new(vec![line]),
            road_class: 4,
            address: AddressRange::default(),
            roundabout: false,
            ramp: false,
            nodes: Default::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ferry {
    pub base: FeatureBase,
    pub road_class: u8,
    pub(crate) nodes: [Node; 2],
}

impl Ferry {
    pub fn new(line: LineString<f64>) -> Self {
        Self {
            base: FeatureBase::new(vec![line]),
            road_class: 4,
            nodes: Default::default(),
        }
    }
}

/// A logical street built from same-named segments. Has no geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Street {
    pub base: FeatureBase,
    pub(crate) segments: Vec<FeatureId>,
}

impl Street {
    /// Member segments ordered by ascending address-range span.
    pub fn segments(&self) -> &[FeatureId] {
        &self.segments
    }
}

/// Any non-routeable feature the builder only carries along.
#[derive(Debug, Clone, PartialEq)]
pub struct Area {
    pub kind: FeatureKind,
    pub base: FeatureBase,
}

impl Area {
    pub fn new(kind: FeatureKind, rings: Vec<LineString<f64>>) -> Self {
        Self {
            kind,
            base: FeatureBase::new(rings),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Feature {
    StreetSegment(StreetSegment),
    Ferry(Ferry),
    Street(Street),
    Area(Area),
}

/// Capabilities the tile builder relies on.
pub trait MapFeature {
    fn kind(&self) -> FeatureKind;

    fn base(&self) -> &FeatureBase;

    fn base_mut(&mut self) -> &mut FeatureBase;

    fn nodes(&self) -> Option<&[Node; 2]> {
        None
    }

    fn nodes_mut(&mut self) -> Option<&mut [Node; 2]> {
        None
    }

    fn is_routeable(&self) -> bool {
        self.nodes().is_some()
    }

    fn geometry(&self) -> &[LineString<f64>] {
        &self.base().geometry
    }

    fn names(&self) -> &[Name] {
        &self.base().names
    }

    fn groups(&self) -> &[u32] {
        &self.base().groups
    }

    /// Coordinates of node 0 and node 1 for routeable features.
    fn endpoints(&self) -> Option<[Coord<f64>; 2]> {
        if !self.is_routeable() {
            return None;
        }
        let line = self.geometry().first()?;
        Some([*line.0.first()?, *line.0.last()?])
    }
}

macro_rules! routeable_feature {
    ($ty:ty, $kind:expr) => {
        impl MapFeature for $ty {
            fn kind(&self) -> FeatureKind {
                $kind
            }

            fn base(&self) -> &FeatureBase {
                &self.base
            }

            fn base_mut(&mut self) -> &mut FeatureBase {
                &mut self.base
            }

            fn nodes(&self) -> Option<&[Node; 2]> {
                Some(&self.nodes)
            }

            fn nodes_mut(&mut self) -> Option<&mut [Node; 2]> {
                Some(&mut self.nodes)
            }
        }
    };
}

routeable_feature!(StreetSegment, FeatureKind::StreetSegment);
routeable_feature!(Ferry, FeatureKind::Ferry);

impl MapFeature for Street {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Street
    }

    fn base(&self) -> &FeatureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FeatureBase {
        &mut self.base
    }
}

impl MapFeature for Area {
    fn kind(&self) -> FeatureKind {
        self.kind
    }

    fn base(&self) -> &FeatureBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FeatureBase {
        &mut self.base
    }
}

impl MapFeature for Feature {
    fn kind(&self) -> FeatureKind {
        match self {
            Feature::StreetSegment(f) => f.kind(),
            Feature::Ferry(f) => f.kind(),
            Feature::Street(f) => f.kind(),
            Feature::Area(f) => f.kind(),
        }
    }

    fn base(&self) -> &FeatureBase {
        match self {
            Feature::StreetSegment(f) => &f.base,
            Feature::Ferry(f) => &f.base,
            Feature::Street(f) => &f.base,
            Feature::Area(f) => &f.base,
        }
    }

    fn base_mut(&mut self) -> &mut FeatureBase {
        match self {
            Feature::StreetSegment(f) => &mut f.base,
            Feature::Ferry(f) => &mut f.base,
            Feature::Street(f) => &mut f.base,
            Feature::Area(f) => &mut f.base,
        }
    }

    fn nodes(&self) -> Option<&[Node; 2]> {
        match self {
            Feature::StreetSegment(f) => f.nodes(),
            Feature::Ferry(f) => f.nodes(),
            Feature::Street(_) | Feature::Area(_) => None,
        }
    }

    fn nodes_mut(&mut self) -> Option<&mut [Node; 2]> {
        match self {
            Feature::StreetSegment(f) => f.nodes_mut(),
            Feature::Ferry(f) => f.nodes_mut(),
            Feature::Street(_) | Feature::Area(_) => None,
        }
    }
}

impl Feature {
    pub fn as_street_segment(&self) -> Option<&StreetSegment> {
        match self {
            Feature::StreetSegment(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_street(&self) -> Option<&Street> {
        match self {
            Feature::Street(s) => Some(s),
            _ => None,
        }
    }

    /// Road class of routeable features.
    pub fn road_class(&self) -> Option<u8> {
        match self {
            Feature::StreetSegment(s) => Some(s.road_class),
            Feature::Ferry(f) => Some(f.road_class),
            Feature::Street(_) | Feature::Area(_) => None,
        }
    }

    /// Zero-length copy of a routeable feature placed at `at`.
    ///
    /// Only the kind, the road class and the group memberships are kept.
    pub(crate) fn boundary_copy(&self, at: Coord<f64>) -> Option<Feature> {
        let line = LineString::new(vec![at, at]);
        let copy = match self {
            Feature::StreetSegment(s) => {
                let mut copy = StreetSegment::new(line);
                copy.road_class = s.road_class;
                copy.base.groups.clone_from(&s.base.groups);
                Feature::StreetSegment(copy)
            }
            Feature::Ferry(f) => {
                let mut copy = Ferry::new(line);
                copy.road_class = f.road_class;
                copy.base.groups.clone_from(&f.base.groups);
                Feature::Ferry(copy)
            }
            Feature::Street(_) | Feature::Area(_) => return None,
        };
        Some(copy)
    }
}

impl From<StreetSegment> for Feature {
    fn from(value: StreetSegment) -> Self {
        Feature::StreetSegment(value)
    }
}

impl From<Ferry> for Feature {
    fn from(value: Ferry) -> Self {
        Feature::Ferry(value)
    }
}

impl From<Area> for Feature {
    fn from(value: Area) -> Self {
        Feature::Area(value)
    }
}
