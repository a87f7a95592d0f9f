//! Road network components - nodes, connections and their classifications

use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

use super::NodeRef;

/// Vehicle classes allowed to use a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleRestriction(u16);

impl VehicleRestriction {
    pub const NONE: Self = Self(0);
    pub const PASSENGER_CAR: Self = Self(1);
    pub const BUS: Self = Self(1 << 1);
    pub const TAXI: Self = Self(1 << 2);
    pub const TRUCK: Self = Self(1 << 3);
    pub const BICYCLE: Self = Self(1 << 4);
    pub const PEDESTRIAN: Self = Self(1 << 5);
    pub const EMERGENCY: Self = Self(1 << 6);
    pub const DELIVERY: Self = Self(1 << 7);
    pub const ALL: Self = Self(0xff);

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// No vehicle may pass.
    pub fn is_impassable(self) -> bool {
        self.0 == 0
    }
}

impl Default for VehicleRestriction {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for VehicleRestriction {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for VehicleRestriction {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TurnDirection {
    #[default]
    Unknown,
    Ahead,
    Left,
    Right,
    UTurn,
    FollowRoad,
    EnterRoundabout,
    ExitRoundabout,
    AheadRoundabout,
    OnRamp,
    OffRamp,
    EnterFerry,
    ExitFerry,
    ChangeFerry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CrossingKind {
    #[default]
    Undefined,
    NoCrossing,
    ThreeWay,
    FourWay,
    MultiWay,
    Roundabout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JunctionType {
    #[default]
    Normal,
    BifurcationRamp,
    BorderCrossing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryRestriction {
    #[default]
    NoRestrictions,
    NoThroughTraffic,
    NoEntry,
    NoWay,
}

/// Directed edge to another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub to: NodeRef,
    pub restriction: VehicleRestriction,
    pub turn: TurnDirection,
    pub crossing: CrossingKind,
    /// Traversal cost in metres
    pub cost: u32,
}

impl Connection {
    pub fn new(to: NodeRef, cost: u32) -> Self {
        Self {
            to,
            restriction: VehicleRestriction::ALL,
            turn: TurnDirection::Unknown,
            crossing: CrossingKind::Undefined,
            cost,
        }
    }

    pub fn with_turn(mut self, turn: TurnDirection, crossing: CrossingKind) -> Self {
        self.turn = turn;
        self.crossing = crossing;
        self
    }

    pub fn with_restriction(mut self, restriction: VehicleRestriction) -> Self {
        self.restriction = restriction;
        self
    }
}

/// Endpoint of a routeable feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Grade level, 0 is ground
    pub level: i8,
    pub junction: JunctionType,
    pub entry: EntryRestriction,
    /// km/h, 0 when unknown
    pub speed_limit: u8,
    pub(crate) connections: Vec<Connection>,
}

impl Node {
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection_to(&self, to: NodeRef) -> Option<&Connection> {
        self.connections.iter().find(|c| c.to == to)
    }

    pub(crate) fn connection_to_mut(&mut self, to: NodeRef) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.to == to)
    }

    /// Appends `connection` unless an edge to the same node exists.
    pub(crate) fn push_connection(&mut self, connection: Connection) -> bool {
        if self.connection_to(connection.to).is_some() {
            return false;
        }
        self.connections.push(connection);
        true
    }

    pub(crate) fn remove_connection(&mut self, to: NodeRef) -> Option<Connection> {
        let pos = self.connections.iter().position(|c| c.to == to)?;
        Some(self.connections.remove(pos))
    }
}
