use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

use crate::pos::BlockPos;
use crate::rotation::Rotation;

/// A movement intent: each component is -1, 0 or 1.
///
/// North is -z, east is +x, up is +y. Adding two directions adds the
/// components and clamps the result back into `{-1, 0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Components")]
pub struct Direction {
    x: i8,
    y: i8,
    z: i8,
}

/// Wire form of [`Direction`]; out-of-range components are clamped.
#[derive(Deserialize)]
struct Components {
    x: i32,
    y: i32,
    z: i32,
}

impl From<Components> for Direction {
    fn from(c: Components) -> Self {
        Self::clamped(c.x, c.y, c.z)
    }
}

/// Orientation of a fixed marker block (e.g. a helm sign) on a wall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    North,
    East,
    South,
    West,
}

const NAMES: [(&str, Direction); 11] = [
    ("north", Direction::NORTH),
    ("northeast", Direction::NORTH_EAST),
    ("east", Direction::EAST),
    ("southeast", Direction::SOUTH_EAST),
    ("south", Direction::SOUTH),
    ("southwest", Direction::SOUTH_WEST),
    ("west", Direction::WEST),
    ("northwest", Direction::NORTH_WEST),
    ("up", Direction::UP),
    ("down", Direction::DOWN),
    ("off", Direction::OFF),
];

const ALIASES: [(&str, Direction); 16] = [
    ("n", Direction::NORTH),
    ("ne", Direction::NORTH_EAST),
    ("north-east", Direction::NORTH_EAST),
    ("e", Direction::EAST),
    ("se", Direction::SOUTH_EAST),
    ("south-east", Direction::SOUTH_EAST),
    ("s", Direction::SOUTH),
    ("sw", Direction::SOUTH_WEST),
    ("south-west", Direction::SOUTH_WEST),
    ("w", Direction::WEST),
    ("nw", Direction::NORTH_WEST),
    ("north-west", Direction::NORTH_WEST),
    ("u", Direction::UP),
    ("d", Direction::DOWN),
    ("none", Direction::OFF),
    ("stop", Direction::OFF),
];

/// Horizontal compass points in yaw order, starting at yaw 0 (south) and
/// turning 45° at a time towards west.
const YAW_ORDER: [Direction; 8] = [
    Direction::SOUTH,
    Direction::SOUTH_WEST,
    Direction::WEST,
    Direction::NORTH_WEST,
    Direction::NORTH,
    Direction::NORTH_EAST,
    Direction::EAST,
    Direction::SOUTH_EAST,
];

/// Pitch (degrees) beyond which a look direction counts as straight up/down.
const VERTICAL_PITCH: f32 = 60.0;

impl Direction {
    pub const OFF: Direction = Direction::raw(0, 0, 0);
    pub const NORTH: Direction = Direction::raw(0, 0, -1);
    pub const NORTH_EAST: Direction = Direction::raw(1, 0, -1);
    pub const EAST: Direction = Direction::raw(1, 0, 0);
    pub const SOUTH_EAST: Direction = Direction::raw(1, 0, 1);
    pub const SOUTH: Direction = Direction::raw(0, 0, 1);
    pub const SOUTH_WEST: Direction = Direction::raw(-1, 0, 1);
    pub const WEST: Direction = Direction::raw(-1, 0, 0);
    pub const NORTH_WEST: Direction = Direction::raw(-1, 0, -1);
    pub const UP: Direction = Direction::raw(0, 1, 0);
    pub const DOWN: Direction = Direction::raw(0, -1, 0);

    const fn raw(x: i8, y: i8, z: i8) -> Self {
        Self { x, y, z }
    }

    /// Build from arbitrary components, clamping each into `{-1, 0, 1}`.
    pub fn clamped(x: i32, y: i32, z: i32) -> Self {
        Self::raw(x.signum() as i8, y.signum() as i8, z.signum() as i8)
    }

    pub fn x(self) -> i32 {
        self.x as i32
    }

    pub fn y(self) -> i32 {
        self.y as i32
    }

    pub fn z(self) -> i32 {
        self.z as i32
    }

    pub fn is_off(self) -> bool {
        self == Self::OFF
    }

    /// Case-insensitive lookup by canonical name or alias.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        NAMES
            .iter()
            .chain(ALIASES.iter())
            .find(|(n, _)| *n == name)
            .map(|(_, d)| *d)
    }

    /// Canonical name, if this is one of the named intents.
    pub fn name(self) -> Option<&'static str> {
        NAMES.iter().find(|(_, d)| *d == self).map(|(n, _)| *n)
    }

    /// Direction a viewer is looking, snapped to the eight compass points or
    /// straight up/down when the pitch is steep.
    ///
    /// Yaw 0 faces south and increases towards west; negative pitch looks up.
    pub fn from_look(yaw: f32, pitch: f32) -> Self {
        if pitch <= -VERTICAL_PITCH {
            return Self::UP;
        }
        if pitch >= VERTICAL_PITCH {
            return Self::DOWN;
        }
        let octant = (yaw.rem_euclid(360.0) / 45.0).round() as usize % 8;
        YAW_ORDER[octant]
    }

    /// The direction a marker block faces.
    pub fn from_facing(facing: Facing) -> Self {
        match facing {
            Facing::North => Self::NORTH,
            Facing::East => Self::EAST,
            Facing::South => Self::SOUTH,
            Facing::West => Self::WEST,
        }
    }

    pub fn rotate(self, rotation: Rotation) -> Self {
        let p = self.offset().rotate(BlockPos::ZERO, rotation);
        Self::clamped(p.x, p.y, p.z)
    }

    /// Unit offset as a block vector.
    pub fn offset(self) -> BlockPos {
        BlockPos::new(self.x(), self.y(), self.z())
    }

    /// Offset scaled by a move distance.
    pub fn scaled(self, distance: i32) -> BlockPos {
        BlockPos::new(self.x() * distance, self.y() * distance, self.z() * distance)
    }
}

impl Add for Direction {
    type Output = Direction;

    fn add(self, rhs: Direction) -> Direction {
        Direction::clamped(self.x() + rhs.x(), self.y() + rhs.y(), self.z() + rhs.z())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "<{}, {}, {}>", self.x, self.y, self.z),
        }
    }
}
