use glam::IVec3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::rotation::Rotation;

/// Integer block position (or offset) in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ZERO: BlockPos = BlockPos::new(0, 0, 0);
    pub const UP: BlockPos = BlockPos::new(0, 1, 0);
    pub const DOWN: BlockPos = BlockPos::new(0, -1, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise translation.
    pub const fn translate(self, offset: BlockPos) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.z + offset.z)
    }

    /// Rotate this position a quarter turn about `pivot` around the vertical axis.
    ///
    /// Uses the exact 90° matrix (`cos = 0`, `sin = ±1`), so four clockwise
    /// turns always return the starting position.
    pub fn rotate(self, pivot: BlockPos, rotation: Rotation) -> Self {
        let Some(sin) = rotation.sin() else {
            return self;
        };
        let rel = self - pivot;
        pivot + BlockPos::new(-rel.z * sin, rel.y, rel.x * sin)
    }

    /// The four horizontal face neighbours (+x, -x, +z, -z).
    pub const fn horizontal_neighbors(self) -> [BlockPos; 4] {
        [
            Self::new(self.x + 1, self.y, self.z),
            Self::new(self.x - 1, self.y, self.z),
            Self::new(self.x, self.y, self.z + 1),
            Self::new(self.x, self.y, self.z - 1),
        ]
    }

    /// All six face neighbours.
    pub const fn neighbors(self) -> [BlockPos; 6] {
        [
            Self::new(self.x + 1, self.y, self.z),
            Self::new(self.x - 1, self.y, self.z),
            Self::new(self.x, self.y + 1, self.z),
            Self::new(self.x, self.y - 1, self.z),
            Self::new(self.x, self.y, self.z + 1),
            Self::new(self.x, self.y, self.z - 1),
        ]
    }

    pub const fn dot(self, other: BlockPos) -> i64 {
        self.x as i64 * other.x as i64 + self.y as i64 * other.y as i64 + self.z as i64 * other.z as i64
    }

    pub const fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }

    /// Centre of this block in continuous space.
    pub fn center(self) -> glam::DVec3 {
        glam::DVec3::new(self.x as f64 + 0.5, self.y as f64 + 0.5, self.z as f64 + 0.5)
    }

    /// Block containing a continuous-space point.
    pub fn containing(point: glam::DVec3) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }
}

impl From<IVec3> for BlockPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<BlockPos> for IVec3 {
    fn from(p: BlockPos) -> Self {
        p.as_ivec3()
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, rhs: BlockPos) -> BlockPos {
        self.translate(rhs)
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, rhs: BlockPos) -> BlockPos {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for BlockPos {
    type Output = BlockPos;

    fn neg(self) -> BlockPos {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
