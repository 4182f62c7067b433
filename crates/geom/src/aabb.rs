use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

use crate::error::GeomError;
use crate::pos::BlockPos;
use crate::rotation::Rotation;

/// Inclusive axis-aligned box of blocks.
///
/// `min <= max` holds on every axis, so every box covers at least one block.
/// Construct with [`Aabb::from_corners`] or an [`AabbBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Corners")]
pub struct Aabb {
    min: BlockPos,
    max: BlockPos,
}

/// Wire form of [`Aabb`]; corners are normalised on the way in.
#[derive(Deserialize)]
struct Corners {
    min: BlockPos,
    max: BlockPos,
}

impl From<Corners> for Aabb {
    fn from(c: Corners) -> Self {
        Self::from_corners(c.min, c.max)
    }
}

impl Aabb {
    /// Box spanning two opposite corners given in any order.
    pub fn from_corners(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Single-block box.
    pub fn of_block(pos: BlockPos) -> Self {
        Self { min: pos, max: pos }
    }

    /// Smallest box containing every point, or an error for an empty iterator.
    pub fn enclosing(points: impl IntoIterator<Item = BlockPos>) -> Result<Self, GeomError> {
        let mut builder = AabbBuilder::new();
        builder.extend(points);
        builder.build()
    }

    pub fn min(&self) -> BlockPos {
        self.min
    }

    pub fn max(&self) -> BlockPos {
        self.max
    }

    pub fn size_x(&self) -> i32 {
        self.max.x - self.min.x + 1
    }

    pub fn size_y(&self) -> i32 {
        self.max.y - self.min.y + 1
    }

    pub fn size_z(&self) -> i32 {
        self.max.z - self.min.z + 1
    }

    pub fn x_range(&self) -> RangeInclusive<i32> {
        self.min.x..=self.max.x
    }

    pub fn y_range(&self) -> RangeInclusive<i32> {
        self.min.y..=self.max.y
    }

    pub fn z_range(&self) -> RangeInclusive<i32> {
        self.min.z..=self.max.z
    }

    /// Number of blocks covered.
    pub fn volume(&self) -> i64 {
        self.size_x() as i64 * self.size_y() as i64 * self.size_z() as i64
    }

    /// Centre block, rounding towards negative infinity on even sizes.
    pub fn center(&self) -> BlockPos {
        BlockPos::new(
            (self.min.x + self.max.x).div_euclid(2),
            (self.min.y + self.max.y).div_euclid(2),
            (self.min.z + self.max.z).div_euclid(2),
        )
    }

    pub fn translate(&self, offset: BlockPos) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Rotate the box about `pivot`.
    ///
    /// Only the two opposite corners are rotated; a quarter turn swaps which of
    /// them is the minimum on x/z, so the result is rebuilt with min/max.
    pub fn rotate(&self, pivot: BlockPos, rotation: Rotation) -> Self {
        if rotation == Rotation::None {
            return *self;
        }
        Self::from_corners(
            self.min.rotate(pivot, rotation),
            self.max.rotate(pivot, rotation),
        )
    }

    pub fn contains(&self, p: BlockPos) -> bool {
        self.x_range().contains(&p.x) && self.y_range().contains(&p.y) && self.z_range().contains(&p.z)
    }

    pub fn contains_box(&self, other: &Aabb) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Overlap test on doubled centres and sizes, so no division is needed.
    pub fn intersects(&self, other: &Aabb) -> bool {
        fn axis(a_min: i32, a_max: i32, b_min: i32, b_max: i32) -> bool {
            let a_center2 = a_min as i64 + a_max as i64;
            let b_center2 = b_min as i64 + b_max as i64;
            let a_size = (a_max - a_min) as i64 + 1;
            let b_size = (b_max - b_min) as i64 + 1;
            (a_center2 - b_center2).abs() < a_size + b_size
        }
        axis(self.min.x, self.max.x, other.min.x, other.max.x)
            && axis(self.min.y, self.max.y, other.min.y, other.max.y)
            && axis(self.min.z, self.max.z, other.min.z, other.max.z)
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Aabb) -> Self {
        Self::from_corners(
            BlockPos::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            BlockPos::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} .. {}]", self.min, self.max)
    }
}

/// Accumulates points and yields the tightest [`Aabb`] around them.
#[derive(Debug, Clone, Default)]
pub struct AabbBuilder {
    bounds: Option<(BlockPos, BlockPos)>,
}

impl AabbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, p: BlockPos) -> &mut Self {
        self.bounds = Some(match self.bounds {
            None => (p, p),
            Some((min, max)) => (
                BlockPos::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z)),
                BlockPos::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z)),
            ),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    pub fn build(&self) -> Result<Aabb, GeomError> {
        self.bounds
            .map(|(min, max)| Aabb { min, max })
            .ok_or(GeomError::EmptyBounds)
    }
}

impl Extend<BlockPos> for AabbBuilder {
    fn extend<I: IntoIterator<Item = BlockPos>>(&mut self, iter: I) {
        for p in iter {
            self.add(p);
        }
    }
}
