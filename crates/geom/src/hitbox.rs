use glam::DVec3;

use crate::pos::BlockPos;

/// Headroom above the highest block of a column that still counts as "on"
/// the craft: a standing entity occupies two blocks.
const STANDING_HEADROOM: i32 = 2;

/// Top-down silhouette of a craft: the vertical extent of every occupied column.
///
/// Columns are indexed by `(x - min_x, z - min_z)`. A column with no blocks
/// has no extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitBox {
    min_x: i32,
    min_z: i32,
    size_x: usize,
    size_z: usize,
    columns: Vec<Option<(i32, i32)>>,
}

impl HitBox {
    /// Silhouette of a set of block positions. `None` when the set is empty.
    pub fn from_positions<'a>(positions: impl IntoIterator<Item = &'a BlockPos> + Clone) -> Option<Self> {
        let mut iter = positions.clone().into_iter();
        let first = iter.next()?;
        let (mut min_x, mut max_x, mut min_z, mut max_z) = (first.x, first.x, first.z, first.z);
        for p in iter {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_z = min_z.min(p.z);
            max_z = max_z.max(p.z);
        }
        let size_x = (max_x - min_x + 1) as usize;
        let size_z = (max_z - min_z + 1) as usize;
        let mut columns: Vec<Option<(i32, i32)>> = vec![None; size_x * size_z];
        for p in positions {
            let idx = (p.x - min_x) as usize * size_z + (p.z - min_z) as usize;
            columns[idx] = Some(match columns[idx] {
                None => (p.y, p.y),
                Some((lo, hi)) => (lo.min(p.y), hi.max(p.y)),
            });
        }
        Some(Self {
            min_x,
            min_z,
            size_x,
            size_z,
            columns,
        })
    }

    /// Vertical extent `[min_y, max_y]` of the column at world `(x, z)`.
    pub fn column(&self, x: i32, z: i32) -> Option<(i32, i32)> {
        let dx = x.checked_sub(self.min_x)?;
        let dz = z.checked_sub(self.min_z)?;
        if dx < 0 || dz < 0 {
            return None;
        }
        let (dx, dz) = (dx as usize, dz as usize);
        if dx >= self.size_x || dz >= self.size_z {
            return None;
        }
        self.columns[dx * self.size_z + dz]
    }

    /// Whether a block lies within the craft's silhouette, including the two
    /// blocks of headroom above each column.
    pub fn contains(&self, p: BlockPos) -> bool {
        match self.column(p.x, p.z) {
            Some((min_y, max_y)) => p.y >= min_y && p.y <= max_y + STANDING_HEADROOM,
            None => false,
        }
    }

    /// [`HitBox::contains`] for a continuous-space point (e.g. an entity's feet).
    pub fn contains_point(&self, point: DVec3) -> bool {
        self.contains(BlockPos::containing(point))
    }

    /// Number of occupied columns.
    pub fn column_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }
}
