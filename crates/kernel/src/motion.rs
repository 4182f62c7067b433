//! Move and rotation planning.
//!
//! A plan turns a craft's current block map into the ordered list of
//! [`BlockDelta`]s the mutation layer applies. Carried blocks come first,
//! fills for vacated cells last, so a cell is never cleared after it has
//! been filled within the same plan.

use craftspace_common::BlockState;
use craftspace_geom::{Aabb, BlockPos, HitBox, Rotation, rotate_f64};
use glam::DVec3;
use std::collections::HashMap;

use crate::craft::{Craft, CraftId};
use crate::delta::{BlockDelta, Effect};
use crate::error::MoveError;

/// A rigid transform requested for a craft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Translate(BlockPos),
    Rotate { pivot: BlockPos, rotation: Rotation },
}

impl Motion {
    fn apply(self, pos: BlockPos) -> BlockPos {
        match self {
            Motion::Translate(offset) => pos + offset,
            Motion::Rotate { pivot, rotation } => pos.rotate(pivot, rotation),
        }
    }

    fn apply_bounds(self, bounds: &Aabb) -> Aabb {
        match self {
            Motion::Translate(offset) => bounds.translate(offset),
            Motion::Rotate { pivot, rotation } => bounds.rotate(pivot, rotation),
        }
    }

    fn rotation(self) -> Rotation {
        match self {
            Motion::Translate(_) => Rotation::None,
            Motion::Rotate { rotation, .. } => rotation,
        }
    }
}

/// Inclusive world-Y band a craft must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalLimits {
    pub floor: i32,
    pub ceiling: i32,
}

impl VerticalLimits {
    /// Limits of a craft type, tightened by an external height limit.
    pub fn for_type(min_height: i32, max_height: i32, external_ceiling: Option<i32>) -> Self {
        let ceiling = match external_ceiling {
            Some(limit) => max_height.min(limit),
            None => max_height,
        };
        Self {
            floor: min_height,
            ceiling,
        }
    }

    fn check(&self, bounds: &Aabb) -> Result<(), MoveError> {
        if bounds.max().y > self.ceiling {
            return Err(MoveError::AboveCeiling {
                max_y: bounds.max().y,
                ceiling: self.ceiling,
            });
        }
        if bounds.min().y < self.floor {
            return Err(MoveError::BelowFloor {
                min_y: bounds.min().y,
                floor: self.floor,
            });
        }
        Ok(())
    }
}

/// Result of a committed motion.
#[derive(Debug, Clone)]
pub struct MovePlan {
    craft: CraftId,
    motion: Motion,
    deltas: Vec<BlockDelta>,
    hitbox: Option<HitBox>,
}

impl MovePlan {
    pub fn craft(&self) -> CraftId {
        self.craft
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    /// Deltas in the order they must be applied.
    pub fn deltas(&self) -> &[BlockDelta] {
        &self.deltas
    }

    pub fn into_deltas(self) -> Vec<BlockDelta> {
        self.deltas
    }

    /// New position for an entity standing on the craft before the move, or
    /// `None` if the entity was not aboard.
    pub fn carry_passenger(&self, position: DVec3) -> Option<DVec3> {
        let aboard = self
            .hitbox
            .as_ref()
            .is_some_and(|hb| hb.contains_point(position));
        if !aboard {
            return None;
        }
        Some(match self.motion {
            Motion::Translate(offset) => position + offset.as_ivec3().as_dvec3(),
            // Blocks turn about the pivot block's centre in continuous space.
            Motion::Rotate { pivot, rotation } => rotate_f64(position, pivot.center(), rotation),
        })
    }
}

pub(crate) struct Staged {
    pub plan: MovePlan,
    pub blocks: HashMap<BlockPos, BlockState>,
    pub bounds: Aabb,
}

/// Compute the new block map, bounds and ordered deltas for `motion`
/// without touching the craft.
pub(crate) fn stage(craft: &Craft, motion: Motion, limits: VerticalLimits) -> Result<Staged, MoveError> {
    if craft.is_sinking() {
        let rising = match motion {
            Motion::Translate(offset) => offset.y > 0,
            Motion::Rotate { rotation, .. } => rotation != Rotation::None,
        };
        if rising {
            return Err(MoveError::Sinking);
        }
    }

    let bounds = motion.apply_bounds(&craft.bounds());
    limits.check(&bounds)?;

    let rotation = motion.rotation();
    let craft_type = craft.craft_type();
    let smoking = craft.is_cruising();

    let mut sources: Vec<(BlockPos, BlockState)> = craft.blocks().iter().map(|(p, s)| (*p, *s)).collect();
    match motion {
        // Leading edge first: a block whose source is another block's
        // destination is carried before that cell gets overwritten.
        Motion::Translate(offset) => {
            sources.sort_by(|(a, _), (b, _)| b.dot(offset).cmp(&a.dot(offset)).then(a.cmp(b)))
        }
        Motion::Rotate { .. } => sources.sort_by(|(a, _), (b, _)| a.cmp(b)),
    }

    let mut blocks = HashMap::with_capacity(sources.len());
    let mut deltas = Vec::with_capacity(sources.len() * 2);
    for &(source, state) in &sources {
        let destination = motion.apply(source);
        let effect = if smoking && craft_type.emits_smoke(state) {
            Effect::Smoke
        } else {
            Effect::None
        };
        deltas.push(BlockDelta::carry(craft.id(), source, destination, state, rotation, effect));
        blocks.insert(destination, state);
    }

    let mut vacated: Vec<BlockPos> = sources
        .iter()
        .map(|(p, _)| *p)
        .filter(|p| !blocks.contains_key(p))
        .collect();
    vacated.sort();
    deltas.extend(vacated.into_iter().map(|cell| BlockDelta::vacate(craft.id(), cell)));

    Ok(Staged {
        plan: MovePlan {
            craft: craft.id(),
            motion,
            deltas,
            hitbox: craft.hitbox(),
        },
        blocks,
        bounds,
    })
}
