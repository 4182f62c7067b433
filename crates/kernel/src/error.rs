use craftspace_common::BlockState;
use craftspace_geom::BlockPos;

use crate::craft::CraftId;

/// Errors from assembling a craft out of a block region.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CraftError {
    #[error("craft has no blocks")]
    Empty,
    #[error("craft has {size} blocks, type {craft_type} needs at least {min}")]
    TooSmall {
        craft_type: String,
        size: usize,
        min: usize,
    },
    #[error("craft has {size} blocks, type {craft_type} allows at most {max}")]
    TooLarge {
        craft_type: String,
        size: usize,
        max: usize,
    },
    #[error("block {state} at {pos} is not allowed on a {craft_type}")]
    Disallowed {
        craft_type: String,
        pos: BlockPos,
        state: BlockState,
    },
    #[error("block {state} at {pos} is forbidden on a {craft_type}")]
    Forbidden {
        craft_type: String,
        pos: BlockPos,
        state: BlockState,
    },
    #[error("block at {pos} is not connected to the rest of the craft")]
    Disconnected { pos: BlockPos },
}

/// Errors from planning a move or rotation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("a sinking craft can only move down or sideways")]
    Sinking,
    #[error("craft top would reach y={max_y}, above the limit y={ceiling}")]
    AboveCeiling { max_y: i32, ceiling: i32 },
    #[error("craft bottom would reach y={min_y}, below the limit y={floor}")]
    BelowFloor { min_y: i32, floor: i32 },
}

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("no async runtime available to schedule a release timer")]
    NoRuntime,
    #[error("{0} is not admitted to the registry")]
    NotAdmitted(CraftId),
}
