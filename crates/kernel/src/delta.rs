use craftspace_common::{BlockState, Material};
use craftspace_geom::{BlockPos, Rotation};
use serde::{Deserialize, Serialize};

use crate::craft::CraftId;

/// Side effect the mutation layer plays at a delta's destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    #[default]
    None,
    Smoke,
}

/// One block's before/after state for a single craft move.
///
/// The mutation layer writes `material`/`variant` at `destination`, turning
/// orientation data by `rotation`. A delta without a `source` materialises a
/// block that was not carried from anywhere (the fill of a vacated cell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDelta {
    pub source: Option<BlockPos>,
    pub destination: BlockPos,
    pub material: Material,
    pub variant: u8,
    pub rotation: Rotation,
    pub craft: CraftId,
    pub effect: Effect,
}

impl BlockDelta {
    pub(crate) fn carry(
        craft: CraftId,
        source: BlockPos,
        destination: BlockPos,
        state: BlockState,
        rotation: Rotation,
        effect: Effect,
    ) -> Self {
        Self {
            source: Some(source),
            destination,
            material: state.material,
            variant: state.variant,
            rotation,
            craft,
            effect,
        }
    }

    pub(crate) fn vacate(craft: CraftId, cell: BlockPos) -> Self {
        Self {
            source: None,
            destination: cell,
            material: Material::AIR,
            variant: 0,
            rotation: Rotation::None,
            craft,
            effect: Effect::None,
        }
    }

    pub fn state(&self) -> BlockState {
        BlockState::new(self.material, self.variant)
    }

    /// True for the air fill written into a cell the craft left.
    pub fn clears(&self) -> bool {
        self.source.is_none() && self.material.is_air()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_serializes_with_its_craft_id() {
        let delta = BlockDelta::carry(
            CraftId(7),
            BlockPos::new(0, 64, 0),
            BlockPos::new(1, 64, 0),
            BlockState::of(Material::WOOD),
            Rotation::None,
            Effect::Smoke,
        );
        let json = serde_json::to_value(delta).unwrap();
        assert_eq!(json["craft"], 7);
        assert_eq!(json["effect"], "smoke");
        let back: BlockDelta = serde_json::from_value(json).unwrap();
        assert_eq!(back, delta);
        assert!(!back.clears());
        assert!(BlockDelta::vacate(CraftId(7), BlockPos::new(0, 64, 0)).clears());
    }
}
