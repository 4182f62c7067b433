//! Shared identifiers and block material types.
//!
//! Everything here is a plain value type: copyable, hashable and serde-ready.
//! Nothing in this crate knows about crafts or geometry.

pub mod material;
pub mod types;

pub use material::{BlockState, ItemDrop, Material, ParseMaterialError};
pub use types::{PilotId, WorldId};
