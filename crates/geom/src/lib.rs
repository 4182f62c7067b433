//! Geometry kernel: integer block positions, axis-aligned bounding boxes,
//! quarter-turn rotations about the vertical axis and named directions.
//!
//! # Invariants
//! - Block-coordinate math is exact integer math; no floating point is used
//!   to rotate or translate a block position.
//! - An [`Aabb`] always holds `min <= max` on every axis and is never empty.
//! - Every operation is pure and total; the only failure is building a box
//!   from zero points.

mod aabb;
mod direction;
mod error;
mod hitbox;
mod pos;
mod rotation;

pub use aabb::{Aabb, AabbBuilder};
pub use direction::{Direction, Facing};
pub use error::GeomError;
pub use hitbox::HitBox;
pub use pos::BlockPos;
pub use rotation::{Rotation, rotate_f64, rotate_rounded};
