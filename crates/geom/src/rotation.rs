use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pos::BlockPos;

/// A quarter turn (or no turn) about the vertical axis, seen from above.
///
/// Rotations do not combine into new values: turning twice clockwise is done
/// by applying [`Rotation::Clockwise`] twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Sine of the turn angle, `None` for the identity.
    pub(crate) fn sin(self) -> Option<i32> {
        match self {
            Rotation::None => None,
            Rotation::Clockwise => Some(1),
            Rotation::CounterClockwise => Some(-1),
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Rotation::None => Rotation::None,
            Rotation::Clockwise => Rotation::CounterClockwise,
            Rotation::CounterClockwise => Rotation::Clockwise,
        }
    }

    /// Rotate a yaw angle (degrees) by this turn, normalised to `[0, 360)`.
    pub fn rotate_yaw(self, yaw: f32) -> f32 {
        let turned = match self {
            Rotation::None => yaw,
            Rotation::Clockwise => yaw + 90.0,
            Rotation::CounterClockwise => yaw - 90.0,
        };
        turned.rem_euclid(360.0)
    }

    /// Parse `cw`, `clockwise`, `ccw`, `anticlockwise`, `none`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" | "0" => Some(Rotation::None),
            "cw" | "clockwise" | "right" => Some(Rotation::Clockwise),
            "ccw" | "counterclockwise" | "counter_clockwise" | "anticlockwise" | "left" => {
                Some(Rotation::CounterClockwise)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rotation::None => "none",
            Rotation::Clockwise => "clockwise",
            Rotation::CounterClockwise => "counter-clockwise",
        })
    }
}

/// Rotate a continuous-space point about `pivot` without rounding.
///
/// Meant for entity offsets that are rounded later (or never).
pub fn rotate_f64(point: DVec3, pivot: DVec3, rotation: Rotation) -> DVec3 {
    let Some(sin) = rotation.sin() else {
        return point;
    };
    let sin = sin as f64;
    let rel = point - pivot;
    pivot + DVec3::new(-rel.z * sin, rel.y, rel.x * sin)
}

/// Rotate a continuous-space point and round each component to the nearest block.
pub fn rotate_rounded(point: DVec3, pivot: DVec3, rotation: Rotation) -> BlockPos {
    let r = rotate_f64(point, pivot, rotation).round();
    BlockPos::new(r.x as i32, r.y as i32, r.z as i32)
}
