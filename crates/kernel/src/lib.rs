//! Craft kernel: the craft model, motion planning and the craft registry.
//!
//! # Invariants
//! - A craft's block map and bounding box are replaced together on every
//!   move, under the craft's own lock.
//! - A craft is listed in its world's live set from `admit` until `release`
//!   or `remove`; auto-cruising crafts stay listed while they sink.
//! - At most one release timer is pending per pilot, and a cancelled timer
//!   never releases.
//! - Registry locks are never held while calling collaborators.

pub mod collab;
pub mod craft;
pub mod delta;
pub mod error;
pub mod motion;
pub mod registry;
mod release;
pub mod sandbox;

pub use collab::{
    Authority, BlockWorld, Collaborators, DestroyRequest, MessageCatalog, Notifier, NotifyError,
    Pilot, StaticCatalog, render_message,
};
pub use craft::{Craft, CraftHandle, CraftId, CraftType};
pub use delta::{BlockDelta, Effect};
pub use error::{CraftError, MoveError, RegistryError};
pub use motion::{Motion, MovePlan, VerticalLimits};
pub use registry::{CraftRegistry, RegistryConfig, RegistryEvent};
pub use release::ReleaseOutcome;
