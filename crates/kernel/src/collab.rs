//! Contracts with the host server: block access, pilot messaging,
//! land-protection authority and message templates.

use craftspace_common::{BlockState, ItemDrop, PilotId, WorldId};
use craftspace_geom::BlockPos;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Someone piloting a craft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pilot {
    pub id: PilotId,
    pub name: String,
    /// Elevated privilege (e.g. creative mode): releasing never destroys blocks.
    pub exempt: bool,
}

impl Pilot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PilotId::new(),
            name: name.into(),
            exempt: false,
        }
    }

    pub fn exempt(mut self) -> Self {
        self.exempt = true;
        self
    }
}

/// Request to break a block and drop its yield into the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestroyRequest {
    pub world: WorldId,
    pub pos: BlockPos,
    pub previous: BlockState,
    pub drops: Vec<ItemDrop>,
}

/// Single-block access to the live world.
pub trait BlockWorld: Send + Sync {
    fn block_at(&self, world: WorldId, pos: BlockPos) -> BlockState;

    fn destroy(&self, request: DestroyRequest);

    /// What breaking a block naturally drops.
    fn natural_yield(&self, state: BlockState) -> Vec<ItemDrop> {
        if state.is_air() {
            Vec::new()
        } else {
            vec![ItemDrop {
                material: state.material,
                count: 1,
            }]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("{0} cannot be reached")]
    Unreachable(PilotId),
}

/// Delivers one-line messages to pilots.
pub trait Notifier: Send + Sync {
    fn notify(&self, pilot: PilotId, message: &str) -> Result<(), NotifyError>;
}

/// Land-protection and world-limit checks.
pub trait Authority: Send + Sync {
    /// Whether `pilot` may break the block at `pos`. `None` is an unknown pilot.
    fn may_break(&self, pilot: Option<PilotId>, world: WorldId, pos: BlockPos) -> bool;

    /// Extra ceiling imposed on crafts in `world`, if any.
    fn height_limit(&self, world: WorldId) -> Option<i32>;
}

/// Message template lookup keyed by string id.
pub trait MessageCatalog: Send + Sync {
    fn template(&self, key: &str) -> Option<String>;
}

/// Render a message: look up the template (falling back to the key itself)
/// and substitute `{name}` placeholders.
pub fn render_message(catalog: &dyn MessageCatalog, key: &str, params: &[(&str, String)]) -> String {
    let mut text = catalog.template(key).unwrap_or_else(|| key.to_string());
    for (name, value) in params {
        text = text.replace(&format!("{{{name}}}"), value);
    }
    text
}

/// Map-backed message catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticCatalog {
    templates: HashMap<String, String>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// English templates for every key the registry emits.
    pub fn english() -> Self {
        let mut catalog = Self::new();
        catalog.insert("release.scheduled", "Your craft will be released in {seconds} seconds");
        catalog.insert("release.done", "Your craft has been released");
        catalog.insert(
            "release.binding_destroyed",
            "{count} blocks binding your craft to its surroundings were destroyed",
        );
        catalog.insert("release.anonymous", "{craft} was released without a reachable pilot");
        catalog
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Add every template from `other`, overriding existing keys.
    pub fn merge(&mut self, other: StaticCatalog) {
        self.templates.extend(other.templates);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl MessageCatalog for StaticCatalog {
    fn template(&self, key: &str) -> Option<String> {
        self.templates.get(key).cloned()
    }
}

/// The registry's outbound collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub world: Arc<dyn BlockWorld>,
    pub notifier: Arc<dyn Notifier>,
    pub authority: Arc<dyn Authority>,
    pub messages: Arc<dyn MessageCatalog>,
}
