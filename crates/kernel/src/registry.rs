use craftspace_common::{Material, PilotId, WorldId};
use craftspace_geom::{BlockPos, Rotation};
use craftspace_material::MaterialPredicate;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::collab::{Collaborators, DestroyRequest, Pilot};
use crate::craft::{CraftHandle, CraftId};
use crate::error::MoveError;
use crate::motion::{Motion, MovePlan, VerticalLimits};

/// Registry tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Delay between scheduling a release and the release itself.
    pub release_delay: Duration,
    /// Loose debris cleared from on top of a craft when it is piloted.
    pub covering: MaterialPredicate,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            release_delay: Duration::from_secs(15),
            covering: MaterialPredicate::of(Material::SNOW_LAYER),
        }
    }
}

/// Lifecycle record produced by every registry transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Admitted { craft: CraftId, pilot: PilotId },
    CoveringCleared { craft: CraftId, count: usize },
    ReleaseScheduled { craft: CraftId, pilot: PilotId },
    ReleaseCancelled { craft: CraftId },
    /// Normal release; `destroyed` binding blocks were broken.
    Released { craft: CraftId, destroyed: usize },
    /// Auto-cruising craft released into a sinking hazard.
    Scuttled { craft: CraftId },
    Removed { craft: CraftId },
}

pub(crate) struct PilotEntry {
    pub pilot: Pilot,
    pub craft: CraftId,
}

pub(crate) struct PendingRelease {
    pub generation: u64,
    pub craft: CraftId,
    pub task: JoinHandle<()>,
}

pub(crate) struct RegistryInner {
    pub config: RegistryConfig,
    pub collab: Collaborators,
    pub runtime: Option<Handle>,
    pub crafts: RwLock<HashMap<CraftId, CraftHandle>>,
    pub worlds: RwLock<HashMap<WorldId, HashSet<CraftId>>>,
    pub pilots: Mutex<HashMap<PilotId, PilotEntry>>,
    pub releases: Mutex<HashMap<PilotId, PendingRelease>>,
    pub next_generation: AtomicU64,
    events: Mutex<Vec<RegistryEvent>>,
}

/// Live crafts indexed by world and by pilot, plus their release timers.
///
/// Cheap to clone; every clone shares the same state. Create one per server
/// and pass it to whatever handles commands and events.
#[derive(Clone)]
pub struct CraftRegistry {
    pub(crate) inner: Arc<RegistryInner>,
}

impl CraftRegistry {
    /// Registry that schedules release timers on the ambient tokio runtime,
    /// if there is one.
    pub fn new(config: RegistryConfig, collab: Collaborators) -> Self {
        Self::build(config, collab, Handle::try_current().ok())
    }

    pub fn with_runtime(config: RegistryConfig, collab: Collaborators, runtime: Handle) -> Self {
        Self::build(config, collab, Some(runtime))
    }

    fn build(config: RegistryConfig, collab: Collaborators, runtime: Option<Handle>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                collab,
                runtime,
                crafts: RwLock::new(HashMap::new()),
                worlds: RwLock::new(HashMap::new()),
                pilots: Mutex::new(HashMap::new()),
                releases: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                events: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Start tracking a craft piloted by `pilot`.
    ///
    /// Re-admitting the same craft and pilot leaves the indices unchanged but
    /// clears covering debris again.
    pub fn admit(&self, craft: &CraftHandle, pilot: Pilot) {
        let id = craft.id();
        let pilot_id = pilot.id;
        self.inner.crafts.write().insert(id, craft.clone());
        self.inner.worlds.write().entry(craft.world()).or_default().insert(id);
        {
            let mut pilots = self.inner.pilots.lock();
            match pilots.get(&pilot_id) {
                Some(entry) if entry.craft == id => {}
                _ => {
                    pilots.insert(pilot_id, PilotEntry { pilot, craft: id });
                }
            }
        }
        craft.lock().set_notify_target(Some(pilot_id));
        tracing::info!(craft = %id, pilot = %pilot_id, world = %craft.world(), "craft admitted");
        self.record(RegistryEvent::Admitted { craft: id, pilot: pilot_id });

        let cleared = self.clear_covering(craft);
        if cleared > 0 {
            self.record(RegistryEvent::CoveringCleared { craft: id, count: cleared });
        }
    }

    /// Break covering debris resting directly on top of the craft.
    fn clear_covering(&self, craft: &CraftHandle) -> usize {
        let positions: HashSet<BlockPos> = craft.lock().blocks().keys().copied().collect();
        let world = craft.world();
        let covering = &self.inner.config.covering;
        let block_world = &self.inner.collab.world;
        let mut cleared = 0;
        for pos in &positions {
            let above = *pos + BlockPos::UP;
            if positions.contains(&above) {
                continue;
            }
            let state = block_world.block_at(world, above);
            if !covering.matches_state(state) {
                continue;
            }
            block_world.destroy(DestroyRequest {
                world,
                pos: above,
                previous: state,
                drops: block_world.natural_yield(state),
            });
            cleared += 1;
        }
        if cleared > 0 {
            tracing::debug!(craft = %craft.id(), cleared, "cleared covering debris");
        }
        cleared
    }

    /// Live crafts in `world`. `None` means the world never held a craft;
    /// `Some(empty)` means it did but none is left.
    pub fn crafts_in(&self, world: WorldId) -> Option<Vec<CraftHandle>> {
        let ids: Vec<CraftId> = self.inner.worlds.read().get(&world)?.iter().copied().collect();
        let crafts = self.inner.crafts.read();
        Some(ids.iter().filter_map(|id| crafts.get(id).cloned()).collect())
    }

    pub fn craft_of(&self, pilot: PilotId) -> Option<CraftHandle> {
        let id = self.inner.pilots.lock().get(&pilot)?.craft;
        self.inner.crafts.read().get(&id).cloned()
    }

    pub fn pilot_of(&self, craft: &CraftHandle) -> Option<Pilot> {
        self.inner
            .pilots
            .lock()
            .values()
            .find(|entry| entry.craft == craft.id())
            .map(|entry| entry.pilot.clone())
    }

    /// Craft piloted by someone with exactly this display name.
    ///
    /// Names are not unique: with duplicates, which pilot wins depends on
    /// hash-map iteration order and must not be relied on.
    pub fn craft_of_named_pilot(&self, name: &str) -> Option<CraftHandle> {
        let id = self
            .inner
            .pilots
            .lock()
            .values()
            .find(|entry| entry.pilot.name == name)?
            .craft;
        self.inner.crafts.read().get(&id).cloned()
    }

    pub fn is_admitted(&self, craft: &CraftHandle) -> bool {
        self.inner.crafts.read().contains_key(&craft.id())
    }

    /// Number of crafts currently admitted across all worlds.
    pub fn len(&self) -> usize {
        self.inner.crafts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a craft from every index without side effects. Used when a
    /// sinking craft has finished dissipating. Idempotent.
    pub fn remove(&self, craft: &CraftHandle) -> bool {
        self.cancel_pending(craft.id());
        let removed = self.unindex(craft);
        if removed {
            tracing::debug!(craft = %craft.id(), "craft removed");
            self.record(RegistryEvent::Removed { craft: craft.id() });
        }
        removed
    }

    /// Remove a craft from the arena, its world set and the pilot index.
    /// Returns whether it was admitted; when it was not, nothing is touched.
    pub(crate) fn unindex(&self, craft: &CraftHandle) -> bool {
        if !self.claim(craft) {
            return false;
        }
        self.unlist(craft);
        self.forget_pilots(craft.id());
        true
    }

    /// Take the craft out of the arena. Exactly one of several concurrent
    /// callers gets `true`; only that caller may finish the teardown.
    pub(crate) fn claim(&self, craft: &CraftHandle) -> bool {
        self.inner.crafts.write().remove(&craft.id()).is_some()
    }

    pub(crate) fn unlist(&self, craft: &CraftHandle) {
        if let Some(set) = self.inner.worlds.write().get_mut(&craft.world()) {
            set.remove(&craft.id());
        }
    }

    pub(crate) fn forget_pilots(&self, craft: CraftId) {
        self.inner.pilots.lock().retain(|_, entry| entry.craft != craft);
    }

    /// Move a craft by `offset`, returning the deltas to apply.
    pub fn translate(&self, craft: &CraftHandle, offset: BlockPos) -> Result<MovePlan, MoveError> {
        self.apply_motion(craft, Motion::Translate(offset))
    }

    /// Turn a craft a quarter turn about `pivot`.
    pub fn rotate(
        &self,
        craft: &CraftHandle,
        pivot: BlockPos,
        rotation: Rotation,
    ) -> Result<MovePlan, MoveError> {
        self.apply_motion(craft, Motion::Rotate { pivot, rotation })
    }

    fn apply_motion(&self, craft: &CraftHandle, motion: Motion) -> Result<MovePlan, MoveError> {
        let external = self.inner.collab.authority.height_limit(craft.world());
        let mut guard = craft.lock();
        let craft_type = guard.craft_type().clone();
        let limits = VerticalLimits::for_type(craft_type.min_height, craft_type.max_height, external);
        let plan = guard.apply(motion, limits)?;
        tracing::debug!(
            craft = %craft.id(),
            ?motion,
            deltas = plan.deltas().len(),
            bounds = %guard.bounds(),
            "craft moved"
        );
        Ok(plan)
    }

    /// Start or stop cruising; returns the resulting flag.
    pub fn set_cruising(&self, craft: &CraftHandle, cruising: bool) -> bool {
        craft.lock().set_cruising(cruising)
    }

    /// Send a rendered message to a pilot. Failures are logged, never raised.
    pub(crate) fn tell(&self, pilot: PilotId, key: &str, params: &[(&str, String)]) -> bool {
        let text = crate::collab::render_message(self.inner.collab.messages.as_ref(), key, params);
        match self.inner.collab.notifier.notify(pilot, &text) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(pilot = %pilot, %err, key, "pilot notification failed");
                false
            }
        }
    }

    pub(crate) fn record(&self, event: RegistryEvent) {
        self.inner.events.lock().push(event);
    }

    /// Drain and return the lifecycle events recorded so far.
    pub fn drain_events(&self) -> Vec<RegistryEvent> {
        std::mem::take(&mut *self.inner.events.lock())
    }

    /// Copy of the lifecycle events recorded so far.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.inner.events.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::craft::{Craft, CraftType};
    use crate::sandbox::Sandbox;
    use craftspace_common::BlockState;

    fn ship(world: WorldId) -> CraftHandle {
        let t = Arc::new(CraftType::new("Ship", MaterialPredicate::of(Material::WOOD)));
        let region = (0..3).map(|x| (BlockPos::new(x, 64, 0), BlockState::of(Material::WOOD)));
        CraftHandle::new(Craft::assemble(t, world, region).unwrap())
    }

    #[test]
    fn admit_indexes_by_world_and_pilot() {
        let sandbox = Sandbox::new();
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let world = WorldId::new();
        let craft = ship(world);
        let pilot = Pilot::new("alice");
        registry.admit(&craft, pilot.clone());

        assert_eq!(registry.craft_of(pilot.id), Some(craft.clone()));
        assert_eq!(registry.pilot_of(&craft), Some(pilot.clone()));
        assert!(registry.crafts_in(world).unwrap().contains(&craft));
        assert_eq!(craft.lock().notify_target(), Some(pilot.id));
        assert_eq!(registry.craft_of_named_pilot("alice"), Some(craft.clone()));
        assert_eq!(registry.craft_of_named_pilot("Alice"), None);
    }

    #[test]
    fn unknown_world_differs_from_emptied_world() {
        let sandbox = Sandbox::new();
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let world = WorldId::new();
        assert!(registry.crafts_in(world).is_none());

        let craft = ship(world);
        registry.admit(&craft, Pilot::new("bob"));
        assert!(registry.remove(&craft));
        assert_eq!(registry.crafts_in(world), Some(Vec::new()));
        assert!(!registry.remove(&craft));
    }

    #[test]
    fn readmit_is_idempotent_for_indices() {
        let sandbox = Sandbox::new();
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let world = WorldId::new();
        let craft = ship(world);
        let pilot = Pilot::new("carol");
        registry.admit(&craft, pilot.clone());
        registry.admit(&craft, pilot.clone());
        assert_eq!(registry.crafts_in(world).unwrap().len(), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.craft_of(pilot.id), Some(craft));
    }

    #[test]
    fn admit_clears_snow_on_deck_only() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        let snow = BlockState::of(Material::SNOW_LAYER);
        sandbox.world.set(world, BlockPos::new(0, 65, 0), snow);
        sandbox.world.set(world, BlockPos::new(2, 65, 0), snow);
        // Not above the craft.
        sandbox.world.set(world, BlockPos::new(5, 65, 0), snow);
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let craft = ship(world);
        registry.admit(&craft, Pilot::new("dave"));

        let destroyed = sandbox.world.destroyed();
        assert_eq!(destroyed.len(), 2);
        assert!(destroyed.iter().all(|r| r.previous == snow && r.drops.len() == 1));
        assert_eq!(sandbox.world.get(world, BlockPos::new(5, 65, 0)), snow);
        assert!(registry
            .events()
            .contains(&RegistryEvent::CoveringCleared { craft: craft.id(), count: 2 }));
    }

    #[test]
    fn translate_respects_external_height_limit() {
        let sandbox = Sandbox::new();
        sandbox.authority.set_height_limit(Some(66));
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let craft = ship(WorldId::new());
        registry.admit(&craft, Pilot::new("erin"));
        assert!(registry.translate(&craft, BlockPos::new(0, 2, 0)).is_ok());
        assert!(matches!(
            registry.translate(&craft, BlockPos::UP),
            Err(MoveError::AboveCeiling { ceiling: 66, .. })
        ));
        let plan = registry.rotate(&craft, BlockPos::new(1, 66, 0), Rotation::Clockwise).unwrap();
        assert_eq!(plan.craft(), craft.id());
        assert!(craft.lock().contains(BlockPos::new(1, 66, 1)));
    }

    #[test]
    fn set_cruising_goes_through_the_craft() {
        let sandbox = Sandbox::new();
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let craft = ship(WorldId::new());
        assert!(registry.set_cruising(&craft, true));
        assert!(craft.lock().is_cruising());
        assert!(!registry.set_cruising(&craft, false));
    }
}
