//! Release scheduling and the terminal lifecycle transition.

use craftspace_common::{PilotId, WorldId};
use craftspace_geom::BlockPos;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::collab::{DestroyRequest, render_message};
use crate::craft::{CraftHandle, CraftId};
use crate::error::RegistryError;
use crate::registry::{CraftRegistry, PendingRelease, RegistryEvent};

/// What [`CraftRegistry::release`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The craft was not admitted.
    NotFound,
    /// The craft was already sinking and has been dropped from the indices.
    RemovedSinking,
    /// Auto-cruising craft turned into a sinking hazard; it stays listed.
    Scuttled,
    /// Normal release. `destroyed` binding blocks were broken.
    Released { destroyed: usize },
}

impl CraftRegistry {
    /// Release `craft` after the configured delay.
    ///
    /// Returns `Ok(false)` when the craft has no pilot or a release is already
    /// pending for this craft; at most one timer per pilot exists. A pending
    /// timer the pilot left behind on another craft is replaced, so the
    /// pilot's timer always targets the craft they pilot now.
    pub fn schedule_release(&self, craft: &CraftHandle) -> Result<bool, RegistryError> {
        if !self.is_admitted(craft) {
            return Err(RegistryError::NotAdmitted(craft.id()));
        }
        let Some(pilot) = self.pilot_of(craft) else {
            return Ok(false);
        };
        let runtime = self.inner.runtime.as_ref().ok_or(RegistryError::NoRuntime)?;
        let delay = self.inner.config.release_delay;

        {
            let mut releases = self.inner.releases.lock();
            if let Some(stale) = releases.get(&pilot.id) {
                if stale.craft == craft.id() {
                    return Ok(false);
                }
                stale.task.abort();
                tracing::debug!(craft = %stale.craft, pilot = %pilot.id, "stale release superseded");
            }
            let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
            let registry = Arc::downgrade(&self.inner);
            let pilot_id = pilot.id;
            let task = runtime.spawn(async move {
                tokio::time::sleep(delay).await;
                if let Some(inner) = registry.upgrade() {
                    CraftRegistry { inner }.fire_release(pilot_id, generation);
                }
            });
            // The timer cannot observe its entry before this insert: firing
            // takes the same lock.
            releases.insert(
                pilot.id,
                PendingRelease {
                    generation,
                    craft: craft.id(),
                    task,
                },
            );
        }

        tracing::info!(craft = %craft.id(), pilot = %pilot.id, delay_secs = delay.as_secs(), "release scheduled");
        self.tell(pilot.id, "release.scheduled", &[("seconds", delay.as_secs().to_string())]);
        self.record(RegistryEvent::ReleaseScheduled {
            craft: craft.id(),
            pilot: pilot.id,
        });
        Ok(true)
    }

    /// Cancel any pending release for `craft`. Safe to call when none is
    /// pending; returns whether a timer was cancelled.
    pub fn cancel_release(&self, craft: &CraftHandle) -> bool {
        let cancelled = self.cancel_pending(craft.id());
        if cancelled {
            tracing::info!(craft = %craft.id(), "release cancelled");
            self.record(RegistryEvent::ReleaseCancelled { craft: craft.id() });
        }
        cancelled
    }

    pub fn has_pending_release(&self, pilot: PilotId) -> bool {
        self.inner.releases.lock().contains_key(&pilot)
    }

    /// Remove and abort every timer for `craft`.
    pub(crate) fn cancel_pending(&self, craft: CraftId) -> bool {
        let mut cancelled = false;
        self.inner.releases.lock().retain(|_, pending| {
            if pending.craft != craft {
                return true;
            }
            pending.task.abort();
            cancelled = true;
            false
        });
        cancelled
    }

    /// Timer callback. Only the timer that is still current for the pilot
    /// may release; a cancelled or superseded one finds a different entry
    /// (or none) and does nothing.
    fn fire_release(&self, pilot: PilotId, generation: u64) {
        let craft = {
            let mut releases = self.inner.releases.lock();
            match releases.get(&pilot) {
                Some(pending) if pending.generation == generation => {}
                _ => return,
            }
            match releases.remove(&pilot) {
                Some(pending) => pending.craft,
                None => return,
            }
        };
        let handle = self.inner.crafts.read().get(&craft).cloned();
        if let Some(handle) = handle {
            self.release(&handle);
        }
    }

    /// The terminal lifecycle transition.
    ///
    /// Safe to race with itself, with `remove` and with a firing timer: the
    /// craft is claimed out of the arena before any side effect, and a caller
    /// that loses the claim gets `NotFound` without touching anything.
    pub fn release(&self, craft: &CraftHandle) -> ReleaseOutcome {
        let _span = tracing::info_span!("release", craft = %craft.id()).entered();
        self.cancel_pending(craft.id());

        let target = {
            let mut c = craft.lock();
            if !self.is_admitted(craft) {
                return ReleaseOutcome::NotFound;
            }
            if c.is_sinking() {
                None
            } else if c.craft_type().cruise_on_pilot {
                // Flag flips under the craft lock, so only one caller scuttles.
                c.start_sinking();
                c.set_notify_target(None);
                drop(c);
                tracing::info!("auto-cruising craft scuttled");
                self.record(RegistryEvent::Scuttled { craft: craft.id() });
                return ReleaseOutcome::Scuttled;
            } else {
                Some(c.notify_target())
            }
        };

        let Some(target) = target else {
            if !self.unindex(craft) {
                return ReleaseOutcome::NotFound;
            }
            tracing::debug!("sinking craft dropped");
            self.record(RegistryEvent::Removed { craft: craft.id() });
            return ReleaseOutcome::RemovedSinking;
        };

        if !self.claim(craft) {
            return ReleaseOutcome::NotFound;
        }
        self.unlist(craft);

        let pilot = self.pilot_of(craft);
        let notified = target.is_some_and(|p| self.tell(p, "release.done", &[]));
        if !notified {
            let line = render_message(
                self.inner.collab.messages.as_ref(),
                "release.anonymous",
                &[("craft", craft.id().to_string())],
            );
            tracing::info!("{line}");
        }

        let destroyed = match &pilot {
            Some(p) if p.exempt => 0,
            _ => self.break_bindings(craft, pilot.as_ref().map(|p| p.id).or(target)),
        };
        if destroyed > 0 {
            if let Some(p) = target {
                self.tell(p, "release.binding_destroyed", &[("count", destroyed.to_string())]);
            }
        }

        self.forget_pilots(craft.id());
        tracing::info!(destroyed, "craft released");
        self.record(RegistryEvent::Released {
            craft: craft.id(),
            destroyed,
        });
        ReleaseOutcome::Released { destroyed }
    }

    /// Break every block next to the craft (horizontally) that the craft type
    /// would classify, so the released hull no longer binds to its
    /// surroundings. Each block is broken at most once.
    fn break_bindings(&self, craft: &CraftHandle, pilot: Option<PilotId>) -> usize {
        let (positions, craft_type): (HashSet<BlockPos>, _) = {
            let c = craft.lock();
            (c.blocks().keys().copied().collect(), c.craft_type().clone())
        };
        let world: WorldId = craft.world();
        let block_world = &self.inner.collab.world;
        let authority = &self.inner.collab.authority;

        let mut visited = HashSet::new();
        let mut destroyed = 0;
        let mut denied = 0;
        for pos in &positions {
            for neighbor in pos.horizontal_neighbors() {
                if positions.contains(&neighbor) || !visited.insert(neighbor) {
                    continue;
                }
                let state = block_world.block_at(world, neighbor);
                if state.is_air() || !craft_type.classifies(state) {
                    continue;
                }
                if !authority.may_break(pilot, world, neighbor) {
                    denied += 1;
                    continue;
                }
                block_world.destroy(DestroyRequest {
                    world,
                    pos: neighbor,
                    previous: state,
                    drops: block_world.natural_yield(state),
                });
                destroyed += 1;
            }
        }
        if denied > 0 {
            tracing::info!(denied, "binding blocks protected from cleanup");
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::{Collaborators, Notifier, NotifyError, Pilot};
    use crate::craft::{Craft, CraftType};
    use crate::registry::RegistryConfig;
    use crate::sandbox::{RecordingNotifier, Sandbox};
    use craftspace_common::{BlockState, Material};
    use craftspace_material::MaterialPredicate;
    use std::time::Duration;

    fn ship(world: WorldId) -> CraftHandle {
        let t = Arc::new(CraftType::new(
            "Ship",
            MaterialPredicate::of_all([Material::WOOD, Material::WOOL]),
        ));
        let region = (0..4).map(|x| (BlockPos::new(x, 64, 0), BlockState::of(Material::WOOD)));
        CraftHandle::new(Craft::assemble(t, world, region).unwrap())
    }

    #[test]
    fn schedule_requires_a_runtime() {
        let sandbox = Sandbox::new();
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let craft = ship(WorldId::new());
        assert_eq!(
            registry.schedule_release(&craft),
            Err(RegistryError::NotAdmitted(craft.id()))
        );
        registry.admit(&craft, Pilot::new("ann"));
        assert_eq!(registry.schedule_release(&craft), Err(RegistryError::NoRuntime));
    }

    #[test]
    fn release_of_unknown_craft_is_not_found() {
        let sandbox = Sandbox::new();
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        assert_eq!(registry.release(&ship(WorldId::new())), ReleaseOutcome::NotFound);
        assert!(sandbox.notifier.sent().is_empty());
    }

    #[test]
    fn corner_neighbor_is_broken_once() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        // L-shaped hull: (0,64,0) (1,64,0) (1,64,1); (0,64,1) touches two hull blocks.
        let t = Arc::new(CraftType::new("Ship", MaterialPredicate::of(Material::WOOD)));
        let wood = BlockState::of(Material::WOOD);
        let region = [
            (BlockPos::new(0, 64, 0), wood),
            (BlockPos::new(1, 64, 0), wood),
            (BlockPos::new(1, 64, 1), wood),
        ];
        let craft = CraftHandle::new(Craft::assemble(t, world, region).unwrap());
        sandbox.world.set(world, BlockPos::new(0, 64, 1), wood);
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        registry.admit(&craft, Pilot::new("ben"));

        assert_eq!(registry.release(&craft), ReleaseOutcome::Released { destroyed: 1 });
        assert_eq!(sandbox.world.destroyed().len(), 1);
        assert_eq!(sandbox.world.get(world, BlockPos::new(0, 64, 1)), BlockState::AIR);
    }

    #[test]
    fn unrelated_neighbors_survive() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        sandbox.world.set(world, BlockPos::new(-1, 64, 0), BlockState::of(Material::STONE));
        // Vertical neighbours are not bindings.
        sandbox.world.set(world, BlockPos::new(0, 63, 0), BlockState::of(Material::WOOD));
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let craft = ship(world);
        let pilot = Pilot::new("cat");
        registry.admit(&craft, pilot.clone());

        assert_eq!(registry.release(&craft), ReleaseOutcome::Released { destroyed: 0 });
        assert!(sandbox.world.destroyed().is_empty());
        assert_eq!(sandbox.notifier.sent_to(pilot.id), vec!["Your craft has been released".to_string()]);
    }

    fn hull(world: WorldId, sandbox: &Sandbox) -> (CraftRegistry, CraftHandle, Pilot) {
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let craft = ship(world);
        let pilot = Pilot::new("dana");
        registry.admit(&craft, pilot.clone());
        (registry, craft, pilot)
    }

    #[tokio::test(start_paused = true)]
    async fn timer_releases_after_the_delay() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        let (registry, craft, pilot) = hull(world, &sandbox);

        assert_eq!(registry.schedule_release(&craft), Ok(true));
        assert!(registry.has_pending_release(pilot.id));
        assert_eq!(
            sandbox.notifier.sent_to(pilot.id),
            vec!["Your craft will be released in 15 seconds".to_string()]
        );

        tokio::time::sleep(Duration::from_secs(14)).await;
        assert!(registry.is_admitted(&craft));

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(!registry.is_admitted(&craft));
        assert!(!registry.has_pending_release(pilot.id));
        assert_eq!(registry.craft_of(pilot.id), None);
    }

    #[tokio::test(start_paused = true)]
    async fn second_schedule_is_a_no_op() {
        let sandbox = Sandbox::new();
        let (registry, craft, pilot) = hull(WorldId::new(), &sandbox);

        assert_eq!(registry.schedule_release(&craft), Ok(true));
        assert_eq!(registry.schedule_release(&craft), Ok(false));
        assert_eq!(sandbox.notifier.sent_to(pilot.id).len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        let released = registry
            .events()
            .into_iter()
            .filter(|e| matches!(e, RegistryEvent::Released { .. }))
            .count();
        assert_eq!(released, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_releases() {
        let sandbox = Sandbox::new();
        let (registry, craft, pilot) = hull(WorldId::new(), &sandbox);

        registry.schedule_release(&craft).unwrap();
        assert!(registry.cancel_release(&craft));
        assert!(!registry.cancel_release(&craft));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(registry.is_admitted(&craft));
        assert_eq!(registry.craft_of(pilot.id), Some(craft.clone()));
        assert!(registry.events().contains(&RegistryEvent::ReleaseCancelled { craft: craft.id() }));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_delay() {
        let sandbox = Sandbox::new();
        let (registry, craft, _pilot) = hull(WorldId::new(), &sandbox);

        registry.schedule_release(&craft).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        registry.cancel_release(&craft);
        registry.schedule_release(&craft).unwrap();

        // The first timer would have fired at 15s.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(registry.is_admitted(&craft));

        tokio::time::sleep(Duration::from_secs(6)).await;
        tokio::task::yield_now().await;
        assert!(!registry.is_admitted(&craft));
    }

    #[tokio::test(start_paused = true)]
    async fn manual_release_disarms_the_timer() {
        let sandbox = Sandbox::new();
        let (registry, craft, pilot) = hull(WorldId::new(), &sandbox);

        registry.schedule_release(&craft).unwrap();
        assert_eq!(registry.release(&craft), ReleaseOutcome::Released { destroyed: 0 });
        assert!(!registry.has_pending_release(pilot.id));

        tokio::time::sleep(Duration::from_secs(60)).await;
        let released = registry
            .events()
            .into_iter()
            .filter(|e| matches!(e, RegistryEvent::Released { .. }))
            .count();
        assert_eq!(released, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnected_ship_releases_and_breaks_bindings_once() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        let wood = BlockState::of(Material::WOOD);
        let wool = BlockState::of(Material::WOOL);
        let t = Arc::new(CraftType::new("Ship", MaterialPredicate::of_all([Material::WOOD, Material::WOOL])));
        let region = (0..5).flat_map(|x| {
            (0..2).map(move |z| (BlockPos::new(x, 64, z), if z == 0 { wood } else { wool }))
        });
        let craft = CraftHandle::new(Craft::assemble(t, world, region).unwrap());
        assert_eq!(craft.lock().size(), 10);

        sandbox.world.set(world, BlockPos::new(5, 64, 0), wood);
        sandbox.world.set(world, BlockPos::new(-1, 64, 1), wool);
        sandbox.world.set(world, BlockPos::new(0, 64, -1), BlockState::of(Material::STONE));

        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let pilot = Pilot::new("erik");
        registry.admit(&craft, pilot.clone());
        registry.drain_events();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(registry.release(&craft), ReleaseOutcome::Released { destroyed: 2 });

        assert_eq!(registry.crafts_in(world), Some(Vec::new()));
        assert_eq!(registry.craft_of(pilot.id), None);
        assert_eq!(registry.pilot_of(&craft), None);

        let mut broken: Vec<BlockPos> = sandbox.world.destroyed().iter().map(|r| r.pos).collect();
        broken.sort();
        assert_eq!(broken, vec![BlockPos::new(-1, 64, 1), BlockPos::new(5, 64, 0)]);
        assert_eq!(sandbox.world.get(world, BlockPos::new(0, 64, -1)), BlockState::of(Material::STONE));

        let messages = sandbox.notifier.sent_to(pilot.id);
        assert_eq!(
            messages,
            vec![
                "Your craft has been released".to_string(),
                "2 blocks binding your craft to its surroundings were destroyed".to_string(),
            ]
        );
        assert_eq!(
            registry.drain_events(),
            vec![RegistryEvent::Released { craft: craft.id(), destroyed: 2 }]
        );
    }

    #[test]
    fn auto_cruise_release_scuttles_in_place() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        let mut t = CraftType::new("Turret", MaterialPredicate::of(Material::WOOD));
        t.cruise_on_pilot = true;
        let region = (0..3).map(|x| (BlockPos::new(x, 64, 0), BlockState::of(Material::WOOD)));
        let craft = CraftHandle::new(Craft::assemble(Arc::new(t), world, region).unwrap());
        sandbox.world.set(world, BlockPos::new(3, 64, 0), BlockState::of(Material::WOOD));
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        registry.admit(&craft, Pilot::new("fay"));
        assert!(craft.lock().is_cruising());

        assert_eq!(registry.release(&craft), ReleaseOutcome::Scuttled);
        {
            let c = craft.lock();
            assert!(c.is_sinking());
            assert!(!c.is_cruising());
            assert_eq!(c.notify_target(), None);
        }
        assert!(registry.crafts_in(world).unwrap().contains(&craft));
        assert!(sandbox.world.destroyed().is_empty());
        assert!(sandbox.notifier.sent().is_empty());

        // Once sinking, a second release drops it without side effects.
        assert_eq!(registry.release(&craft), ReleaseOutcome::RemovedSinking);
        assert_eq!(registry.crafts_in(world), Some(Vec::new()));
        assert_eq!(registry.release(&craft), ReleaseOutcome::NotFound);
    }

    #[test]
    fn sinking_release_has_no_side_effects() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        sandbox.world.set(world, BlockPos::new(4, 64, 0), BlockState::of(Material::WOOD));
        let (registry, craft, pilot) = hull(world, &sandbox);
        craft.lock().start_sinking();

        assert_eq!(registry.release(&craft), ReleaseOutcome::RemovedSinking);
        assert_eq!(registry.crafts_in(world), Some(Vec::new()));
        assert_eq!(registry.craft_of(pilot.id), None);
        assert!(sandbox.world.destroyed().is_empty());
        assert!(sandbox.notifier.sent().is_empty());
        assert!(!registry.remove(&craft));
    }

    #[test]
    fn exempt_pilot_breaks_nothing() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        sandbox.world.set(world, BlockPos::new(4, 64, 0), BlockState::of(Material::WOOD));
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let craft = ship(world);
        let pilot = Pilot::new("gus").exempt();
        registry.admit(&craft, pilot.clone());

        assert_eq!(registry.release(&craft), ReleaseOutcome::Released { destroyed: 0 });
        assert_eq!(sandbox.world.get(world, BlockPos::new(4, 64, 0)), BlockState::of(Material::WOOD));
        assert_eq!(sandbox.notifier.sent_to(pilot.id).len(), 1);
    }

    #[test]
    fn denied_block_is_skipped_and_the_rest_still_break() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        let wood = BlockState::of(Material::WOOD);
        sandbox.world.set(world, BlockPos::new(4, 64, 0), wood);
        sandbox.world.set(world, BlockPos::new(-1, 64, 0), wood);
        sandbox.authority.deny(world, BlockPos::new(-1, 64, 0));
        let (registry, craft, _pilot) = hull(world, &sandbox);

        assert_eq!(registry.release(&craft), ReleaseOutcome::Released { destroyed: 1 });
        assert_eq!(sandbox.world.get(world, BlockPos::new(-1, 64, 0)), wood);
        assert_eq!(sandbox.world.get(world, BlockPos::new(4, 64, 0)), BlockState::AIR);
    }

    #[test]
    fn unreachable_pilot_does_not_block_release() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        sandbox.world.set(world, BlockPos::new(4, 64, 0), BlockState::of(Material::WOOL));
        let (registry, craft, pilot) = hull(world, &sandbox);
        sandbox.notifier.set_offline(pilot.id, true);

        assert_eq!(registry.release(&craft), ReleaseOutcome::Released { destroyed: 1 });
        assert_eq!(registry.crafts_in(world), Some(Vec::new()));
        assert_eq!(registry.craft_of(pilot.id), None);
        assert!(sandbox.notifier.sent().is_empty());
    }

    #[test]
    fn parallel_admits_and_reads_stay_consistent() {
        let sandbox = Sandbox::new();
        let registry = CraftRegistry::new(RegistryConfig::default(), sandbox.collaborators());
        let world = WorldId::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let registry = registry.clone();
                scope.spawn(move || {
                    for _ in 0..25 {
                        let craft = ship(world);
                        registry.admit(&craft, Pilot::new("crew"));
                        assert!(registry.crafts_in(world).is_some_and(|set| set.contains(&craft)));
                    }
                });
            }
        });
        assert_eq!(registry.crafts_in(world).map(|set| set.len()), Some(100));
        assert_eq!(registry.len(), 100);
    }

    fn released_count(registry: &CraftRegistry) -> usize {
        registry
            .events()
            .into_iter()
            .filter(|e| matches!(e, RegistryEvent::Released { .. }))
            .count()
    }

    /// Holds every message long enough for concurrent releases to overlap.
    struct SlowNotifier(Arc<RecordingNotifier>);

    impl Notifier for SlowNotifier {
        fn notify(&self, pilot: PilotId, message: &str) -> Result<(), NotifyError> {
            std::thread::sleep(Duration::from_millis(20));
            self.0.notify(pilot, message)
        }
    }

    #[test]
    fn concurrent_releases_tear_down_once() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        sandbox.world.set(world, BlockPos::new(-1, 64, 0), BlockState::of(Material::WOOL));
        let collab = Collaborators {
            notifier: Arc::new(SlowNotifier(sandbox.notifier.clone())),
            ..sandbox.collaborators()
        };
        let registry = CraftRegistry::new(RegistryConfig::default(), collab);
        let craft = ship(world);
        let pilot = Pilot::new("erin");
        registry.admit(&craft, pilot.clone());

        let outcomes: Vec<ReleaseOutcome> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4).map(|_| scope.spawn(|| registry.release(&craft))).collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        let released: Vec<_> = outcomes
            .iter()
            .filter(|o| matches!(o, ReleaseOutcome::Released { .. }))
            .collect();
        assert_eq!(released, [&ReleaseOutcome::Released { destroyed: 1 }]);
        assert_eq!(
            outcomes.iter().filter(|o| **o == ReleaseOutcome::NotFound).count(),
            3
        );
        assert_eq!(released_count(&registry), 1);
        assert_eq!(sandbox.world.destroyed().len(), 1);
        let done = sandbox
            .notifier
            .sent_to(pilot.id)
            .into_iter()
            .filter(|m| m == "Your craft has been released")
            .count();
        assert_eq!(done, 1);
        assert!(registry.is_empty());
        assert_eq!(registry.crafts_in(world).map(|set| set.len()), Some(0));
    }

    fn quick_registry(sandbox: &Sandbox) -> CraftRegistry {
        let config = RegistryConfig {
            release_delay: Duration::from_millis(2),
            ..RegistryConfig::default()
        };
        CraftRegistry::new(config, sandbox.collaborators())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn manual_release_racing_the_timer_releases_once() {
        for _ in 0..20 {
            let sandbox = Sandbox::new();
            let registry = quick_registry(&sandbox);
            let craft = ship(WorldId::new());
            let pilot = Pilot::new("finn");
            registry.admit(&craft, pilot.clone());
            assert_eq!(registry.schedule_release(&craft), Ok(true));

            tokio::time::sleep(Duration::from_millis(2)).await;
            let (r, c) = (registry.clone(), craft.clone());
            tokio::task::spawn_blocking(move || r.release(&c)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;

            assert_eq!(released_count(&registry), 1);
            assert!(!registry.is_admitted(&craft));
            assert!(!registry.has_pending_release(pilot.id));
            let done = sandbox
                .notifier
                .sent_to(pilot.id)
                .into_iter()
                .filter(|m| m == "Your craft has been released")
                .count();
            assert_eq!(done, 1);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_racing_the_timer_is_all_or_nothing() {
        for _ in 0..20 {
            let sandbox = Sandbox::new();
            let registry = quick_registry(&sandbox);
            let craft = ship(WorldId::new());
            let pilot = Pilot::new("gale");
            registry.admit(&craft, pilot.clone());
            assert_eq!(registry.schedule_release(&craft), Ok(true));

            tokio::time::sleep(Duration::from_millis(2)).await;
            let (r, c) = (registry.clone(), craft.clone());
            let cancelled = tokio::task::spawn_blocking(move || r.cancel_release(&c)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;

            if cancelled {
                assert_eq!(released_count(&registry), 0);
                assert!(registry.is_admitted(&craft));
            } else {
                assert_eq!(released_count(&registry), 1);
                assert!(!registry.is_admitted(&craft));
            }
            assert!(!registry.has_pending_release(pilot.id));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_for_a_new_craft_replaces_the_stale_timer() {
        let sandbox = Sandbox::new();
        let world = WorldId::new();
        let (registry, first, pilot) = hull(world, &sandbox);
        assert_eq!(registry.schedule_release(&first), Ok(true));

        let second = ship(world);
        registry.admit(&second, pilot.clone());
        assert_eq!(registry.schedule_release(&second), Ok(true));
        assert_eq!(registry.schedule_release(&second), Ok(false));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!registry.is_admitted(&second));
        assert!(registry.is_admitted(&first));
        assert!(!registry.has_pending_release(pilot.id));
        let released: Vec<_> = registry
            .events()
            .into_iter()
            .filter(|e| matches!(e, RegistryEvent::Released { .. }))
            .collect();
        assert_eq!(
            released,
            [RegistryEvent::Released {
                craft: second.id(),
                destroyed: 0,
            }]
        );
    }
}
