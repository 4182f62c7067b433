//! In-memory collaborators for tests, benches and the CLI simulator.

use craftspace_common::{BlockState, PilotId, WorldId};
use craftspace_geom::BlockPos;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::collab::{
    Authority, BlockWorld, Collaborators, DestroyRequest, Notifier, NotifyError, StaticCatalog,
};

/// Sparse block store; unset cells read as air.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    blocks: RwLock<HashMap<(WorldId, BlockPos), BlockState>>,
    destroyed: Mutex<Vec<DestroyRequest>>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, world: WorldId, pos: BlockPos, state: BlockState) {
        let mut blocks = self.blocks.write();
        if state.is_air() {
            blocks.remove(&(world, pos));
        } else {
            blocks.insert((world, pos), state);
        }
    }

    pub fn get(&self, world: WorldId, pos: BlockPos) -> BlockState {
        self.blocks
            .read()
            .get(&(world, pos))
            .copied()
            .unwrap_or(BlockState::AIR)
    }

    /// Every destroy request received, in order.
    pub fn destroyed(&self) -> Vec<DestroyRequest> {
        self.destroyed.lock().clone()
    }
}

impl BlockWorld for MemoryWorld {
    fn block_at(&self, world: WorldId, pos: BlockPos) -> BlockState {
        self.get(world, pos)
    }

    fn destroy(&self, request: DestroyRequest) {
        self.set(request.world, request.pos, BlockState::AIR);
        self.destroyed.lock().push(request);
    }
}

/// Notifier that keeps every delivered message.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(PilotId, String)>>,
    offline: Mutex<HashSet<PilotId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `pilot` unreachable (or reachable again).
    pub fn set_offline(&self, pilot: PilotId, offline: bool) {
        let mut set = self.offline.lock();
        if offline {
            set.insert(pilot);
        } else {
            set.remove(&pilot);
        }
    }

    pub fn sent(&self) -> Vec<(PilotId, String)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, pilot: PilotId) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(to, _)| *to == pilot)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, pilot: PilotId, message: &str) -> Result<(), NotifyError> {
        if self.offline.lock().contains(&pilot) {
            return Err(NotifyError::Unreachable(pilot));
        }
        self.sent.lock().push((pilot, message.to_string()));
        Ok(())
    }
}

/// Authority with an explicit deny list and an optional height limit.
#[derive(Debug, Default)]
pub struct SandboxAuthority {
    denied: RwLock<HashSet<(WorldId, BlockPos)>>,
    height_limit: RwLock<Option<i32>>,
}

impl SandboxAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self, world: WorldId, pos: BlockPos) {
        self.denied.write().insert((world, pos));
    }

    pub fn set_height_limit(&self, limit: Option<i32>) {
        *self.height_limit.write() = limit;
    }
}

impl Authority for SandboxAuthority {
    fn may_break(&self, _pilot: Option<PilotId>, world: WorldId, pos: BlockPos) -> bool {
        !self.denied.read().contains(&(world, pos))
    }

    fn height_limit(&self, _world: WorldId) -> Option<i32> {
        *self.height_limit.read()
    }
}

/// A full set of in-memory collaborators with their concrete types kept
/// reachable for inspection.
#[derive(Clone)]
pub struct Sandbox {
    pub world: Arc<MemoryWorld>,
    pub notifier: Arc<RecordingNotifier>,
    pub authority: Arc<SandboxAuthority>,
    pub messages: Arc<StaticCatalog>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::with_messages(StaticCatalog::english())
    }

    pub fn with_messages(messages: StaticCatalog) -> Self {
        Self {
            world: Arc::new(MemoryWorld::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            authority: Arc::new(SandboxAuthority::new()),
            messages: Arc::new(messages),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            world: self.world.clone(),
            notifier: self.notifier.clone(),
            authority: self.authority.clone(),
            messages: self.messages.clone(),
        }
    }
}

impl Default for Sandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use craftspace_common::Material;

    #[test]
    fn destroy_clears_and_logs() {
        let world = MemoryWorld::new();
        let id = WorldId::new();
        let pos = BlockPos::new(1, 2, 3);
        world.set(id, pos, BlockState::of(Material::WOOL));
        let state = world.block_at(id, pos);
        world.destroy(DestroyRequest {
            world: id,
            pos,
            previous: state,
            drops: world.natural_yield(state),
        });
        assert_eq!(world.get(id, pos), BlockState::AIR);
        assert_eq!(world.destroyed()[0].drops.len(), 1);
    }

    #[test]
    fn offline_pilots_get_nothing() {
        let notifier = RecordingNotifier::new();
        let pilot = PilotId::new();
        notifier.set_offline(pilot, true);
        assert_eq!(notifier.notify(pilot, "hi"), Err(NotifyError::Unreachable(pilot)));
        notifier.set_offline(pilot, false);
        notifier.notify(pilot, "hi").unwrap();
        assert_eq!(notifier.sent_to(pilot), vec!["hi".to_string()]);
    }
}
