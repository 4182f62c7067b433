use craftspace_common::{BlockState, PilotId, WorldId};
use craftspace_geom::{Aabb, BlockPos, HitBox};
use craftspace_material::MaterialPredicate;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{CraftError, MoveError};
use crate::motion::{self, Motion, MovePlan, VerticalLimits};

static NEXT_CRAFT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an assembled craft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CraftId(pub u64);

impl CraftId {
    fn next() -> Self {
        Self(NEXT_CRAFT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "craft#{}", self.0)
    }
}

/// Template a block region is classified against: which blocks it may be
/// built from, how big it may be and how it behaves when piloted.
///
/// Loaded once from configuration and shared immutably between crafts.
#[derive(Debug, Clone, PartialEq)]
pub struct CraftType {
    pub name: String,
    /// Blocks a craft of this type may contain (air is always skipped).
    pub allowed: MaterialPredicate,
    /// Blocks that disqualify a region outright.
    pub forbidden: MaterialPredicate,
    pub min_size: usize,
    pub max_size: usize,
    /// Lowest world Y the craft's bottom may reach.
    pub min_height: i32,
    /// Highest world Y the craft's top may reach.
    pub max_height: i32,
    /// Starts cruising as soon as it is piloted; releasing it scuttles it.
    pub cruise_on_pilot: bool,
    pub smoke_on_cruise: bool,
    /// Blocks that emit smoke while the craft cruises.
    pub smoke_sources: MaterialPredicate,
}

impl CraftType {
    pub fn new(name: impl Into<String>, allowed: MaterialPredicate) -> Self {
        Self {
            name: name.into(),
            allowed,
            forbidden: MaterialPredicate::None,
            min_size: 1,
            max_size: 10_000,
            min_height: 0,
            max_height: 255,
            cruise_on_pilot: false,
            smoke_on_cruise: false,
            smoke_sources: MaterialPredicate::None,
        }
    }

    /// Whether a block is one this type cares about at all.
    pub fn classifies(&self, state: BlockState) -> bool {
        self.allowed.matches_state(state) || self.forbidden.matches_state(state)
    }

    pub(crate) fn emits_smoke(&self, state: BlockState) -> bool {
        self.smoke_on_cruise && self.smoke_sources.matches_state(state)
    }
}

/// A group of blocks moved as one unit.
#[derive(Debug, Clone)]
pub struct Craft {
    id: CraftId,
    craft_type: Arc<CraftType>,
    world: WorldId,
    blocks: HashMap<BlockPos, BlockState>,
    bounds: Aabb,
    notify_target: Option<PilotId>,
    cruising: bool,
    sinking: bool,
}

impl Craft {
    /// Classify a pre-resolved block region against a craft type.
    ///
    /// Air blocks are skipped. Every remaining block must be allowed and not
    /// forbidden, the count must fit the type's size limits and the blocks
    /// must form one face-connected group.
    pub fn assemble(
        craft_type: Arc<CraftType>,
        world: WorldId,
        region: impl IntoIterator<Item = (BlockPos, BlockState)>,
    ) -> Result<Self, CraftError> {
        let mut blocks = HashMap::new();
        for (pos, state) in region {
            if state.is_air() {
                continue;
            }
            if craft_type.forbidden.matches_state(state) {
                return Err(CraftError::Forbidden {
                    craft_type: craft_type.name.clone(),
                    pos,
                    state,
                });
            }
            if !craft_type.allowed.matches_state(state) {
                return Err(CraftError::Disallowed {
                    craft_type: craft_type.name.clone(),
                    pos,
                    state,
                });
            }
            blocks.insert(pos, state);
        }

        let size = blocks.len();
        if size == 0 {
            return Err(CraftError::Empty);
        }
        if size < craft_type.min_size {
            return Err(CraftError::TooSmall {
                craft_type: craft_type.name.clone(),
                size,
                min: craft_type.min_size,
            });
        }
        if size > craft_type.max_size {
            return Err(CraftError::TooLarge {
                craft_type: craft_type.name.clone(),
                size,
                max: craft_type.max_size,
            });
        }
        if let Some(pos) = first_disconnected(&blocks) {
            return Err(CraftError::Disconnected { pos });
        }

        let bounds = Aabb::enclosing(blocks.keys().copied()).map_err(|_| CraftError::Empty)?;
        let cruising = craft_type.cruise_on_pilot;
        Ok(Self {
            id: CraftId::next(),
            craft_type,
            world,
            blocks,
            bounds,
            notify_target: None,
            cruising,
            sinking: false,
        })
    }

    pub fn id(&self) -> CraftId {
        self.id
    }

    pub fn craft_type(&self) -> &Arc<CraftType> {
        &self.craft_type
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn min_corner(&self) -> BlockPos {
        self.bounds.min()
    }

    pub fn size(&self) -> usize {
        self.blocks.len()
    }

    pub fn blocks(&self) -> &HashMap<BlockPos, BlockState> {
        &self.blocks
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        self.blocks.contains_key(&pos)
    }

    pub fn block_at(&self, pos: BlockPos) -> Option<BlockState> {
        self.blocks.get(&pos).copied()
    }

    pub fn hitbox(&self) -> Option<HitBox> {
        HitBox::from_positions(self.blocks.keys())
    }

    pub fn notify_target(&self) -> Option<PilotId> {
        self.notify_target
    }

    pub fn set_notify_target(&mut self, pilot: Option<PilotId>) {
        self.notify_target = pilot;
    }

    pub fn is_cruising(&self) -> bool {
        self.cruising
    }

    pub fn is_sinking(&self) -> bool {
        self.sinking
    }

    /// Start or stop cruising. A sinking craft never cruises; returns the
    /// resulting flag.
    pub fn set_cruising(&mut self, cruising: bool) -> bool {
        self.cruising = cruising && !self.sinking;
        self.cruising
    }

    /// Mark the craft as sinking. Sinking is irreversible and stops cruising.
    pub fn start_sinking(&mut self) {
        self.sinking = true;
        self.cruising = false;
    }

    /// Plan a motion and, if it is valid, replace the block map and bounds in
    /// one step. On error the craft is left untouched.
    pub fn apply(&mut self, motion: Motion, limits: VerticalLimits) -> Result<MovePlan, MoveError> {
        let staged = motion::stage(self, motion, limits)?;
        self.blocks = staged.blocks;
        self.bounds = staged.bounds;
        Ok(staged.plan)
    }
}

/// First block (in coordinate order) not reachable from the lowest block
/// through face neighbours.
fn first_disconnected(blocks: &HashMap<BlockPos, BlockState>) -> Option<BlockPos> {
    let start = *blocks.keys().min()?;
    let mut seen: HashSet<BlockPos> = HashSet::with_capacity(blocks.len());
    let mut queue = VecDeque::from([start]);
    seen.insert(start);
    while let Some(pos) = queue.pop_front() {
        for n in pos.neighbors() {
            if blocks.contains_key(&n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    if seen.len() == blocks.len() {
        return None;
    }
    blocks.keys().filter(|p| !seen.contains(p)).min().copied()
}

/// Shared, lockable reference to a craft.
///
/// Equality and hashing use the craft id. The id and world are cached so
/// indices never need the craft lock.
#[derive(Clone)]
pub struct CraftHandle {
    id: CraftId,
    world: WorldId,
    inner: Arc<Mutex<Craft>>,
}

impl CraftHandle {
    pub fn new(craft: Craft) -> Self {
        Self {
            id: craft.id,
            world: craft.world,
            inner: Arc::new(Mutex::new(craft)),
        }
    }

    pub fn id(&self) -> CraftId {
        self.id
    }

    pub fn world(&self) -> WorldId {
        self.world
    }

    /// Exclusive access to the craft. Never hold two craft locks at once.
    pub fn lock(&self) -> MutexGuard<'_, Craft> {
        self.inner.lock()
    }
}

impl PartialEq for CraftHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CraftHandle {}

impl Hash for CraftHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CraftHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CraftHandle")
            .field("id", &self.id)
            .field("world", &self.world)
            .finish_non_exhaustive()
    }
}
