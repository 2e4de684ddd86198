//! Entity handle with generational index
//!
//! Entities are lightweight handles (8 bytes) that reference data in the Registry.
//! The generation counter prevents use-after-free bugs.

use std::fmt;

/// Entity handle (generation-indexed for safety)
///
/// Bits: index in the low 32, generation in the next 21.
/// - Index: Slot in the allocator
/// - Generation: Incremented when the slot is recycled, wrapping at
///   `MAX_GENERATION` so `to_bits` always fits in 53 bits
///
/// Ordering is by index first, which keeps query results in a stable order.
///
/// Example:
/// ```ignore
/// let entity = registry.create();
/// registry.destroy(entity);
/// registry.remove_removed();
/// // entity handle is now invalid (generation mismatch)
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Largest generation a slot reaches before wrapping back to zero.
    pub const MAX_GENERATION: u32 = (1 << 21) - 1;

    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Serialize to 64-bit integer (for scripts/save files)
    pub fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Deserialize from 64-bit integer
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out entity slots and recycles destroyed ones.
#[derive(Debug, Default)]
pub(crate) struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_list: Vec<u32>,
    live: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> Entity {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Entity::new(index, self.generations[slot]);
        }

        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.alive.push(true);
        Entity::new(index, 0)
    }

    /// Release a slot. The slot's generation is bumped so old handles go stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = entity.index as usize;
        self.alive[slot] = false;
        self.generations[slot] = (self.generations[slot] + 1) & Entity::MAX_GENERATION;
        self.free_list.push(entity.index);
        self.live -= 1;
        true
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        self.alive.get(slot).copied().unwrap_or(false) && self.generations[slot] == entity.generation
    }

    pub fn count(&self) -> usize {
        self.live
    }
}
