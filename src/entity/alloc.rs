//! Generational allocation of entity slots.

use std::collections::VecDeque;
use std::num::NonZeroU32;

use super::EntityId;

#[cfg(test)]
mod tests;

/// The state of one entity slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// The slot has never been issued.
    Vacant,
    /// The slot is occupied by the entity of this generation.
    Alive(NonZeroU32),
    /// The slot was freed; the value is the generation of its last occupant.
    Recycled(NonZeroU32),
    /// The generation counter of this slot is exhausted, so it is never reissued.
    Retired,
}

/// The result of [`Allocator::allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// The allocated entity.
    pub id:       EntityId,
    /// The new length of entity-indexed arrays if the slot table had to grow.
    pub grown_to: Option<usize>,
    /// Whether the slot was reissued from the recycle queue.
    pub recycled: bool,
}

/// Issues entity ids and tracks their liveness.
///
/// Freed slots enter a FIFO queue and are only reissued
/// once at least `reuse_barrier` slots are waiting,
/// so a stale id stays detectably dead for a while after its entity is removed.
#[derive(Debug)]
pub struct Allocator {
    slots:         Vec<Slot>,
    /// The number of slots that have ever been issued.
    issued:        usize,
    recycled:      VecDeque<u32>,
    reuse_barrier: usize,
    live:          usize,
}

impl Allocator {
    /// Creates an allocator with room for `capacity` entities before the first growth.
    pub fn new(capacity: usize, reuse_barrier: usize) -> Self {
        Self {
            slots: vec![Slot::Vacant; capacity.max(1)],
            issued: 0,
            recycled: VecDeque::new(),
            reuse_barrier,
            live: 0,
        }
    }

    /// Issues a new entity id.
    ///
    /// The oldest recycled slot is reused if the recycle queue has reached the barrier.
    /// Otherwise a never-used slot is issued with generation 1,
    /// doubling the slot table if it is full.
    pub fn allocate(&mut self) -> Allocation {
        self.live += 1;

        if !self.recycled.is_empty() && self.recycled.len() >= self.reuse_barrier {
            let index = self.recycled.pop_front().expect("queue is non-empty");
            let slot = &mut self.slots[index as usize];
            let generation = match *slot {
                Slot::Recycled(last) => last.checked_add(1).expect("retired slots are never queued"),
                other => panic!("slot {index} in the recycle queue is {other:?}"),
            };
            *slot = Slot::Alive(generation);

            return Allocation {
                id:       EntityId::new(index, generation.get()),
                grown_to: None,
                recycled: true,
            };
        }

        let index = self.issued;
        let mut grown_to = None;
        if index == self.slots.len() {
            let new_len = self.slots.len() * 2;
            log::debug!("Growing entity table from {} to {new_len}", self.slots.len());
            self.slots.resize(new_len, Slot::Vacant);
            grown_to = Some(new_len);
        }

        self.issued += 1;
        self.slots[index] = Slot::Alive(NonZeroU32::MIN);

        let index = u32::try_from(index).expect("entity index space is exhausted");
        Allocation { id: EntityId::new(index, 1), grown_to, recycled: false }
    }

    /// Frees the slot of `id`.
    ///
    /// Returns false if `id` is not alive.
    pub fn free(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }

        let slot = &mut self.slots[id.usize()];
        let Slot::Alive(generation) = *slot else { unreachable!("checked by is_alive") };

        self.live -= 1;
        if generation == NonZeroU32::MAX {
            log::debug!("Retiring entity slot {} after exhausting its generations", id.index());
            *slot = Slot::Retired;
        } else {
            *slot = Slot::Recycled(generation);
            self.recycled.push_back(id.index());
        }

        true
    }

    /// Checks whether `id` refers to the current occupant of its slot.
    pub fn is_alive(&self, id: EntityId) -> bool {
        matches!(
            self.slots.get(id.usize()),
            Some(Slot::Alive(generation)) if generation.get() == id.generation()
        )
    }

    /// Returns the live entity occupying `index`, if any.
    pub fn get(&self, index: u32) -> Option<EntityId> {
        match self.slots.get(index as usize) {
            Some(Slot::Alive(generation)) => Some(EntityId::new(index, generation.get())),
            _ => None,
        }
    }

    /// Iterates over all live entities in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots[..self.issued].iter().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Alive(generation) => Some(EntityId::new(index as u32, generation.get())),
            _ => None,
        })
    }

    /// The number of live entities.
    pub fn live_count(&self) -> usize { self.live }

    /// The number of freed slots waiting to be reissued.
    pub fn recycled_count(&self) -> usize { self.recycled.len() }

    /// The current length of entity-indexed arrays.
    pub fn capacity(&self) -> usize { self.slots.len() }
}
