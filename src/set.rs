//! A dense set of entities that tolerates mutation while being iterated.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::callback::{ResizeCallback, Subscribers};
use crate::entity::EntityId;
use crate::group::GroupObserver;


/// The outcome of [`EntitiesSet::add`] or [`EntitiesSet::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The set was changed.
    Applied,
    /// The set was already in the requested state.
    AppliedEarly,
    /// The set is locked; the operation was queued until the last lock is released.
    Deferred,
}

/// A dense set of entities with O(1) add, remove and membership test.
///
/// `index[e]` stores the position of `e` in `dense` plus one, with 0 meaning absent.
/// Positions stay stable while the set is locked,
/// because structural changes are queued until [`unlock`](Self::unlock) releases the last lock.
#[derive(Debug, Default)]
pub struct EntitiesSet {
    index:    Vec<u32>,
    dense:    Vec<EntityId>,
    deferred: Vec<(EntityId, bool)>,
    locks:    usize,
}

impl EntitiesSet {
    /// Creates an empty set addressing entity indices below `entities_capacity`.
    pub fn new(entities_capacity: usize) -> Self {
        Self { index: vec![0; entities_capacity], ..Self::default() }
    }

    /// The number of entities in the set, excluding queued operations.
    pub fn len(&self) -> usize { self.dense.len() }

    /// Whether the set is empty, excluding queued operations.
    pub fn is_empty(&self) -> bool { self.dense.is_empty() }

    /// Checks whether `entity` is in the set.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.position(entity.index()).map_or(false, |pos| self.dense[pos] == entity)
    }

    /// Returns the member at dense position `pos`.
    pub fn get(&self, pos: usize) -> Option<EntityId> { self.dense.get(pos).copied() }

    /// The members in dense order.
    pub fn as_slice(&self) -> &[EntityId] { &self.dense }

    /// Iterates over the members without locking the set.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ { self.dense.iter().copied() }

    /// Appends all members to `out`, returning the number appended.
    pub fn copy_to(&self, out: &mut Vec<EntityId>) -> usize {
        out.extend_from_slice(&self.dense);
        self.dense.len()
    }

    /// Adds `entity` to the set.
    pub fn add(&mut self, entity: EntityId) -> Applied {
        if self.is_locked() {
            self.deferred.push((entity, true));
            return Applied::Deferred;
        }
        self.apply_add(entity)
    }

    /// Removes `entity` from the set.
    pub fn remove(&mut self, entity: EntityId) -> Applied {
        if self.is_locked() {
            self.deferred.push((entity, false));
            return Applied::Deferred;
        }
        self.apply_remove(entity)
    }

    /// Removes all members.
    ///
    /// While locked, queued operations are discarded
    /// and a removal of every current member is queued instead.
    pub fn clear(&mut self) {
        if self.is_locked() {
            self.deferred.clear();
            let dense = &self.dense;
            self.deferred.extend(dense.iter().map(|&entity| (entity, false)));
            return;
        }

        for entity in self.dense.drain(..) {
            self.index[entity.usize()] = 0;
        }
    }

    /// Grows the entity index to address at least `len` entities.
    pub fn resize_entities(&mut self, len: usize) {
        if self.index.len() < len {
            self.index.resize(len, 0);
        }
    }

    /// Whether any lock is held.
    pub fn is_locked(&self) -> bool { self.locks > 0 }

    /// Acquires an iteration lock.
    ///
    /// Locks nest; queued operations are applied when the last one is released.
    pub fn lock(&mut self) { self.locks += 1; }

    /// Releases an iteration lock.
    ///
    /// When the last lock is released, queued operations are resolved per entity
    /// to the last requested state, in the order each entity was first queued.
    /// Returns the effective changes as `(entity, added)` pairs.
    ///
    /// # Panics
    /// Panics if no lock is held.
    pub fn unlock(&mut self) -> Vec<(EntityId, bool)> {
        assert!(self.locks > 0, "unlock called on an unlocked EntitiesSet");
        self.locks -= 1;
        if self.locks > 0 || self.deferred.is_empty() {
            return Vec::new();
        }

        let mut pending = IndexMap::with_capacity(self.deferred.len());
        for (entity, added) in self.deferred.drain(..) {
            pending.insert(entity, added);
        }
        log::trace!("Draining {} deferred entity operations", pending.len());

        pending
            .into_iter()
            .filter(|&(entity, added)| {
                let applied = if added { self.apply_add(entity) } else { self.apply_remove(entity) };
                applied == Applied::Applied
            })
            .collect()
    }

    fn position(&self, index: u32) -> Option<usize> {
        match self.index.get(index as usize) {
            Some(&0) | None => None,
            Some(&slot) => Some(slot as usize - 1),
        }
    }

    fn apply_add(&mut self, entity: EntityId) -> Applied {
        if let Some(pos) = self.position(entity.index()) {
            let member = &mut self.dense[pos];
            if *member == entity {
                return Applied::AppliedEarly;
            }

            // a stale generation of the same slot is replaced in place
            *member = entity;
            return Applied::Applied;
        }

        self.resize_entities(entity.usize() + 1);
        self.dense.push(entity);
        self.index[entity.usize()] =
            u32::try_from(self.dense.len()).expect("set length exceeds the entity index space");
        Applied::Applied
    }

    fn apply_remove(&mut self, entity: EntityId) -> Applied {
        let pos = match self.position(entity.index()) {
            Some(pos) if self.dense[pos] == entity => pos,
            _ => return Applied::AppliedEarly,
        };

        self.dense.swap_remove(pos);
        self.index[entity.usize()] = 0;
        if let Some(&moved) = self.dense.get(pos) {
            self.index[moved.usize()] = pos as u32 + 1;
        }
        Applied::Applied
    }
}

impl ResizeCallback for RefCell<EntitiesSet> {
    fn resize_entities(&self, len: usize) { self.borrow_mut().resize_entities(len); }
}

/// Iterates over a shared [`EntitiesSet`] while holding one of its locks.
///
/// The lock is released when the iterator is dropped,
/// including on early exit from a loop and during unwinding.
/// Changes applied on release are reported to the attached group observers, if any.
pub struct LockedIter {
    set:       Rc<RefCell<EntitiesSet>>,
    observers: Option<Rc<Subscribers<dyn GroupObserver>>>,
    pos:       usize,
    len:       usize,
}

impl LockedIter {
    pub(crate) fn new(
        set: Rc<RefCell<EntitiesSet>>,
        observers: Option<Rc<Subscribers<dyn GroupObserver>>>,
    ) -> Self {
        let len = {
            let mut locked = set.borrow_mut();
            locked.lock();
            locked.len()
        };
        Self { set, observers, pos: 0, len }
    }
}

impl Iterator for LockedIter {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        if self.pos >= self.len {
            return None;
        }

        let entity = self.set.borrow().get(self.pos);
        self.pos += 1;
        entity
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for LockedIter {}

impl Drop for LockedIter {
    fn drop(&mut self) {
        let changes = self.set.borrow_mut().unlock();
        if let Some(observers) = &self.observers {
            for (entity, added) in changes {
                observers.notify(|observer| observer.group_changed(entity, added));
            }
        }
    }
}
