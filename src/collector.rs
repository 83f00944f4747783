//! Accumulates entities flagged by group and field events until cleared.

use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::Pod;

use crate::callback::Subscription;
use crate::context::ContextToken;
use crate::entity::EntityId;
use crate::field::{ReactiveField, ValueObserver};
use crate::group::{Group, GroupObserver};
use crate::set::{EntitiesSet, LockedIter};
use crate::{Context, Error, Result};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watch {
    AddedTo(usize),
    RemovedFrom(usize),
    ChangesOf(usize),
}

struct MembershipWatch {
    set:   Rc<RefCell<EntitiesSet>>,
    added: bool,
}

impl GroupObserver for MembershipWatch {
    fn group_changed(&mut self, entity: EntityId, added: bool) {
        if added == self.added {
            self.set.borrow_mut().add(entity);
        }
    }
}

struct ValueWatch {
    set: Rc<RefCell<EntitiesSet>>,
}

impl<T> ValueObserver<T> for ValueWatch {
    fn value_changed(&mut self, entity: EntityId, _: Option<T>, _: T) {
        self.set.borrow_mut().add(entity);
    }
}

/// A set of entities collected from watched events.
///
/// The set only grows until [`clear`](Self::clear) is called.
/// Dropping the collector cancels all its subscriptions.
pub struct Collector {
    token:   ContextToken,
    set:     Rc<RefCell<EntitiesSet>>,
    watches: Vec<(Watch, Subscription)>,
}

impl Collector {
    pub(crate) fn new(token: ContextToken, set: Rc<RefCell<EntitiesSet>>) -> Self {
        Self { token, set, watches: Vec::new() }
    }

    /// Collects entities entering `group`.
    pub fn watch_added_to(&mut self, group: &Group) -> Result<&mut Self> {
        self.watch_group(group, true)
    }

    /// Collects entities leaving `group`.
    pub fn watch_removed_from(&mut self, group: &Group) -> Result<&mut Self> {
        self.watch_group(group, false)
    }

    /// Collects entities whose value of `field` changed.
    pub fn watch_changes_of<T: Pod + PartialEq>(
        &mut self,
        ctx: &Context,
        field: &ReactiveField<T>,
    ) -> Result<&mut Self> {
        let watch = Watch::ChangesOf(field.callback_id());
        self.check(ctx.token(), watch)?;

        let observer = Rc::new(RefCell::new(ValueWatch { set: Rc::clone(&self.set) }));
        let subscription = field.subscribe(ctx, observer);
        self.watches.push((watch, subscription));
        Ok(self)
    }

    fn watch_group(&mut self, group: &Group, added: bool) -> Result<&mut Self> {
        let watch = if added { Watch::AddedTo(group.id()) } else { Watch::RemovedFrom(group.id()) };
        self.check(group.token(), watch)?;

        let observer = Rc::new(RefCell::new(MembershipWatch { set: Rc::clone(&self.set), added }));
        let subscription = group.subscribe(observer);
        self.watches.push((watch, subscription));
        Ok(self)
    }

    fn check(&self, token: &ContextToken, watch: Watch) -> Result<()> {
        if !self.token.is_same(token) {
            return Err(Error::CrossContextWatch);
        }
        if self.watches.iter().any(|&(other, _)| other == watch) {
            return Err(Error::DuplicateWatch { what: format!("{watch:?}") });
        }
        Ok(())
    }

    /// The number of collected entities.
    pub fn len(&self) -> usize { self.set.borrow().len() }

    /// Whether nothing has been collected since the last clear.
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Checks whether `entity` has been collected.
    pub fn contains(&self, entity: EntityId) -> bool { self.set.borrow().contains(entity) }

    /// Iterates over the collected entities.
    ///
    /// Entities collected during the iteration are only visible after the iterator is dropped.
    pub fn iter(&self) -> LockedIter { LockedIter::new(Rc::clone(&self.set), None) }

    /// Forgets all collected entities.
    pub fn clear(&mut self) { self.set.borrow_mut().clear(); }

    /// Cancels all subscriptions.
    ///
    /// Entities collected so far are kept.
    pub fn dispose(&mut self) {
        for (watch, subscription) in self.watches.drain(..) {
            log::trace!("Collector stops watching {watch:?}");
            subscription.cancel();
        }
    }
}

impl<'t> IntoIterator for &'t Collector {
    type Item = EntityId;
    type IntoIter = LockedIter;

    fn into_iter(self) -> LockedIter { self.iter() }
}

impl Drop for Collector {
    fn drop(&mut self) { self.dispose(); }
}
