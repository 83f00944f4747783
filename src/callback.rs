//! Observer protocols connecting storages to the structures derived from them.
//!
//! There are three kinds of observers:
//! - [`UpdateCallback`]s are notified before and after a component is added to or removed from
//!   an entity, in registration order.
//! - [`ResizeCallback`]s are notified when the entity table grows.
//! - Event subscribers (group and field observers) are stored in [`Subscribers`] lists
//!   and can be detached through the [`Subscription`] handle returned on subscription.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::entity::EntityId;
use crate::storage::ComponentStorage;

#[cfg(test)]
mod tests;

/// Reacts to component presence changes on one storage.
///
/// `before_change` runs while the record is still intact,
/// so a callback that needs the field values of a removed component must read them there.
/// `after_change` runs after the entity map has been updated.
/// On addition, field bytes are written after `after_change` returns,
/// so the record is still zeroed in both phases.
pub trait UpdateCallback: 'static {
    /// Called before the component is attached to or detached from `entity`.
    fn before_change(&mut self, storage: &ComponentStorage, entity: EntityId, added: bool) {
        let _ = (storage, entity, added);
    }

    /// Called after the component is attached to or detached from `entity`.
    fn after_change(&mut self, storage: &ComponentStorage, entity: EntityId, added: bool) {
        let _ = (storage, entity, added);
    }

    /// Called when entity-indexed arrays must grow to `len`.
    fn resize_entities(&mut self, len: usize) { let _ = len; }
}

/// Type-erased [`UpdateCallback`] that can be downcast to its concrete type.
pub(crate) trait AnyCallback: UpdateCallback {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: UpdateCallback> AnyCallback for C {
    fn as_any(&self) -> &dyn Any { self }
    fn as_any_mut(&mut self) -> &mut dyn Any { self }
}

/// Builds a callback for a context whose entity table has the given length.
pub(crate) type CallbackFactory = Box<dyn FnOnce(usize) -> Box<dyn AnyCallback>>;

/// A typed reference to a callback owned by a [`Context`](crate::Context).
pub struct CallbackHandle<C> {
    pub(crate) id: usize,
    _ph:          PhantomData<fn() -> C>,
}

impl<C> CallbackHandle<C> {
    pub(crate) fn new(id: usize) -> Self { Self { id, _ph: PhantomData } }
}

impl<C> Clone for CallbackHandle<C> {
    fn clone(&self) -> Self { *self }
}
impl<C> Copy for CallbackHandle<C> {}

impl<C> fmt::Debug for CallbackHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CallbackHandle").field(&self.id).finish()
    }
}

/// Anything holding an entity-indexed array that must grow with the entity table.
///
/// Implementors are registered through
/// [`Context::add_resize_callback`](crate::Context::add_resize_callback) by weak reference,
/// so they are dropped from the list once their owner is gone.
pub trait ResizeCallback {
    /// Grows entity-indexed arrays to at least `len`.
    fn resize_entities(&self, len: usize);
}

/// An entry in the observer list of a storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observer {
    /// The group at this index of the context.
    Group(usize),
    /// The callback at this index of the context.
    Callback(usize),
}

/// An ordered list of event observers.
pub(crate) struct Subscribers<O: ?Sized> {
    next_id: Cell<u64>,
    list:    RefCell<Vec<(u64, Rc<RefCell<O>>)>>,
}

impl<O: ?Sized + 'static> Subscribers<O> {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self { next_id: Cell::new(0), list: RefCell::new(Vec::new()) })
    }

    /// Appends an observer to the list.
    pub(crate) fn subscribe(self: &Rc<Self>, observer: Rc<RefCell<O>>) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.list.borrow_mut().push((id, observer));

        let weak = Rc::downgrade(self);
        let source: Weak<dyn Unsubscribe> = weak;
        Subscription { id, source }
    }

    /// Calls `f` on every observer in subscription order.
    ///
    /// # Panics
    /// Panics if an observer subscribes to or unsubscribes from this list during the call.
    pub(crate) fn notify(&self, mut f: impl FnMut(&mut O)) {
        for (_, observer) in self.list.borrow().iter() {
            f(&mut *observer.borrow_mut());
        }
    }

    pub(crate) fn len(&self) -> usize { self.list.borrow().len() }
}

trait Unsubscribe {
    fn unsubscribe(&self, id: u64) -> bool;
}

impl<O: ?Sized> Unsubscribe for Subscribers<O> {
    fn unsubscribe(&self, id: u64) -> bool {
        let mut list = self.list.borrow_mut();
        match list.iter().position(|&(other, _)| other == id) {
            Some(pos) => {
                list.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Detaches an observer from the event source it subscribed to.
pub struct Subscription {
    id:     u64,
    source: Weak<dyn Unsubscribe>,
}

impl Subscription {
    /// Removes the observer.
    ///
    /// Returns false if the event source no longer exists.
    pub fn cancel(self) -> bool {
        match self.source.upgrade() {
            Some(source) => source.unsubscribe(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish_non_exhaustive()
    }
}
