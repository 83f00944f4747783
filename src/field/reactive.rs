use std::cell::RefCell;
use std::rc::Rc;

use bytemuck::Pod;

use super::{Component, Field};
use crate::callback::{CallbackHandle, Subscribers, Subscription, UpdateCallback};
use crate::entity::EntityId;
use crate::{Context, Result};

/// Receives effective value changes of a [`ReactiveField`].
pub trait ValueObserver<T> {
    /// Called after the value of the field on `entity` changed from `old` to `new`.
    ///
    /// `old` is `None` if the component was attached by this change.
    fn value_changed(&mut self, entity: EntityId, old: Option<T>, new: T);
}

/// The observers of one reactive field, owned by the context.
pub struct ValueObservers<T> {
    pub(crate) subscribers: Rc<Subscribers<dyn ValueObserver<T>>>,
}

impl<T: 'static> ValueObservers<T> {
    pub(crate) fn new() -> Self { Self { subscribers: Subscribers::new() } }
}

impl<T: 'static> UpdateCallback for ValueObservers<T> {}

/// A field that notifies observers when its value actually changes.
///
/// Writing the value already stored is a no-op and notifies nobody.
pub struct ReactiveField<T> {
    field:     Field<T>,
    observers: CallbackHandle<ValueObservers<T>>,
}

impl<T> Clone for ReactiveField<T> {
    fn clone(&self) -> Self { *self }
}
impl<T> Copy for ReactiveField<T> {}

impl<T: Pod + PartialEq> ReactiveField<T> {
    pub(crate) fn new(field: Field<T>, observers: CallbackHandle<ValueObservers<T>>) -> Self {
        Self { field, observers }
    }

    /// The component owning this field.
    pub fn component(&self) -> Component { self.field.component() }

    /// Reads the value of this field.
    pub fn get(&self, ctx: &Context, entity: EntityId) -> Result<T> { self.field.get(ctx, entity) }

    /// Reads the value of this field if `entity` holds the component.
    pub fn try_get(&self, ctx: &Context, entity: EntityId) -> Result<Option<T>> {
        self.field.try_get(ctx, entity)
    }

    /// Writes the value of this field, notifying observers if it changed.
    pub fn set(&self, ctx: &mut Context, entity: EntityId, value: T) -> Result<()> {
        let old = self.field.try_get(ctx, entity)?;
        if old == Some(value) {
            return Ok(());
        }

        self.field.set(ctx, entity, value)?;
        self.notify(ctx, entity, old, value);
        Ok(())
    }

    /// Mutates the value of this field in place, notifying observers if it changed.
    pub fn update<R>(
        &self,
        ctx: &mut Context,
        entity: EntityId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R> {
        let old = self.field.get(ctx, entity)?;
        let mut new = old;
        let ret = f(&mut new);
        if new != old {
            self.field.set(ctx, entity, new)?;
            self.notify(ctx, entity, Some(old), new);
        }
        Ok(ret)
    }

    /// Subscribes `observer` to the changes of this field.
    pub fn subscribe(
        &self,
        ctx: &Context,
        observer: Rc<RefCell<dyn ValueObserver<T>>>,
    ) -> Subscription {
        self.subscribers(ctx).subscribe(observer)
    }

    pub(crate) fn subscribers<'c>(
        &self,
        ctx: &'c Context,
    ) -> &'c Rc<Subscribers<dyn ValueObserver<T>>> {
        &ctx.callback(self.observers).subscribers
    }

    /// Identifies this field among the callbacks of its context.
    pub(crate) fn callback_id(&self) -> usize { self.observers.id }

    fn notify(&self, ctx: &Context, entity: EntityId, old: Option<T>, new: T) {
        self.subscribers(ctx).notify(|observer| observer.value_changed(entity, old, new));
    }
}
