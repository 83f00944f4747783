//! Typed accessors for component fields.
//!
//! A field handle is a byte offset and size within the records of one component storage.
//! Handles own no data; every access goes through the [`Context`].

use std::fmt;
use std::marker::PhantomData;

use bytemuck::Pod;

use crate::entity::EntityId;
use crate::schema::ComponentId;
use crate::{Context, Result};

mod reactive;
pub use reactive::{ReactiveField, ValueObserver, ValueObservers};
mod primary_key;
pub use primary_key::{PrimaryIndex, PrimaryKey};
mod index;
pub use index::{IndexField, ValueIndex};
mod refs;
pub use refs::{RefField, RefValues};

#[cfg(test)]
mod tests;

/// The location of a field within the records of its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldInfo {
    pub(crate) component: ComponentId,
    pub(crate) index:     usize,
    pub(crate) offset:    usize,
    pub(crate) size:      usize,
}

impl FieldInfo {
    /// The component owning the field.
    pub fn component(&self) -> ComponentId { self.component }

    /// The declaration order of the field within its component.
    pub fn index(&self) -> usize { self.index }

    /// The byte offset of the field within a record.
    pub fn offset(&self) -> usize { self.offset }

    /// The number of bytes occupied by the field.
    pub fn size(&self) -> usize { self.size }
}

/// A handle to a component, used to test, attach and detach it as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Component {
    id: ComponentId,
}

impl Component {
    pub(crate) fn new(id: ComponentId) -> Self { Self { id } }

    /// The identifier of this component.
    pub fn id(&self) -> ComponentId { self.id }

    /// Checks whether `entity` holds this component.
    pub fn has(&self, ctx: &Context, entity: EntityId) -> Result<bool> {
        ctx.ensure_alive(entity)?;
        Ok(ctx.storage(self.id).has(entity.index()))
    }

    /// Attaches this component with all fields zeroed.
    ///
    /// Returns false if `entity` already holds the component.
    pub fn add(&self, ctx: &mut Context, entity: EntityId) -> Result<bool> {
        ctx.ensure_alive(entity)?;
        Ok(ctx.attach(self.id, entity))
    }

    /// Detaches this component.
    ///
    /// Returns false if `entity` does not hold the component.
    pub fn remove(&self, ctx: &mut Context, entity: EntityId) -> Result<bool> {
        ctx.ensure_alive(entity)?;
        Ok(ctx.detach(self.id, entity))
    }

    /// The number of entities holding this component.
    pub fn len(&self, ctx: &Context) -> usize { ctx.storage(self.id).len() }
}

impl From<&Component> for ComponentId {
    fn from(component: &Component) -> Self { component.id }
}

/// A plain-data field of type `T`.
pub struct Field<T> {
    info: FieldInfo,
    _ph:  PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self { *self }
}
impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field").field("info", &self.info).finish()
    }
}

impl<T: Pod> Field<T> {
    pub(crate) fn new(info: FieldInfo) -> Self { Self { info, _ph: PhantomData } }

    /// The location of this field.
    pub fn info(&self) -> &FieldInfo { &self.info }

    /// The component owning this field.
    pub fn component(&self) -> Component { Component::new(self.info.component) }

    /// Reads the value of this field.
    ///
    /// Fails with [`ComponentNotFound`](crate::Error::ComponentNotFound)
    /// if `entity` does not hold the component.
    pub fn get(&self, ctx: &Context, entity: EntityId) -> Result<T> {
        match self.try_get(ctx, entity)? {
            Some(value) => Ok(value),
            None => Err(ctx.component_not_found(self.info.component, entity)),
        }
    }

    /// Reads the value of this field if `entity` holds the component.
    pub fn try_get(&self, ctx: &Context, entity: EntityId) -> Result<Option<T>> {
        ctx.ensure_alive(entity)?;
        Ok(ctx.storage(self.info.component).read(entity.index(), self.info.offset))
    }

    /// Writes the value of this field, attaching the component if absent.
    pub fn set(&self, ctx: &mut Context, entity: EntityId, value: T) -> Result<()> {
        ctx.ensure_alive(entity)?;
        ctx.attach(self.info.component, entity);
        ctx.storage_mut(self.info.component).write(entity.index(), self.info.offset, value);
        Ok(())
    }

    /// Mutates the value of this field in place.
    ///
    /// Fails with [`ComponentNotFound`](crate::Error::ComponentNotFound)
    /// if `entity` does not hold the component.
    pub fn update<R>(
        &self,
        ctx: &mut Context,
        entity: EntityId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R> {
        ctx.ensure_alive(entity)?;
        match ctx.storage_mut(self.info.component).update(entity.index(), self.info.offset, f) {
            Some(ret) => Ok(ret),
            None => Err(ctx.component_not_found(self.info.component, entity)),
        }
    }

    /// Reads the value of this field, or sets it to `default` if `entity` lacks the component.
    pub fn get_or_set(&self, ctx: &mut Context, entity: EntityId, default: T) -> Result<T> {
        match self.try_get(ctx, entity)? {
            Some(value) => Ok(value),
            None => {
                self.set(ctx, entity, default)?;
                Ok(default)
            }
        }
    }
}
