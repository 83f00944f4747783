use std::fmt;

use super::{Component, FieldInfo};
use crate::callback::{CallbackHandle, UpdateCallback};
use crate::entity::EntityId;
use crate::storage::ComponentStorage;
use crate::{Context, Result};

/// Values of a [`RefField`], indexed by entity.
pub struct RefValues<T> {
    values: Vec<Option<T>>,
}

impl<T> RefValues<T> {
    pub(crate) fn new(entities_capacity: usize) -> Self {
        let mut values = Vec::new();
        values.resize_with(entities_capacity, || None);
        Self { values }
    }

    fn slot_mut(&mut self, index: u32) -> &mut Option<T> {
        let index = index as usize;
        if self.values.len() <= index {
            self.values.resize_with(index + 1, || None);
        }
        &mut self.values[index]
    }
}

impl<T: 'static> UpdateCallback for RefValues<T> {
    fn before_change(&mut self, _: &ComponentStorage, entity: EntityId, added: bool) {
        if !added {
            if let Some(slot) = self.values.get_mut(entity.usize()) {
                *slot = None;
            }
        }
    }

    fn resize_entities(&mut self, len: usize) {
        if self.values.len() < len {
            self.values.resize_with(len, || None);
        }
    }
}

/// A field holding an arbitrary owned value.
///
/// The value lives outside the packed record;
/// it is dropped when the entity loses the component.
pub struct RefField<T> {
    info:   FieldInfo,
    values: CallbackHandle<RefValues<T>>,
}

impl<T> Clone for RefField<T> {
    fn clone(&self) -> Self { *self }
}
impl<T> Copy for RefField<T> {}

impl<T> fmt::Debug for RefField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefField").field("info", &self.info).finish()
    }
}

impl<T: 'static> RefField<T> {
    pub(crate) fn new(info: FieldInfo, values: CallbackHandle<RefValues<T>>) -> Self {
        Self { info, values }
    }

    /// The location of this field.
    pub fn info(&self) -> &FieldInfo { &self.info }

    /// The component owning this field.
    pub fn component(&self) -> Component { Component::new(self.info.component) }

    /// Borrows the value of this field.
    ///
    /// Fails with [`ComponentNotFound`](crate::Error::ComponentNotFound)
    /// if `entity` does not hold the component or no value was set.
    pub fn get<'c>(&self, ctx: &'c Context, entity: EntityId) -> Result<&'c T> {
        match self.try_get(ctx, entity)? {
            Some(value) => Ok(value),
            None => Err(ctx.component_not_found(self.info.component, entity)),
        }
    }

    /// Borrows the value of this field if there is one.
    pub fn try_get<'c>(&self, ctx: &'c Context, entity: EntityId) -> Result<Option<&'c T>> {
        ctx.ensure_alive(entity)?;
        let values = &ctx.callback(self.values).values;
        Ok(values.get(entity.usize()).and_then(Option::as_ref))
    }

    /// Mutably borrows the value of this field.
    pub fn get_mut<'c>(&self, ctx: &'c mut Context, entity: EntityId) -> Result<&'c mut T> {
        ctx.ensure_alive(entity)?;
        if ctx.callback(self.values).values.get(entity.usize()).map_or(true, Option::is_none) {
            return Err(ctx.component_not_found(self.info.component, entity));
        }

        let slot = ctx.callback_mut(self.values).slot_mut(entity.index());
        Ok(slot.as_mut().expect("checked above"))
    }

    /// Stores `value`, attaching the component if absent.
    ///
    /// Returns the previous value.
    pub fn set(&self, ctx: &mut Context, entity: EntityId, value: T) -> Result<Option<T>> {
        ctx.ensure_alive(entity)?;
        ctx.attach(self.info.component, entity);
        Ok(ctx.callback_mut(self.values).slot_mut(entity.index()).replace(value))
    }

    /// Moves the value out, leaving the component attached without a value.
    pub fn take(&self, ctx: &mut Context, entity: EntityId) -> Result<Option<T>> {
        ctx.ensure_alive(entity)?;
        Ok(ctx.callback_mut(self.values).slot_mut(entity.index()).take())
    }
}
