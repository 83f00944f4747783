use std::collections::HashMap;
use std::hash::Hash;

use bytemuck::Pod;

use super::{Component, Field, FieldInfo};
use crate::callback::{CallbackHandle, UpdateCallback};
use crate::entity::EntityId;
use crate::set::EntitiesSet;
use crate::storage::ComponentStorage;
use crate::{Context, Result};

/// Groups the holders of an indexed field by value.
pub struct ValueIndex<V> {
    entities_capacity: usize,
    sets:              HashMap<V, EntitiesSet>,
    values:            HashMap<EntityId, V>,
}

impl<V: Pod + Eq + Hash> ValueIndex<V> {
    pub(crate) fn new(entities_capacity: usize) -> Self {
        Self { entities_capacity, sets: HashMap::new(), values: HashMap::new() }
    }

    fn link(&mut self, value: V, entity: EntityId) {
        self.unlink(entity);
        self.values.insert(entity, value);
        let capacity = self.entities_capacity;
        self.sets.entry(value).or_insert_with(|| EntitiesSet::new(capacity)).add(entity);
    }

    fn unlink(&mut self, entity: EntityId) {
        let Some(value) = self.values.remove(&entity) else { return };
        if let Some(set) = self.sets.get_mut(&value) {
            set.remove(entity);
            if set.is_empty() {
                self.sets.remove(&value);
            }
        }
    }
}

impl<V: Pod + Eq + Hash> UpdateCallback for ValueIndex<V> {
    fn before_change(&mut self, _: &ComponentStorage, entity: EntityId, added: bool) {
        if !added {
            self.unlink(entity);
        }
    }

    fn after_change(&mut self, _: &ComponentStorage, entity: EntityId, added: bool) {
        if added {
            // fresh records are zeroed
            self.link(V::zeroed(), entity);
        }
    }

    fn resize_entities(&mut self, len: usize) {
        self.entities_capacity = len;
        for set in self.sets.values_mut() {
            set.resize_entities(len);
        }
    }
}

/// A field whose holders can be looked up by value.
pub struct IndexField<V> {
    field: Field<V>,
    index: CallbackHandle<ValueIndex<V>>,
}

impl<V> Clone for IndexField<V> {
    fn clone(&self) -> Self { *self }
}
impl<V> Copy for IndexField<V> {}

impl<V: Pod + Eq + Hash> IndexField<V> {
    pub(crate) fn new(field: Field<V>, index: CallbackHandle<ValueIndex<V>>) -> Self {
        Self { field, index }
    }

    /// The location of this field.
    pub fn info(&self) -> &FieldInfo { self.field.info() }

    /// The component owning this field.
    pub fn component(&self) -> Component { self.field.component() }

    /// Reads the value of this field.
    pub fn get(&self, ctx: &Context, entity: EntityId) -> Result<V> { self.field.get(ctx, entity) }

    /// Reads the value of this field if `entity` holds the component.
    pub fn try_get(&self, ctx: &Context, entity: EntityId) -> Result<Option<V>> {
        self.field.try_get(ctx, entity)
    }

    /// Writes the value of this field and moves `entity` to the matching index entry.
    pub fn set(&self, ctx: &mut Context, entity: EntityId, value: V) -> Result<()> {
        let old = self.field.try_get(ctx, entity)?;
        if old == Some(value) {
            return Ok(());
        }

        self.field.set(ctx, entity, value)?;
        ctx.callback_mut(self.index).link(value, entity);
        Ok(())
    }

    /// The entities currently holding `value`.
    pub fn entities_with<'c>(&self, ctx: &'c Context, value: V) -> &'c [EntityId] {
        match ctx.callback(self.index).sets.get(&value) {
            Some(set) => set.as_slice(),
            None => &[],
        }
    }
}
