use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use bytemuck::Pod;

use super::{Component, Field, FieldInfo};
use crate::callback::{CallbackHandle, UpdateCallback};
use crate::entity::EntityId;
use crate::storage::ComponentStorage;
use crate::{Context, Error, Result};

/// Maps each assigned key to its owner.
///
/// Keys are tracked per entity as well,
/// so eviction never depends on the current record contents.
pub struct PrimaryIndex<K> {
    owners: HashMap<K, EntityId>,
    keys:   HashMap<EntityId, K>,
}

impl<K: Pod + Eq + Hash> PrimaryIndex<K> {
    pub(crate) fn new() -> Self { Self { owners: HashMap::new(), keys: HashMap::new() } }

    fn assign(&mut self, key: K, entity: EntityId) {
        if let Some(old) = self.keys.insert(entity, key) {
            self.owners.remove(&old);
        }
        self.owners.insert(key, entity);
    }

    fn evict(&mut self, entity: EntityId) {
        if let Some(key) = self.keys.remove(&entity) {
            self.owners.remove(&key);
        }
    }

    /// The number of assigned keys.
    pub fn len(&self) -> usize { self.owners.len() }

    /// Whether no key is assigned.
    pub fn is_empty(&self) -> bool { self.owners.is_empty() }
}

impl<K: Pod + Eq + Hash> UpdateCallback for PrimaryIndex<K> {
    fn before_change(&mut self, _: &ComponentStorage, entity: EntityId, added: bool) {
        if !added {
            self.evict(entity);
        }
    }
}

/// A field whose values identify at most one entity each.
///
/// Only keys assigned through [`set`](Self::set) are indexed;
/// the zeroed value of a freshly attached record does not claim a key.
/// A key is released when its owner loses the component or is removed.
pub struct PrimaryKey<K> {
    field: Field<K>,
    index: CallbackHandle<PrimaryIndex<K>>,
}

impl<K> Clone for PrimaryKey<K> {
    fn clone(&self) -> Self { *self }
}
impl<K> Copy for PrimaryKey<K> {}

impl<K: Pod + Eq + Hash + Debug> PrimaryKey<K> {
    pub(crate) fn new(field: Field<K>, index: CallbackHandle<PrimaryIndex<K>>) -> Self {
        Self { field, index }
    }

    /// The location of this field.
    pub fn info(&self) -> &FieldInfo { self.field.info() }

    /// The component owning this field.
    pub fn component(&self) -> Component { self.field.component() }

    /// Reads the key of `entity`.
    pub fn get(&self, ctx: &Context, entity: EntityId) -> Result<K> { self.field.get(ctx, entity) }

    /// Reads the key of `entity` if it holds the component.
    pub fn try_get(&self, ctx: &Context, entity: EntityId) -> Result<Option<K>> {
        self.field.try_get(ctx, entity)
    }

    /// Assigns `key` to `entity`, releasing the previous key of `entity`.
    ///
    /// Fails with [`PrimaryKeyConflict`](Error::PrimaryKeyConflict) without changing anything
    /// if another entity owns `key`.
    pub fn set(&self, ctx: &mut Context, entity: EntityId, key: K) -> Result<()> {
        ctx.ensure_alive(entity)?;

        if let Some(&owner) = ctx.callback(self.index).owners.get(&key) {
            if owner == entity {
                return Ok(());
            }
            return Err(Error::PrimaryKeyConflict {
                field: ctx.field_name(&self.field.info).to_owned(),
                key: format!("{key:?}"),
                owner,
                entity,
            });
        }

        self.field.set(ctx, entity, key)?;
        ctx.callback_mut(self.index).assign(key, entity);
        Ok(())
    }

    /// Finds the owner of `key`.
    ///
    /// Fails with [`KeyNotFound`](Error::KeyNotFound) if no entity owns it.
    pub fn get_entity_by_key(&self, ctx: &Context, key: K) -> Result<EntityId> {
        self.try_get_entity_by_key(ctx, key).ok_or_else(|| Error::KeyNotFound {
            field: ctx.field_name(&self.field.info).to_owned(),
            key:   format!("{key:?}"),
        })
    }

    /// Finds the owner of `key` if there is one.
    pub fn try_get_entity_by_key(&self, ctx: &Context, key: K) -> Option<EntityId> {
        ctx.callback(self.index).owners.get(&key).copied()
    }

    /// The number of assigned keys.
    pub fn len(&self, ctx: &Context) -> usize { ctx.callback(self.index).len() }
}
