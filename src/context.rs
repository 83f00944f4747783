//! The owner of all entities, storages, groups and callbacks.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::callback::{AnyCallback, CallbackHandle, Observer, ResizeCallback, UpdateCallback};
use crate::collector::Collector;
use crate::entity::{self, EntityId};
use crate::field::FieldInfo;
use crate::group::{Group, GroupFilter, GroupState};
use crate::schema::{ComponentDef, ComponentId, Schema};
use crate::set::EntitiesSet;
use crate::storage::ComponentStorage;
use crate::{Error, Result};


/// Tuning parameters of a [`Context`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The initial length of every entity-indexed array.
    pub initial_entities_capacity: usize,
    /// The number of freed entity slots that must be waiting before the oldest is reused.
    pub reuse_barrier:             usize,
    /// The initial number of record slots in each component storage.
    pub initial_records_capacity:  usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { initial_entities_capacity: 100, reuse_barrier: 1000, initial_records_capacity: 100 }
    }
}

/// Identifies the context that issued a handle.
#[derive(Debug, Clone)]
pub(crate) struct ContextToken(Rc<()>);

impl ContextToken {
    pub(crate) fn is_same(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }
}

/// Entities and their components.
///
/// A context is single-threaded.
/// Every structure derived from its storages
/// (groups, indices, relations, collectors) is updated synchronously
/// within the call that changed the storage.
pub struct Context {
    token:            ContextToken,
    config:           Config,
    entities:         entity::Allocator,
    storages:         Vec<ComponentStorage>,
    callbacks:        Vec<Box<dyn AnyCallback>>,
    groups:           IndexMap<GroupFilter, GroupState>,
    resize_callbacks: Vec<Weak<dyn ResizeCallback>>,
}

static_assertions::assert_not_impl_any!(Context: Send, Sync);

impl Context {
    /// Creates a context with the default [`Config`].
    pub fn new(schema: Schema) -> Self { Self::with_config(schema, Config::default()) }

    /// Creates a context with custom parameters.
    pub fn with_config(schema: Schema, config: Config) -> Self {
        let entities =
            entity::Allocator::new(config.initial_entities_capacity, config.reuse_barrier);
        let entities_capacity = entities.capacity();

        let mut storages: Vec<_> = schema
            .components
            .into_iter()
            .enumerate()
            .map(|(index, def)| {
                ComponentStorage::new(
                    ComponentId(index),
                    def,
                    entities_capacity,
                    config.initial_records_capacity,
                )
            })
            .collect();

        let mut callbacks = Vec::with_capacity(schema.callbacks.len());
        for (id, def) in schema.callbacks.into_iter().enumerate() {
            if def.observes {
                storages[def.component.0].add_update_callback(Observer::Callback(id));
            }
            callbacks.push((def.build)(entities_capacity));
        }

        log::debug!(
            "Created context with {} components and {} callbacks",
            storages.len(),
            callbacks.len()
        );

        Self {
            token: ContextToken(Rc::new(())),
            config,
            entities,
            storages,
            callbacks,
            groups: IndexMap::new(),
            resize_callbacks: Vec::new(),
        }
    }

    /// The parameters this context was created with.
    pub fn config(&self) -> &Config { &self.config }

    /// Creates an entity holding no components.
    pub fn create_entity(&mut self) -> EntityId {
        let allocation = self.entities.allocate();
        if let Some(len) = allocation.grown_to {
            self.resize_entities(len);
        }

        log::trace!("Created entity {} (recycled: {})", allocation.id, allocation.recycled);
        allocation.id
    }

    /// Removes an entity together with all its components.
    ///
    /// Returns false if `entity` is not alive.
    /// The entity is marked dead before its components are detached,
    /// so update callbacks observe the removal of each component on a dead id.
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        if !self.entities.free(entity) {
            return false;
        }

        for index in 0..self.storages.len() {
            self.detach(ComponentId(index), entity);
        }

        log::trace!("Removed entity {entity}");
        true
    }

    /// Checks whether `entity` is alive.
    pub fn is_alive(&self, entity: EntityId) -> bool { self.entities.is_alive(entity) }

    /// Returns the live entity occupying slot `index`, if any.
    pub fn entity_at(&self, index: u32) -> Option<EntityId> { self.entities.get(index) }

    /// Iterates over all live entities in index order.
    pub fn alive_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.iter_alive()
    }

    /// The number of live entities.
    pub fn live_entities_count(&self) -> usize { self.entities.live_count() }

    /// The number of removed entity slots waiting to be reused.
    pub fn recycled_entities_count(&self) -> usize { self.entities.recycled_count() }

    /// The current length of entity-indexed arrays.
    pub fn entities_capacity(&self) -> usize { self.entities.capacity() }

    /// The layouts of all components in registration order.
    pub fn components(&self) -> impl Iterator<Item = &ComponentDef> + '_ {
        self.storages.iter().map(ComponentStorage::def)
    }

    /// The storage of `component`.
    pub fn storage(&self, component: impl Into<ComponentId>) -> &ComponentStorage {
        &self.storages[component.into().0]
    }

    pub(crate) fn storage_mut(&mut self, component: ComponentId) -> &mut ComponentStorage {
        &mut self.storages[component.0]
    }

    /// The declared name of a field.
    pub fn field_name(&self, info: &FieldInfo) -> &str {
        &self.storages[info.component.0].def().fields()[info.index].name
    }

    /// Returns the group matching `filter`, creating it on first use.
    ///
    /// Filters equal as sets share the same group.
    pub fn group(&mut self, filter: &GroupFilter) -> Result<Group> {
        if let Some((id, _, state)) = self.groups.get_full(filter) {
            return Ok(state.handle(id, &self.token));
        }

        filter.validate(&self.storages)?;

        let id = self.groups.len();
        let state = GroupState::new(filter.clone(), self.entities.capacity());
        for entity in self.entities.iter_alive() {
            if state.matches(&self.storages, entity) {
                state.populate(entity);
            }
        }
        for component in state.watched() {
            self.storages[component.0].add_update_callback(Observer::Group(id));
        }

        log::trace!("Created group {id} for filter {filter}");
        let handle = state.handle(id, &self.token);
        self.groups.insert(filter.clone(), state);
        Ok(handle)
    }

    /// Creates an empty collector for the events of this context.
    pub fn collector(&mut self) -> Collector {
        let set = Rc::new(RefCell::new(EntitiesSet::new(self.entities.capacity())));
        let resize: Rc<dyn ResizeCallback> = set.clone();
        self.add_resize_callback(Rc::downgrade(&resize));
        Collector::new(self.token.clone(), set)
    }

    /// Registers a structure to be resized with the entity table.
    ///
    /// The callback is dropped from the list once it can no longer be upgraded.
    pub fn add_resize_callback(&mut self, callback: Weak<dyn ResizeCallback>) {
        if let Some(strong) = callback.upgrade() {
            strong.resize_entities(self.entities.capacity());
        }
        self.resize_callbacks.push(callback);
    }

    /// Attaches `callback` to the storage of `component`.
    ///
    /// It is notified after all callbacks registered earlier on the same storage.
    pub fn add_update_callback<C: UpdateCallback>(
        &mut self,
        component: impl Into<ComponentId>,
        mut callback: C,
    ) -> CallbackHandle<C> {
        callback.resize_entities(self.entities.capacity());

        let id = self.callbacks.len();
        self.callbacks.push(Box::new(callback));
        self.storages[component.into().0].add_update_callback(Observer::Callback(id));
        CallbackHandle::new(id)
    }

    /// Borrows a callback owned by this context.
    pub fn callback<C: UpdateCallback>(&self, handle: CallbackHandle<C>) -> &C {
        self.callbacks[handle.id]
            .as_any()
            .downcast_ref()
            .expect("callback handle does not match the callback type")
    }

    /// Mutably borrows a callback owned by this context.
    pub fn callback_mut<C: UpdateCallback>(&mut self, handle: CallbackHandle<C>) -> &mut C {
        self.callbacks[handle.id]
            .as_any_mut()
            .downcast_mut()
            .expect("callback handle does not match the callback type")
    }

    pub(crate) fn token(&self) -> &ContextToken { &self.token }

    pub(crate) fn ensure_alive(&self, entity: EntityId) -> Result<()> {
        if self.entities.is_alive(entity) {
            Ok(())
        } else {
            Err(Error::DeadEntity { entity })
        }
    }

    pub(crate) fn component_not_found(&self, component: ComponentId, entity: EntityId) -> Error {
        Error::ComponentNotFound { entity, component: self.storages[component.0].name().to_owned() }
    }

    /// Attaches a zeroed record of `component` to `entity` if absent,
    /// notifying callbacks before and after the entity map changes.
    pub(crate) fn attach(&mut self, component: ComponentId, entity: EntityId) -> bool {
        if self.storages[component.0].has(entity.index()) {
            return false;
        }

        self.dispatch(component, entity, true, true);
        self.storages[component.0].allocate(entity.index());
        self.dispatch(component, entity, true, false);
        true
    }

    /// Detaches the record of `component` from `entity` if present,
    /// notifying callbacks before and after the compaction.
    pub(crate) fn detach(&mut self, component: ComponentId, entity: EntityId) -> bool {
        if !self.storages[component.0].has(entity.index()) {
            return false;
        }

        self.dispatch(component, entity, false, true);
        self.storages[component.0].release(entity.index());
        self.dispatch(component, entity, false, false);
        true
    }

    fn dispatch(&mut self, component: ComponentId, entity: EntityId, added: bool, before: bool) {
        let alive = self.entities.is_alive(entity);
        let storage = &self.storages[component.0];
        for &observer in storage.update_callbacks() {
            match observer {
                Observer::Callback(id) => {
                    let callback = &mut self.callbacks[id];
                    if before {
                        callback.before_change(storage, entity, added);
                    } else {
                        callback.after_change(storage, entity, added);
                    }
                }
                Observer::Group(id) => {
                    if !before {
                        let (_, group) =
                            self.groups.get_index(id).expect("group observers are never removed");
                        group.update(&self.storages, entity, added, alive);
                    }
                }
            }
        }
    }

    fn resize_entities(&mut self, len: usize) {
        log::debug!("Resizing entity-indexed arrays to {len}");

        for storage in &mut self.storages {
            storage.resize_entities(len);
        }
        for group in self.groups.values() {
            group.resize_entities(len);
        }
        for callback in &mut self.callbacks {
            callback.resize_entities(len);
        }
        self.resize_callbacks.retain(|callback| match callback.upgrade() {
            Some(callback) => {
                callback.resize_entities(len);
                true
            }
            None => false,
        });
    }
}
