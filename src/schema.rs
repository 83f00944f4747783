//! Explicit registration of components and their fields.
//!
//! A [`Schema`] is assembled once, before any entity exists,
//! and consumed by [`Context::new`](crate::Context::new).
//! Each declaration returns a typed handle that is later passed to the context to access data.
//! Handles are only meaningful for the context built from the schema that issued them.
//!
//! ```
//! use dynrec::{Context, Schema};
//!
//! let mut schema = Schema::builder();
//! let mut position = schema.component("Position");
//! let xy = position.field::<[f32; 2]>("xy");
//! let position = position.handle();
//!
//! let mut ctx = Context::new(schema.build());
//! let entity = ctx.create_entity();
//! xy.set(&mut ctx, entity, [1.0, 2.0]).unwrap();
//! assert!(position.has(&ctx, entity).unwrap());
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::mem;

use bytemuck::Pod;

use crate::callback::{AnyCallback, CallbackFactory, CallbackHandle, UpdateCallback};
use crate::field::{
    Component, Field, FieldInfo, IndexField, PrimaryIndex, PrimaryKey, ReactiveField, RefField,
    RefValues, ValueIndex, ValueObservers,
};
use crate::relation::{Links, Relation};
use crate::storage::BACK_POINTER_SIZE;

#[cfg(test)]
mod tests;

/// Identifies a component within its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub(crate) usize);

impl ComponentId {
    /// The registration order of the component.
    pub fn index(self) -> usize { self.0 }
}

/// Describes one field of a component record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// The declared name.
    pub name:   String,
    /// The byte offset within the record, after the back-pointer.
    pub offset: usize,
    /// The number of bytes the field occupies in the record.
    pub size:   usize,
}

/// Describes the record layout of a component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDef {
    name:        String,
    fields:      Vec<FieldDef>,
    record_size: usize,
}

impl ComponentDef {
    fn new(name: String) -> Self {
        Self { name, fields: Vec::new(), record_size: BACK_POINTER_SIZE }
    }

    /// The declared name of the component.
    pub fn name(&self) -> &str { &self.name }

    /// The fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] { &self.fields }

    /// Finds a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The size of one record, including the back-pointer.
    pub fn record_size(&self) -> usize { self.record_size }

    /// Whether the component carries no data besides its presence.
    pub fn is_tag(&self) -> bool { self.record_size == BACK_POINTER_SIZE }
}

pub(crate) struct CallbackDef {
    pub(crate) component: ComponentId,
    /// Whether the callback is attached to the storage of `component`.
    pub(crate) observes:  bool,
    pub(crate) build:     CallbackFactory,
}

/// A finished schema, ready to be turned into a [`Context`](crate::Context).
pub struct Schema {
    pub(crate) components: Vec<ComponentDef>,
    pub(crate) callbacks:  Vec<CallbackDef>,
}

impl Schema {
    /// Starts declaring a new schema.
    pub fn builder() -> SchemaBuilder { SchemaBuilder::default() }

    /// The registered components in registration order.
    pub fn components(&self) -> &[ComponentDef] { &self.components }
}

/// Declares components, fields and callbacks.
#[derive(Default)]
pub struct SchemaBuilder {
    components: Vec<ComponentDef>,
    callbacks:  Vec<CallbackDef>,
}

impl SchemaBuilder {
    /// Declares a new component.
    ///
    /// Fields are declared on the returned builder in record order.
    pub fn component(&mut self, name: impl Into<String>) -> ComponentBuilder<'_> {
        let id = ComponentId(self.components.len());
        self.components.push(ComponentDef::new(name.into()));
        ComponentBuilder { schema: self, id }
    }

    /// Declares a relation kind.
    ///
    /// The relation is backed by a tag component with the same name,
    /// which is attached to both ends of every link.
    pub fn relation(&mut self, name: impl Into<String>) -> Relation {
        let component = self.component(name).handle();
        let links = self.add_callback(component.id(), Links::new);
        Relation::new(component, links)
    }

    /// Attaches a custom [`UpdateCallback`] to the storage of `component`.
    ///
    /// `factory` receives the initial length of entity-indexed arrays
    /// when the context is created.
    pub fn add_callback<C: UpdateCallback>(
        &mut self,
        component: ComponentId,
        factory: impl FnOnce(usize) -> C + 'static,
    ) -> CallbackHandle<C> {
        self.push_callback(component, true, factory)
    }

    fn push_callback<C: UpdateCallback>(
        &mut self,
        component: ComponentId,
        observes: bool,
        factory: impl FnOnce(usize) -> C + 'static,
    ) -> CallbackHandle<C> {
        let id = self.callbacks.len();
        let build: CallbackFactory =
            Box::new(move |len| Box::new(factory(len)) as Box<dyn AnyCallback>);
        self.callbacks.push(CallbackDef { component, observes, build });
        CallbackHandle::new(id)
    }

    /// Finishes the schema.
    pub fn build(self) -> Schema {
        Schema { components: self.components, callbacks: self.callbacks }
    }
}

/// Declares the fields of one component.
pub struct ComponentBuilder<'s> {
    schema: &'s mut SchemaBuilder,
    id:     ComponentId,
}

impl ComponentBuilder<'_> {
    /// The handle of the component being declared.
    pub fn handle(&self) -> Component { Component::new(self.id) }

    fn push_field(&mut self, name: String, size: usize) -> FieldInfo {
        let def = &mut self.schema.components[self.id.0];
        let info = FieldInfo {
            component: self.id,
            index: def.fields.len(),
            offset: def.record_size,
            size,
        };
        def.fields.push(FieldDef { name, offset: info.offset, size });
        def.record_size += size;
        info
    }

    /// Declares a plain-data field.
    pub fn field<T: Pod>(&mut self, name: impl Into<String>) -> Field<T> {
        Field::new(self.push_field(name.into(), mem::size_of::<T>()))
    }

    /// Declares a field whose effective changes can be observed.
    pub fn reactive_field<T: Pod + PartialEq>(
        &mut self,
        name: impl Into<String>,
    ) -> ReactiveField<T> {
        let field = self.field::<T>(name);
        let observers = self.schema.push_callback(self.id, false, |_| ValueObservers::<T>::new());
        ReactiveField::new(field, observers)
    }

    /// Declares a field whose values are unique among all entities.
    pub fn primary_key<K: Pod + Eq + Hash + Debug>(
        &mut self,
        name: impl Into<String>,
    ) -> PrimaryKey<K> {
        let field = self.field::<K>(name);
        let index = self.schema.push_callback(self.id, true, |_| PrimaryIndex::<K>::new());
        PrimaryKey::new(field, index)
    }

    /// Declares a field indexed by value.
    pub fn index_field<V: Pod + Eq + Hash>(&mut self, name: impl Into<String>) -> IndexField<V> {
        let field = self.field::<V>(name);
        let index = self.schema.push_callback(self.id, true, ValueIndex::<V>::new);
        IndexField::new(field, index)
    }

    /// Declares a field holding an arbitrary owned value outside the record.
    ///
    /// The field occupies no bytes in the record.
    pub fn ref_field<T: 'static>(&mut self, name: impl Into<String>) -> RefField<T> {
        let info = self.push_field(name.into(), 0);
        let values = self.schema.push_callback(self.id, true, RefValues::<T>::new);
        RefField::new(info, values)
    }
}
