//! A packed-record entity-component store with live filtered groups.
//!
//! # Entities
//! An entity is an [`EntityId`]: a slot index paired with a generation.
//! Removed slots are recycled only after enough other slots have been freed
//! (the reuse barrier in [`Config`]),
//! and each reuse bumps the generation,
//! so a stale id never aliases the entity that later occupies its slot.
//!
//! # Components are byte records
//! Components and their fields are declared up front in a [`Schema`].
//! Each component is stored in one [`ComponentStorage`](storage::ComponentStorage):
//! a densely packed buffer of fixed-size records,
//! each starting with a back-pointer to its owning entity.
//! Removing a component moves the last record into the vacated slot,
//! so the buffer never has holes.
//! Fields are plain-data ([`bytemuck::Pod`]) values at a fixed offset within the record,
//! read and written through typed [`Field`] handles.
//!
//! Some fields do more than store bytes:
//! - [`ReactiveField`]s notify observers when their value actually changes.
//! - [`PrimaryKey`]s enforce that no two entities share a value and support reverse lookup.
//! - [`IndexField`]s keep the set of entities holding each value.
//! - [`RefField`]s hold arbitrary owned values outside the record.
//!
//! [`Relation`]s link entities to each other in a many-to-many fashion.
//!
//! # Groups
//! A [`Group`] is the live set of entities matching a [`GroupFilter`]
//! of included and excluded components.
//! It is updated synchronously on every component change.
//! Iterating a group locks it:
//! changes caused by the loop body are queued and applied when the iterator is dropped,
//! so the loop sees a stable snapshot.
//!
//! A [`Collector`] accumulates the entities entering or leaving groups,
//! or whose reactive fields changed, until it is cleared.

#![cfg_attr(not(debug_assertions), deny(missing_docs))]
#![cfg_attr(doc, warn(missing_docs))]

pub mod callback;
pub use callback::{CallbackHandle, ResizeCallback, Subscription, UpdateCallback};

mod collector;
pub use collector::Collector;

mod context;
pub use context::{Config, Context};

pub mod entity;
pub use entity::EntityId;

mod error;
pub use error::{Error, Result};

pub mod field;
pub use field::{
    Component, Field, FieldInfo, IndexField, PrimaryKey, ReactiveField, RefField, ValueObserver,
};

pub mod group;
pub use group::{Group, GroupFilter, GroupObserver};

pub mod relation;
pub use relation::Relation;

pub mod schema;
pub use schema::{ComponentId, Schema};

pub mod set;

pub mod storage;

#[cfg(any(test, feature = "internal-bench"))]
pub mod test_util;
