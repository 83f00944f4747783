//! Errors raised by the store.
//!
//! All variants describe misuse by the caller.
//! None of them are transient, so nothing in this crate retries.

use crate::entity::EntityId;

/// The error type for all fallible operations in this crate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A field or component was read on an entity that does not hold the component.
    #[error("entity {entity} does not have component `{component}`")]
    ComponentNotFound {
        /// The entity that was accessed.
        entity:    EntityId,
        /// The name of the missing component.
        component: String,
    },

    /// An operation was attempted through a stale entity id.
    #[error("entity {entity} is not alive")]
    DeadEntity {
        /// The stale id.
        entity: EntityId,
    },

    /// A collector was asked to watch the same event source twice.
    #[error("collector already watches {what}")]
    DuplicateWatch {
        /// A description of the duplicated watch.
        what: String,
    },

    /// A collector was asked to watch a group or field owned by another context.
    #[error("cannot watch an event source that belongs to another context")]
    CrossContextWatch,

    /// A primary key is already owned by another entity.
    #[error("key {key} of `{field}` is owned by entity {owner}, cannot assign it to {entity}")]
    PrimaryKeyConflict {
        /// The name of the primary key field.
        field:  String,
        /// The debug representation of the key.
        key:    String,
        /// The entity currently owning the key.
        owner:  EntityId,
        /// The entity that attempted to take the key.
        entity: EntityId,
    },

    /// No entity owns the requested primary key.
    #[error("no entity has key {key} of `{field}`")]
    KeyNotFound {
        /// The name of the primary key field.
        field: String,
        /// The debug representation of the key.
        key:   String,
    },

    /// A group filter cannot be satisfied or maintained.
    #[error("invalid group filter: {reason}")]
    InvalidFilter {
        /// Why the filter was rejected.
        reason: String,
    },
}

/// Shorthand for results with [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
