//! Entity identities.
//!
//! An entity is only a handle: it owns no data by itself.
//! The data attached to it lives in the [component storages](crate::storage).

use std::fmt;

pub mod alloc;
pub use alloc::Allocator;


/// Identifies an entity by a slot index and the generation of that slot.
///
/// The index is used directly as a subscript into every entity-indexed array,
/// while the generation distinguishes successive occupants of the same slot.
/// A generation of 0 never identifies a live entity.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

static_assertions::assert_eq_size!(EntityId, u64);

impl EntityId {
    /// Constructs an id from its parts.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | index as u64)
    }

    /// The slot index of this entity.
    pub const fn index(self) -> u32 { self.0 as u32 }

    /// The slot index as an array subscript.
    pub const fn usize(self) -> usize { self.index() as usize }

    /// The generation of this entity.
    pub const fn generation(self) -> u32 { (self.0 >> 32) as u32 }

    /// Returns the packed 64-bit representation.
    pub const fn to_bits(self) -> u64 { self.0 }

    /// Restores an id from [`to_bits`](Self::to_bits).
    pub const fn from_bits(bits: u64) -> Self { Self(bits) }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}
