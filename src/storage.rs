//! Packed byte-record storage for the fields of one component.
//!
//! Each entity holding the component owns one fixed-size record:
//! a 4-byte back-pointer (the owning entity index) followed by the packed field bytes.
//! Records are kept contiguous in a single buffer.
//! Removing a record moves the last record into the vacated slot,
//! and the back-pointer of the moved record is used to fix up its owner's mapping.
//!
//! Record slot 0 is reserved and always zeroed,
//! so a mapped offset of 0 means the entity does not hold the component.
//!
//! Offsets into the buffer are invalidated by any removal or growth;
//! callers must look them up again after mutating the storage.

use std::mem;

use bytemuck::Pod;

use crate::callback::Observer;
use crate::schema::{ComponentDef, ComponentId};


/// The number of bytes preceding the fields of every record.
pub const BACK_POINTER_SIZE: usize = mem::size_of::<u32>();

/// Stores the records of one component for all entities.
#[derive(Debug)]
pub struct ComponentStorage {
    id:          ComponentId,
    def:         ComponentDef,
    record_size: usize,
    /// Entity index to the byte offset of its record, or 0 if absent.
    entities:    Vec<usize>,
    records:     Vec<u8>,
    /// The number of live records, excluding the reserved slot.
    len:         usize,
    callbacks:   Vec<Observer>,
}

impl ComponentStorage {
    /// Creates a storage for the component described by `def`.
    ///
    /// `records_capacity` counts the reserved slot,
    /// so at least 2 slots are allocated up front.
    pub fn new(
        id: ComponentId,
        def: ComponentDef,
        entities_capacity: usize,
        records_capacity: usize,
    ) -> Self {
        let record_size = def.record_size();
        Self {
            id,
            def,
            record_size,
            entities: vec![0; entities_capacity],
            records: vec![0; records_capacity.max(2) * record_size],
            len: 0,
            callbacks: Vec::new(),
        }
    }

    /// The component stored here.
    pub fn id(&self) -> ComponentId { self.id }

    /// The layout of the component.
    pub fn def(&self) -> &ComponentDef { &self.def }

    /// The name of the component.
    pub fn name(&self) -> &str { self.def.name() }

    /// The size of one record, including the back-pointer.
    pub fn record_size(&self) -> usize { self.record_size }

    /// The number of entities holding the component.
    pub fn len(&self) -> usize { self.len }

    /// Whether no entity holds the component.
    pub fn is_empty(&self) -> bool { self.len == 0 }

    /// The number of record slots allocated, including the reserved slot.
    pub fn records_capacity(&self) -> usize { self.records.len() / self.record_size }

    /// Whether the entity at `index` holds the component.
    pub fn has(&self, index: u32) -> bool { self.record_offset(index).is_some() }

    /// The byte offset of the record of the entity at `index`.
    pub fn record_offset(&self, index: u32) -> Option<usize> {
        match self.entities.get(index as usize) {
            Some(&0) | None => None,
            Some(&offset) => Some(offset),
        }
    }

    /// Iterates over the entity indices holding the component, in record order.
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        (1..=self.len).map(move |slot| self.back_pointer(slot * self.record_size))
    }

    /// Reads the field at `offset` of the entity at `index`.
    pub fn read<T: Pod>(&self, index: u32, offset: usize) -> Option<T> {
        self.bytes(index, offset, mem::size_of::<T>()).map(bytemuck::pod_read_unaligned)
    }

    /// Returns the bytes of the field at `offset` of the entity at `index`.
    pub fn bytes(&self, index: u32, offset: usize, size: usize) -> Option<&[u8]> {
        debug_assert!(offset >= BACK_POINTER_SIZE && offset + size <= self.record_size);
        let start = self.record_offset(index)? + offset;
        Some(&self.records[start..start + size])
    }

    /// Returns the mutable bytes of the field at `offset` of the entity at `index`.
    pub fn bytes_mut(&mut self, index: u32, offset: usize, size: usize) -> Option<&mut [u8]> {
        debug_assert!(offset >= BACK_POINTER_SIZE && offset + size <= self.record_size);
        let start = self.record_offset(index)? + offset;
        Some(&mut self.records[start..start + size])
    }

    /// Overwrites the field at `offset` of the entity at `index`.
    ///
    /// Returns false without writing if the entity does not hold the component.
    pub fn write<T: Pod>(&mut self, index: u32, offset: usize, value: T) -> bool {
        match self.bytes_mut(index, offset, mem::size_of::<T>()) {
            Some(bytes) => {
                bytes.copy_from_slice(bytemuck::bytes_of(&value));
                true
            }
            None => false,
        }
    }

    /// Mutates the field at `offset` of the entity at `index` in place.
    ///
    /// Fields are packed without alignment padding,
    /// so the value is copied out, passed to `f` and copied back.
    pub fn update<T: Pod, R>(
        &mut self,
        index: u32,
        offset: usize,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let bytes = self.bytes_mut(index, offset, mem::size_of::<T>())?;
        let mut value: T = bytemuck::pod_read_unaligned(bytes);
        let ret = f(&mut value);
        bytes.copy_from_slice(bytemuck::bytes_of(&value));
        Some(ret)
    }

    /// Attaches a zeroed record to the entity at `index`.
    ///
    /// Returns false if the entity already holds the component.
    /// The record is appended after the last live record,
    /// doubling the buffer if it is full.
    pub fn allocate(&mut self, index: u32) -> bool {
        if self.has(index) {
            return false;
        }

        let slot = self.len + 1;
        let capacity = self.records_capacity();
        if slot == capacity {
            log::debug!(
                "Growing records of {} from {capacity} to {} slots",
                self.def.name(),
                capacity * 2
            );
            self.records.resize(capacity * 2 * self.record_size, 0);
        }

        let offset = slot * self.record_size;
        self.records[offset..offset + BACK_POINTER_SIZE].copy_from_slice(&index.to_ne_bytes());

        self.resize_entities(index as usize + 1);
        self.entities[index as usize] = offset;
        self.len += 1;
        true
    }

    /// Detaches the record of the entity at `index`.
    ///
    /// Returns false if the entity does not hold the component.
    /// The last record is moved into the vacated slot and the tail is zeroed.
    pub fn release(&mut self, index: u32) -> bool {
        let Some(offset) = self.record_offset(index) else { return false };

        let last = self.len * self.record_size;
        if offset != last {
            self.records.copy_within(last..last + self.record_size, offset);
            let moved = self.back_pointer(offset);
            self.entities[moved as usize] = offset;
        }
        self.records[last..last + self.record_size].fill(0);

        self.entities[index as usize] = 0;
        self.len -= 1;
        true
    }

    /// Attaches the component if absent and writes the field at `offset`,
    /// bypassing update callbacks.
    #[cfg(test)]
    pub(crate) fn set<T: Pod>(&mut self, index: u32, offset: usize, value: T) -> bool {
        let added = self.allocate(index);
        self.write(index, offset, value);
        added
    }

    /// Grows the entity map to address at least `len` entities.
    pub fn resize_entities(&mut self, len: usize) {
        if self.entities.len() < len {
            self.entities.resize(len, 0);
        }
    }

    /// Registers an observer to be notified on every change of component presence.
    pub(crate) fn add_update_callback(&mut self, observer: Observer) {
        self.callbacks.push(observer);
    }

    /// The observers in registration order.
    pub(crate) fn update_callbacks(&self) -> &[Observer] { &self.callbacks }

    fn back_pointer(&self, offset: usize) -> u32 {
        bytemuck::pod_read_unaligned(&self.records[offset..offset + BACK_POINTER_SIZE])
    }
}
