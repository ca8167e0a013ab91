//! Generation-checked slot arena.
//!
//! Handles carry the owning region's tag plus a generation counter, so a
//! handle from another region, or one whose slot has since been reused,
//! resolves to nothing instead of aliasing a live value.

use crate::region::slab::RegionTag;

/// Handle to a value stored in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId {
    tag: RegionTag,
    index: u32,
    generation: u32,
}

impl SlotId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot table indexed by [`SlotId`].
#[derive(Debug)]
pub struct Arena<T> {
    tag: RegionTag,
    slots: Vec<Slot<T>>,
    vacant: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new(tag: RegionTag) -> Self {
        Self {
            tag,
            slots: Vec::new(),
            vacant: Vec::new(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value, reusing a vacant slot when one exists.
    pub fn insert(&mut self, value: T) -> SlotId {
        self.len += 1;
        if let Some(index) = self.vacant.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return SlotId {
                tag: self.tag,
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        SlotId {
            tag: self.tag,
            index,
            generation: 0,
        }
    }

    /// Take a value out. Stale or foreign handles return `None`.
    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        if !self.is_current(id) {
            return None;
        }
        let slot = &mut self.slots[id.index()];
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.vacant.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        if !self.is_current(id) {
            return None;
        }
        self.slots[id.index()].value.as_ref()
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        if !self.is_current(id) {
            return None;
        }
        self.slots[id.index()].value.as_mut()
    }

    /// True iff `id` was issued by this arena and its slot was not reused.
    pub fn is_current(&self, id: SlotId) -> bool {
        id.tag == self.tag
            && self
                .slots
                .get(id.index())
                .is_some_and(|slot| slot.generation == id.generation)
    }
}
