/// Generational handles and the bounded slot table backing them.
///
/// Every externally visible reference in the engine is a pair
/// `{id, generation}` where `id == 0` is the reserved invalid handle and
/// `id - 1` is the slot index. A handle is valid iff its slot is occupied
/// and the slot's stored generation equals the handle's generation.
/// Freeing a slot increments its generation, so stale handles become
/// detectable instead of aliasing a recycled slot.

/// Untyped generational handle.
///
/// Typed wrappers are produced with [`define_handles!`](crate::define_handles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle {
    /// Slot index + 1; zero is reserved for the invalid handle
    pub id: u32,
    /// Generation the slot had when the handle was issued
    pub generation: u32,
}

impl RawHandle {
    /// The reserved invalid handle
    pub const INVALID: RawHandle = RawHandle { id: 0, generation: 0 };

    /// Whether this handle refers to any slot at all
    pub fn is_valid(self) -> bool {
        self.id != 0
    }

    /// Slot index encoded in this handle (`id - 1`), or None for invalid
    pub fn slot_index(self) -> Option<usize> {
        if self.id == 0 {
            None
        } else {
            Some(self.id as usize - 1)
        }
    }
}

impl Default for RawHandle {
    fn default() -> Self {
        RawHandle::INVALID
    }
}

/// Define typed newtype wrappers around [`RawHandle`].
#[macro_export]
macro_rules! define_handles {
    ($($(#[$doc:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub $crate::utils::RawHandle);

            impl $name {
                /// The reserved invalid handle
                pub const INVALID: $name = $name($crate::utils::RawHandle::INVALID);

                /// Whether this handle refers to any slot at all
                pub fn is_valid(self) -> bool {
                    self.0.is_valid()
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::INVALID
                }
            }
        )+
    };
}

// ===== SLOT TABLE =====

enum SlotPayload<T> {
    /// Slot is not in use
    Free,
    /// Slot holds a live value
    Occupied(T),
    /// Slot is live but its value is temporarily lent out (callback dispatch)
    Borrowed,
}

struct TableSlot<T> {
    generation: u32,
    payload: SlotPayload<T>,
}

/// Bounded table of generational slots.
///
/// Backs every handle registry in the engine (layers, behaviors).
/// The table never grows past the bound given at construction; a full
/// table reports no-slot instead of reallocating, which keeps issued
/// slot indices stable for the registry's whole lifetime.
pub struct HandleTable<T> {
    slots: Vec<TableSlot<T>>,
    max_slots: usize,
    len: usize,
}

impl<T> HandleTable<T> {
    /// Create a table bounded at `max_slots` entries
    pub fn with_capacity(max_slots: usize) -> Self {
        Self {
            slots: Vec::new(),
            max_slots,
            len: 0,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no entries are live
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bound given at construction
    pub fn max_slots(&self) -> usize {
        self.max_slots
    }

    /// Number of slots ever touched (live or freed)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Insert a value, returning its handle, or None when the table is full
    pub fn insert(&mut self, value: T) -> Option<RawHandle> {
        // Reuse the first free slot before touching a fresh one
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if matches!(slot.payload, SlotPayload::Free) {
                slot.payload = SlotPayload::Occupied(value);
                self.len += 1;
                return Some(RawHandle {
                    id: index as u32 + 1,
                    generation: slot.generation,
                });
            }
        }
        if self.slots.len() >= self.max_slots {
            return None;
        }
        let index = self.slots.len();
        self.slots.push(TableSlot {
            generation: 0,
            payload: SlotPayload::Occupied(value),
        });
        self.len += 1;
        Some(RawHandle {
            id: index as u32 + 1,
            generation: 0,
        })
    }

    fn slot_for(&self, handle: RawHandle) -> Option<usize> {
        let index = handle.slot_index()?;
        let slot = self.slots.get(index)?;
        if slot.generation != handle.generation {
            return None;
        }
        match slot.payload {
            SlotPayload::Free => None,
            _ => Some(index),
        }
    }

    /// Whether the handle refers to a live entry
    pub fn contains(&self, handle: RawHandle) -> bool {
        self.slot_for(handle).is_some()
    }

    /// Get a live entry by handle
    pub fn get(&self, handle: RawHandle) -> Option<&T> {
        let index = self.slot_for(handle)?;
        match &self.slots[index].payload {
            SlotPayload::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Get a live entry mutably by handle
    pub fn get_mut(&mut self, handle: RawHandle) -> Option<&mut T> {
        let index = self.slot_for(handle)?;
        match &mut self.slots[index].payload {
            SlotPayload::Occupied(value) => Some(value),
            _ => None,
        }
    }

    /// Get a live entry mutably by slot index
    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut T> {
        match self.slots.get_mut(index).map(|s| &mut s.payload) {
            Some(SlotPayload::Occupied(value)) => Some(value),
            _ => None,
        }
    }

    /// Handle of the entry at `index`, if the slot is live
    pub fn handle_at(&self, index: usize) -> Option<RawHandle> {
        let slot = self.slots.get(index)?;
        match slot.payload {
            SlotPayload::Free => None,
            _ => Some(RawHandle {
                id: index as u32 + 1,
                generation: slot.generation,
            }),
        }
    }

    /// Remove a live entry, bumping the slot generation
    pub fn remove(&mut self, handle: RawHandle) -> Option<T> {
        let index = self.slot_for(handle)?;
        let slot = &mut self.slots[index];
        match std::mem::replace(&mut slot.payload, SlotPayload::Free) {
            SlotPayload::Occupied(value) => {
                slot.generation += 1;
                self.len -= 1;
                Some(value)
            }
            other => {
                // Borrowed entries cannot be removed out from under a dispatch
                slot.payload = other;
                None
            }
        }
    }

    /// Lend out the entry at `index` for a callback dispatch.
    ///
    /// The slot stays live (its handle remains valid for lookups of the
    /// handle itself) but holds no value until [`put_back`](Self::put_back)
    /// or [`release_taken`](Self::release_taken).
    pub fn take_at(&mut self, index: usize) -> Option<T> {
        let slot = self.slots.get_mut(index)?;
        match std::mem::replace(&mut slot.payload, SlotPayload::Borrowed) {
            SlotPayload::Occupied(value) => Some(value),
            other => {
                slot.payload = other;
                None
            }
        }
    }

    /// Return a lent-out entry to its slot
    pub fn put_back(&mut self, index: usize, value: T) {
        if let Some(slot) = self.slots.get_mut(index) {
            if matches!(slot.payload, SlotPayload::Borrowed) {
                slot.payload = SlotPayload::Occupied(value);
            }
        }
    }

    /// Free a lent-out slot without returning the value, bumping the generation
    pub fn release_taken(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            if matches!(slot.payload, SlotPayload::Borrowed) {
                slot.payload = SlotPayload::Free;
                slot.generation += 1;
                self.len -= 1;
            }
        }
    }

    /// Generation currently stored in `index`'s slot
    pub fn generation_at(&self, index: usize) -> Option<u32> {
        self.slots.get(index).map(|s| s.generation)
    }

    /// Iterate live entries as `(handle, &value)`
    pub fn iter(&self) -> impl Iterator<Item = (RawHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            match &slot.payload {
                SlotPayload::Occupied(value) => Some((
                    RawHandle {
                        id: index as u32 + 1,
                        generation: slot.generation,
                    },
                    value,
                )),
                _ => None,
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
