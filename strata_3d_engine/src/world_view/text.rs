/// Bounded pool of 3D text slots owned by the world layer.
///
/// Slots map the world layer's externally visible text ids onto
/// WorldResources text indices. Created and destroyed through
/// WORLD_TEXT_* messages; every active slot is rebound when the text
/// pipeline changes (offscreen toggle).

/// Maximum world-text slots
pub const MAX_TEXTS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct TextSlot {
    active: bool,
    text_index: u32,
}

/// Fixed-size slot pool.
pub struct TextSlotPool {
    slots: [TextSlot; MAX_TEXTS],
}

impl TextSlotPool {
    pub fn new() -> Self {
        Self {
            slots: [TextSlot { active: false, text_index: 0 }; MAX_TEXTS],
        }
    }

    /// Claim a slot for a built text; None when the pool is full
    pub fn allocate(&mut self, text_index: u32) -> Option<u32> {
        for (slot_id, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                *slot = TextSlot { active: true, text_index };
                return Some(slot_id as u32);
            }
        }
        None
    }

    /// Release a slot, returning its text index
    pub fn release(&mut self, slot_id: u32) -> Option<u32> {
        let slot = self.slots.get_mut(slot_id as usize)?;
        if !slot.active {
            return None;
        }
        slot.active = false;
        Some(slot.text_index)
    }

    /// Text index behind an active slot
    pub fn text_index(&self, slot_id: u32) -> Option<u32> {
        let slot = self.slots.get(slot_id as usize)?;
        if slot.active {
            Some(slot.text_index)
        } else {
            None
        }
    }

    /// Number of active slots
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.active).count()
    }

    /// Iterate active slots as `(slot_id, text_index)`
    pub fn active_slots(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.active)
            .map(|(id, s)| (id as u32, s.text_index))
    }

    /// Release every slot, yielding the text indices that were active
    pub fn drain(&mut self) -> Vec<u32> {
        let mut released = Vec::new();
        for slot in self.slots.iter_mut() {
            if slot.active {
                slot.active = false;
                released.push(slot.text_index);
            }
        }
        released
    }
}

impl Default for TextSlotPool {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_lookup() {
        let mut pool = TextSlotPool::new();
        let slot = pool.allocate(42).unwrap();
        assert_eq!(pool.text_index(slot), Some(42));
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn test_pool_is_bounded() {
        let mut pool = TextSlotPool::new();
        for i in 0..MAX_TEXTS {
            assert!(pool.allocate(i as u32).is_some());
        }
        assert!(pool.allocate(99).is_none());
    }

    #[test]
    fn test_release_frees_slot() {
        let mut pool = TextSlotPool::new();
        let slot = pool.allocate(7).unwrap();
        assert_eq!(pool.release(slot), Some(7));
        assert_eq!(pool.text_index(slot), None);
        assert_eq!(pool.release(slot), None);

        // Slot is reusable
        assert_eq!(pool.allocate(8), Some(slot));
    }

    #[test]
    fn test_drain_returns_active_indices() {
        let mut pool = TextSlotPool::new();
        pool.allocate(1);
        let middle = pool.allocate(2).unwrap();
        pool.allocate(3);
        pool.release(middle);

        let mut drained = pool.drain();
        drained.sort_unstable();
        assert_eq!(drained, vec![1, 3]);
        assert_eq!(pool.active_count(), 0);
    }
}
