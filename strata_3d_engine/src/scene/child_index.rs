/// Parent → children index.
///
/// A rebuildable cache accelerating hierarchy traversal (topo-order BFS).
/// Slots are keyed by the generational parent id and carry a copy of it as
/// a guard: a slot is only consulted when `slot.parent == parent`, so a
/// slot left over from a recycled directory entry self-detects and resets.
/// When the index has been invalidated, callers fall back to a full
/// transform scan (logged once per rebuild cycle).

use slotmap::SecondaryMap;
use crate::engine_debug;
use super::world::{EntityId, SceneWorld};

const SOURCE: &str = "strata3d::SceneChildIndex";

#[derive(Debug, Clone)]
pub(crate) struct ChildSlot {
    parent: EntityId,
    children: Vec<EntityId>,
}

/// Parent → children cache with generational guards.
pub struct ChildIndex {
    slots: SecondaryMap<EntityId, ChildSlot>,
    valid: bool,
}

impl ChildIndex {
    pub fn new() -> Self {
        Self {
            slots: SecondaryMap::new(),
            valid: false,
        }
    }

    /// Whether lookups may use the cache
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Drop the cache; the next rebuild restores it
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    fn slot_for(&mut self, parent: EntityId) -> &mut ChildSlot {
        let stale = self
            .slots
            .get(parent)
            .is_some_and(|slot| slot.parent != parent);
        if stale {
            // Slot left behind by a recycled entity; reset it
            self.slots.remove(parent);
        }
        if self.slots.get(parent).is_none() {
            self.slots.insert(
                parent,
                ChildSlot {
                    parent,
                    children: Vec::new(),
                },
            );
        }
        self.slots.get_mut(parent).unwrap()
    }

    /// Record `child` under `parent`; no-op when already present
    pub fn add(&mut self, parent: EntityId, child: EntityId) {
        let slot = self.slot_for(parent);
        if !slot.children.contains(&child) {
            slot.children.push(child);
        }
    }

    /// Remove `child` from `parent`'s list; no-op on stale entries
    pub fn remove(&mut self, parent: EntityId, child: EntityId) {
        let Some(slot) = self.slots.get_mut(parent) else {
            return;
        };
        if slot.parent != parent {
            return;
        }
        if let Some(position) = slot.children.iter().position(|&c| c == child) {
            slot.children.swap_remove(position);
        }
    }

    /// Reset a parent's slot entirely (entity destruction)
    pub fn clear_parent_slot(&mut self, parent: EntityId) {
        self.slots.remove(parent);
    }

    /// Children recorded under `parent`, empty when absent or stale
    pub fn children_of(&self, parent: EntityId) -> &[EntityId] {
        match self.slots.get(parent) {
            Some(slot) if slot.parent == parent => &slot.children,
            _ => &[],
        }
    }

    /// Rebuild the whole index from the world's transforms, skipping dead
    /// parents, and mark it valid.
    pub fn rebuild(&mut self, world: &SceneWorld) {
        self.slots.clear();
        for (child, transform) in world.transforms.iter() {
            let parent = transform.parent;
            if parent == EntityId::default() || !world.is_alive(parent) {
                continue;
            }
            self.add(parent, child);
        }
        self.valid = true;
        engine_debug!(SOURCE, "rebuilt ({} parents)", self.slots.len());
    }
}

impl Default for ChildIndex {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "child_index_tests.rs"]
mod tests;
