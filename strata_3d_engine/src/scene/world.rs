/// The ECS world backing a scene.
///
/// Entities are generational slotmap keys; each component type lives in
/// its own secondary column. Stale keys never alias a recycled entity.

use slotmap::{new_key_type, SecondaryMap, SlotMap};
use crate::error::SceneError;
use super::components::{
    SceneDirectionalLight, SceneMeshRenderer, SceneName, ScenePointLight, SceneRenderId,
    SceneShape, SceneText3D, SceneTransform, SceneVisibility,
};

new_key_type! {
    /// Stable generational entity id.
    ///
    /// The default value is the null entity; it never refers to anything.
    pub struct EntityId;
}

/// Default entity limit per world
pub const DEFAULT_ENTITY_LIMIT: usize = 4096;

/// Entity storage plus one column per component type.
pub struct SceneWorld {
    entities: SlotMap<EntityId, ()>,
    limit: usize,
    pub(crate) names: SecondaryMap<EntityId, SceneName>,
    pub(crate) transforms: SecondaryMap<EntityId, SceneTransform>,
    pub(crate) mesh_renderers: SecondaryMap<EntityId, SceneMeshRenderer>,
    pub(crate) shapes: SecondaryMap<EntityId, SceneShape>,
    pub(crate) visibilities: SecondaryMap<EntityId, SceneVisibility>,
    pub(crate) render_ids: SecondaryMap<EntityId, SceneRenderId>,
    pub(crate) texts: SecondaryMap<EntityId, SceneText3D>,
    pub(crate) point_lights: SecondaryMap<EntityId, ScenePointLight>,
    pub(crate) directional_lights: SecondaryMap<EntityId, SceneDirectionalLight>,
}

impl SceneWorld {
    /// Create a world bounded at `limit` live entities
    pub fn new(limit: usize) -> Self {
        Self {
            entities: SlotMap::with_key(),
            limit,
            names: SecondaryMap::new(),
            transforms: SecondaryMap::new(),
            mesh_renderers: SecondaryMap::new(),
            shapes: SecondaryMap::new(),
            visibilities: SecondaryMap::new(),
            render_ids: SecondaryMap::new(),
            texts: SecondaryMap::new(),
            point_lights: SecondaryMap::new(),
            directional_lights: SecondaryMap::new(),
        }
    }

    /// Allocate an entity
    pub fn spawn(&mut self) -> Result<EntityId, SceneError> {
        if self.entities.len() >= self.limit {
            return Err(SceneError::EntityLimitReached);
        }
        Ok(self.entities.insert(()))
    }

    /// Release an entity and all its components; false on stale id
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if self.entities.remove(entity).is_none() {
            return false;
        }
        self.names.remove(entity);
        self.transforms.remove(entity);
        self.mesh_renderers.remove(entity);
        self.shapes.remove(entity);
        self.visibilities.remove(entity);
        self.render_ids.remove(entity);
        self.texts.remove(entity);
        self.point_lights.remove(entity);
        self.directional_lights.remove(entity);
        true
    }

    /// Whether the id refers to a live entity
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Upper bound on the directory size; bounds ancestor walks
    pub fn capacity(&self) -> usize {
        self.entities.capacity().max(1)
    }

    /// Configured entity limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Iterate live entity ids
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys()
    }

    /// Remove every entity and component
    pub fn clear(&mut self) {
        self.entities.clear();
        self.names.clear();
        self.transforms.clear();
        self.mesh_renderers.clear();
        self.shapes.clear();
        self.visibilities.clear();
        self.render_ids.clear();
        self.texts.clear();
        self.point_lights.clear();
        self.directional_lights.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
