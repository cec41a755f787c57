/// Scene ↔ renderer bridge.
///
/// Pushes world matrices, visibility, and render ids into the mesh manager
/// (instance path for mesh renderers, mesh-slot path for shapes) and
/// maintains the render-id → entity mapping GPU picking resolves through.
/// Entries are the null entity while the id is unassigned or the entity is
/// hidden.

use crate::renderer::MeshManager;
use super::picking::{decode_picking_id, PickKind};
use super::scene::Scene;
use super::world::EntityId;

/// Render-id → entity mapping plus the sync that fills it.
pub struct SceneRenderBridge {
    render_id_to_entity: Vec<EntityId>,
}

impl SceneRenderBridge {
    /// Create a bridge with room for `initial_capacity` render ids
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            render_id_to_entity: vec![EntityId::default(); initial_capacity],
        }
    }

    fn ensure_capacity(&mut self, next_render_id: u32) {
        let needed = next_render_id as usize + 1;
        if self.render_id_to_entity.len() < needed {
            self.render_id_to_entity.resize(needed, EntityId::default());
        }
    }

    /// Entity mapped to a render id; None for unassigned/hidden entries
    pub fn entity_for_render_id(&self, render_id: u32) -> Option<EntityId> {
        let entity = *self.render_id_to_entity.get(render_id as usize)?;
        if entity == EntityId::default() {
            None
        } else {
            Some(entity)
        }
    }

    /// Resolve a GPU picking object id back to an entity.
    ///
    /// Scene and light picks carry render ids; other kinds (UI text, world
    /// text, gizmos) are not entity-backed.
    pub fn entity_from_picking_id(&self, object_id: u32) -> Option<EntityId> {
        let picked = decode_picking_id(object_id)?;
        match picked.kind {
            PickKind::Scene | PickKind::Light => self.entity_for_render_id(picked.value),
            _ => None,
        }
    }

    /// Mapping size (test/introspection aid)
    pub fn capacity(&self) -> usize {
        self.render_id_to_entity.len()
    }

    /// Route to a full or incremental sync depending on what the scene
    /// accumulated this frame.
    pub fn sync(&mut self, scene: &mut Scene, mesh_manager: &mut dyn MeshManager) {
        if scene.render_full_sync_needed {
            self.full_sync(scene, mesh_manager);
        } else {
            self.incremental_sync(scene, mesh_manager);
        }
    }

    /// Rebuild the whole mapping and re-push every renderable.
    pub fn full_sync(&mut self, scene: &mut Scene, mesh_manager: &mut dyn MeshManager) {
        self.ensure_capacity(scene.next_render_id());
        for entry in self.render_id_to_entity.iter_mut() {
            *entry = EntityId::default();
        }

        // Instance-path renderables: transform ∧ mesh_renderer ∧ render_id
        let mut mapped: Vec<(u32, EntityId)> = Vec::new();
        {
            let world = scene.world();
            for (entity, renderer) in world.mesh_renderers.iter() {
                let Some(transform) = world.transforms.get(entity) else {
                    continue;
                };
                let Some(render_id) = world.render_ids.get(entity) else {
                    continue;
                };
                let visible = scene.is_visible(entity);
                mesh_manager.instance_set_model(renderer.instance, &transform.world);
                mesh_manager.instance_set_visible(renderer.instance, visible);
                mesh_manager.instance_set_render_id(renderer.instance, render_id.id);
                if visible {
                    mapped.push((render_id.id, entity));
                }
            }

            // Point lights: mapping only (picked as lights, not drawn here)
            for (entity, _) in world.point_lights.iter() {
                if !world.transforms.contains_key(entity) {
                    continue;
                }
                let Some(render_id) = world.render_ids.get(entity) else {
                    continue;
                };
                if scene.is_visible(entity) {
                    mapped.push((render_id.id, entity));
                }
            }

            // Shape-path renderables: transform ∧ shape ∧ render_id
            for (entity, shape) in world.shapes.iter() {
                let Some(transform) = world.transforms.get(entity) else {
                    continue;
                };
                let Some(render_id) = world.render_ids.get(entity) else {
                    continue;
                };
                let visible = scene.is_visible(entity);
                mesh_manager.set_model(shape.mesh_index, &transform.world);
                mesh_manager.set_visible(shape.mesh_index, visible);
                mesh_manager.set_render_id(shape.mesh_index, render_id.id);
                if visible {
                    mapped.push((render_id.id, entity));
                }
            }
        }

        for (render_id, entity) in mapped {
            if let Some(entry) = self.render_id_to_entity.get_mut(render_id as usize) {
                *entry = entity;
            }
        }

        scene.render_dirty.clear();
        scene.render_full_sync_needed = false;
    }

    fn incremental_sync(&mut self, scene: &mut Scene, mesh_manager: &mut dyn MeshManager) {
        let dirty = std::mem::take(&mut scene.render_dirty);
        self.ensure_capacity(scene.next_render_id());

        for entity in dirty {
            let world = scene.world();
            if !world.is_alive(entity) {
                continue;
            }
            let Some(render_id) = world.render_ids.get(entity).map(|r| r.id) else {
                continue;
            };
            let Some(transform) = world.transforms.get(entity).copied() else {
                continue;
            };
            let visible = scene.is_visible(entity);

            if let Some(renderer) = world.mesh_renderers.get(entity).copied() {
                mesh_manager.instance_set_model(renderer.instance, &transform.world);
                mesh_manager.instance_set_visible(renderer.instance, visible);
                mesh_manager.instance_set_render_id(renderer.instance, render_id);
            } else if let Some(shape) = world.shapes.get(entity).copied() {
                mesh_manager.set_model(shape.mesh_index, &transform.world);
                mesh_manager.set_visible(shape.mesh_index, visible);
                mesh_manager.set_render_id(shape.mesh_index, render_id);
            } else {
                continue;
            }

            if let Some(entry) = self.render_id_to_entity.get_mut(render_id as usize) {
                *entry = if visible { entity } else { EntityId::default() };
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
