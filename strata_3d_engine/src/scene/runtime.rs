/// Scene runtime — the per-scene ownership boundary.
///
/// Bundles a scene with its render bridge so the whole thing tears down in
/// one step: `destroy` waits for the GPU, releases everything the scene
/// owns (text slots, mesh instances, meshes, materials, geometries), and
/// drops the bundle. The C original backs this with a per-scene arena; in
/// Rust the exclusive ownership of the runtime provides the same bound.

use crate::error::Result;
use crate::engine_info;
use crate::renderer::RenderServices;
use super::bridge::SceneRenderBridge;
use super::scene::Scene;
use super::world::EntityId;

const SOURCE: &str = "strata3d::SceneRuntime";

/// A scene plus its render bridge under one owner.
pub struct SceneRuntime {
    world_id: u32,
    services: RenderServices,
    scene: Scene,
    bridge: SceneRenderBridge,
}

impl SceneRuntime {
    /// Create a runtime with its own scene and bridge
    pub fn create(
        services: RenderServices,
        world_id: u32,
        initial_entities: usize,
        initial_picking_capacity: usize,
    ) -> Result<SceneRuntime> {
        let scene = Scene::new(services.clone(), initial_entities);
        let bridge = SceneRenderBridge::new(initial_picking_capacity);
        engine_info!(SOURCE, "created scene runtime {}", world_id);
        Ok(SceneRuntime {
            world_id,
            services,
            scene,
            bridge,
        })
    }

    /// Identifier given at creation
    pub fn world_id(&self) -> u32 {
        self.world_id
    }

    /// The scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// The scene, mutably
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The render bridge
    pub fn bridge(&self) -> &SceneRenderBridge {
        &self.bridge
    }

    /// Forward to `Scene::update`
    pub fn update(&mut self, dt: f32) {
        self.scene.update(dt);
    }

    /// Push accumulated render changes into the mesh manager
    pub fn sync(&mut self) {
        let mut mesh_manager = self.services.mesh_manager.lock().unwrap();
        self.bridge.sync(&mut self.scene, &mut *mesh_manager);
    }

    /// Force a full re-sync of every renderable
    pub fn full_sync(&mut self) {
        let mut mesh_manager = self.services.mesh_manager.lock().unwrap();
        self.bridge.full_sync(&mut self.scene, &mut *mesh_manager);
    }

    /// `update` then `sync`, the per-frame pair
    pub fn update_and_sync(&mut self, dt: f32) {
        self.update(dt);
        self.sync();
    }

    /// Resolve a GPU picking object id to a live entity
    pub fn entity_from_picking_id(&self, object_id: u32) -> Option<EntityId> {
        let entity = self.bridge.entity_from_picking_id(object_id)?;
        if self.scene.world().is_alive(entity) {
            Some(entity)
        } else {
            None
        }
    }

    /// Tear the runtime down: wait for the GPU, release scene-owned
    /// resources in order, then drop everything at once.
    pub fn destroy(mut self) {
        self.services.renderer.lock().unwrap().wait_idle();
        self.scene.shutdown();
        engine_info!(SOURCE, "destroyed scene runtime {}", self.world_id);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
