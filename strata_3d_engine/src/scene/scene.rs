/// Scene — an ECS world with a maintained transform hierarchy.
///
/// Per frame, `update` runs the two-pass transform refresh: pass 1 scans
/// transforms contiguously and rebuilds dirty local matrices; pass 2 walks
/// the BFS topological order, propagates parent updates to children by the
/// deferred-dirty rule, and collects renderable entities whose world
/// matrices changed. The bridge consumes the render-dirty list on sync.
///
/// The scene owns the meshes, mesh instances, geometries, materials, and
/// 3D-text slots it created; `shutdown` releases all of them.

use std::collections::VecDeque;
use glam::{Mat4, Quat, Vec3, Vec4};
use rustc_hash::FxHashSet;
use crate::error::{Result, SceneError};
use crate::{engine_error, engine_warn};
use crate::renderer::{
    GeometryHandle, MaterialHandle, MeshCreateDesc, MeshInstanceHandle, RenderServices,
    Text3dConfig,
};
use super::child_index::ChildIndex;
use super::components::{
    SceneDirectionalLight, SceneMeshRenderer, SceneName, ScenePointLight, SceneRenderId,
    SceneShape, SceneText3D, SceneTransform, SceneVisibility, ShapeKind, TransformFlags,
};
use super::world::{EntityId, SceneWorld};

const SOURCE: &str = "strata3d::Scene";

/// Render-dirty entries kept per frame before forcing a full sync
pub const RENDER_DIRTY_CAPACITY: usize = 1024;

/// Configuration for a procedural shape entity
#[derive(Debug, Clone)]
pub struct ShapeConfig {
    pub kind: ShapeKind,
    pub dimensions: Vec3,
    pub color: Vec4,
    /// Load a material by name+path instead of a flat color
    pub material_name: Option<String>,
    pub material_path: Option<String>,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Cube,
            dimensions: Vec3::ONE,
            color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            material_name: None,
            material_path: None,
        }
    }
}

/// A snapshot of one point light for the draw path
#[derive(Debug, Clone, Copy)]
pub struct PointLightSnapshot {
    pub entity: EntityId,
    pub position: Vec3,
    pub light: ScenePointLight,
    pub render_id: u32,
}

/// ECS scene with hierarchy maintenance and render-dirty tracking.
pub struct Scene {
    world: SceneWorld,
    services: RenderServices,
    topo_order: Vec<EntityId>,
    hierarchy_dirty: bool,
    child_index: ChildIndex,
    pub(crate) render_dirty: Vec<EntityId>,
    pub(crate) render_full_sync_needed: bool,
    next_render_id: u32,
    owned_meshes: Vec<u32>,
    owned_instances: Vec<MeshInstanceHandle>,
    owned_geometries: Vec<GeometryHandle>,
    owned_materials: Vec<MaterialHandle>,
    owned_texts: Vec<u32>,
    text_transform_updates: Vec<(u32, Mat4)>,
    scan_fallback_warned: bool,
}

impl Scene {
    /// Create a scene bounded at `entity_limit` entities
    pub fn new(services: RenderServices, entity_limit: usize) -> Self {
        Self {
            world: SceneWorld::new(entity_limit),
            services,
            topo_order: Vec::new(),
            hierarchy_dirty: false,
            child_index: ChildIndex::new(),
            render_dirty: Vec::new(),
            render_full_sync_needed: false,
            next_render_id: 1,
            owned_meshes: Vec::new(),
            owned_instances: Vec::new(),
            owned_geometries: Vec::new(),
            owned_materials: Vec::new(),
            owned_texts: Vec::new(),
            text_transform_updates: Vec::new(),
            scan_fallback_warned: false,
        }
    }

    /// The underlying world
    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    /// Highest render id ever assigned + 1 (bridge capacity bound)
    pub fn next_render_id(&self) -> u32 {
        self.next_render_id
    }

    // ===== ENTITY LIFECYCLE =====

    /// Spawn a named entity with a root transform and default visibility
    pub fn spawn(&mut self, name: &str) -> Result<EntityId> {
        let entity = self.world.spawn()?;
        self.world.names.insert(entity, SceneName { name: name.to_string() });
        self.world.transforms.insert(entity, SceneTransform::default());
        self.world.visibilities.insert(entity, SceneVisibility::default());
        self.hierarchy_dirty = true;
        Ok(entity)
    }

    /// Destroy an entity, releasing the render resources it owns.
    /// Returns false on a stale id.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.world.is_alive(entity) {
            return false;
        }

        if let Some(shape) = self.world.shapes.get(entity).copied() {
            self.services
                .mesh_manager
                .lock()
                .unwrap()
                .mesh_destroy(shape.mesh_index);
            self.owned_meshes.retain(|&m| m != shape.mesh_index);
        }
        if let Some(renderer) = self.world.mesh_renderers.get(entity).copied() {
            if renderer.owned {
                self.services
                    .mesh_manager
                    .lock()
                    .unwrap()
                    .instance_release(renderer.instance);
                self.owned_instances.retain(|&i| i != renderer.instance);
            }
        }
        if let Some(text) = self.world.texts.get(entity).copied() {
            self.services
                .world_resources
                .lock()
                .unwrap()
                .text_destroy(text.text_index);
            self.owned_texts.retain(|&t| t != text.text_index);
        }

        // Drop the entity's own slot and its entry under its parent, then
        // invalidate: removing a transform changes the archetype the index
        // was built against
        if let Some(transform) = self.world.transforms.get(entity).copied() {
            if transform.parent != EntityId::default() {
                self.child_index.remove(transform.parent, entity);
            }
        }
        self.child_index.clear_parent_slot(entity);
        self.child_index.invalidate();

        self.world.despawn(entity);
        self.hierarchy_dirty = true;
        self.render_full_sync_needed = true;
        true
    }

    /// Entity name, while alive
    pub fn name(&self, entity: EntityId) -> Option<&str> {
        self.world.names.get(entity).map(|n| n.name.as_str())
    }

    // ===== TRANSFORM MUTATORS =====

    fn transform_mut(&mut self, entity: EntityId) -> Option<&mut SceneTransform> {
        self.world.transforms.get_mut(entity)
    }

    /// Set local position; marks the local matrix dirty
    pub fn set_position(&mut self, entity: EntityId, position: Vec3) -> bool {
        match self.transform_mut(entity) {
            Some(transform) => {
                transform.position = position;
                transform.flags.insert(TransformFlags::DIRTY_LOCAL);
                true
            }
            None => false,
        }
    }

    /// Set local rotation; marks the local matrix dirty
    pub fn set_rotation(&mut self, entity: EntityId, rotation: Quat) -> bool {
        match self.transform_mut(entity) {
            Some(transform) => {
                transform.rotation = rotation;
                transform.flags.insert(TransformFlags::DIRTY_LOCAL);
                true
            }
            None => false,
        }
    }

    /// Set local scale; marks the local matrix dirty
    pub fn set_scale(&mut self, entity: EntityId, scale: Vec3) -> bool {
        match self.transform_mut(entity) {
            Some(transform) => {
                transform.scale = scale;
                transform.flags.insert(TransformFlags::DIRTY_LOCAL);
                true
            }
            None => false,
        }
    }

    /// Re-parent an entity (None makes it a root)
    pub fn set_parent(&mut self, entity: EntityId, parent: Option<EntityId>) -> Result<()> {
        if !self.world.is_alive(entity) {
            return Err(SceneError::InvalidEntity.into());
        }
        let parent = parent.unwrap_or_default();
        if parent == entity {
            return Err(SceneError::InvalidEntity.into());
        }
        if parent != EntityId::default() && !self.world.is_alive(parent) {
            return Err(SceneError::InvalidEntity.into());
        }

        let Some(transform) = self.world.transforms.get_mut(entity) else {
            return Err(SceneError::ComponentAddFailed.into());
        };
        let old_parent = transform.parent;
        transform.parent = parent;
        transform
            .flags
            .insert(TransformFlags::DIRTY_WORLD.union(TransformFlags::DIRTY_HIERARCHY));

        if self.child_index.is_valid() {
            if old_parent != EntityId::default() {
                self.child_index.remove(old_parent, entity);
            }
            if parent != EntityId::default() {
                self.child_index.add(parent, entity);
            }
        }
        self.hierarchy_dirty = true;
        Ok(())
    }

    /// Current world matrix (as of the last update)
    pub fn world_matrix(&self, entity: EntityId) -> Option<Mat4> {
        self.world.transforms.get(entity).map(|t| t.world)
    }

    /// Current local matrix (as of the last update)
    pub fn local_matrix(&self, entity: EntityId) -> Option<Mat4> {
        self.world.transforms.get(entity).map(|t| t.local)
    }

    // ===== VISIBILITY =====

    /// Set per-entity visibility
    pub fn set_visible(&mut self, entity: EntityId, visible: bool, inherit_parent: bool) -> bool {
        if !self.world.is_alive(entity) {
            return false;
        }
        self.world
            .visibilities
            .insert(entity, SceneVisibility { visible, inherit_parent });
        if self.world.render_ids.contains_key(entity) {
            self.mark_render_dirty(entity);
        }
        true
    }

    /// Effective visibility: walks ancestors until a non-inheriting
    /// visibility or an invisible one decides, bounded by the directory
    /// capacity. Missing transforms or dead parents terminate as visible.
    pub fn is_visible(&self, entity: EntityId) -> bool {
        let mut current = entity;
        for _ in 0..self.world.capacity() {
            if let Some(visibility) = self.world.visibilities.get(current) {
                if !visibility.visible {
                    return false;
                }
                if !visibility.inherit_parent {
                    return true;
                }
            }
            let Some(transform) = self.world.transforms.get(current) else {
                return true;
            };
            let parent = transform.parent;
            if parent == EntityId::default() || !self.world.is_alive(parent) {
                return true;
            }
            current = parent;
        }
        true
    }

    // ===== RENDER IDS =====

    /// The entity's render id, when assigned
    pub fn render_id(&self, entity: EntityId) -> Option<u32> {
        self.world.render_ids.get(entity).map(|r| r.id)
    }

    /// Assign a render id if the entity lacks one. Ids are unique within
    /// the scene and never zero.
    pub fn ensure_render_id(&mut self, entity: EntityId) -> Option<u32> {
        if !self.world.is_alive(entity) {
            return None;
        }
        if let Some(existing) = self.world.render_ids.get(entity) {
            return Some(existing.id);
        }
        let id = self.next_render_id;
        self.next_render_id += 1;
        self.world.render_ids.insert(entity, SceneRenderId { id });
        self.render_full_sync_needed = true;
        Some(id)
    }

    // ===== RENDERABLES =====

    /// Attach a mesh instance to an entity. `owned` instances are released
    /// by the scene at shutdown.
    pub fn set_mesh_instance(
        &mut self,
        entity: EntityId,
        instance: MeshInstanceHandle,
        owned: bool,
    ) -> Result<()> {
        if !self.world.is_alive(entity) {
            return Err(SceneError::InvalidEntity.into());
        }
        self.world
            .mesh_renderers
            .insert(entity, SceneMeshRenderer { instance, owned });
        if owned {
            self.owned_instances.push(instance);
        }
        self.ensure_render_id(entity);
        self.render_full_sync_needed = true;
        Ok(())
    }

    /// Create a procedural shape for an entity: geometry through the
    /// geometry system, a named or flat-colored material, and a mesh slot
    /// seeded with the entity's current state.
    pub fn set_shape(&mut self, entity: EntityId, config: ShapeConfig) -> Result<()> {
        if !self.world.is_alive(entity) {
            return Err(SceneError::InvalidEntity.into());
        }

        let geometry = {
            let mut geometries = self.services.geometries.lock().unwrap();
            match config.kind {
                ShapeKind::Cube => geometries.create_cube(config.dimensions),
            }
        }
        .map_err(|err| {
            engine_error!(SOURCE, "shape geometry creation failed: {}", err);
            SceneError::MeshLoadFailed
        })?;
        self.owned_geometries.push(geometry);

        let material = {
            let mut materials = self.services.materials.lock().unwrap();
            match (&config.material_name, &config.material_path) {
                (Some(name), Some(path)) => materials.load(name, path),
                _ => materials.create_colored("scene.shape", config.color),
            }
        }
        .map_err(|err| {
            engine_error!(SOURCE, "shape material creation failed: {}", err);
            SceneError::MeshLoadFailed
        })?;
        self.owned_materials.push(material);

        let bounding_sphere = self
            .services
            .geometries
            .lock()
            .unwrap()
            .bounding_sphere(geometry);
        let mesh_index = self
            .services
            .mesh_manager
            .lock()
            .unwrap()
            .mesh_create(&MeshCreateDesc {
                geometry,
                material,
                bounding_sphere,
            })
            .map_err(|err| {
                engine_error!(SOURCE, "shape mesh creation failed: {}", err);
                SceneError::MeshLoadFailed
            })?;
        self.owned_meshes.push(mesh_index);

        let render_id = self.ensure_render_id(entity).unwrap_or(0);
        self.world.shapes.insert(
            entity,
            SceneShape {
                kind: config.kind,
                dimensions: config.dimensions,
                color: config.color,
                mesh_index,
            },
        );
        if !self.world.visibilities.contains_key(entity) {
            self.world
                .visibilities
                .insert(entity, SceneVisibility::default());
        }

        // Seed the mesh slot so the shape is correct before the first sync
        let world_matrix = self.world_matrix(entity).unwrap_or(Mat4::IDENTITY);
        let visible = self.is_visible(entity);
        let mut mesh_manager = self.services.mesh_manager.lock().unwrap();
        mesh_manager.set_model(mesh_index, &world_matrix);
        mesh_manager.set_visible(mesh_index, visible);
        mesh_manager.set_render_id(mesh_index, render_id);
        Ok(())
    }

    // ===== 3D TEXT =====

    /// Create or update a 3D text on an entity through WorldResources
    pub fn set_text3d(&mut self, entity: EntityId, config: &Text3dConfig) -> Result<()> {
        if !self.world.is_alive(entity) {
            return Err(SceneError::InvalidEntity.into());
        }
        let transform = self.world_matrix(entity).unwrap_or(Mat4::IDENTITY);

        if let Some(existing) = self.world.texts.get(entity).copied() {
            self.services
                .world_resources
                .lock()
                .unwrap()
                .text_update(existing.text_index, config)?;
            let size = self
                .services
                .world_resources
                .lock()
                .unwrap()
                .text_world_size(existing.text_index)
                .unwrap_or((0.0, 0.0));
            self.world.texts.insert(
                entity,
                SceneText3D {
                    text_index: existing.text_index,
                    dirty: false,
                    world_width: size.0,
                    world_height: size.1,
                },
            );
            return Ok(());
        }

        let text_index = self
            .services
            .world_resources
            .lock()
            .unwrap()
            .text_create(config, &transform)?;
        self.owned_texts.push(text_index);
        let size = self
            .services
            .world_resources
            .lock()
            .unwrap()
            .text_world_size(text_index)
            .unwrap_or((0.0, 0.0));
        self.world.texts.insert(
            entity,
            SceneText3D {
                text_index,
                dirty: false,
                world_width: size.0,
                world_height: size.1,
            },
        );
        Ok(())
    }

    // ===== LIGHTS =====

    /// Attach or update a point light
    pub fn set_point_light(&mut self, entity: EntityId, light: ScenePointLight) -> Result<()> {
        if !self.world.is_alive(entity) {
            return Err(SceneError::InvalidEntity.into());
        }
        self.world.point_lights.insert(entity, light);
        self.ensure_render_id(entity);
        Ok(())
    }

    /// Attach or update a directional light
    pub fn set_directional_light(
        &mut self,
        entity: EntityId,
        light: SceneDirectionalLight,
    ) -> Result<()> {
        if !self.world.is_alive(entity) {
            return Err(SceneError::InvalidEntity.into());
        }
        self.world.directional_lights.insert(entity, light);
        Ok(())
    }

    /// Enabled point lights with world positions and render ids
    pub fn point_lights(&self) -> Vec<PointLightSnapshot> {
        self.world
            .point_lights
            .iter()
            .map(|(entity, light)| PointLightSnapshot {
                entity,
                position: self
                    .world
                    .transforms
                    .get(entity)
                    .map(|t| t.world.col(3).truncate())
                    .unwrap_or(Vec3::ZERO),
                light: *light,
                render_id: self.render_id(entity).unwrap_or(0),
            })
            .collect()
    }

    /// The first directional light, if any
    pub fn directional_light(&self) -> Option<SceneDirectionalLight> {
        self.world.directional_lights.iter().map(|(_, l)| *l).next()
    }

    // ===== PER-FRAME UPDATE =====

    fn mark_render_dirty(&mut self, entity: EntityId) {
        if self.render_dirty.len() < RENDER_DIRTY_CAPACITY {
            self.render_dirty.push(entity);
        } else {
            self.render_full_sync_needed = true;
        }
    }

    /// Run the two-pass transform update.
    pub fn update(&mut self, _dt: f32) {
        if self.hierarchy_dirty {
            if !self.child_index.is_valid() {
                self.child_index.rebuild(&self.world);
                self.scan_fallback_warned = false;
            }
            self.topo_order = Self::rebuild_topo_order(
                &self.world,
                &self.child_index,
                &mut self.scan_fallback_warned,
            );
            self.hierarchy_dirty = false;
        }

        // Pass 1 (local): clear last frame's update marks, refresh dirty
        // local matrices
        for (_, transform) in self.world.transforms.iter_mut() {
            transform.flags.remove(TransformFlags::WORLD_UPDATED);
            if transform.flags.contains(TransformFlags::DIRTY_LOCAL) {
                transform.local = Mat4::from_scale_rotation_translation(
                    transform.scale,
                    transform.rotation,
                    transform.position,
                );
                transform.flags.remove(TransformFlags::DIRTY_LOCAL);
                transform.flags.insert(TransformFlags::DIRTY_WORLD);
            }
        }

        // Pass 2 (world): walk topological order with deferred dirty
        // propagation; a parent updated earlier this pass marks its
        // children dirty as they are reached
        for index in 0..self.topo_order.len() {
            let entity = self.topo_order[index];

            let parent_info = {
                let Some(transform) = self.world.transforms.get(entity) else {
                    continue;
                };
                let parent = transform.parent;
                if parent != EntityId::default() {
                    self.world
                        .transforms
                        .get(parent)
                        .map(|p| (p.world, p.flags.contains(TransformFlags::WORLD_UPDATED)))
                } else {
                    None
                }
            };

            let updated = {
                let Some(transform) = self.world.transforms.get_mut(entity) else {
                    continue;
                };
                if let Some((_, parent_updated)) = parent_info {
                    if parent_updated {
                        transform.flags.insert(TransformFlags::DIRTY_WORLD);
                    }
                }
                if !transform.flags.contains(TransformFlags::DIRTY_WORLD) {
                    false
                } else {
                    transform.world = match parent_info {
                        Some((parent_world, _)) => parent_world * transform.local,
                        None => transform.local,
                    };
                    transform.flags.remove(
                        TransformFlags::DIRTY_WORLD.union(TransformFlags::DIRTY_HIERARCHY),
                    );
                    transform.flags.insert(TransformFlags::WORLD_UPDATED);
                    true
                }
            };

            if updated {
                if self.world.mesh_renderers.contains_key(entity)
                    || self.world.shapes.contains_key(entity)
                {
                    self.mark_render_dirty(entity);
                }
                if let Some(text) = self.world.texts.get(entity).copied() {
                    if let Some(transform) = self.world.transforms.get(entity) {
                        self.text_transform_updates
                            .push((text.text_index, transform.world));
                    }
                }
            }
        }

        // Forward moved 3D texts to the text service
        if !self.text_transform_updates.is_empty() {
            let mut world_resources = self.services.world_resources.lock().unwrap();
            for (text_index, transform) in self.text_transform_updates.drain(..) {
                world_resources.text_set_transform(text_index, &transform);
            }
        }
    }

    fn rebuild_topo_order(
        world: &SceneWorld,
        child_index: &ChildIndex,
        scan_warned: &mut bool,
    ) -> Vec<EntityId> {
        let transform_count = world.transforms.len();
        let mut order = Vec::with_capacity(transform_count);
        let mut visited: FxHashSet<EntityId> = FxHashSet::default();
        let mut queue: VecDeque<EntityId> = VecDeque::new();

        // Roots: no parent, or a parent that is dead / transform-less
        for (entity, transform) in world.transforms.iter() {
            let parent_alive = transform.parent != EntityId::default()
                && world.is_alive(transform.parent)
                && world.transforms.contains_key(transform.parent);
            if !parent_alive {
                queue.push_back(entity);
            }
        }

        while let Some(entity) = queue.pop_front() {
            if !visited.insert(entity) {
                continue;
            }
            order.push(entity);
            if child_index.is_valid() {
                for &child in child_index.children_of(entity) {
                    if world.transforms.contains_key(child) {
                        queue.push_back(child);
                    }
                }
            } else {
                if !*scan_warned {
                    engine_warn!(SOURCE, "child index invalid; topo rebuild scans transforms");
                    *scan_warned = true;
                }
                for (child, transform) in world.transforms.iter() {
                    if transform.parent == entity {
                        queue.push_back(child);
                    }
                }
            }
        }

        if order.len() < transform_count {
            engine_warn!(
                SOURCE,
                "transform hierarchy has a cycle; appending {} unvisited entities as roots",
                transform_count - order.len()
            );
            for (entity, _) in world.transforms.iter() {
                if !visited.contains(&entity) {
                    order.push(entity);
                }
            }
        }
        order
    }

    // ===== SHUTDOWN =====

    /// Release everything the scene owns and clear the world.
    /// Callers wait for the renderer to go idle first.
    pub fn shutdown(&mut self) {
        {
            let mut world_resources = self.services.world_resources.lock().unwrap();
            for text_index in self.owned_texts.drain(..) {
                world_resources.text_destroy(text_index);
            }
        }
        {
            let mut mesh_manager = self.services.mesh_manager.lock().unwrap();
            for instance in self.owned_instances.drain(..) {
                mesh_manager.instance_release(instance);
            }
            for mesh_index in self.owned_meshes.drain(..) {
                mesh_manager.mesh_destroy(mesh_index);
            }
        }
        {
            let mut materials = self.services.materials.lock().unwrap();
            for material in self.owned_materials.drain(..) {
                materials.release(material);
            }
        }
        {
            let mut geometries = self.services.geometries.lock().unwrap();
            for geometry in self.owned_geometries.drain(..) {
                geometries.release(geometry);
            }
        }
        self.world.clear();
        self.topo_order.clear();
        self.child_index.invalidate();
        self.render_dirty.clear();
        self.render_full_sync_needed = false;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
