/// Mock renderer frontend and collaborators for tests (no GPU required).
///
/// Each mock records the calls it receives: call-name strings for flow
/// assertions plus structured records for value assertions. The mocks are
/// public so integration tests under `tests/` can drive whole frames
/// without a backend.

use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashMap;
use crate::error::Result;
use crate::engine_err;
use crate::utils::RawHandle;
use super::cameras::CameraRegistry;
use super::frontend::RendererFrontend;
use super::geometry::{GeometryDrawData, GeometrySystem};
use super::materials::{MaterialData, MaterialSystem};
use super::mesh_manager::{
    MeshCreateDesc, MeshInstanceData, MeshManager, MeshSlotData, SubmeshData,
};
use super::pipelines::{
    LightingGlobals, PipelineDomain, PipelineRegistry, ShadowGlobals,
};
use super::pools::{IndirectDrawPool, InstanceBufferPool};
use super::services::RenderServices;
use super::types::{
    BufferHandle, GeometryHandle, IndexType, IndirectDrawCommand, InstanceData,
    MaterialHandle, MeshInstanceHandle, PipelineHandle, RenderPassDesc, RenderPassHandle,
    RenderTargetDesc, RenderTargetHandle, RendererInstanceStateHandle, TextureDesc,
    TextureHandle, TextureLayout,
};
use super::world_resources::{Text3dConfig, TextDrawData, WorldResources};

fn handle(id: u32) -> RawHandle {
    RawHandle { id, generation: 0 }
}

// ============================================================================
// Mock Frontend
// ============================================================================

/// One recorded indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRecord {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

/// One recorded indirect dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndirectDrawRecord {
    pub buffer: BufferHandle,
    pub offset: u64,
    pub draw_count: u32,
    pub stride: u32,
}

/// Recording renderer frontend.
pub struct MockFrontend {
    pub calls: Vec<String>,
    image_count: u32,
    window_attachments: Vec<TextureHandle>,
    depth: Option<TextureHandle>,
    renderpasses: FxHashMap<String, RenderPassHandle>,
    next_id: u32,
    pub created_targets: Vec<(RenderTargetHandle, RenderTargetDesc, RenderPassHandle)>,
    pub destroyed_targets: Vec<RenderTargetHandle>,
    pub created_textures: Vec<(TextureHandle, TextureDesc)>,
    pub destroyed_textures: Vec<TextureHandle>,
    pub sampled_registrations: Vec<(TextureHandle, String)>,
    pub transitions: Vec<(TextureHandle, TextureLayout, TextureLayout)>,
    pub wait_idle_count: u32,
    pub begun_passes: Vec<(RenderPassHandle, RenderTargetHandle)>,
    pub draws: Vec<DrawRecord>,
    pub indirect_draws: Vec<IndirectDrawRecord>,
    pub supports_mdi: bool,
    pub supports_first_instance: bool,
    /// Force render-target creation to fail (error-path tests)
    pub fail_render_target_create: bool,
}

impl MockFrontend {
    /// Create a frontend with `image_count` swapchain images and a depth
    /// attachment
    pub fn new(image_count: u32) -> Self {
        let mut next_id = 1;
        let mut alloc = || {
            let id = next_id;
            next_id += 1;
            TextureHandle(handle(id))
        };
        let window_attachments = (0..image_count).map(|_| alloc()).collect();
        let depth = Some(alloc());
        Self {
            calls: Vec::new(),
            image_count,
            window_attachments,
            depth,
            renderpasses: FxHashMap::default(),
            next_id,
            created_targets: Vec::new(),
            destroyed_targets: Vec::new(),
            created_textures: Vec::new(),
            destroyed_textures: Vec::new(),
            sampled_registrations: Vec::new(),
            transitions: Vec::new(),
            wait_idle_count: 0,
            begun_passes: Vec::new(),
            draws: Vec::new(),
            indirect_draws: Vec::new(),
            supports_mdi: true,
            supports_first_instance: true,
            fail_render_target_create: false,
        }
    }

    fn alloc(&mut self) -> RawHandle {
        let id = self.next_id;
        self.next_id += 1;
        handle(id)
    }

    /// Register a named renderpass, as the backend does for builtins
    pub fn register_renderpass(&mut self, name: &str) -> RenderPassHandle {
        let h = RenderPassHandle(self.alloc());
        self.renderpasses.insert(name.to_string(), h);
        h
    }

    /// Drop a depth attachment (attachment-less error-path tests)
    pub fn clear_depth_attachment(&mut self) {
        self.depth = None;
    }
}

impl RendererFrontend for MockFrontend {
    fn window_attachment_count(&self) -> u32 {
        self.image_count
    }

    fn window_attachment(&self, image_index: u32) -> Option<TextureHandle> {
        self.window_attachments.get(image_index as usize).copied()
    }

    fn depth_attachment(&self) -> Option<TextureHandle> {
        self.depth
    }

    fn renderpass_by_name(&self, name: &str) -> Option<RenderPassHandle> {
        self.renderpasses.get(name).copied()
    }

    fn renderpass_create(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle> {
        self.calls.push(format!("renderpass_create:{}", desc.name));
        let h = RenderPassHandle(self.alloc());
        self.renderpasses.insert(desc.name.clone(), h);
        Ok(h)
    }

    fn renderpass_destroy(&mut self, handle: RenderPassHandle) {
        self.calls.push("renderpass_destroy".to_string());
        self.renderpasses.retain(|_, h| *h != handle);
    }

    fn render_target_create(
        &mut self,
        desc: &RenderTargetDesc,
        renderpass: RenderPassHandle,
    ) -> Result<RenderTargetHandle> {
        self.calls.push("render_target_create".to_string());
        if self.fail_render_target_create {
            return Err(engine_err!(ResourceCreationFailed, "mock target failure"));
        }
        let h = RenderTargetHandle(self.alloc());
        self.created_targets.push((h, desc.clone(), renderpass));
        Ok(h)
    }

    fn render_target_destroy(&mut self, handle: RenderTargetHandle) {
        self.calls.push("render_target_destroy".to_string());
        self.destroyed_targets.push(handle);
    }

    fn texture_create(&mut self, desc: &TextureDesc) -> Result<TextureHandle> {
        self.calls.push(format!("texture_create:{}", desc.name));
        let h = TextureHandle(self.alloc());
        self.created_textures.push((h, desc.clone()));
        Ok(h)
    }

    fn texture_destroy(&mut self, handle: TextureHandle) {
        self.calls.push("texture_destroy".to_string());
        self.destroyed_textures.push(handle);
    }

    fn register_sampled_texture(&mut self, handle: TextureHandle, name: &str) -> Result<()> {
        self.calls.push(format!("register_sampled_texture:{}", name));
        self.sampled_registrations.push((handle, name.to_string()));
        Ok(())
    }

    fn transition_texture_layout(
        &mut self,
        texture: TextureHandle,
        from: TextureLayout,
        to: TextureLayout,
    ) {
        self.calls.push("transition_texture_layout".to_string());
        self.transitions.push((texture, from, to));
    }

    fn wait_idle(&mut self) {
        self.calls.push("wait_idle".to_string());
        self.wait_idle_count += 1;
    }

    fn begin_render_pass(
        &mut self,
        renderpass: RenderPassHandle,
        target: RenderTargetHandle,
    ) -> Result<()> {
        self.calls.push("begin_render_pass".to_string());
        self.begun_passes.push((renderpass, target));
        Ok(())
    }

    fn end_render_pass(&mut self) {
        self.calls.push("end_render_pass".to_string());
    }

    fn bind_vertex_buffer(&mut self, _buffer: BufferHandle, _offset: u64) {
        self.calls.push("bind_vertex_buffer".to_string());
    }

    fn bind_index_buffer(&mut self, _buffer: BufferHandle, _offset: u64, _index_type: IndexType) {
        self.calls.push("bind_index_buffer".to_string());
    }

    fn draw(
        &mut self,
        _vertex_count: u32,
        _instance_count: u32,
        _first_vertex: u32,
        _first_instance: u32,
    ) {
        self.calls.push("draw".to_string());
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.calls.push("draw_indexed".to_string());
        self.draws.push(DrawRecord {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn draw_indexed_indirect(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        self.calls.push("draw_indexed_indirect".to_string());
        self.indirect_draws.push(IndirectDrawRecord {
            buffer,
            offset,
            draw_count,
            stride,
        });
    }

    fn supports_multi_draw_indirect(&self) -> bool {
        self.supports_mdi
    }

    fn supports_indirect_first_instance(&self) -> bool {
        self.supports_first_instance
    }
}

// ============================================================================
// Mock Mesh Manager
// ============================================================================

struct MockMesh {
    slot: MeshSlotData,
    submeshes: Vec<SubmeshData>,
}

/// Recording mesh manager with directly seedable meshes and instances.
///
/// All meshes share one suballocated vertex/index buffer pair, the way a
/// real mesh manager packs geometry.
pub struct MockMeshManager {
    meshes: Vec<Option<MockMesh>>,
    instances: Vec<Option<MeshInstanceData>>,
    instance_generations: Vec<u32>,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    pub released_instances: Vec<MeshInstanceHandle>,
    pub destroyed_meshes: Vec<u32>,
    pub pipeline_refreshes: Vec<(u32, u32, PipelineHandle)>,
    pub model_writes: Vec<(u32, Mat4)>,
    pub visibility_writes: Vec<(u32, bool)>,
    pub render_id_writes: Vec<(u32, u32)>,
}

impl MockMeshManager {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            instances: Vec::new(),
            instance_generations: Vec::new(),
            vertex_buffer: BufferHandle(handle(1000)),
            index_buffer: BufferHandle(handle(1001)),
            released_instances: Vec::new(),
            destroyed_meshes: Vec::new(),
            pipeline_refreshes: Vec::new(),
            model_writes: Vec::new(),
            visibility_writes: Vec::new(),
            render_id_writes: Vec::new(),
        }
    }

    /// Seed a mesh with one submesh per `(material, range_id)` pair
    pub fn add_mesh(
        &mut self,
        bounding_sphere: Option<(Vec3, f32)>,
        submeshes: &[(MaterialHandle, GeometryHandle, u32)],
    ) -> u32 {
        let vertex_buffer = self.vertex_buffer;
        let index_buffer = self.index_buffer;
        let subs = submeshes
            .iter()
            .enumerate()
            .map(|(i, &(material, geometry, range_id))| SubmeshData {
                geometry,
                index_count: 36,
                first_index: i as u32 * 36,
                vertex_offset: 0,
                range_id,
                material,
                pipeline: PipelineHandle::INVALID,
                instance_state: RendererInstanceStateHandle::INVALID,
            })
            .collect::<Vec<_>>();
        let mesh = MockMesh {
            slot: MeshSlotData {
                model: Mat4::IDENTITY,
                visible: true,
                render_id: 0,
                bounding_sphere,
                submesh_count: subs.len() as u32,
                vertex_buffer,
                index_buffer,
            },
            submeshes: subs,
        };
        self.meshes.push(Some(mesh));
        self.meshes.len() as u32 - 1
    }

    /// Seed a mesh instance pointing at a mesh slot
    pub fn add_instance(&mut self, mesh_index: u32) -> MeshInstanceHandle {
        self.instances.push(Some(MeshInstanceData {
            mesh_index,
            model: Mat4::IDENTITY,
            visible: true,
            render_id: 0,
        }));
        self.instance_generations.push(0);
        MeshInstanceHandle(RawHandle {
            id: self.instances.len() as u32,
            generation: 0,
        })
    }

    /// Direct instance read-back for assertions
    pub fn instance(&self, handle: MeshInstanceHandle) -> Option<MeshInstanceData> {
        let index = handle.0.slot_index()?;
        if *self.instance_generations.get(index)? != handle.0.generation {
            return None;
        }
        *self.instances.get(index)?
    }

    /// Direct mesh slot read-back for assertions
    pub fn mesh_slot(&self, mesh_index: u32) -> Option<MeshSlotData> {
        self.meshes.get(mesh_index as usize)?.as_ref().map(|m| m.slot)
    }

    fn instance_mut(&mut self, handle: MeshInstanceHandle) -> Option<&mut MeshInstanceData> {
        let index = handle.0.slot_index()?;
        if *self.instance_generations.get(index)? != handle.0.generation {
            return None;
        }
        self.instances.get_mut(index)?.as_mut()
    }
}

impl Default for MockMeshManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshManager for MockMeshManager {
    fn count(&self) -> u32 {
        self.meshes.iter().filter(|m| m.is_some()).count() as u32
    }

    fn mesh_by_live_index(&self, live_index: u32) -> Option<(u32, MeshSlotData)> {
        self.meshes
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.as_ref().map(|m| (i as u32, m.slot)))
            .nth(live_index as usize)
    }

    fn mesh_slot(&self, mesh_index: u32) -> Option<MeshSlotData> {
        self.meshes.get(mesh_index as usize)?.as_ref().map(|m| m.slot)
    }

    fn submesh(&self, mesh_index: u32, submesh_index: u32) -> Option<SubmeshData> {
        self.meshes
            .get(mesh_index as usize)?
            .as_ref()?
            .submeshes
            .get(submesh_index as usize)
            .copied()
    }

    fn set_model(&mut self, mesh_index: u32, model: &Mat4) -> bool {
        self.model_writes.push((mesh_index, *model));
        match self.meshes.get_mut(mesh_index as usize) {
            Some(Some(mesh)) => {
                mesh.slot.model = *model;
                true
            }
            _ => false,
        }
    }

    fn set_visible(&mut self, mesh_index: u32, visible: bool) -> bool {
        self.visibility_writes.push((mesh_index, visible));
        match self.meshes.get_mut(mesh_index as usize) {
            Some(Some(mesh)) => {
                mesh.slot.visible = visible;
                true
            }
            _ => false,
        }
    }

    fn set_render_id(&mut self, mesh_index: u32, render_id: u32) -> bool {
        self.render_id_writes.push((mesh_index, render_id));
        match self.meshes.get_mut(mesh_index as usize) {
            Some(Some(mesh)) => {
                mesh.slot.render_id = render_id;
                true
            }
            _ => false,
        }
    }

    fn refresh_pipeline(
        &mut self,
        mesh_index: u32,
        submesh_index: u32,
        pipeline: PipelineHandle,
        instance_state: RendererInstanceStateHandle,
    ) -> bool {
        self.pipeline_refreshes.push((mesh_index, submesh_index, pipeline));
        match self.meshes.get_mut(mesh_index as usize) {
            Some(Some(mesh)) => match mesh.submeshes.get_mut(submesh_index as usize) {
                Some(sub) => {
                    sub.pipeline = pipeline;
                    sub.instance_state = instance_state;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn mesh_create(&mut self, desc: &MeshCreateDesc) -> Result<u32> {
        let index = self.add_mesh(desc.bounding_sphere, &[(desc.material, desc.geometry, 0)]);
        Ok(index)
    }

    fn mesh_destroy(&mut self, mesh_index: u32) {
        self.destroyed_meshes.push(mesh_index);
        if let Some(slot) = self.meshes.get_mut(mesh_index as usize) {
            *slot = None;
        }
    }

    fn instance_count(&self) -> u32 {
        self.instances.iter().filter(|i| i.is_some()).count() as u32
    }

    fn instance_by_live_index(
        &self,
        live_index: u32,
    ) -> Option<(MeshInstanceHandle, MeshInstanceData)> {
        self.instances
            .iter()
            .enumerate()
            .filter_map(|(i, inst)| {
                inst.map(|data| {
                    (
                        MeshInstanceHandle(RawHandle {
                            id: i as u32 + 1,
                            generation: self.instance_generations[i],
                        }),
                        data,
                    )
                })
            })
            .nth(live_index as usize)
    }

    fn instance_set_model(&mut self, handle: MeshInstanceHandle, model: &Mat4) -> bool {
        match self.instance_mut(handle) {
            Some(inst) => {
                inst.model = *model;
                true
            }
            None => false,
        }
    }

    fn instance_set_visible(&mut self, handle: MeshInstanceHandle, visible: bool) -> bool {
        match self.instance_mut(handle) {
            Some(inst) => {
                inst.visible = visible;
                true
            }
            None => false,
        }
    }

    fn instance_set_render_id(&mut self, handle: MeshInstanceHandle, render_id: u32) -> bool {
        match self.instance_mut(handle) {
            Some(inst) => {
                inst.render_id = render_id;
                true
            }
            None => false,
        }
    }

    fn instance_refresh_pipeline(
        &mut self,
        handle: MeshInstanceHandle,
        submesh_index: u32,
        pipeline: PipelineHandle,
        instance_state: RendererInstanceStateHandle,
    ) -> bool {
        let Some(inst) = self.instance(handle) else {
            return false;
        };
        self.refresh_pipeline(inst.mesh_index, submesh_index, pipeline, instance_state)
    }

    fn instance_release(&mut self, handle: MeshInstanceHandle) {
        self.released_instances.push(handle);
        if let Some(index) = handle.0.slot_index() {
            if self
                .instance_generations
                .get(index)
                .is_some_and(|g| *g == handle.0.generation)
            {
                self.instances[index] = None;
                self.instance_generations[index] += 1;
            }
        }
    }
}

// ============================================================================
// Mock Pipeline Registry
// ============================================================================

/// Recording pipeline registry; resolution allocates one pipeline per
/// distinct (shader, domain, renderpass) triple.
pub struct MockPipelineRegistry {
    resolved: FxHashMap<(String, PipelineDomain, RenderPassHandle), PipelineHandle>,
    next_id: u32,
    pub binds: Vec<PipelineHandle>,
    pub lighting_applies: Vec<PipelineHandle>,
    pub shadow_applies: Vec<(PipelineHandle, bool)>,
    pub domain_applies: Vec<(PipelineHandle, PipelineDomain)>,
    pub globals_dirty_count: u32,
    pub acquired_states: Vec<RendererInstanceStateHandle>,
    pub released_states: Vec<RendererInstanceStateHandle>,
    pub state_binds: Vec<RendererInstanceStateHandle>,
    pub material_applies: Vec<(RendererInstanceStateHandle, MaterialHandle)>,
}

impl MockPipelineRegistry {
    pub fn new() -> Self {
        Self {
            resolved: FxHashMap::default(),
            next_id: 1,
            binds: Vec::new(),
            lighting_applies: Vec::new(),
            shadow_applies: Vec::new(),
            domain_applies: Vec::new(),
            globals_dirty_count: 0,
            acquired_states: Vec::new(),
            released_states: Vec::new(),
            state_binds: Vec::new(),
            material_applies: Vec::new(),
        }
    }

    fn alloc(&mut self) -> RawHandle {
        let id = self.next_id;
        self.next_id += 1;
        handle(id)
    }
}

impl Default for MockPipelineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRegistry for MockPipelineRegistry {
    fn resolve(
        &mut self,
        shader: &str,
        domain: PipelineDomain,
        renderpass: RenderPassHandle,
    ) -> Option<PipelineHandle> {
        let key = (shader.to_string(), domain, renderpass);
        if let Some(&p) = self.resolved.get(&key) {
            return Some(p);
        }
        let p = PipelineHandle(self.alloc());
        self.resolved.insert(key, p);
        Some(p)
    }

    fn bind(&mut self, pipeline: PipelineHandle) -> bool {
        self.binds.push(pipeline);
        pipeline.is_valid()
    }

    fn apply_lighting(&mut self, pipeline: PipelineHandle, _lighting: &LightingGlobals) {
        self.lighting_applies.push(pipeline);
    }

    fn apply_shadow_globals(&mut self, pipeline: PipelineHandle, shadow: &ShadowGlobals) {
        self.shadow_applies.push((pipeline, shadow.comparison_enabled));
    }

    fn apply_domain_globals(&mut self, pipeline: PipelineHandle, domain: PipelineDomain) {
        self.domain_applies.push((pipeline, domain));
    }

    fn mark_globals_dirty(&mut self) {
        self.globals_dirty_count += 1;
    }

    fn acquire_instance_state(
        &mut self,
        _pipeline: PipelineHandle,
    ) -> Option<RendererInstanceStateHandle> {
        let state = RendererInstanceStateHandle(self.alloc());
        self.acquired_states.push(state);
        Some(state)
    }

    fn release_instance_state(&mut self, state: RendererInstanceStateHandle) {
        self.released_states.push(state);
    }

    fn bind_instance_state(&mut self, state: RendererInstanceStateHandle) {
        self.state_binds.push(state);
    }

    fn apply_instance_material(
        &mut self,
        state: RendererInstanceStateHandle,
        material: MaterialHandle,
    ) {
        self.material_applies.push((state, material));
    }
}

// ============================================================================
// Mock Material System
// ============================================================================

/// Material system over an in-memory table.
pub struct MockMaterialSystem {
    materials: FxHashMap<MaterialHandle, MaterialData>,
    default: MaterialHandle,
    next_id: u32,
    pub released: Vec<MaterialHandle>,
    pub emission_writes: Vec<(MaterialHandle, Vec3)>,
}

impl MockMaterialSystem {
    pub fn new() -> Self {
        let mut materials = FxHashMap::default();
        let default = MaterialHandle(handle(1));
        materials.insert(default, MaterialData::default());
        Self {
            materials,
            default,
            next_id: 2,
            released: Vec::new(),
            emission_writes: Vec::new(),
        }
    }

    /// Seed a material with explicit draw-path data
    pub fn add(&mut self, data: MaterialData) -> MaterialHandle {
        let h = MaterialHandle(handle(self.next_id));
        self.next_id += 1;
        self.materials.insert(h, data);
        h
    }
}

impl Default for MockMaterialSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialSystem for MockMaterialSystem {
    fn material(&self, handle: MaterialHandle) -> Option<MaterialData> {
        self.materials.get(&handle).cloned()
    }

    fn default_material(&self) -> MaterialHandle {
        self.default
    }

    fn create_colored(&mut self, _name: &str, _color: Vec4) -> Result<MaterialHandle> {
        Ok(self.add(MaterialData::default()))
    }

    fn load(&mut self, _name: &str, _path: &str) -> Result<MaterialHandle> {
        Ok(self.add(MaterialData::default()))
    }

    fn set_emission_color(&mut self, handle: MaterialHandle, color: Vec3) -> bool {
        self.emission_writes.push((handle, color));
        match self.materials.get_mut(&handle) {
            Some(data) => {
                data.emission_color = color;
                true
            }
            None => false,
        }
    }

    fn release(&mut self, handle: MaterialHandle) {
        self.released.push(handle);
        self.materials.remove(&handle);
    }
}

// ============================================================================
// Mock Geometry System
// ============================================================================

/// Geometry system allocating handles and recording creations.
pub struct MockGeometrySystem {
    next_id: u32,
    pub cubes: Vec<(GeometryHandle, Vec3)>,
    pub spheres: Vec<(GeometryHandle, f32)>,
    pub released: Vec<GeometryHandle>,
}

impl MockGeometrySystem {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            cubes: Vec::new(),
            spheres: Vec::new(),
            released: Vec::new(),
        }
    }

    fn alloc(&mut self) -> GeometryHandle {
        let h = GeometryHandle(handle(self.next_id));
        self.next_id += 1;
        h
    }
}

impl Default for MockGeometrySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometrySystem for MockGeometrySystem {
    fn create_cube(&mut self, dimensions: Vec3) -> Result<GeometryHandle> {
        let h = self.alloc();
        self.cubes.push((h, dimensions));
        Ok(h)
    }

    fn create_sphere(&mut self, radius: f32) -> Result<GeometryHandle> {
        let h = self.alloc();
        self.spheres.push((h, radius));
        Ok(h)
    }

    fn bounding_sphere(&self, _handle: GeometryHandle) -> Option<(Vec3, f32)> {
        Some((Vec3::ZERO, 1.0))
    }

    fn draw_data(&self, handle: GeometryHandle) -> Option<GeometryDrawData> {
        Some(GeometryDrawData {
            vertex_buffer: BufferHandle(RawHandle {
                id: 9000 + handle.0.id,
                generation: 0,
            }),
            index_buffer: BufferHandle(RawHandle {
                id: 9500 + handle.0.id,
                generation: 0,
            }),
            index_count: 240,
        })
    }

    fn release(&mut self, handle: GeometryHandle) {
        self.released.push(handle);
    }
}

// ============================================================================
// Mock Camera Registry
// ============================================================================

/// Camera registry recording resize calls.
#[derive(Default)]
pub struct MockCameraRegistry {
    pub resizes: Vec<(u32, u32)>,
}

impl MockCameraRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CameraRegistry for MockCameraRegistry {
    fn resize_all(&mut self, width: u32, height: u32) {
        self.resizes.push((width, height));
    }
}

// ============================================================================
// Mock World Resources
// ============================================================================

struct MockText {
    config: Text3dConfig,
    transform: Mat4,
    pipeline: PipelineHandle,
}

/// 3D-text service over an in-memory slot list.
pub struct MockWorldResources {
    texts: Vec<Option<MockText>>,
    pub destroyed: Vec<u32>,
    pub rebinds: Vec<(u32, PipelineHandle)>,
}

impl MockWorldResources {
    pub fn new() -> Self {
        Self {
            texts: Vec::new(),
            destroyed: Vec::new(),
            rebinds: Vec::new(),
        }
    }

    /// Number of live text slots
    pub fn live_count(&self) -> usize {
        self.texts.iter().filter(|t| t.is_some()).count()
    }

    /// Read back a text's content for assertions
    pub fn text_content(&self, text_index: u32) -> Option<String> {
        self.texts
            .get(text_index as usize)?
            .as_ref()
            .map(|t| t.config.text.clone())
    }

    /// Read back a text's transform for assertions
    pub fn text_transform(&self, text_index: u32) -> Option<Mat4> {
        self.texts.get(text_index as usize)?.as_ref().map(|t| t.transform)
    }

    /// Read back a text's bound pipeline for assertions
    pub fn text_pipeline(&self, text_index: u32) -> Option<PipelineHandle> {
        self.texts.get(text_index as usize)?.as_ref().map(|t| t.pipeline)
    }
}

impl Default for MockWorldResources {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldResources for MockWorldResources {
    fn text_create(&mut self, config: &Text3dConfig, transform: &Mat4) -> Result<u32> {
        let text = MockText {
            config: config.clone(),
            transform: *transform,
            pipeline: PipelineHandle::INVALID,
        };
        for (i, slot) in self.texts.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(text);
                return Ok(i as u32);
            }
        }
        self.texts.push(Some(text));
        Ok(self.texts.len() as u32 - 1)
    }

    fn text_update(&mut self, text_index: u32, config: &Text3dConfig) -> Result<()> {
        match self.texts.get_mut(text_index as usize) {
            Some(Some(text)) => {
                text.config = config.clone();
                Ok(())
            }
            _ => Err(engine_err!(HandleInvalid, "text slot {}", text_index)),
        }
    }

    fn text_set_transform(&mut self, text_index: u32, transform: &Mat4) -> bool {
        match self.texts.get_mut(text_index as usize) {
            Some(Some(text)) => {
                text.transform = *transform;
                true
            }
            _ => false,
        }
    }

    fn text_destroy(&mut self, text_index: u32) {
        self.destroyed.push(text_index);
        if let Some(slot) = self.texts.get_mut(text_index as usize) {
            *slot = None;
        }
    }

    fn text_world_size(&self, text_index: u32) -> Option<(f32, f32)> {
        let text = self.texts.get(text_index as usize)?.as_ref()?;
        let width = text.config.text.chars().count() as f32 * text.config.size * 0.6;
        Some((width, text.config.size))
    }

    fn text_draw_data(&self, text_index: u32) -> Option<TextDrawData> {
        let _ = self.texts.get(text_index as usize)?.as_ref()?;
        Some(TextDrawData {
            vertex_buffer: BufferHandle(handle(8000 + text_index)),
            index_buffer: BufferHandle(handle(8500 + text_index)),
            index_count: 6,
            atlas: TextureHandle(handle(8900)),
        })
    }

    fn text_rebind_pipeline(&mut self, text_index: u32, pipeline: PipelineHandle) -> bool {
        self.rebinds.push((text_index, pipeline));
        match self.texts.get_mut(text_index as usize) {
            Some(Some(text)) => {
                text.pipeline = pipeline;
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Mock Buffer Pools
// ============================================================================

/// Bump-allocating instance pool with recorded writes and flushes.
pub struct MockInstancePool {
    capacity: u32,
    cursor: u32,
    buffer: BufferHandle,
    pub allocs: Vec<(u32, u32)>,
    pub writes: Vec<(u32, InstanceData)>,
    pub flushes: Vec<(u32, u32)>,
}

impl MockInstancePool {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            cursor: 0,
            buffer: BufferHandle(handle(7000)),
            allocs: Vec::new(),
            writes: Vec::new(),
            flushes: Vec::new(),
        }
    }
}

impl InstanceBufferPool for MockInstancePool {
    fn alloc(&mut self, count: u32) -> Option<u32> {
        if self.cursor + count > self.capacity {
            return None;
        }
        let base = self.cursor;
        self.cursor += count;
        self.allocs.push((base, count));
        Some(base)
    }

    fn write(&mut self, index: u32, data: &InstanceData) {
        self.writes.push((index, *data));
    }

    fn flush_range(&mut self, base: u32, count: u32) {
        self.flushes.push((base, count));
    }

    fn flush_current(&mut self) {
        self.flushes.push((0, self.cursor));
    }

    fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

/// Bump-allocating indirect pool with recorded writes and flushes.
pub struct MockIndirectPool {
    capacity: u32,
    cursor: u32,
    buffer: BufferHandle,
    pub allocs: Vec<(u32, u32)>,
    pub writes: Vec<(u32, IndirectDrawCommand)>,
    pub flushes: Vec<(u32, u32)>,
}

impl MockIndirectPool {
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            cursor: 0,
            buffer: BufferHandle(handle(7500)),
            allocs: Vec::new(),
            writes: Vec::new(),
            flushes: Vec::new(),
        }
    }
}

impl IndirectDrawPool for MockIndirectPool {
    fn remaining(&self) -> u32 {
        self.capacity - self.cursor
    }

    fn alloc(&mut self, count: u32) -> Option<u32> {
        if self.cursor + count > self.capacity {
            return None;
        }
        let base = self.cursor;
        self.cursor += count;
        self.allocs.push((base, count));
        Some(base)
    }

    fn write(&mut self, index: u32, command: &IndirectDrawCommand) {
        self.writes.push((index, *command));
    }

    fn flush_range(&mut self, base: u32, count: u32) {
        self.flushes.push((base, count));
    }

    fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

// ============================================================================
// Service Bundle
// ============================================================================

/// Concrete mock references kept alongside the type-erased bundle so tests
/// can inspect recorded calls after the fact.
#[derive(Clone)]
pub struct MockServiceHandles {
    pub renderer: Arc<Mutex<MockFrontend>>,
    pub mesh_manager: Arc<Mutex<MockMeshManager>>,
    pub pipelines: Arc<Mutex<MockPipelineRegistry>>,
    pub materials: Arc<Mutex<MockMaterialSystem>>,
    pub geometries: Arc<Mutex<MockGeometrySystem>>,
    pub cameras: Arc<Mutex<MockCameraRegistry>>,
    pub instance_pool: Arc<Mutex<MockInstancePool>>,
    pub indirect_pool: Arc<Mutex<MockIndirectPool>>,
    pub world_resources: Arc<Mutex<MockWorldResources>>,
}

/// Build a full mock service bundle with `image_count` swapchain images.
pub fn mock_services(image_count: u32) -> (RenderServices, MockServiceHandles) {
    let renderer = Arc::new(Mutex::new(MockFrontend::new(image_count)));
    let mesh_manager = Arc::new(Mutex::new(MockMeshManager::new()));
    let pipelines = Arc::new(Mutex::new(MockPipelineRegistry::new()));
    let materials = Arc::new(Mutex::new(MockMaterialSystem::new()));
    let geometries = Arc::new(Mutex::new(MockGeometrySystem::new()));
    let cameras = Arc::new(Mutex::new(MockCameraRegistry::new()));
    let instance_pool = Arc::new(Mutex::new(MockInstancePool::new(4096)));
    let indirect_pool = Arc::new(Mutex::new(MockIndirectPool::new(4096)));
    let world_resources = Arc::new(Mutex::new(MockWorldResources::new()));

    let handles = MockServiceHandles {
        renderer: renderer.clone(),
        mesh_manager: mesh_manager.clone(),
        pipelines: pipelines.clone(),
        materials: materials.clone(),
        geometries: geometries.clone(),
        cameras: cameras.clone(),
        instance_pool: instance_pool.clone(),
        indirect_pool: indirect_pool.clone(),
        world_resources: world_resources.clone(),
    };
    let services = RenderServices {
        renderer,
        mesh_manager,
        pipelines,
        materials,
        geometries,
        cameras,
        instance_pool,
        indirect_pool,
        world_resources,
    };
    (services, handles)
}
