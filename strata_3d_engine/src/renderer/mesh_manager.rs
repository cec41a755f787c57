/// Mesh manager contract.
///
/// The mesh manager owns GPU mesh slots (the shape path) and mesh instances
/// (the instance path). The scene pushes world matrices, visibility, and
/// render ids into it on sync; the world view layer reads it back when
/// collecting draws. Records are returned by value so callers never hold
/// references across the `Arc<Mutex<_>>` boundary.

use glam::{Mat4, Vec3};
use crate::error::Result;
use super::types::{
    BufferHandle, GeometryHandle, MaterialHandle, MeshInstanceHandle, PipelineHandle,
    RendererInstanceStateHandle,
};

/// Snapshot of one live mesh slot
#[derive(Debug, Clone, Copy)]
pub struct MeshSlotData {
    /// World matrix pushed by the scene
    pub model: Mat4,
    /// Visibility pushed by the scene
    pub visible: bool,
    /// Raw render id pushed by the scene (0 = unassigned)
    pub render_id: u32,
    /// Local-space bounding sphere, when the asset provides one
    pub bounding_sphere: Option<(Vec3, f32)>,
    /// Number of submeshes in the slot
    pub submesh_count: u32,
    /// Shared vertex buffer for all submeshes
    pub vertex_buffer: BufferHandle,
    /// Shared index buffer for all submeshes
    pub index_buffer: BufferHandle,
}

/// Snapshot of one submesh
#[derive(Debug, Clone, Copy)]
pub struct SubmeshData {
    pub geometry: GeometryHandle,
    pub index_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    /// Buffer-range id; submeshes with different ranges cannot merge without MDI
    pub range_id: u32,
    pub material: MaterialHandle,
    /// Cached pipeline record, refreshed through `refresh_pipeline`
    pub pipeline: PipelineHandle,
    /// Per-draw instance state tied to the cached pipeline
    pub instance_state: RendererInstanceStateHandle,
}

/// Snapshot of one live mesh instance
#[derive(Debug, Clone, Copy)]
pub struct MeshInstanceData {
    /// Mesh slot the instance draws
    pub mesh_index: u32,
    pub model: Mat4,
    pub visible: bool,
    pub render_id: u32,
}

/// Descriptor for a mesh slot created by the scene's shape path
#[derive(Debug, Clone)]
pub struct MeshCreateDesc {
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub bounding_sphere: Option<(Vec3, f32)>,
}

/// Mesh manager contract consumed by the scene bridge and the world layer.
pub trait MeshManager: Send + Sync {
    // ===== MESH SLOTS =====

    /// Number of live mesh slots
    fn count(&self) -> u32;

    /// Resolve the `live_index`-th live mesh to `(mesh_index, slot)`
    fn mesh_by_live_index(&self, live_index: u32) -> Option<(u32, MeshSlotData)>;

    /// Fetch a mesh slot directly by index
    fn mesh_slot(&self, mesh_index: u32) -> Option<MeshSlotData>;

    /// Fetch one submesh of a mesh slot
    fn submesh(&self, mesh_index: u32, submesh_index: u32) -> Option<SubmeshData>;

    /// Set a slot's world matrix; false on invalid index
    fn set_model(&mut self, mesh_index: u32, model: &Mat4) -> bool;

    /// Set a slot's visibility; false on invalid index
    fn set_visible(&mut self, mesh_index: u32, visible: bool) -> bool;

    /// Set a slot's render id; false on invalid index
    fn set_render_id(&mut self, mesh_index: u32, render_id: u32) -> bool;

    /// Refresh a submesh's cached pipeline record and instance state
    fn refresh_pipeline(
        &mut self,
        mesh_index: u32,
        submesh_index: u32,
        pipeline: PipelineHandle,
        instance_state: RendererInstanceStateHandle,
    ) -> bool;

    /// Create a mesh slot (scene shape path)
    fn mesh_create(&mut self, desc: &MeshCreateDesc) -> Result<u32>;

    /// Destroy a mesh slot
    fn mesh_destroy(&mut self, mesh_index: u32);

    // ===== MESH INSTANCES =====

    /// Number of live mesh instances
    fn instance_count(&self) -> u32;

    /// Resolve the `live_index`-th live instance
    fn instance_by_live_index(&self, live_index: u32)
        -> Option<(MeshInstanceHandle, MeshInstanceData)>;

    /// Set an instance's world matrix; false on stale handle
    fn instance_set_model(&mut self, handle: MeshInstanceHandle, model: &Mat4) -> bool;

    /// Set an instance's visibility; false on stale handle
    fn instance_set_visible(&mut self, handle: MeshInstanceHandle, visible: bool) -> bool;

    /// Set an instance's render id; false on stale handle
    fn instance_set_render_id(&mut self, handle: MeshInstanceHandle, render_id: u32) -> bool;

    /// Refresh an instance submesh's cached pipeline record
    fn instance_refresh_pipeline(
        &mut self,
        handle: MeshInstanceHandle,
        submesh_index: u32,
        pipeline: PipelineHandle,
        instance_state: RendererInstanceStateHandle,
    ) -> bool;

    /// Release a mesh instance
    fn instance_release(&mut self, handle: MeshInstanceHandle);
}
