/// Shared renderer-facing types: resource handles, descriptors, and the
/// GPU-plain records written into instance and indirect-draw buffers.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use crate::define_handles;

define_handles! {
    /// Graphics pipeline owned by the pipeline registry
    PipelineHandle,
    /// Renderpass owned by the renderer frontend
    RenderPassHandle,
    /// Render target (framebuffer) owned by the renderer frontend
    RenderTargetHandle,
    /// Material owned by the material system
    MaterialHandle,
    /// Geometry owned by the geometry system
    GeometryHandle,
    /// Texture owned by the renderer frontend
    TextureHandle,
    /// GPU buffer owned by the renderer frontend
    BufferHandle,
    /// Mesh instance owned by the mesh manager
    MeshInstanceHandle,
    /// Per-pipeline per-draw instance state owned by the pipeline registry
    RendererInstanceStateHandle,
    /// Camera owned by the camera registry
    CameraHandle,
}

/// Image layout as far as the core is concerned.
///
/// The backend maps these onto its own transition machinery; the core only
/// requests transitions around custom-attachment passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureLayout {
    /// Freshly created, contents undefined
    Undefined,
    /// Written as a color attachment
    ColorAttachment,
    /// Written as a depth attachment
    DepthAttachment,
    /// Sampled in a shader
    ShaderReadOnly,
}

/// Texture usage bits for attachment creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureUsage {
    /// Color attachment only
    ColorAttachment,
    /// Color attachment that is also sampled (editor viewport)
    ColorAttachmentSampled,
    /// Depth attachment
    DepthAttachment,
}

/// Descriptor for an offscreen attachment texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Debug name
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub usage: TextureUsage,
}

/// Load operation for a renderpass attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// Clear the attachment at pass begin
    Clear,
    /// Preserve the previous contents
    Load,
}

/// Descriptor for a renderpass created by the core (offscreen passes)
#[derive(Debug, Clone)]
pub struct RenderPassDesc {
    /// Name the pass is registered under (resolvable by `renderpass_by_name`)
    pub name: String,
    pub color_load: LoadOp,
    pub depth_load: LoadOp,
    pub has_color: bool,
    pub has_depth: bool,
}

/// Descriptor for a render target
#[derive(Debug, Clone)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    /// Whether the backend should recreate the target on window resize
    pub sync_to_window_size: bool,
    /// Attachment textures, color first
    pub attachments: Vec<TextureHandle>,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

/// Per-draw record written into the persistent instance buffer.
///
/// Layout is shared with the shaders; keep field order fixed.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceData {
    /// World matrix, column-major
    pub model: [[f32; 4]; 4],
    /// Picking object id (0 = no pick)
    pub object_id: u32,
    /// Reserved for bindless material indexing
    pub material_index: u32,
    /// Reserved per-instance flags
    pub flags: u32,
    pub padding: u32,
}

impl InstanceData {
    /// Build a record from a world matrix and picking object id
    pub fn new(model: &Mat4, object_id: u32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            object_id,
            material_index: 0,
            flags: 0,
            padding: 0,
        }
    }
}

/// One indexed draw inside an indirect buffer.
///
/// Field order matches `VkDrawIndexedIndirectCommand`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct IndirectDrawCommand {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

/// Stride of one indirect command in the indirect buffer
pub const INDIRECT_DRAW_STRIDE: u32 = std::mem::size_of::<IndirectDrawCommand>() as u32;
