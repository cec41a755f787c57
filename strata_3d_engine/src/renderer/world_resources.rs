/// World resources contract — the external 3D-text service.
///
/// Glyph atlas creation and text mesh building live outside the core; the
/// scene and the world view layer only push text content, configuration,
/// and transforms, and read back world-space dimensions and draw buffers.

use glam::{Mat4, Vec4};
use crate::error::Result;
use super::types::{BufferHandle, PipelineHandle, TextureHandle};

/// Configuration for a 3D text
#[derive(Debug, Clone)]
pub struct Text3dConfig {
    pub text: String,
    /// Glyph size in world units
    pub size: f32,
    pub color: Vec4,
}

/// Buffers and atlas needed to draw a built text
#[derive(Debug, Clone, Copy)]
pub struct TextDrawData {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub atlas: TextureHandle,
}

/// World resources contract.
pub trait WorldResources: Send + Sync {
    /// Build a text, returning its slot index
    fn text_create(&mut self, config: &Text3dConfig, transform: &Mat4) -> Result<u32>;

    /// Rebuild a text's content/config in place
    fn text_update(&mut self, text_index: u32, config: &Text3dConfig) -> Result<()>;

    /// Move a text; false on invalid index
    fn text_set_transform(&mut self, text_index: u32, transform: &Mat4) -> bool;

    /// Destroy a text slot
    fn text_destroy(&mut self, text_index: u32);

    /// Computed world-space width/height of a built text
    fn text_world_size(&self, text_index: u32) -> Option<(f32, f32)>;

    /// Buffers for drawing a built text
    fn text_draw_data(&self, text_index: u32) -> Option<TextDrawData>;

    /// Rebind a text to a pipeline (offscreen toggle / pipeline change)
    fn text_rebind_pipeline(&mut self, text_index: u32, pipeline: PipelineHandle) -> bool;
}
