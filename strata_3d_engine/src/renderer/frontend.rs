/// Renderer frontend trait — the narrow contract the core consumes.
///
/// The Vulkan backend (or any other) implements this trait; the core never
/// sees command buffers, descriptor sets, or synchronization primitives
/// beyond what these operations express. All access goes through
/// `Arc<Mutex<dyn RendererFrontend>>` and runs on the render thread.

use crate::error::Result;
use super::types::{
    BufferHandle, IndexType, RenderPassDesc, RenderPassHandle, RenderTargetDesc,
    RenderTargetHandle, TextureDesc, TextureHandle, TextureLayout,
};

/// Main renderer frontend trait.
///
/// Failure policy: creation calls return `Err` on backend failure; draw and
/// state calls are fire-and-forget (the backend is expected to drop invalid
/// work and keep the frame alive).
pub trait RendererFrontend: Send + Sync {
    // ===== SWAPCHAIN-DERIVED ATTACHMENTS =====

    /// Number of swapchain images
    fn window_attachment_count(&self) -> u32;

    /// Swapchain color attachment for one image
    fn window_attachment(&self, image_index: u32) -> Option<TextureHandle>;

    /// The shared depth attachment, when the swapchain carries one
    fn depth_attachment(&self) -> Option<TextureHandle>;

    // ===== RENDERPASSES =====

    /// Look up a registered renderpass by name
    fn renderpass_by_name(&self, name: &str) -> Option<RenderPassHandle>;

    /// Create (and register under its name) a renderpass
    fn renderpass_create(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle>;

    /// Destroy a renderpass
    fn renderpass_destroy(&mut self, handle: RenderPassHandle);

    // ===== RENDER TARGETS =====

    /// Create a render target compatible with `renderpass`
    fn render_target_create(
        &mut self,
        desc: &RenderTargetDesc,
        renderpass: RenderPassHandle,
    ) -> Result<RenderTargetHandle>;

    /// Destroy a render target
    fn render_target_destroy(&mut self, handle: RenderTargetHandle);

    // ===== TEXTURES =====

    /// Create an attachment texture (offscreen color/depth)
    fn texture_create(&mut self, desc: &TextureDesc) -> Result<TextureHandle>;

    /// Destroy a texture
    fn texture_destroy(&mut self, handle: TextureHandle);

    /// Register a texture under a name so other layers can sample it
    fn register_sampled_texture(&mut self, handle: TextureHandle, name: &str) -> Result<()>;

    /// Transition a texture between layouts
    fn transition_texture_layout(
        &mut self,
        texture: TextureHandle,
        from: TextureLayout,
        to: TextureLayout,
    );

    // ===== SYNCHRONIZATION =====

    /// Block until the GPU is idle
    fn wait_idle(&mut self);

    // ===== PASS RECORDING =====

    /// Begin a renderpass on a target
    fn begin_render_pass(
        &mut self,
        renderpass: RenderPassHandle,
        target: RenderTargetHandle,
    ) -> Result<()>;

    /// End the current renderpass
    fn end_render_pass(&mut self);

    /// Bind a vertex buffer
    fn bind_vertex_buffer(&mut self, buffer: BufferHandle, offset: u64);

    /// Bind an index buffer
    fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, index_type: IndexType);

    /// Non-indexed draw
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32);

    /// Indexed draw
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );

    /// Issue `draw_count` indexed draws from an indirect buffer
    fn draw_indexed_indirect(
        &mut self,
        buffer: BufferHandle,
        offset: u64,
        draw_count: u32,
        stride: u32,
    );

    // ===== CAPABILITIES =====

    /// Whether the device supports multi-draw-indirect
    fn supports_multi_draw_indirect(&self) -> bool;

    /// Whether `first_instance` may come from an indirect buffer
    fn supports_indirect_first_instance(&self) -> bool;
}
