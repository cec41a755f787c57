/// Pipeline registry contract and the global uniform blocks the world
/// layer applies through it.
///
/// Pipelines are resolved by (shader name, domain, renderpass) so the same
/// material renders through renderpass-compatible pipeline objects in both
/// onscreen and offscreen forms. Instance states are per-pipeline per-draw
/// slots tying a material's uniforms and descriptor binding to a draw call.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use super::types::{MaterialHandle, PipelineHandle, RenderPassHandle, RendererInstanceStateHandle};

/// Maximum shadow cascades carried in shadow frame data
pub const MAX_SHADOW_CASCADES: usize = 4;

/// Maximum point lights in the lighting globals
pub const MAX_POINT_LIGHTS: usize = 16;

/// Rendering domain a pipeline belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineDomain {
    Opaque,
    Transparent,
    Overlay,
    Text,
}

/// One point light as applied to pipeline globals
#[derive(Debug, Clone, Copy, Default)]
pub struct PointLightGlobal {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
}

/// Lighting uniforms collected from the scene each frame
#[derive(Debug, Clone, Copy)]
pub struct LightingGlobals {
    pub ambient_color: Vec4,
    pub directional_direction: Vec3,
    pub directional_color: Vec3,
    pub directional_intensity: f32,
    pub point_count: u32,
    pub points: [PointLightGlobal; MAX_POINT_LIGHTS],
}

impl Default for LightingGlobals {
    fn default() -> Self {
        Self {
            ambient_color: Vec4::new(0.03, 0.03, 0.03, 1.0),
            directional_direction: Vec3::new(-0.4, -1.0, -0.3),
            directional_color: Vec3::ONE,
            directional_intensity: 1.0,
            point_count: 0,
            points: [PointLightGlobal::default(); MAX_POINT_LIGHTS],
        }
    }
}

/// Per-frame shadow snapshot returned by the shadow layer.
///
/// Wire format: this struct is the body of the `SHADOW_GET_FRAME_DATA`
/// response; keep it plain and padding-free.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ShadowFrameData {
    /// Per-cascade view-projection matrices, column-major
    pub cascade_view_proj: [[f32; 16]; MAX_SHADOW_CASCADES],
    /// Per-cascade 1.0 / shadow map size
    pub inv_map_size: [f32; MAX_SHADOW_CASCADES],
    /// Per-cascade split far distance
    pub split_far: [f32; MAX_SHADOW_CASCADES],
    /// Per-cascade world units covered by one texel
    pub world_units_per_texel: [f32; MAX_SHADOW_CASCADES],
    pub cascade_count: u32,
    pub depth_bias: f32,
    pub slope_bias: f32,
    pub pcf_radius: f32,
    pub fade_start: f32,
    pub fade_range: f32,
    pub debug_flags: u32,
    /// Shadow map texture as raw handle parts (id, generation)
    pub shadow_map: [u32; 2],
    pub _pad: [u32; 3],
}

impl Default for ShadowFrameData {
    fn default() -> Self {
        Zeroable::zeroed()
    }
}

/// Shadow uniforms as applied to a pipeline.
///
/// When the shadow layer does not respond, `comparison_enabled` is false but
/// the shadow-map binding stays in place so descriptor layouts remain
/// compatible.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadowGlobals {
    pub frame: ShadowFrameData,
    pub comparison_enabled: bool,
}

/// Pipeline registry contract.
pub trait PipelineRegistry: Send + Sync {
    /// Resolve the pipeline for a shader in a domain, compatible with a renderpass
    fn resolve(
        &mut self,
        shader: &str,
        domain: PipelineDomain,
        renderpass: RenderPassHandle,
    ) -> Option<PipelineHandle>;

    /// Bind a pipeline; false on stale handle
    fn bind(&mut self, pipeline: PipelineHandle) -> bool;

    /// Apply lighting uniforms to a pipeline's globals
    fn apply_lighting(&mut self, pipeline: PipelineHandle, lighting: &LightingGlobals);

    /// Apply shadow cascade uniforms and the shadow-map binding
    fn apply_shadow_globals(&mut self, pipeline: PipelineHandle, shadow: &ShadowGlobals);

    /// Apply domain-wide material state (blend/cutout defaults)
    fn apply_domain_globals(&mut self, pipeline: PipelineHandle, domain: PipelineDomain);

    /// Mark all per-pipeline globals stale (camera change)
    fn mark_globals_dirty(&mut self);

    // ===== INSTANCE STATES =====

    /// Acquire a per-draw instance state for a pipeline
    fn acquire_instance_state(
        &mut self,
        pipeline: PipelineHandle,
    ) -> Option<RendererInstanceStateHandle>;

    /// Release a per-draw instance state
    fn release_instance_state(&mut self, state: RendererInstanceStateHandle);

    /// Bind an instance state for the next draw
    fn bind_instance_state(&mut self, state: RendererInstanceStateHandle);

    /// Upload a material's uniforms into an instance state
    fn apply_instance_material(
        &mut self,
        state: RendererInstanceStateHandle,
        material: MaterialHandle,
    );
}
