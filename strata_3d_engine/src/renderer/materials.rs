/// Material system contract.
///
/// Materials are opaque to the core except for the fields the draw path
/// reads: the shader that renders them, the cutout inputs that decide
/// opaque vs transparent classification, and the emission color the light
/// gizmos write.

use glam::{Vec3, Vec4};
use crate::error::Result;
use super::types::{MaterialHandle, TextureHandle};

/// Shader used when a material names none
pub const DEFAULT_SHADER_NAME: &str = "builtin.world";

/// The slice of a material the draw path consumes
#[derive(Debug, Clone)]
pub struct MaterialData {
    /// Shader configuration name (drives pipeline resolution)
    pub shader_name: String,
    /// Alpha-test threshold; > 0 makes the material a cutout candidate
    pub alpha_cutoff: f32,
    /// Whether the diffuse texture slot is enabled
    pub diffuse_enabled: bool,
    /// Diffuse texture; invalid handle means no texture bound
    pub diffuse_texture: TextureHandle,
    /// Emission color (light gizmos)
    pub emission_color: Vec3,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            shader_name: DEFAULT_SHADER_NAME.to_string(),
            alpha_cutoff: 0.0,
            diffuse_enabled: false,
            diffuse_texture: TextureHandle::INVALID,
            emission_color: Vec3::ZERO,
        }
    }
}

/// Material system contract.
pub trait MaterialSystem: Send + Sync {
    /// Look up a material's draw-path data
    fn material(&self, handle: MaterialHandle) -> Option<MaterialData>;

    /// The always-available fallback material
    fn default_material(&self) -> MaterialHandle;

    /// Create a flat-colored material
    fn create_colored(&mut self, name: &str, color: Vec4) -> Result<MaterialHandle>;

    /// Load a material config by name and path (`.mt` files)
    fn load(&mut self, name: &str, path: &str) -> Result<MaterialHandle>;

    /// Set a material's emission color; false on stale handle
    fn set_emission_color(&mut self, handle: MaterialHandle, color: Vec3) -> bool;

    /// Release a material
    fn release(&mut self, handle: MaterialHandle);
}
