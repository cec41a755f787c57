/// Geometry system contract.
///
/// Creates procedural geometry for scene shapes and gizmos, and exposes the
/// buffers a draw needs.

use glam::Vec3;
use crate::error::Result;
use super::types::{BufferHandle, GeometryHandle};

/// Buffers and counts needed to draw a geometry directly
#[derive(Debug, Clone, Copy)]
pub struct GeometryDrawData {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

/// Geometry system contract.
pub trait GeometrySystem: Send + Sync {
    /// Create a box geometry with the given extents
    fn create_cube(&mut self, dimensions: Vec3) -> Result<GeometryHandle>;

    /// Create a UV sphere geometry with the given radius
    fn create_sphere(&mut self, radius: f32) -> Result<GeometryHandle>;

    /// Local-space bounding sphere of a geometry
    fn bounding_sphere(&self, handle: GeometryHandle) -> Option<(Vec3, f32)>;

    /// Buffers for drawing the geometry directly (gizmos)
    fn draw_data(&self, handle: GeometryHandle) -> Option<GeometryDrawData>;

    /// Release a geometry
    fn release(&mut self, handle: GeometryHandle);
}
