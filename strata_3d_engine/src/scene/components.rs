/// Scene component types.
///
/// Columns are stored per component in the world; every struct here is the
/// payload of one column. Transforms carry the dirty bitset that drives
/// the two-pass update.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3, Vec4};
use crate::renderer::MeshInstanceHandle;
use super::world::EntityId;

bitflags! {
    /// Transform dirty tracking
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TransformFlags: u32 {
        /// Position/rotation/scale changed; local matrix is stale
        const DIRTY_LOCAL = 1 << 0;
        /// World matrix is stale
        const DIRTY_WORLD = 1 << 1;
        /// Parent link changed
        const DIRTY_HIERARCHY = 1 << 2;
        /// World matrix was recomputed this frame (drives deferred
        /// child propagation); cleared at the start of the next local pass
        const WORLD_UPDATED = 1 << 3;
    }
}

/// Entity display name
#[derive(Debug, Clone)]
pub struct SceneName {
    pub name: String,
}

/// Hierarchy node with cached local and world matrices
#[derive(Debug, Clone, Copy)]
pub struct SceneTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Parent entity; null for roots
    pub parent: EntityId,
    pub local: Mat4,
    pub world: Mat4,
    pub flags: TransformFlags,
}

impl Default for SceneTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            parent: EntityId::default(),
            local: Mat4::IDENTITY,
            world: Mat4::IDENTITY,
            flags: TransformFlags::DIRTY_LOCAL.union(TransformFlags::DIRTY_WORLD),
        }
    }
}

/// Renderable via the mesh-instance path
#[derive(Debug, Clone, Copy)]
pub struct SceneMeshRenderer {
    pub instance: MeshInstanceHandle,
    /// The scene releases the instance at shutdown when it created it
    pub owned: bool,
}

/// Procedural shape kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Cube,
}

/// Renderable via the mesh-slot path
#[derive(Debug, Clone, Copy)]
pub struct SceneShape {
    pub kind: ShapeKind,
    pub dimensions: Vec3,
    pub color: Vec4,
    /// Mesh slot in the mesh manager
    pub mesh_index: u32,
}

/// Per-entity visibility
#[derive(Debug, Clone, Copy)]
pub struct SceneVisibility {
    pub visible: bool,
    /// Whether an invisible ancestor hides this entity
    pub inherit_parent: bool,
}

impl Default for SceneVisibility {
    fn default() -> Self {
        Self {
            visible: true,
            inherit_parent: true,
        }
    }
}

/// Picking/bridge key; ids are unique within a scene and never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneRenderId {
    pub id: u32,
}

/// 3D text managed through the WorldResources service
#[derive(Debug, Clone, Copy)]
pub struct SceneText3D {
    /// Slot index in the world-resources text pool
    pub text_index: u32,
    pub dirty: bool,
    pub world_width: f32,
    pub world_height: f32,
}

/// Point-light emitter
#[derive(Debug, Clone, Copy)]
pub struct ScenePointLight {
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub enabled: bool,
}

/// Sun/directional light
#[derive(Debug, Clone, Copy)]
pub struct SceneDirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}
