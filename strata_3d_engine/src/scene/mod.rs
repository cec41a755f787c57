//! Scene module
//!
//! An ECS scene graph: topologically ordered two-pass transform updates, a
//! parent→children index, dirty-driven synchronization into the mesh
//! manager, and GPU-picking id resolution back to entities.

mod bridge;
mod child_index;
pub mod components;
pub mod picking;
mod runtime;
#[allow(clippy::module_inception)]
mod scene;
mod world;

pub use bridge::SceneRenderBridge;
pub use child_index::ChildIndex;
pub use components::{
    SceneDirectionalLight, SceneMeshRenderer, SceneName, ScenePointLight, SceneRenderId,
    SceneShape, SceneText3D, SceneTransform, SceneVisibility, ShapeKind, TransformFlags,
};
pub use picking::{
    decode_picking_id, encode_picking_id, PickKind, PickingId, PICKING_ID_KIND_BITS,
    PICKING_ID_MAX_VALUE, PICKING_ID_SHIFT, PICKING_ID_VALUE_MASK,
};
pub use runtime::SceneRuntime;
pub use scene::{PointLightSnapshot, Scene, ShapeConfig, RENDER_DIRTY_CAPACITY};
pub use world::{EntityId, SceneWorld, DEFAULT_ENTITY_LIMIT};
