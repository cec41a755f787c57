//! World view layer module
//!
//! The primary 3D pass: draw batching with frustum culling, instance
//! buffer and multi-draw-indirect issuance, shadow-data integration, 3D
//! world text, point-light gizmos, camera control, and the editor-viewport
//! offscreen mode.

mod batch;
mod layer;
mod offscreen;
mod text;

pub use batch::{material_is_cutout, DrawBatch, DrawBatcher, DrawCommand, DrawKey};
pub use layer::{world_text_create_message, WorldViewConfig, WorldViewLayer};
pub use offscreen::{
    OffscreenState, OFFSCREEN_SKYBOX_RENDERPASS, OFFSCREEN_WORLD_RENDERPASS,
};
pub use text::{TextSlotPool, MAX_TEXTS};
