//! View system module
//!
//! A composable stack of rendering layers: registration with generational
//! handles, ordered rendering, modal-input routing, per-layer typed message
//! dispatch, and render-target construction tied to the swapchain.

mod behavior;
mod layer;
pub mod message;
mod view_system;

pub use behavior::LayerBehavior;
pub use layer::{
    LayerBehaviorHandle, LayerCallbacks, LayerConfig, LayerFlags, LayerHandle, LayerPass,
    LayerPassConfig, LayerState, MAX_LAYERS, MAX_LAYER_BEHAVIORS, MAX_LAYER_PASSES,
};
pub use message::{Message, ResponseBuffer};
pub use view_system::{LayerContext, ViewSystem};

pub(crate) use view_system::build_pass_targets;
