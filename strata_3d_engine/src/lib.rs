/*!
# Strata3D Engine

Core of the Strata3D real-time renderer: a layered view system over a
Vulkan-style backend, an ECS scene graph bridged into the renderer's mesh
manager, and the world/editor view layers that turn both into draws.

## Architecture

- **View system**: a bounded registry of rendering layers with generational
  handles, stable render order, modal input routing, typed message passing,
  and swapchain-tied render targets.
- **Scene**: an ECS world whose transform hierarchy is refreshed by a
  topologically ordered two-pass update, synchronized into the mesh manager
  through a dirty-driven bridge that also backs GPU picking.
- **World view layer**: frustum-culled draw batching with instance-buffer
  and multi-draw-indirect issuance, shadow-data integration, 3D world text,
  point-light gizmos, and an editor-viewport offscreen mode.
- **Renderer contracts**: the narrow traits the backend and surrounding
  systems implement; mock implementations ship for GPU-free tests.

Backend implementations (Vulkan, etc.) live in their own crates and plug in
through [`renderer::RendererFrontend`].
*/

// Error handling module
pub mod error;

// Internal logging system
pub mod log;

// Generational handles and slot tables
pub mod utils;

// Per-frame input snapshot
pub mod input;

// Frustum and fly-camera tools
pub mod camera;

// Renderer-facing contracts and mocks
pub mod renderer;

// Layered view system
pub mod view;

// ECS scene graph + render bridge
pub mod scene;

// World view layer (primary 3D pass)
pub mod world_view;

// Editor view layer (viewport framing + picking mapping)
pub mod editor_view;

// Re-export error types at crate root
pub use error::{EngineError, Result, SceneError};

// Re-export the math library
pub use glam;
