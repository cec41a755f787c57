//! Camera module — frustum culling and the fly-camera controller.
//!
//! Provides passive tools for the rendering layers. The engine does NOT
//! own cameras; layers carry their own view/projection matrices and the
//! world layer drives a controller from captured input.

mod controller;
mod frustum;

pub use controller::CameraController;
pub use frustum::{
    Frustum,
    PLANE_LEFT, PLANE_RIGHT, PLANE_BOTTOM, PLANE_TOP, PLANE_NEAR, PLANE_FAR,
};
