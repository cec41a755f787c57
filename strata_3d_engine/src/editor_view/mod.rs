//! Editor view layer module
//!
//! Frames the offscreen scene image inside an editor panel layout,
//! computes the window→target pixel mapping for picking, and keeps the
//! world layer's offscreen target sized to the viewport.

mod layer;
mod viewport;

pub use layer::{EditorViewConfig, EditorViewLayer};
pub use viewport::{
    clamp_render_scale, compute_viewport, window_to_target_pixel, FitMode, RectPx,
    ViewportMapping, BOTTOM_PANEL_FRACTION, LEFT_PANEL_FRACTION, MAX_RENDER_SCALE,
    MIN_RENDER_SCALE, PANEL_GUTTER_PX, RIGHT_PANEL_FRACTION, TOP_BAR_FRACTION,
};
