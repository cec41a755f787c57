/// Editor viewport layout and mapping.
///
/// The editor frames the scene image between fixed panel fractions (top
/// bar, bottom panel, left and right panels, a pixel gutter). The image
/// either stretches to the panel or is letterboxed/pillarboxed to a
/// reference aspect; the offscreen target takes the image size scaled by
/// the render scale. `window_to_target_pixel` is the pure mapping used by
/// picking: edges map to edges, intermediate math is u64 so large targets
/// cannot overflow.

use crate::view::message::ViewportMappingResponse;

/// Height fraction of the top bar
pub const TOP_BAR_FRACTION: f32 = 0.06;
/// Height fraction of the bottom panel
pub const BOTTOM_PANEL_FRACTION: f32 = 0.24;
/// Width fraction of the left panel
pub const LEFT_PANEL_FRACTION: f32 = 0.18;
/// Width fraction of the right panel
pub const RIGHT_PANEL_FRACTION: f32 = 0.22;
/// Gutter between panels and the viewport, in pixels
pub const PANEL_GUTTER_PX: u32 = 8;

/// Render scale bounds
pub const MIN_RENDER_SCALE: f32 = 0.25;
pub const MAX_RENDER_SCALE: f32 = 2.0;

/// Reference aspect the CONTAIN mode letterboxes to
const CONTAIN_ASPECT: f32 = 16.0 / 9.0;

/// How the scene image fills the viewport panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    /// Fill the panel, distorting aspect
    Stretch = 0,
    /// Letterbox/pillarbox to the reference aspect
    Contain = 1,
}

impl FitMode {
    /// Decode a wire value
    pub fn from_u32(value: u32) -> Option<FitMode> {
        match value {
            0 => Some(FitMode::Stretch),
            1 => Some(FitMode::Contain),
            _ => None,
        }
    }
}

/// An integer pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectPx {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl RectPx {
    /// Whether a window point falls inside the rect
    pub fn contains(&self, wx: i32, wy: i32) -> bool {
        wx >= self.x
            && wy >= self.y
            && (wx - self.x) < self.width as i32
            && (wy - self.y) < self.height as i32
    }
}

/// The computed viewport mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportMapping {
    /// Region between the panels
    pub panel_rect_px: RectPx,
    /// Region the scene image occupies within the panel
    pub image_rect_px: RectPx,
    /// Offscreen target size
    pub target_width: u32,
    pub target_height: u32,
    pub fit_mode: FitMode,
}

impl ViewportMapping {
    /// Wire form for EDITOR_GET_VIEWPORT_MAPPING responses
    pub fn to_response(&self) -> ViewportMappingResponse {
        ViewportMappingResponse {
            panel_rect: [
                self.panel_rect_px.x,
                self.panel_rect_px.y,
                self.panel_rect_px.width as i32,
                self.panel_rect_px.height as i32,
            ],
            image_rect: [
                self.image_rect_px.x,
                self.image_rect_px.y,
                self.image_rect_px.width as i32,
                self.image_rect_px.height as i32,
            ],
            target_width: self.target_width,
            target_height: self.target_height,
            fit_mode: self.fit_mode as u32,
            _pad: 0,
        }
    }
}

/// Clamp a render scale into its valid range
pub fn clamp_render_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE)
}

/// Compute the viewport mapping for a window size, fit mode, and render
/// scale.
///
/// The viewport width subtracts only the side panels and gutters; the
/// vertical bars contribute to height alone.
pub fn compute_viewport(
    window_width: u32,
    window_height: u32,
    fit_mode: FitMode,
    render_scale: f32,
) -> ViewportMapping {
    let left = (window_width as f32 * LEFT_PANEL_FRACTION).round() as u32;
    let right = (window_width as f32 * RIGHT_PANEL_FRACTION).round() as u32;
    let top = (window_height as f32 * TOP_BAR_FRACTION).round() as u32;
    let bottom = (window_height as f32 * BOTTOM_PANEL_FRACTION).round() as u32;

    let used_w = left + right + PANEL_GUTTER_PX * 2;
    let used_h = top + bottom + PANEL_GUTTER_PX * 2;
    let panel_width = window_width.saturating_sub(used_w).max(1);
    let panel_height = window_height.saturating_sub(used_h).max(1);
    let panel_rect_px = RectPx {
        x: (left + PANEL_GUTTER_PX) as i32,
        y: (top + PANEL_GUTTER_PX) as i32,
        width: panel_width,
        height: panel_height,
    };

    let image_rect_px = match fit_mode {
        FitMode::Stretch => panel_rect_px,
        FitMode::Contain => {
            let panel_aspect = panel_width as f32 / panel_height as f32;
            let (image_width, image_height) = if panel_aspect > CONTAIN_ASPECT {
                // Wider than the reference: pillarbox
                (
                    ((panel_height as f32 * CONTAIN_ASPECT).round() as u32).max(1),
                    panel_height,
                )
            } else {
                // Taller than the reference: letterbox
                (
                    panel_width,
                    ((panel_width as f32 / CONTAIN_ASPECT).round() as u32).max(1),
                )
            };
            RectPx {
                x: panel_rect_px.x + ((panel_width - image_width) / 2) as i32,
                y: panel_rect_px.y + ((panel_height - image_height) / 2) as i32,
                width: image_width,
                height: image_height,
            }
        }
    };

    let scale = clamp_render_scale(render_scale);
    let target_width = ((image_rect_px.width as f32 * scale).round() as u32).max(1);
    let target_height = ((image_rect_px.height as f32 * scale).round() as u32).max(1);

    ViewportMapping {
        panel_rect_px,
        image_rect_px,
        target_width,
        target_height,
        fit_mode,
    }
}

/// Map a window pixel into target-texture coordinates.
///
/// Returns None outside the image rect. Edges map to edges: the top-left
/// image pixel is (0, 0), the bottom-right is (target-1, target-1); a
/// one-pixel-wide image always maps to 0. Intermediate products are u64.
pub fn window_to_target_pixel(
    mapping: &ViewportMapping,
    wx: i32,
    wy: i32,
) -> Option<(u32, u32)> {
    let rect = mapping.image_rect_px;
    if !rect.contains(wx, wy) {
        return None;
    }
    let dx = (wx - rect.x) as u64;
    let dy = (wy - rect.y) as u64;
    let target_width = mapping.target_width.max(1) as u64;
    let target_height = mapping.target_height.max(1) as u64;

    let tx = if rect.width <= 1 {
        0
    } else {
        dx * (target_width - 1) / (rect.width as u64 - 1)
    };
    let ty = if rect.height <= 1 {
        0
    } else {
        dy * (target_height - 1) / (rect.height as u64 - 1)
    };
    Some((
        tx.min(target_width - 1) as u32,
        ty.min(target_height - 1) as u32,
    ))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "viewport_tests.rs"]
mod tests;
