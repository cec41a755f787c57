use super::*;

fn literal_mapping() -> ViewportMapping {
    // The mapping from the picking contract: an 800×600 panel framing a
    // 720×540 image at (40, 30), targeting a 1280×720 texture
    ViewportMapping {
        panel_rect_px: RectPx { x: 0, y: 0, width: 800, height: 600 },
        image_rect_px: RectPx { x: 40, y: 30, width: 720, height: 540 },
        target_width: 1280,
        target_height: 720,
        fit_mode: FitMode::Contain,
    }
}

// ============================================================================
// Tests: window_to_target_pixel
// ============================================================================

#[test]
fn test_top_left_maps_to_origin() {
    let mapping = literal_mapping();
    assert_eq!(window_to_target_pixel(&mapping, 40, 30), Some((0, 0)));
}

#[test]
fn test_bottom_right_maps_to_last_pixel() {
    let mapping = literal_mapping();
    assert_eq!(
        window_to_target_pixel(&mapping, 40 + 719, 30 + 539),
        Some((1279, 719))
    );
}

#[test]
fn test_out_of_rect_is_rejected() {
    let mapping = literal_mapping();
    assert_eq!(window_to_target_pixel(&mapping, 39, 30), None);
    assert_eq!(window_to_target_pixel(&mapping, 40, 29), None);
    assert_eq!(window_to_target_pixel(&mapping, 40 + 720, 30), None);
    assert_eq!(window_to_target_pixel(&mapping, 40, 30 + 540), None);
    assert_eq!(window_to_target_pixel(&mapping, -5, -5), None);
}

#[test]
fn test_mapping_is_monotonic() {
    let mapping = literal_mapping();
    let (x0, _) = window_to_target_pixel(&mapping, 100, 100).unwrap();
    let (x1, _) = window_to_target_pixel(&mapping, 101, 100).unwrap();
    assert!(x1 >= x0);
}

#[test]
fn test_single_pixel_image_maps_to_zero() {
    let mapping = ViewportMapping {
        panel_rect_px: RectPx { x: 0, y: 0, width: 10, height: 10 },
        image_rect_px: RectPx { x: 3, y: 3, width: 1, height: 1 },
        target_width: 256,
        target_height: 256,
        fit_mode: FitMode::Stretch,
    };
    assert_eq!(window_to_target_pixel(&mapping, 3, 3), Some((0, 0)));
}

#[test]
fn test_large_target_does_not_overflow() {
    let mapping = ViewportMapping {
        panel_rect_px: RectPx { x: 0, y: 0, width: 10_000, height: 10_000 },
        image_rect_px: RectPx { x: 0, y: 0, width: 10_000, height: 10_000 },
        target_width: u32::MAX,
        target_height: u32::MAX,
        fit_mode: FitMode::Stretch,
    };
    let (tx, ty) = window_to_target_pixel(&mapping, 9_999, 9_999).unwrap();
    assert_eq!((tx, ty), (u32::MAX - 1, u32::MAX - 1));
}

// ============================================================================
// Tests: compute_viewport
// ============================================================================

#[test]
fn test_panel_fractions() {
    let mapping = compute_viewport(1000, 1000, FitMode::Stretch, 1.0);
    // left 180, right 220, top 60, bottom 240, gutter 8
    assert_eq!(mapping.panel_rect_px.x, 188);
    assert_eq!(mapping.panel_rect_px.y, 68);
    assert_eq!(mapping.panel_rect_px.width, 1000 - (180 + 220 + 16));
    assert_eq!(mapping.panel_rect_px.height, 1000 - (60 + 240 + 16));
}

#[test]
fn test_stretch_fills_panel() {
    let mapping = compute_viewport(1280, 720, FitMode::Stretch, 1.0);
    assert_eq!(mapping.image_rect_px, mapping.panel_rect_px);
    assert_eq!(mapping.target_width, mapping.image_rect_px.width);
    assert_eq!(mapping.target_height, mapping.image_rect_px.height);
}

#[test]
fn test_contain_letterboxes_to_reference_aspect() {
    let mapping = compute_viewport(1280, 720, FitMode::Contain, 1.0);
    let image = mapping.image_rect_px;
    // Image is centered inside the panel with the reference aspect
    let aspect = image.width as f32 / image.height as f32;
    assert!((aspect - 16.0 / 9.0).abs() < 0.02);
    assert!(image.width <= mapping.panel_rect_px.width);
    assert!(image.height <= mapping.panel_rect_px.height);
    assert!(image.x >= mapping.panel_rect_px.x);
    assert!(image.y >= mapping.panel_rect_px.y);
}

#[test]
fn test_render_scale_scales_target() {
    let base = compute_viewport(1280, 720, FitMode::Stretch, 1.0);
    let half = compute_viewport(1280, 720, FitMode::Stretch, 0.5);
    let double = compute_viewport(1280, 720, FitMode::Stretch, 2.0);

    assert_eq!(half.target_width, (base.target_width as f32 * 0.5).round() as u32);
    assert_eq!(double.target_width, base.target_width * 2);
    // The image rect itself is unaffected by scale
    assert_eq!(half.image_rect_px, base.image_rect_px);
}

#[test]
fn test_render_scale_clamps() {
    assert_eq!(clamp_render_scale(0.1), MIN_RENDER_SCALE);
    assert_eq!(clamp_render_scale(5.0), MAX_RENDER_SCALE);
    assert_eq!(clamp_render_scale(1.0), 1.0);
    assert_eq!(clamp_render_scale(f32::NAN), 1.0);
}

#[test]
fn test_tiny_window_never_degenerates() {
    let mapping = compute_viewport(20, 20, FitMode::Contain, 0.25);
    assert!(mapping.panel_rect_px.width >= 1);
    assert!(mapping.panel_rect_px.height >= 1);
    assert!(mapping.target_width >= 1);
    assert!(mapping.target_height >= 1);
}

#[test]
fn test_fit_mode_wire_roundtrip() {
    assert_eq!(FitMode::from_u32(0), Some(FitMode::Stretch));
    assert_eq!(FitMode::from_u32(1), Some(FitMode::Contain));
    assert_eq!(FitMode::from_u32(2), None);
}

#[test]
fn test_mapping_response_roundtrip() {
    let mapping = literal_mapping();
    let response = mapping.to_response();
    assert_eq!(response.panel_rect, [0, 0, 800, 600]);
    assert_eq!(response.image_rect, [40, 30, 720, 540]);
    assert_eq!(response.target_width, 1280);
    assert_eq!(response.target_height, 720);
    assert_eq!(response.fit_mode, 1);
}
