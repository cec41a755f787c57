//! Integration tests for the editor view layer: viewport mapping queries,
//! fit-mode and render-scale messages, and world-layer size notifications.

mod support;

use strata_3d_engine::editor_view::{
    compute_viewport, EditorViewConfig, EditorViewLayer, FitMode,
};
use strata_3d_engine::view::message::{
    FitModePayload, Message, OffscreenSizePayload, RenderScalePayload, ResponseBuffer,
    ViewportMappingResponse, MSG_EDITOR_GET_VIEWPORT_MAPPING, MSG_EDITOR_SET_RENDER_SCALE,
    MSG_EDITOR_SET_VIEWPORT_FIT_MODE, MSG_WORLD_SET_OFFSCREEN_SIZE,
};
use strata_3d_engine::view::{LayerConfig, LayerHandle};
use support::{Fixture, MessageLog};

fn register_editor(fixture: &mut Fixture) -> LayerHandle {
    let callbacks = EditorViewLayer::new(EditorViewConfig::default());
    let mut config = LayerConfig::new("editor", Box::new(callbacks));
    config.order = 50;
    fixture.vs.register_layer(config).unwrap()
}

fn world_sizes(log: &MessageLog) -> Vec<(u32, u32)> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|m| m.kind() == MSG_WORLD_SET_OFFSCREEN_SIZE)
        .filter_map(|m| m.payload::<OffscreenSizePayload>())
        .map(|p| (p.width, p.height))
        .collect()
}

#[test]
fn test_editor_sizes_world_on_attach() {
    let mut fixture = Fixture::new(2, 800, 600);
    let (_world, world_log) = fixture.register_recorder("world", 0);
    register_editor(&mut fixture);

    let expected = compute_viewport(800, 600, FitMode::Contain, 1.0);
    assert_eq!(
        world_sizes(&world_log),
        vec![(expected.target_width, expected.target_height)]
    );
}

#[test]
fn test_get_viewport_mapping_response() {
    let mut fixture = Fixture::new(2, 800, 600);
    let editor = register_editor(&mut fixture);

    let msg = Message::new(MSG_EDITOR_GET_VIEWPORT_MAPPING).expect_response();
    let mut rsp = ResponseBuffer::new(std::mem::size_of::<ViewportMappingResponse>());
    fixture.vs.send_msg(editor, &msg, Some(&mut rsp)).unwrap();

    assert_eq!(rsp.error(), Some(0));
    let mapping = rsp.body::<ViewportMappingResponse>().unwrap();
    let expected = compute_viewport(800, 600, FitMode::Contain, 1.0).to_response();
    assert_eq!(mapping, expected);
}

#[test]
fn test_render_scale_message_rescales_target() {
    let mut fixture = Fixture::new(2, 800, 600);
    let (_world, world_log) = fixture.register_recorder("world", 0);
    let editor = register_editor(&mut fixture);
    world_log.lock().unwrap().clear();

    let msg = Message::with_payload(MSG_EDITOR_SET_RENDER_SCALE, &RenderScalePayload { scale: 0.5 });
    fixture.vs.send_msg_no_rsp(editor, &msg).unwrap();

    let expected = compute_viewport(800, 600, FitMode::Contain, 0.5);
    assert_eq!(
        world_sizes(&world_log),
        vec![(expected.target_width, expected.target_height)]
    );
}

#[test]
fn test_render_scale_clamps_out_of_range() {
    let mut fixture = Fixture::new(2, 800, 600);
    let (_world, world_log) = fixture.register_recorder("world", 0);
    let editor = register_editor(&mut fixture);
    world_log.lock().unwrap().clear();

    let msg = Message::with_payload(MSG_EDITOR_SET_RENDER_SCALE, &RenderScalePayload { scale: 9.0 });
    fixture.vs.send_msg_no_rsp(editor, &msg).unwrap();

    let expected = compute_viewport(800, 600, FitMode::Contain, 2.0);
    assert_eq!(
        world_sizes(&world_log),
        vec![(expected.target_width, expected.target_height)]
    );
}

#[test]
fn test_fit_mode_message_recomputes() {
    let mut fixture = Fixture::new(2, 800, 600);
    let (_world, world_log) = fixture.register_recorder("world", 0);
    let editor = register_editor(&mut fixture);
    world_log.lock().unwrap().clear();

    let msg = Message::with_payload(
        MSG_EDITOR_SET_VIEWPORT_FIT_MODE,
        &FitModePayload { fit_mode: FitMode::Stretch as u32 },
    );
    fixture.vs.send_msg_no_rsp(editor, &msg).unwrap();

    let expected = compute_viewport(800, 600, FitMode::Stretch, 1.0);
    assert_eq!(
        world_sizes(&world_log),
        vec![(expected.target_width, expected.target_height)]
    );

    // Re-sending the same mode is a no-op
    world_log.lock().unwrap().clear();
    let msg = Message::with_payload(
        MSG_EDITOR_SET_VIEWPORT_FIT_MODE,
        &FitModePayload { fit_mode: FitMode::Stretch as u32 },
    );
    fixture.vs.send_msg_no_rsp(editor, &msg).unwrap();
    assert!(world_sizes(&world_log).is_empty());
}

#[test]
fn test_window_resize_renotifies_world() {
    let mut fixture = Fixture::new(2, 800, 600);
    let (_world, world_log) = fixture.register_recorder("world", 0);
    register_editor(&mut fixture);
    world_log.lock().unwrap().clear();

    fixture.vs.on_resize(1920, 1080);

    let expected = compute_viewport(1920, 1080, FitMode::Contain, 1.0);
    assert_eq!(
        world_sizes(&world_log),
        vec![(expected.target_width, expected.target_height)]
    );
}

#[test]
fn test_editor_quad_draws_each_frame() {
    let mut fixture = Fixture::new(2, 800, 600);
    register_editor(&mut fixture);

    fixture.vs.draw_all(0.016, 0);

    let renderer = fixture.handles.renderer.lock().unwrap();
    assert!(renderer.calls.iter().any(|c| c == "draw"));
}
