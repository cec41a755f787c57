/// The editor view layer.
///
/// Frames the world layer's offscreen image as a textured quad inside the
/// editor panel layout. Recomputes the viewport mapping whenever the
/// window size, fit mode, or render scale changes and tells the world
/// layer what offscreen target size it needs.

use crate::error::Result;
use crate::{engine_debug, engine_warn};
use crate::input::InputState;
use crate::renderer::PipelineDomain;
use crate::view::message::{
    FitModePayload, Message, OffscreenSizePayload, RenderScalePayload, ResponseBuffer,
    MSG_EDITOR_GET_VIEWPORT_MAPPING, MSG_EDITOR_SET_RENDER_SCALE,
    MSG_EDITOR_SET_VIEWPORT_FIT_MODE, MSG_WORLD_SET_OFFSCREEN_SIZE,
};
use crate::view::{LayerCallbacks, LayerContext, LayerHandle, LayerState};
use super::viewport::{
    clamp_render_scale, compute_viewport, window_to_target_pixel, FitMode, ViewportMapping,
};

const SOURCE: &str = "strata3d::EditorViewLayer";

/// Tunables for the editor layer
#[derive(Debug, Clone)]
pub struct EditorViewConfig {
    /// Shader configuration for the viewport quad
    pub quad_shader: String,
    /// Name of the world layer to keep sized
    pub world_layer_name: String,
    pub fit_mode: FitMode,
    pub render_scale: f32,
}

impl Default for EditorViewConfig {
    fn default() -> Self {
        Self {
            quad_shader: "builtin.editor_quad".to_string(),
            world_layer_name: "world".to_string(),
            fit_mode: FitMode::Contain,
            render_scale: 1.0,
        }
    }
}

/// Editor layer callbacks + state.
pub struct EditorViewLayer {
    config: EditorViewConfig,
    fit_mode: FitMode,
    render_scale: f32,
    mapping: ViewportMapping,
    world_layer: Option<LayerHandle>,
}

impl EditorViewLayer {
    pub fn new(config: EditorViewConfig) -> Self {
        let fit_mode = config.fit_mode;
        let render_scale = clamp_render_scale(config.render_scale);
        Self {
            config,
            fit_mode,
            render_scale,
            mapping: compute_viewport(1, 1, fit_mode, render_scale),
            world_layer: None,
        }
    }

    /// The current viewport mapping
    pub fn mapping(&self) -> &ViewportMapping {
        &self.mapping
    }

    /// Map a window pixel into offscreen-target coordinates
    pub fn window_to_target(&self, wx: i32, wy: i32) -> Option<(u32, u32)> {
        window_to_target_pixel(&self.mapping, wx, wy)
    }

    fn recompute(&mut self, width: u32, height: u32) {
        self.mapping = compute_viewport(width, height, self.fit_mode, self.render_scale);
    }

    fn notify_world(&mut self, ctx: &mut LayerContext<'_>) {
        let world = match self.world_layer {
            Some(handle) if ctx.layer_enabled(handle) => Some(handle),
            _ => {
                self.world_layer = ctx.layer_by_name(&self.config.world_layer_name);
                self.world_layer
            }
        };
        let Some(world) = world else {
            engine_debug!(SOURCE, "no world layer to size");
            return;
        };
        let msg = Message::with_payload(
            MSG_WORLD_SET_OFFSCREEN_SIZE,
            &OffscreenSizePayload {
                width: self.mapping.target_width,
                height: self.mapping.target_height,
            },
        );
        if ctx.send_msg_no_rsp(world, &msg).is_err() {
            engine_warn!(SOURCE, "world layer rejected offscreen size");
        }
    }
}

impl LayerCallbacks for EditorViewLayer {
    fn on_create(&mut self, state: &mut LayerState, _ctx: &mut LayerContext<'_>) -> Result<()> {
        self.recompute(state.width, state.height);
        Ok(())
    }

    fn on_attach(&mut self, _state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        self.notify_world(ctx);
    }

    fn on_resize(
        &mut self,
        _state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        width: u32,
        height: u32,
    ) {
        self.recompute(width, height);
        self.notify_world(ctx);
    }

    fn on_update(
        &mut self,
        _state: &mut LayerState,
        _ctx: &mut LayerContext<'_>,
        _dt: f32,
        input: Option<&InputState>,
    ) -> bool {
        // The editor chrome swallows pointer input that lands on it, so
        // layers underneath do not react to panel clicks
        let Some(input) = input else {
            return false;
        };
        !input.mouse_captured && input.mouse_delta != glam::Vec2::ZERO
    }

    fn on_render(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        _dt: f32,
        pass_index: usize,
        _image_index: u32,
    ) -> Result<()> {
        let Some(renderpass) = state.passes.get(pass_index).and_then(|p| p.renderpass) else {
            return Ok(());
        };
        let services = ctx.services().clone();
        let pipeline = services.pipelines.lock().unwrap().resolve(
            &self.config.quad_shader,
            PipelineDomain::Overlay,
            renderpass,
        );
        let Some(pipeline) = pipeline else {
            engine_warn!(SOURCE, "viewport quad pipeline unavailable");
            return Ok(());
        };
        services.pipelines.lock().unwrap().bind(pipeline);
        // Vertex-less quad: positions derive from the vertex index
        services.renderer.lock().unwrap().draw(6, 1, 0, 0);
        Ok(())
    }

    fn on_message(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        msg: &Message,
        rsp: Option<&mut ResponseBuffer>,
    ) {
        match msg.kind() {
            MSG_EDITOR_GET_VIEWPORT_MAPPING => {
                if let Some(rsp) = rsp {
                    rsp.write(
                        MSG_EDITOR_GET_VIEWPORT_MAPPING,
                        0,
                        &self.mapping.to_response(),
                    );
                }
            }
            MSG_EDITOR_SET_VIEWPORT_FIT_MODE => {
                let Some(payload) = msg.payload::<FitModePayload>() else {
                    return;
                };
                let Some(fit_mode) = FitMode::from_u32(payload.fit_mode) else {
                    engine_warn!(SOURCE, "unknown fit mode {}", payload.fit_mode);
                    return;
                };
                if fit_mode != self.fit_mode {
                    self.fit_mode = fit_mode;
                    self.recompute(state.width, state.height);
                    self.notify_world(ctx);
                }
            }
            MSG_EDITOR_SET_RENDER_SCALE => {
                let Some(payload) = msg.payload::<RenderScalePayload>() else {
                    return;
                };
                let scale = clamp_render_scale(payload.scale);
                if (scale - self.render_scale).abs() > f32::EPSILON {
                    self.render_scale = scale;
                    self.recompute(state.width, state.height);
                    self.notify_world(ctx);
                }
            }
            _ => {}
        }
    }
}
