/// Offscreen mode for the world layer (editor viewport).
///
/// When enabled, the world pass stops drawing to the swapchain and targets
/// sampled color attachments sized to the editor viewport instead. The
/// skybox gets its own clear-loading renderpass over the same attachments,
/// the UI layer is told to composite into them, and every camera is
/// resized so aspect matches. Renderpasses are created once and retained
/// across toggles; attachments and targets are rebuilt per enable/resize.

use crate::error::Result;
use crate::{engine_debug, engine_warn};
use crate::renderer::{
    LoadOp, RenderPassDesc, RenderPassHandle, RenderServices, RenderTargetDesc,
    RenderTargetHandle, RendererFrontend, TextureDesc, TextureHandle, TextureLayout,
    TextureUsage,
};
use crate::view::message::{
    Message, OffscreenTargetsPayload, MAX_SWAPCHAIN_IMAGES,
    MSG_SKYBOX_SET_OFFSCREEN_TARGETS, MSG_UI_SET_OFFSCREEN_TARGETS,
};
use crate::view::{build_pass_targets, LayerContext, LayerState};

const SOURCE: &str = "strata3d::WorldOffscreen";

/// Name the offscreen world renderpass registers under
pub const OFFSCREEN_WORLD_RENDERPASS: &str = "world.offscreen";

/// Name the offscreen skybox renderpass registers under
pub const OFFSCREEN_SKYBOX_RENDERPASS: &str = "skybox.offscreen";

/// Offscreen resources and state for one world layer.
pub struct OffscreenState {
    pub enabled: bool,
    /// Requested target size; editor-owned once set explicitly
    width: u32,
    height: u32,
    pub explicit_size: bool,
    world_renderpass: Option<RenderPassHandle>,
    skybox_renderpass: Option<RenderPassHandle>,
    color_attachments: Vec<TextureHandle>,
    depth_attachments: Vec<TextureHandle>,
    world_targets: Vec<RenderTargetHandle>,
    skybox_targets: Vec<RenderTargetHandle>,
}

impl OffscreenState {
    pub fn new() -> Self {
        Self {
            enabled: false,
            width: 0,
            height: 0,
            explicit_size: false,
            world_renderpass: None,
            skybox_renderpass: None,
            color_attachments: Vec::new(),
            depth_attachments: Vec::new(),
            world_targets: Vec::new(),
            skybox_targets: Vec::new(),
        }
    }

    /// Current offscreen size
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Record an explicit (editor-owned) target size
    pub fn set_requested_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.explicit_size = true;
    }

    /// The offscreen skybox targets (for the skybox layer)
    pub fn skybox_targets(&self) -> &[RenderTargetHandle] {
        &self.skybox_targets
    }

    /// Enable offscreen mode: build renderpasses and per-image attachments,
    /// retarget the world pass, notify UI and skybox, resize cameras.
    pub fn enable(&mut self, ctx: &mut LayerContext<'_>, state: &mut LayerState) -> Result<()> {
        if self.enabled {
            return Ok(());
        }
        if !self.explicit_size {
            self.width = state.width.max(1);
            self.height = state.height.max(1);
        }
        let services = ctx.services().clone();
        {
            let mut frontend = services.renderer.lock().unwrap();
            frontend.wait_idle();
            self.ensure_renderpasses(&mut *frontend)?;
            self.create_attachments(&mut *frontend)?;
            // The swapchain targets built for the onscreen pass are no
            // longer reachable once the pass goes custom
            if let Some(pass) = state.passes.get_mut(0) {
                for target in pass.render_targets.drain(..) {
                    frontend.render_target_destroy(target);
                }
            }
        }
        self.retarget_world_pass(state);
        self.enabled = true;
        self.notify_companions(ctx, true);
        services
            .cameras
            .lock()
            .unwrap()
            .resize_all(self.width, self.height);
        Ok(())
    }

    /// Disable offscreen mode: tear down attachments, restore the world
    /// pass to the builtin renderpass + swapchain targets, notify, resize
    /// cameras back to the layer size.
    pub fn disable(
        &mut self,
        ctx: &mut LayerContext<'_>,
        state: &mut LayerState,
        onscreen_renderpass: &str,
    ) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let services = ctx.services().clone();
        {
            let mut frontend = services.renderer.lock().unwrap();
            frontend.wait_idle();
            self.destroy_attachments(&mut *frontend);

            let pass = &mut state.passes[0];
            pass.config.use_custom_render_targets = false;
            pass.config.renderpass_name = onscreen_renderpass.to_string();
            pass.custom_color_attachments.clear();
            pass.custom_color_layouts.clear();
            pass.render_targets.clear();
            build_pass_targets(&mut *frontend, state, 0);
        }
        self.enabled = false;
        self.notify_companions(ctx, false);
        services
            .cameras
            .lock()
            .unwrap()
            .resize_all(state.width, state.height);
        Ok(())
    }

    /// Rebuild the offscreen attachments at a new size while enabled
    pub fn resize(
        &mut self,
        ctx: &mut LayerContext<'_>,
        state: &mut LayerState,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.width = width.max(1);
        self.height = height.max(1);
        if !self.enabled {
            return Ok(());
        }
        let services = ctx.services().clone();
        {
            let mut frontend = services.renderer.lock().unwrap();
            frontend.wait_idle();
            self.destroy_attachments(&mut *frontend);
            self.create_attachments(&mut *frontend)?;
        }
        self.retarget_world_pass(state);
        self.notify_companions(ctx, true);
        services
            .cameras
            .lock()
            .unwrap()
            .resize_all(self.width, self.height);
        Ok(())
    }

    /// Full teardown at layer destruction (renderpasses included)
    pub fn destroy(&mut self, services: &RenderServices) {
        let mut frontend = services.renderer.lock().unwrap();
        if self.enabled
            || !self.color_attachments.is_empty()
            || self.world_renderpass.is_some()
        {
            frontend.wait_idle();
        }
        self.destroy_attachments(&mut *frontend);
        if let Some(renderpass) = self.world_renderpass.take() {
            frontend.renderpass_destroy(renderpass);
        }
        if let Some(renderpass) = self.skybox_renderpass.take() {
            frontend.renderpass_destroy(renderpass);
        }
        self.enabled = false;
    }

    fn ensure_renderpasses(&mut self, frontend: &mut dyn RendererFrontend) -> Result<()> {
        if self.world_renderpass.is_none() {
            self.world_renderpass = Some(frontend.renderpass_create(&RenderPassDesc {
                name: OFFSCREEN_WORLD_RENDERPASS.to_string(),
                color_load: LoadOp::Load,
                depth_load: LoadOp::Load,
                has_color: true,
                has_depth: true,
            })?);
        }
        if self.skybox_renderpass.is_none() {
            self.skybox_renderpass = Some(frontend.renderpass_create(&RenderPassDesc {
                name: OFFSCREEN_SKYBOX_RENDERPASS.to_string(),
                color_load: LoadOp::Clear,
                depth_load: LoadOp::Load,
                has_color: true,
                has_depth: true,
            })?);
        }
        Ok(())
    }

    fn create_attachments(&mut self, frontend: &mut dyn RendererFrontend) -> Result<()> {
        let world_renderpass = self.world_renderpass.unwrap_or_default();
        let skybox_renderpass = self.skybox_renderpass.unwrap_or_default();
        let image_count = frontend.window_attachment_count();

        for image_index in 0..image_count {
            let color = frontend.texture_create(&TextureDesc {
                name: format!("editor.viewport.color.{}", image_index),
                width: self.width,
                height: self.height,
                usage: TextureUsage::ColorAttachmentSampled,
            })?;
            // Fresh attachments start in the sampled steady state the
            // per-frame transitions assume
            frontend.transition_texture_layout(
                color,
                TextureLayout::Undefined,
                TextureLayout::ShaderReadOnly,
            );
            let depth = frontend.texture_create(&TextureDesc {
                name: format!("editor.viewport.depth.{}", image_index),
                width: self.width,
                height: self.height,
                usage: TextureUsage::DepthAttachment,
            })?;

            let desc = RenderTargetDesc {
                width: self.width,
                height: self.height,
                sync_to_window_size: false,
                attachments: vec![color, depth],
            };
            let world_target = frontend.render_target_create(&desc, world_renderpass)?;
            let skybox_target = frontend.render_target_create(&desc, skybox_renderpass)?;

            frontend.register_sampled_texture(
                color,
                &format!("editor.viewport.{}", image_index),
            )?;

            self.color_attachments.push(color);
            self.depth_attachments.push(depth);
            self.world_targets.push(world_target);
            self.skybox_targets.push(skybox_target);
        }
        Ok(())
    }

    fn destroy_attachments(&mut self, frontend: &mut dyn RendererFrontend) {
        for target in self.world_targets.drain(..) {
            frontend.render_target_destroy(target);
        }
        for target in self.skybox_targets.drain(..) {
            frontend.render_target_destroy(target);
        }
        for texture in self.color_attachments.drain(..) {
            frontend.texture_destroy(texture);
        }
        for texture in self.depth_attachments.drain(..) {
            frontend.texture_destroy(texture);
        }
    }

    fn retarget_world_pass(&self, state: &mut LayerState) {
        let Some(pass) = state.passes.get_mut(0) else {
            return;
        };
        pass.config.use_custom_render_targets = true;
        pass.config.renderpass_name = OFFSCREEN_WORLD_RENDERPASS.to_string();
        pass.renderpass = self.world_renderpass;
        pass.render_targets = self.world_targets.clone();
        pass.custom_color_attachments = self.color_attachments.clone();
        pass.custom_color_layouts =
            vec![TextureLayout::ShaderReadOnly; self.color_attachments.len()];
    }

    fn targets_payload(&self, enabled: bool, renderpass: Option<RenderPassHandle>) -> OffscreenTargetsPayload {
        let mut color_attachments = [[0u32; 2]; MAX_SWAPCHAIN_IMAGES];
        for (index, attachment) in self
            .color_attachments
            .iter()
            .take(MAX_SWAPCHAIN_IMAGES)
            .enumerate()
        {
            color_attachments[index] = [attachment.0.id, attachment.0.generation];
        }
        let renderpass = renderpass.unwrap_or_default();
        OffscreenTargetsPayload {
            enabled: enabled as u32,
            width: self.width,
            height: self.height,
            image_count: self.color_attachments.len().min(MAX_SWAPCHAIN_IMAGES) as u32,
            color_attachments,
            renderpass: [renderpass.0.id, renderpass.0.generation],
            _pad: [0; 2],
        }
    }

    fn notify_companions(&self, ctx: &mut LayerContext<'_>, enabled: bool) {
        if let Some(ui) = ctx.layer_by_name("ui") {
            let payload = self.targets_payload(enabled, self.world_renderpass);
            let msg = Message::with_payload(MSG_UI_SET_OFFSCREEN_TARGETS, &payload);
            if ctx.send_msg_no_rsp(ui, &msg).is_err() {
                engine_warn!(SOURCE, "ui layer rejected offscreen notification");
            }
        } else {
            engine_debug!(SOURCE, "no ui layer to notify");
        }
        if let Some(skybox) = ctx.layer_by_name("skybox") {
            let payload = self.targets_payload(enabled, self.skybox_renderpass);
            let msg = Message::with_payload(MSG_SKYBOX_SET_OFFSCREEN_TARGETS, &payload);
            if ctx.send_msg_no_rsp(skybox, &msg).is_err() {
                engine_warn!(SOURCE, "skybox layer rejected offscreen notification");
            }
        } else {
            engine_debug!(SOURCE, "no skybox layer to notify");
        }
    }
}

impl Default for OffscreenState {
    fn default() -> Self {
        Self::new()
    }
}
