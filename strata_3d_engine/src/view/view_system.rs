/// The view system: a bounded registry of layers with stable render order,
/// per-frame update/render orchestration, modal input focus, typed message
/// dispatch, and ownership of swapchain-derived render targets.
///
/// Reentrancy: a layer is moved out of its slot for the duration of its own
/// callback, so callbacks receive `&mut LayerState` plus a [`LayerContext`]
/// that can reach the rest of the view system (messages to other layers,
/// services). A message sent to the in-flight layer reports an invalid
/// handle instead of recursing.

use glam::Mat4;
use crate::error::Result;
use crate::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};
use crate::input::InputState;
use crate::renderer::{
    RenderServices, RenderTargetDesc, RendererFrontend, TextureLayout,
};
use crate::utils::HandleTable;
use super::behavior::{BehaviorSlot, LayerBehavior};
use super::layer::{
    Layer, LayerBehaviorHandle, LayerConfig, LayerFlags, LayerHandle, LayerState,
    MAX_LAYERS, MAX_LAYER_PASSES,
};
use super::message::{Message, ResponseBuffer, MSG_FLAG_DEBUG_ONLY};

const SOURCE: &str = "strata3d::ViewSystem";

/// Dispatch context handed to layer and behavior callbacks.
///
/// Holds the view system (minus the in-flight layer) so callbacks can send
/// messages, look up layers, and reach the service bundle.
pub struct LayerContext<'a> {
    vs: &'a mut ViewSystem,
    /// Handle of the layer currently being dispatched
    pub self_handle: LayerHandle,
}

impl LayerContext<'_> {
    /// The shared collaborator bundle
    pub fn services(&self) -> &RenderServices {
        &self.vs.services
    }

    /// Current window size
    pub fn window_size(&self) -> (u32, u32) {
        (self.vs.window_width, self.vs.window_height)
    }

    /// Find a layer by name
    pub fn layer_by_name(&self, name: &str) -> Option<LayerHandle> {
        self.vs.layer_by_name(name)
    }

    /// Whether a layer is live and enabled
    pub fn layer_enabled(&self, handle: LayerHandle) -> bool {
        self.vs.get_layer(handle).map(|s| s.enabled).unwrap_or(false)
    }

    /// Send a typed message to another layer, optionally collecting a response
    pub fn send_msg(
        &mut self,
        target: LayerHandle,
        msg: &Message,
        rsp: Option<&mut ResponseBuffer>,
    ) -> Result<()> {
        self.vs.send_msg(target, msg, rsp)
    }

    /// Fire-and-forget send
    pub fn send_msg_no_rsp(&mut self, target: LayerHandle, msg: &Message) -> Result<()> {
        self.vs.send_msg_no_rsp(target, msg)
    }

    /// Give a layer modal input focus
    pub fn set_modal_focus(&mut self, handle: LayerHandle) {
        self.vs.set_modal_focus(handle);
    }

    /// Drop modal input focus
    pub fn clear_modal_focus(&mut self) {
        self.vs.clear_modal_focus();
    }
}

/// Layer registry and frame orchestrator.
pub struct ViewSystem {
    services: RenderServices,
    layers: HandleTable<Layer>,
    insertion_counter: u64,
    sorted_slots: Vec<usize>,
    order_dirty: bool,
    modal_focus: Option<LayerHandle>,
    window_width: u32,
    window_height: u32,
}

impl ViewSystem {
    /// Initialize the view system against a service bundle and window size
    pub fn new(services: RenderServices, window_width: u32, window_height: u32) -> Self {
        Self {
            services,
            layers: HandleTable::with_capacity(MAX_LAYERS),
            insertion_counter: 0,
            sorted_slots: Vec::new(),
            order_dirty: false,
            modal_focus: None,
            window_width,
            window_height,
        }
    }

    /// The shared collaborator bundle
    pub fn services(&self) -> &RenderServices {
        &self.services
    }

    /// Current window size
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    /// Number of registered layers
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    // ===== DISPATCH PLUMBING =====

    /// Run `f` with the layer at `slot` taken out of the table, so the
    /// callback can re-enter the view system.
    fn with_layer_at<R>(
        &mut self,
        slot: usize,
        f: impl FnOnce(&mut ViewSystem, &mut Layer) -> R,
    ) -> Option<R> {
        let mut layer = self.layers.take_at(slot)?;
        let result = f(self, &mut layer);
        self.layers.put_back(slot, layer);
        Some(result)
    }

    fn slot_of(&self, handle: LayerHandle) -> Option<usize> {
        if !self.layers.contains(handle.0) {
            return None;
        }
        handle.0.slot_index()
    }

    // ===== REGISTRATION =====

    /// Register a layer: validates the config, invokes `on_create`,
    /// `on_attach`, and `on_enable` (if enabled), and builds the pass
    /// render targets.
    pub fn register_layer(&mut self, config: LayerConfig) -> Result<LayerHandle> {
        if config.name.is_empty() {
            engine_bail!(InvalidParameter, "layer name must not be empty");
        }
        if config.passes.is_empty() || config.passes.len() > MAX_LAYER_PASSES {
            engine_bail!(
                InvalidParameter,
                "layer '{}' pass count {} outside [1, {}]",
                config.name,
                config.passes.len(),
                MAX_LAYER_PASSES
            );
        }

        let name = config.name.clone();
        let mut layer = Layer::new(config, self.window_width, self.window_height);
        layer.insertion_index = self.insertion_counter;

        let raw = self
            .layers
            .insert(layer)
            .ok_or_else(|| engine_err!(NoSlot, "layer table full ({} slots)", MAX_LAYERS))?;
        self.insertion_counter += 1;
        let handle = LayerHandle(raw);
        let slot = raw.slot_index().unwrap_or(0);

        // on_create; a failure tears the partial layer down again
        let created = self
            .with_layer_at(slot, |vs, layer| {
                let mut ctx = LayerContext { vs, self_handle: handle };
                layer.dispatch_create(&mut ctx)
            })
            .unwrap_or(Ok(()));
        if let Err(err) = created {
            engine_error!(SOURCE, "layer '{}' on_create failed: {}", name, err);
            if let Some(mut layer) = self.layers.remove(raw) {
                let mut ctx = LayerContext { vs: self, self_handle: handle };
                layer.dispatch_destroy(&mut ctx);
            }
            return Err(engine_err!(
                ResourceCreationFailed,
                "layer '{}' creation failed",
                name
            ));
        }

        self.with_layer_at(slot, |vs, layer| {
            let mut ctx = LayerContext { vs, self_handle: handle };
            layer.dispatch_attach(&mut ctx);
            if layer.state.enabled {
                layer.dispatch_enable(&mut ctx);
            }
        });

        self.rebuild_layer_targets(slot);
        self.order_dirty = true;
        engine_info!(SOURCE, "registered layer '{}'", name);
        Ok(handle)
    }

    /// Unregister a layer: tears down pass targets, runs detach hooks and
    /// `on_destroy`, and bumps the slot generation. Silent on an invalid
    /// handle.
    pub fn unregister_layer(&mut self, handle: LayerHandle) {
        let Some(slot) = self.slot_of(handle) else {
            engine_debug!(SOURCE, "unregister_layer: stale handle, ignoring");
            return;
        };
        let Some(mut layer) = self.layers.take_at(slot) else {
            engine_debug!(SOURCE, "unregister_layer: layer is mid-dispatch, ignoring");
            return;
        };

        // Pass render targets are torn down before destroy
        {
            let mut frontend = self.services.renderer.lock().unwrap();
            for pass in &mut layer.state.passes {
                if pass.config.use_custom_render_targets {
                    continue;
                }
                for target in pass.render_targets.drain(..) {
                    frontend.render_target_destroy(target);
                }
            }
        }

        let mut ctx = LayerContext { vs: self, self_handle: handle };
        layer.dispatch_teardown(&mut ctx);

        self.layers.release_taken(slot);
        if self.modal_focus == Some(handle) {
            self.modal_focus = None;
        }
        self.order_dirty = true;
        engine_info!(SOURCE, "unregistered layer '{}'", layer.state.name);
    }

    /// Unregister every layer (shutdown path)
    pub fn shutdown(&mut self) {
        for slot in 0..self.layers.slot_count() {
            if let Some(raw) = self.layers.handle_at(slot) {
                self.unregister_layer(LayerHandle(raw));
            }
        }
    }

    // ===== LOOKUPS =====

    /// The layer's state, while the handle is live
    pub fn get_layer(&self, handle: LayerHandle) -> Option<&LayerState> {
        self.layers.get(handle.0).map(|layer| &layer.state)
    }

    /// Find a layer handle by name
    pub fn layer_by_name(&self, name: &str) -> Option<LayerHandle> {
        self.layers
            .iter()
            .find(|(_, layer)| layer.state.name == name)
            .map(|(raw, _)| LayerHandle(raw))
    }

    // ===== CAMERA =====

    /// Update a layer's view/projection matrices and mark pipeline globals
    /// stale so they are re-applied on the next render.
    pub fn set_layer_camera(
        &mut self,
        handle: LayerHandle,
        view: Option<&Mat4>,
        projection: Option<&Mat4>,
    ) {
        let Some(layer) = self.layers.get_mut(handle.0) else {
            return;
        };
        if let Some(view) = view {
            layer.state.view = *view;
        }
        if let Some(projection) = projection {
            layer.state.projection = *projection;
        }
        self.services.pipelines.lock().unwrap().mark_globals_dirty();
    }

    // ===== ENABLE / MODAL FOCUS =====

    /// Enable or disable a layer, invoking the transition hooks.
    /// Disabling a layer that holds modal focus releases the focus.
    pub fn set_layer_enabled(&mut self, handle: LayerHandle, enabled: bool) {
        let Some(slot) = self.slot_of(handle) else {
            return;
        };
        let transition = self
            .layers
            .get_at_mut(slot)
            .is_some_and(|layer| layer.state.enabled != enabled);
        if !transition {
            return;
        }
        self.with_layer_at(slot, |vs, layer| {
            layer.state.enabled = enabled;
            let mut ctx = LayerContext { vs, self_handle: handle };
            if enabled {
                layer.dispatch_enable(&mut ctx);
            } else {
                layer.dispatch_disable(&mut ctx);
            }
        });
        if !enabled && self.modal_focus == Some(handle) {
            self.modal_focus = None;
        }
    }

    /// Route all input to one layer. An invalid handle clears the focus.
    pub fn set_modal_focus(&mut self, handle: LayerHandle) {
        if self.layers.contains(handle.0) {
            self.modal_focus = Some(handle);
        } else {
            self.modal_focus = None;
        }
    }

    /// Drop modal input focus
    pub fn clear_modal_focus(&mut self) {
        self.modal_focus = None;
    }

    /// The layer currently holding modal focus
    pub fn modal_focus(&self) -> Option<LayerHandle> {
        self.modal_focus
    }

    // ===== ORDERING =====

    fn rebuild_order_if_dirty(&mut self) {
        if !self.order_dirty {
            return;
        }
        let mut entries: Vec<(i32, u64, usize)> = Vec::with_capacity(self.layers.len());
        for slot in 0..self.layers.slot_count() {
            if self.layers.handle_at(slot).is_none() {
                continue;
            }
            if let Some(layer) = self.layers.get_at_mut(slot) {
                entries.push((layer.state.order, layer.insertion_index, slot));
            }
        }
        // Insertion indices are unique, so the tuple sort is stable in effect:
        // equal orders keep insertion order.
        entries.sort_unstable();
        self.sorted_slots = entries.into_iter().map(|(_, _, slot)| slot).collect();
        self.order_dirty = false;
    }

    /// Sorted layer handles, ascending draw order (test/introspection aid)
    pub fn sorted_layers(&mut self) -> Vec<LayerHandle> {
        self.rebuild_order_if_dirty();
        self.sorted_slots
            .iter()
            .filter_map(|&slot| self.layers.handle_at(slot).map(LayerHandle))
            .collect()
    }

    // ===== PER-FRAME UPDATE =====

    /// Update all enabled layers back-to-front so the front-most layer sees
    /// input first. A consuming layer nulls the input for the layers behind
    /// it; with modal focus set, only the focused layer receives input.
    pub fn update_all(&mut self, dt: f32, input: &InputState) {
        self.rebuild_order_if_dirty();
        let order = self.sorted_slots.clone();
        let mut consumed = false;
        for &slot in order.iter().rev() {
            let Some(raw) = self.layers.handle_at(slot) else {
                continue;
            };
            let handle = LayerHandle(raw);
            let give: Option<&InputState> = match self.modal_focus {
                Some(focused) => {
                    if focused == handle {
                        Some(input)
                    } else {
                        None
                    }
                }
                None => {
                    if consumed {
                        None
                    } else {
                        Some(input)
                    }
                }
            };
            let layer_consumed = self
                .with_layer_at(slot, |vs, layer| {
                    if !layer.state.enabled {
                        return false;
                    }
                    let mut ctx = LayerContext { vs, self_handle: handle };
                    layer.dispatch_update(&mut ctx, dt, give)
                })
                .unwrap_or(false);
            consumed |= layer_consumed;
        }
    }

    // ===== PER-FRAME RENDER =====

    /// Render all enabled layers in ascending sorted order. Failing passes
    /// are logged and skipped; the rest of the frame continues.
    pub fn draw_all(&mut self, dt: f32, image_index: u32) {
        self.rebuild_order_if_dirty();
        let order = self.sorted_slots.clone();
        for &slot in &order {
            let Some(raw) = self.layers.handle_at(slot) else {
                continue;
            };
            let handle = LayerHandle(raw);
            self.with_layer_at(slot, |vs, layer| {
                if !layer.state.enabled {
                    return;
                }
                vs.render_layer(layer, handle, dt, image_index);
            });
        }
    }

    fn render_layer(&mut self, layer: &mut Layer, handle: LayerHandle, dt: f32, image_index: u32) {
        for pass_index in 0..layer.state.passes.len() {
            let (renderpass, target, custom_attachment) = {
                let pass = &layer.state.passes[pass_index];
                let Some(renderpass) = pass.renderpass else {
                    engine_warn!(
                        SOURCE,
                        "layer '{}' pass {} has no renderpass, skipping",
                        layer.state.name,
                        pass_index
                    );
                    continue;
                };
                let Some(&target) = pass.render_targets.get(image_index as usize) else {
                    engine_warn!(
                        SOURCE,
                        "layer '{}' pass {} has no target for image {}, skipping",
                        layer.state.name,
                        pass_index,
                        image_index
                    );
                    continue;
                };
                let custom_attachment = if pass.config.use_custom_render_targets {
                    debug_assert!(pass.custom_attachments_consistent());
                    pass.custom_color_attachments
                        .get(image_index as usize)
                        .copied()
                        .zip(pass.custom_color_layouts.get(image_index as usize).copied())
                } else {
                    None
                };
                (renderpass, target, custom_attachment)
            };

            // Custom attachments are sampled elsewhere between frames;
            // bring the current image to color-attachment layout
            if let Some((attachment, layout)) = custom_attachment {
                let mut frontend = self.services.renderer.lock().unwrap();
                frontend.transition_texture_layout(
                    attachment,
                    layout,
                    TextureLayout::ColorAttachment,
                );
                drop(frontend);
                layer.state.passes[pass_index].custom_color_layouts[image_index as usize] =
                    TextureLayout::ColorAttachment;
            }

            let begun = self
                .services
                .renderer
                .lock()
                .unwrap()
                .begin_render_pass(renderpass, target);
            match begun {
                Ok(()) => {
                    let mut ctx = LayerContext { vs: self, self_handle: handle };
                    if let Err(err) =
                        layer.dispatch_render(&mut ctx, dt, pass_index, image_index)
                    {
                        engine_error!(
                            SOURCE,
                            "layer '{}' pass {} render failed: {}",
                            layer.state.name,
                            pass_index,
                            err
                        );
                    }
                    self.services.renderer.lock().unwrap().end_render_pass();
                }
                Err(err) => {
                    engine_error!(
                        SOURCE,
                        "layer '{}' pass {} begin failed: {}",
                        layer.state.name,
                        pass_index,
                        err
                    );
                }
            }

            if let Some((attachment, _)) = custom_attachment {
                let mut frontend = self.services.renderer.lock().unwrap();
                frontend.transition_texture_layout(
                    attachment,
                    TextureLayout::ColorAttachment,
                    TextureLayout::ShaderReadOnly,
                );
                drop(frontend);
                layer.state.passes[pass_index].custom_color_layouts[image_index as usize] =
                    TextureLayout::ShaderReadOnly;
            }
        }
    }

    // ===== WINDOW EVENTS =====

    /// Propagate a window resize: layers with `sync_to_window` take the new
    /// size, then every layer's `on_resize` hook runs.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
        for slot in 0..self.layers.slot_count() {
            let Some(raw) = self.layers.handle_at(slot) else {
                continue;
            };
            let handle = LayerHandle(raw);
            self.with_layer_at(slot, |vs, layer| {
                if layer.state.sync_to_window {
                    layer.state.width = width;
                    layer.state.height = height;
                }
                let mut ctx = LayerContext { vs, self_handle: handle };
                layer.dispatch_resize(&mut ctx, width, height);
            });
        }
    }

    // ===== RENDER TARGETS =====

    /// Rebuild every layer's pass render targets against the current
    /// swapchain. Passes with missing renderpasses are logged and skipped.
    pub fn rebuild_targets(&mut self) {
        for slot in 0..self.layers.slot_count() {
            if self.layers.handle_at(slot).is_some() {
                self.rebuild_layer_targets(slot);
            }
        }
    }

    fn rebuild_layer_targets(&mut self, slot: usize) {
        let mut frontend = self.services.renderer.lock().unwrap();
        let Some(layer) = self.layers.get_at_mut(slot) else {
            return;
        };
        for pass_index in 0..layer.state.passes.len() {
            build_pass_targets(&mut *frontend, &mut layer.state, pass_index);
        }
    }

    // ===== TYPED MESSAGES =====

    fn deliver(
        &mut self,
        target: LayerHandle,
        msg: &Message,
        rsp: Option<&mut ResponseBuffer>,
    ) -> Result<()> {
        if cfg!(debug_assertions) {
            msg.validate()?;
        }
        if msg.flags() & MSG_FLAG_DEBUG_ONLY != 0 && !cfg!(debug_assertions) {
            return Ok(());
        }
        let Some(slot) = self.slot_of(target) else {
            engine_bail!(HandleInvalid, "message target is stale");
        };
        let delivered = self.with_layer_at(slot, |vs, layer| {
            let mut ctx = LayerContext { vs, self_handle: target };
            layer.dispatch_message(&mut ctx, msg, rsp);
        });
        if delivered.is_none() {
            // The target is mid-dispatch (a layer messaging itself)
            engine_bail!(HandleInvalid, "message target is unavailable");
        }
        Ok(())
    }

    /// Send a typed message, collecting a response when the handler writes
    /// one into `rsp`.
    pub fn send_msg(
        &mut self,
        target: LayerHandle,
        msg: &Message,
        rsp: Option<&mut ResponseBuffer>,
    ) -> Result<()> {
        self.deliver(target, msg, rsp)
    }

    /// Fire-and-forget send
    pub fn send_msg_no_rsp(&mut self, target: LayerHandle, msg: &Message) -> Result<()> {
        self.deliver(target, msg, None)
    }

    /// Deliver to every enabled layer whose flags contain `filter`.
    /// No responses are collected.
    pub fn broadcast_msg(&mut self, msg: &Message, filter: LayerFlags) {
        if cfg!(debug_assertions) {
            if let Err(err) = msg.validate() {
                engine_error!(SOURCE, "broadcast rejected: {}", err);
                return;
            }
        }
        for slot in 0..self.layers.slot_count() {
            let Some(raw) = self.layers.handle_at(slot) else {
                continue;
            };
            let handle = LayerHandle(raw);
            self.with_layer_at(slot, |vs, layer| {
                if !layer.state.enabled || !layer.state.flags.contains(filter) {
                    return;
                }
                let mut ctx = LayerContext { vs, self_handle: handle };
                layer.dispatch_message(&mut ctx, msg, None);
            });
        }
    }

    // ===== BEHAVIORS =====

    /// Attach a behavior to a layer, invoking its attach hook
    pub fn attach_behavior(
        &mut self,
        layer: LayerHandle,
        behavior: Box<dyn LayerBehavior>,
    ) -> Result<LayerBehaviorHandle> {
        let Some(slot) = self.slot_of(layer) else {
            engine_bail!(HandleInvalid, "attach_behavior: stale layer handle");
        };
        self.with_layer_at(slot, |vs, entry| {
            let raw = entry
                .behaviors
                .insert(BehaviorSlot { behavior, active: true })
                .ok_or_else(|| engine_err!(NoSlot, "behavior table full"))?;
            let behavior_index = raw.slot_index().unwrap_or(0);
            if let Some(mut bslot) = entry.behaviors.take_at(behavior_index) {
                let mut ctx = LayerContext { vs, self_handle: layer };
                bslot.behavior.on_attach(&mut entry.state, &mut ctx);
                entry.behaviors.put_back(behavior_index, bslot);
            }
            Ok(LayerBehaviorHandle(raw))
        })
        .unwrap_or_else(|| Err(engine_err!(HandleInvalid, "attach_behavior: layer unavailable")))
    }

    /// Detach a behavior, invoking its detach hook. Silent on stale handles.
    pub fn detach_behavior(&mut self, layer: LayerHandle, behavior: LayerBehaviorHandle) {
        let Some(slot) = self.slot_of(layer) else {
            return;
        };
        self.with_layer_at(slot, |vs, entry| {
            if !entry.behaviors.contains(behavior.0) {
                return;
            }
            let Some(behavior_index) = behavior.0.slot_index() else {
                return;
            };
            if let Some(mut bslot) = entry.behaviors.take_at(behavior_index) {
                let mut ctx = LayerContext { vs, self_handle: layer };
                bslot.behavior.on_detach(&mut entry.state, &mut ctx);
                entry.behaviors.release_taken(behavior_index);
                drop(bslot);
            }
        });
    }
}

/// Build (or rebuild) the render targets of one layer pass.
///
/// Resolves the renderpass by name; for non-custom passes, destroys the
/// prior targets and builds one per swapchain image with the attachments
/// the config asks for. A pass with no resolvable renderpass or no
/// attachments is logged and left target-less.
pub(crate) fn build_pass_targets(
    frontend: &mut dyn RendererFrontend,
    state: &mut LayerState,
    pass_index: usize,
) {
    let (width, height) = (state.width, state.height);
    let name = state.name.clone();
    let Some(pass) = state.passes.get_mut(pass_index) else {
        return;
    };

    let Some(renderpass) = frontend.renderpass_by_name(&pass.config.renderpass_name) else {
        engine_warn!(
            SOURCE,
            "layer '{}' pass {}: renderpass '{}' unavailable",
            name,
            pass_index,
            pass.config.renderpass_name
        );
        pass.renderpass = None;
        return;
    };
    pass.renderpass = Some(renderpass);

    if pass.config.use_custom_render_targets {
        // Layer-owned attachments; nothing to build here
        return;
    }

    for target in pass.render_targets.drain(..) {
        frontend.render_target_destroy(target);
    }

    let image_count = frontend.window_attachment_count();
    for image_index in 0..image_count {
        let mut attachments = Vec::new();
        if pass.config.use_swapchain_color {
            if let Some(color) = frontend.window_attachment(image_index) {
                attachments.push(color);
            }
        }
        if pass.config.use_depth {
            if let Some(depth) = frontend.depth_attachment() {
                attachments.push(depth);
            }
        }
        if attachments.is_empty() {
            engine_error!(
                SOURCE,
                "layer '{}' pass {}: no attachments available, pass skipped",
                name,
                pass_index
            );
            break;
        }
        let desc = RenderTargetDesc {
            width,
            height,
            sync_to_window_size: true,
            attachments,
        };
        match frontend.render_target_create(&desc, renderpass) {
            Ok(target) => pass.render_targets.push(target),
            Err(err) => {
                engine_error!(
                    SOURCE,
                    "layer '{}' pass {}: target creation failed: {}",
                    name,
                    pass_index,
                    err
                );
                break;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "view_system_tests.rs"]
mod tests;
