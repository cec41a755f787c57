/// Layer types: per-layer state, pass configuration, and the lifecycle
/// callback trait implemented by concrete layers.
///
/// The C-style callback table becomes a trait object; layer-owned data the
/// view system needs to reach (size, matrices, passes) lives in
/// [`LayerState`] so a callback can mutate its own layer while the view
/// system stays reachable through the dispatch context.

use bitflags::bitflags;
use glam::Mat4;
use crate::define_handles;
use crate::error::Result;
use crate::input::InputState;
use crate::renderer::{RenderPassHandle, RenderTargetHandle, TextureHandle, TextureLayout};
use crate::utils::HandleTable;
use super::behavior::BehaviorSlot;
use super::message::{Message, ResponseBuffer};
use super::view_system::LayerContext;

/// Maximum layers a view system can hold
pub const MAX_LAYERS: usize = 16;

/// Maximum passes per layer
pub const MAX_LAYER_PASSES: usize = 4;

/// Maximum behaviors attached to one layer
pub const MAX_LAYER_BEHAVIORS: usize = 8;

define_handles! {
    /// A registered layer
    LayerHandle,
    /// A behavior attached to a layer
    LayerBehaviorHandle,
}

bitflags! {
    /// Application-defined layer tags, matched by broadcast filters
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct LayerFlags: u32 {
        /// Renders the primary 3D view
        const MAIN_VIEW = 1 << 0;
        /// Renders on top of the 3D view
        const OVERLAY = 1 << 1;
        /// Wants world-state broadcasts
        const RECEIVES_WORLD_EVENTS = 1 << 2;
        /// Only active in editor sessions
        const EDITOR_ONLY = 1 << 3;
    }
}

/// Configuration for one layer pass
#[derive(Debug, Clone)]
pub struct LayerPassConfig {
    /// Renderpass resolved by name at target-rebuild time
    pub renderpass_name: String,
    /// Attach the swapchain color image of the frame being drawn
    pub use_swapchain_color: bool,
    /// Attach the shared depth buffer
    pub use_depth: bool,
    /// The layer owns its attachments (offscreen mode); the view system
    /// only transitions layouts around the pass
    pub use_custom_render_targets: bool,
}

impl LayerPassConfig {
    /// A pass drawing to the swapchain with depth
    pub fn swapchain(renderpass_name: &str) -> Self {
        Self {
            renderpass_name: renderpass_name.to_string(),
            use_swapchain_color: true,
            use_depth: true,
            use_custom_render_targets: false,
        }
    }
}

/// Runtime state of one layer pass
#[derive(Debug, Clone)]
pub struct LayerPass {
    pub config: LayerPassConfig,
    /// Resolved renderpass; None while unresolved (pass is skipped)
    pub renderpass: Option<RenderPassHandle>,
    /// One render target per swapchain image
    pub render_targets: Vec<RenderTargetHandle>,
    /// Custom color attachments, one per swapchain image
    pub custom_color_attachments: Vec<TextureHandle>,
    /// Current layout of each custom color attachment
    pub custom_color_layouts: Vec<TextureLayout>,
}

impl LayerPass {
    pub fn new(config: LayerPassConfig) -> Self {
        Self {
            config,
            renderpass: None,
            render_targets: Vec::new(),
            custom_color_attachments: Vec::new(),
            custom_color_layouts: Vec::new(),
        }
    }

    /// Custom passes must carry one attachment and one layout per target
    pub fn custom_attachments_consistent(&self) -> bool {
        !self.config.use_custom_render_targets
            || (self.custom_color_attachments.len() == self.render_targets.len()
                && self.custom_color_layouts.len() == self.render_targets.len())
    }
}

/// Layer-owned data the view system manages
#[derive(Debug, Clone)]
pub struct LayerState {
    pub name: String,
    /// Signed render order; draw ascending, update descending
    pub order: i32,
    pub width: u32,
    pub height: u32,
    pub view: Mat4,
    pub projection: Mat4,
    pub passes: Vec<LayerPass>,
    pub enabled: bool,
    pub flags: LayerFlags,
    /// Follow the window size on resize
    pub sync_to_window: bool,
}

/// Lifecycle callbacks implemented by a concrete layer.
///
/// Every hook receives the layer's own [`LayerState`] and a
/// [`LayerContext`] that can reach services and other layers. Hooks run on
/// the render thread only; handlers must not retain message pointers
/// beyond the call.
pub trait LayerCallbacks: Send {
    /// Build layer-owned resources. An error tears the layer down again.
    fn on_create(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) -> Result<()> {
        let _ = (state, ctx);
        Ok(())
    }

    /// The layer joined the registry
    fn on_attach(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let _ = (state, ctx);
    }

    /// The layer became enabled
    fn on_enable(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let _ = (state, ctx);
    }

    /// The layer became disabled
    fn on_disable(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let _ = (state, ctx);
    }

    /// The window resized (state dimensions are already updated)
    fn on_resize(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        width: u32,
        height: u32,
    ) {
        let _ = (state, ctx, width, height);
    }

    /// Per-frame update. Returns true when the layer consumed the input;
    /// layers behind it then receive `None`.
    fn on_update(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        dt: f32,
        input: Option<&InputState>,
    ) -> bool {
        let _ = (state, ctx, dt, input);
        false
    }

    /// Record draws for one pass. The renderpass is already begun.
    fn on_render(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        dt: f32,
        pass_index: usize,
        image_index: u32,
    ) -> Result<()> {
        let _ = (state, ctx, dt, pass_index, image_index);
        Ok(())
    }

    /// A typed message arrived. Write into `rsp` to answer.
    fn on_message(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        msg: &Message,
        rsp: Option<&mut ResponseBuffer>,
    ) {
        let _ = (state, ctx, msg, rsp);
    }

    /// The layer is leaving the registry
    fn on_detach(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let _ = (state, ctx);
    }

    /// Last hook before the layer is dropped
    fn on_destroy(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let _ = (state, ctx);
    }
}

/// Everything needed to register a layer
pub struct LayerConfig {
    pub name: String,
    pub order: i32,
    /// Explicit size; None follows the window
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub view: Mat4,
    pub projection: Mat4,
    pub passes: Vec<LayerPassConfig>,
    pub enabled: bool,
    pub flags: LayerFlags,
    pub sync_to_window: bool,
    pub callbacks: Box<dyn LayerCallbacks>,
}

impl LayerConfig {
    /// A single-pass swapchain layer with defaults
    pub fn new(name: &str, callbacks: Box<dyn LayerCallbacks>) -> Self {
        Self {
            name: name.to_string(),
            order: 0,
            width: None,
            height: None,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            passes: vec![LayerPassConfig::swapchain("builtin.world")],
            enabled: true,
            flags: LayerFlags::empty(),
            sync_to_window: true,
            callbacks,
        }
    }
}

// ===== REGISTRY ENTRY =====

/// A registered layer: state + callbacks + behaviors
pub(crate) struct Layer {
    pub(crate) state: LayerState,
    /// Taken out for the duration of a callback so the callback can
    /// mutate the state it lives next to
    pub(crate) callbacks: Option<Box<dyn LayerCallbacks>>,
    pub(crate) behaviors: HandleTable<BehaviorSlot>,
    pub(crate) insertion_index: u64,
}

impl Layer {
    pub(crate) fn new(config: LayerConfig, window_width: u32, window_height: u32) -> Self {
        let width = config.width.unwrap_or(window_width);
        let height = config.height.unwrap_or(window_height);
        let state = LayerState {
            name: config.name,
            order: config.order,
            width,
            height,
            view: config.view,
            projection: config.projection,
            passes: config.passes.into_iter().map(LayerPass::new).collect(),
            enabled: config.enabled,
            flags: config.flags,
            sync_to_window: config.sync_to_window,
        };
        Self {
            state,
            callbacks: Some(config.callbacks),
            behaviors: HandleTable::with_capacity(MAX_LAYER_BEHAVIORS),
            insertion_index: 0,
        }
    }

    fn with_callbacks<R>(
        &mut self,
        f: impl FnOnce(&mut dyn LayerCallbacks, &mut LayerState) -> R,
    ) -> Option<R> {
        let mut callbacks = self.callbacks.take()?;
        let result = f(callbacks.as_mut(), &mut self.state);
        self.callbacks = Some(callbacks);
        Some(result)
    }

    pub(crate) fn dispatch_create(&mut self, ctx: &mut LayerContext<'_>) -> Result<()> {
        self.with_callbacks(|cb, state| cb.on_create(state, ctx))
            .unwrap_or(Ok(()))
    }

    pub(crate) fn dispatch_attach(&mut self, ctx: &mut LayerContext<'_>) {
        self.with_callbacks(|cb, state| cb.on_attach(state, ctx));
    }

    pub(crate) fn dispatch_enable(&mut self, ctx: &mut LayerContext<'_>) {
        self.with_callbacks(|cb, state| cb.on_enable(state, ctx));
    }

    pub(crate) fn dispatch_disable(&mut self, ctx: &mut LayerContext<'_>) {
        self.with_callbacks(|cb, state| cb.on_disable(state, ctx));
    }

    pub(crate) fn dispatch_resize(&mut self, ctx: &mut LayerContext<'_>, width: u32, height: u32) {
        self.with_callbacks(|cb, state| cb.on_resize(state, ctx, width, height));
    }

    /// Update the layer, then its behaviors. A consumer nulls the input
    /// for everything after it.
    pub(crate) fn dispatch_update(
        &mut self,
        ctx: &mut LayerContext<'_>,
        dt: f32,
        input: Option<&InputState>,
    ) -> bool {
        let mut consumed = self
            .with_callbacks(|cb, state| cb.on_update(state, ctx, dt, input))
            .unwrap_or(false);
        for index in 0..self.behaviors.slot_count() {
            let Some(mut slot) = self.behaviors.take_at(index) else {
                continue;
            };
            if slot.active {
                let behavior_input = if consumed { None } else { input };
                consumed |= slot.behavior.on_update(&mut self.state, ctx, dt, behavior_input);
            }
            self.behaviors.put_back(index, slot);
        }
        consumed
    }

    /// Render the layer, then its behaviors
    pub(crate) fn dispatch_render(
        &mut self,
        ctx: &mut LayerContext<'_>,
        dt: f32,
        pass_index: usize,
        image_index: u32,
    ) -> Result<()> {
        self.with_callbacks(|cb, state| cb.on_render(state, ctx, dt, pass_index, image_index))
            .unwrap_or(Ok(()))?;
        for index in 0..self.behaviors.slot_count() {
            let Some(mut slot) = self.behaviors.take_at(index) else {
                continue;
            };
            let result = if slot.active {
                slot.behavior
                    .on_render(&mut self.state, ctx, dt, pass_index, image_index)
            } else {
                Ok(())
            };
            self.behaviors.put_back(index, slot);
            result?;
        }
        Ok(())
    }

    /// Deliver a message to the layer, then to each active behavior.
    /// The response buffer enforces single-writer, so a behavior can only
    /// respond when the layer did not.
    pub(crate) fn dispatch_message(
        &mut self,
        ctx: &mut LayerContext<'_>,
        msg: &Message,
        mut rsp: Option<&mut ResponseBuffer>,
    ) {
        self.with_callbacks(|cb, state| cb.on_message(state, ctx, msg, rsp.as_deref_mut()));
        for index in 0..self.behaviors.slot_count() {
            let Some(mut slot) = self.behaviors.take_at(index) else {
                continue;
            };
            if slot.active {
                slot.behavior
                    .on_message(&mut self.state, ctx, msg, rsp.as_deref_mut());
            }
            self.behaviors.put_back(index, slot);
        }
    }

    /// Destroy hook alone (teardown of a layer that never attached)
    pub(crate) fn dispatch_destroy(&mut self, ctx: &mut LayerContext<'_>) {
        self.with_callbacks(|cb, state| cb.on_destroy(state, ctx));
    }

    /// Detach hooks (behaviors first), then destroy
    pub(crate) fn dispatch_teardown(&mut self, ctx: &mut LayerContext<'_>) {
        for index in 0..self.behaviors.slot_count() {
            let Some(mut slot) = self.behaviors.take_at(index) else {
                continue;
            };
            slot.behavior.on_detach(&mut self.state, ctx);
            self.behaviors.put_back(index, slot);
        }
        self.with_callbacks(|cb, state| cb.on_detach(state, ctx));
        self.with_callbacks(|cb, state| cb.on_destroy(state, ctx));
    }
}
