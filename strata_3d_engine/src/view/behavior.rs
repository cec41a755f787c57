/// Layer behaviors — reusable callback sets attached to a layer to extend
/// it without subclassing.
///
/// Behaviors run after their layer for every hook: update (with the same
/// input-claim rule), render, and message delivery (a behavior may only
/// respond when the layer did not).

use crate::error::Result;
use crate::input::InputState;
use super::layer::LayerState;
use super::message::{Message, ResponseBuffer};
use super::view_system::LayerContext;

/// Callbacks of a layer behavior.
pub trait LayerBehavior: Send {
    /// The behavior was attached to a layer
    fn on_attach(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let _ = (state, ctx);
    }

    /// Per-frame update; same consumption contract as the layer hook
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

    /// Record draws after the layer's own render
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

    /// A typed message arrived (after the layer saw it)
    fn on_message(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        msg: &Message,
        rsp: Option<&mut ResponseBuffer>,
    ) {
        let _ = (state, ctx, msg, rsp);
    }

    /// The behavior is being detached
    fn on_detach(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let _ = (state, ctx);
    }
}

/// One attached behavior
pub(crate) struct BehaviorSlot {
    pub(crate) behavior: Box<dyn LayerBehavior>,
    pub(crate) active: bool,
}
