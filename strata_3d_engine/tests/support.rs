//! Shared fixtures for the integration suites.
//!
//! Builds a view system over the mock renderer frontend so whole frames
//! (update → sync → draw) run without a GPU.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use strata_3d_engine::error::Result;
use strata_3d_engine::input::InputState;
use strata_3d_engine::renderer::mock::{mock_services, MockServiceHandles};
use strata_3d_engine::renderer::{RenderServices, ShadowFrameData};
use strata_3d_engine::scene::SceneRuntime;
use strata_3d_engine::view::message::{Message, ResponseBuffer, MSG_SHADOW_GET_FRAME_DATA};
use strata_3d_engine::view::{
    LayerCallbacks, LayerConfig, LayerContext, LayerFlags, LayerHandle, LayerState, ViewSystem,
};
use strata_3d_engine::world_view::{WorldViewConfig, WorldViewLayer};

/// A view system over mock services, with the builtin world renderpass
/// registered.
pub struct Fixture {
    pub vs: ViewSystem,
    pub services: RenderServices,
    pub handles: MockServiceHandles,
}

impl Fixture {
    pub fn new(image_count: u32, window_width: u32, window_height: u32) -> Self {
        let (services, handles) = mock_services(image_count);
        handles
            .renderer
            .lock()
            .unwrap()
            .register_renderpass("builtin.world");
        let vs = ViewSystem::new(services.clone(), window_width, window_height);
        Self { vs, services, handles }
    }

    /// Register a world view layer over a fresh scene runtime, with an
    /// identity camera so origin-centered content is in view.
    pub fn register_world_layer(&mut self) -> (LayerHandle, Arc<Mutex<SceneRuntime>>) {
        let runtime = Arc::new(Mutex::new(
            SceneRuntime::create(self.services.clone(), 0, 256, 64).unwrap(),
        ));
        let callbacks = WorldViewLayer::new(runtime.clone(), WorldViewConfig::default());
        let mut config = LayerConfig::new("world", Box::new(callbacks));
        config.flags = LayerFlags::MAIN_VIEW;
        let handle = self.vs.register_layer(config).unwrap();
        self.vs.set_layer_camera(
            handle,
            Some(&glam::Mat4::IDENTITY),
            Some(&glam::Mat4::IDENTITY),
        );
        (handle, runtime)
    }

    /// Register a stub shadow layer answering SHADOW_GET_FRAME_DATA
    pub fn register_shadow_stub(&mut self) -> LayerHandle {
        let mut config = LayerConfig::new("shadow", Box::new(ShadowStubLayer::new()));
        config.order = -10;
        self.vs.register_layer(config).unwrap()
    }

    /// Register a layer that records every message it receives
    pub fn register_recorder(&mut self, name: &str, order: i32) -> (LayerHandle, MessageLog) {
        let log: MessageLog = Arc::new(Mutex::new(Vec::new()));
        let mut config = LayerConfig::new(name, Box::new(RecorderLayer { log: log.clone() }));
        config.order = order;
        let handle = self.vs.register_layer(config).unwrap();
        (handle, log)
    }

    /// Run one whole frame
    pub fn run_frame(&mut self, runtime: &Arc<Mutex<SceneRuntime>>, image_index: u32) {
        self.vs.update_all(0.016, &InputState::new());
        runtime.lock().unwrap().update_and_sync(0.016);
        self.vs.draw_all(0.016, image_index);
    }
}

pub type MessageLog = Arc<Mutex<Vec<Message>>>;

/// Records received messages without answering them
pub struct RecorderLayer {
    pub log: MessageLog,
}

impl LayerCallbacks for RecorderLayer {
    fn on_message(
        &mut self,
        _state: &mut LayerState,
        _ctx: &mut LayerContext<'_>,
        msg: &Message,
        _rsp: Option<&mut ResponseBuffer>,
    ) {
        self.log.lock().unwrap().push(msg.clone());
    }
}

/// Answers shadow frame-data requests with a fixed two-cascade setup
pub struct ShadowStubLayer {
    pub frame: ShadowFrameData,
}

impl ShadowStubLayer {
    pub fn new() -> Self {
        let mut frame = ShadowFrameData::default();
        frame.cascade_count = 2;
        frame.split_far = [20.0, 80.0, 0.0, 0.0];
        frame.pcf_radius = 1.5;
        frame.shadow_map = [42, 0];
        Self { frame }
    }
}

impl Default for ShadowStubLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerCallbacks for ShadowStubLayer {
    fn on_create(&mut self, _state: &mut LayerState, _ctx: &mut LayerContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_message(
        &mut self,
        _state: &mut LayerState,
        _ctx: &mut LayerContext<'_>,
        msg: &Message,
        rsp: Option<&mut ResponseBuffer>,
    ) {
        if msg.kind() == MSG_SHADOW_GET_FRAME_DATA {
            if let Some(rsp) = rsp {
                rsp.write(MSG_SHADOW_GET_FRAME_DATA, 0, &self.frame);
            }
        }
    }
}

/// Kinds of the recorded messages, in arrival order
pub fn recorded_kinds(log: &MessageLog) -> Vec<u32> {
    log.lock().unwrap().iter().map(|m| m.kind()).collect()
}
