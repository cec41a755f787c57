/// The world view layer — the primary 3D pass.
///
/// Per frame it requests shadow data from the shadow layer, collects draw
/// commands from the mesh manager (mesh-slot and instance paths) with
/// sphere frustum culling, batches opaques by draw key, allocates instance
/// data from the persistent pool, and issues draws: multi-draw-indirect
/// in chunks when the backend supports it, per-command otherwise. It also
/// renders 3D world text and point-light gizmos, drives the fly camera
/// from captured input, and hosts the editor-viewport offscreen mode.

use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashSet;
use winit::keyboard::KeyCode;
use crate::error::Result;
use crate::{engine_bail, engine_debug, engine_warn};
use crate::camera::{CameraController, Frustum};
use crate::input::InputState;
use crate::renderer::{
    BufferHandle, GeometryHandle, IndexType, IndirectDrawCommand, IndirectDrawPool,
    InstanceBufferPool, InstanceData, LightingGlobals, MaterialHandle, MaterialSystem,
    MeshInstanceHandle, MeshManager, PipelineDomain, PipelineHandle, PipelineRegistry,
    PointLightGlobal, RenderPassHandle, RenderServices, RendererFrontend,
    RendererInstanceStateHandle, ShadowFrameData, ShadowGlobals, Text3dConfig,
    INDIRECT_DRAW_STRIDE, MAX_POINT_LIGHTS,
};
use crate::scene::{encode_picking_id, PickKind, PointLightSnapshot, SceneRuntime};
use crate::view::message::{
    pack_text, unpack_text, shadow_frame_request, shadow_frame_response_buffer, Message,
    OffscreenSizePayload, ResponseBuffer, TextIdResponse, WorldTextCreatePayload,
    WorldTextDestroyPayload, WorldTextSetTransformPayload, WorldTextUpdatePayload,
    MSG_WORLD_SET_OFFSCREEN_SIZE, MSG_WORLD_TEXT_CREATE, MSG_WORLD_TEXT_DESTROY,
    MSG_WORLD_TEXT_SET_TRANSFORM, MSG_WORLD_TEXT_UPDATE, MSG_WORLD_TOGGLE_OFFSCREEN,
};
use crate::view::{LayerCallbacks, LayerContext, LayerHandle, LayerState};
use std::sync::{Arc, Mutex};
use super::batch::{material_is_cutout, DrawBatcher, DrawCommand, DrawKey};
use super::offscreen::OffscreenState;
use super::text::TextSlotPool;

const SOURCE: &str = "strata3d::WorldViewLayer";

/// World-space radius of a point-light gizmo sphere
const GIZMO_RADIUS: f32 = 0.15;

/// Tunables for a world view layer
#[derive(Debug, Clone)]
pub struct WorldViewConfig {
    /// Shader configuration for 3D text
    pub text_shader: String,
    /// Shader configuration for overlays and gizmos
    pub overlay_shader: String,
    /// Renderpass the layer draws to when not offscreen
    pub onscreen_renderpass: String,
    /// Use multi-draw-indirect when the backend can
    pub use_indirect: bool,
    pub move_speed: f32,
    pub look_speed: f32,
    pub zoom_speed: f32,
    pub gamepad_dead_zone: f32,
}

impl Default for WorldViewConfig {
    fn default() -> Self {
        Self {
            text_shader: "builtin.text3d".to_string(),
            overlay_shader: "builtin.overlay".to_string(),
            onscreen_renderpass: "builtin.world".to_string(),
            use_indirect: true,
            move_speed: 6.0,
            look_speed: 0.0025,
            zoom_speed: 0.8,
            gamepad_dead_zone: 0.15,
        }
    }
}

/// The world view layer callbacks + state.
pub struct WorldViewLayer {
    config: WorldViewConfig,
    scene: Arc<Mutex<SceneRuntime>>,
    batcher: DrawBatcher,
    camera: CameraController,
    texts: TextSlotPool,
    offscreen: OffscreenState,
    gizmo_geometry: Option<GeometryHandle>,
    gizmo_material: Option<MaterialHandle>,
    gizmo_pipeline: Option<PipelineHandle>,
    gizmo_states: Vec<RendererInstanceStateHandle>,
    shadow_layer: Option<LayerHandle>,
}

impl WorldViewLayer {
    /// Create the layer callbacks over a scene runtime
    pub fn new(scene: Arc<Mutex<SceneRuntime>>, config: WorldViewConfig) -> Self {
        Self {
            config,
            scene,
            batcher: DrawBatcher::new(),
            camera: CameraController::default(),
            texts: TextSlotPool::new(),
            offscreen: OffscreenState::new(),
            gizmo_geometry: None,
            gizmo_material: None,
            gizmo_pipeline: None,
            gizmo_states: Vec::new(),
            shadow_layer: None,
        }
    }

    /// The fly camera (test/introspection aid)
    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    /// Whether the layer currently renders offscreen
    pub fn offscreen_enabled(&self) -> bool {
        self.offscreen.enabled
    }

    /// Number of live world-text slots
    pub fn text_count(&self) -> usize {
        self.texts.active_count()
    }

    // ===== SHADOW SNAPSHOT =====

    fn request_shadow_data(
        &mut self,
        ctx: &mut LayerContext<'_>,
        image_index: u32,
    ) -> ShadowGlobals {
        let shadow_layer = match self.shadow_layer {
            Some(handle) => Some(handle),
            None => {
                self.shadow_layer = ctx.layer_by_name("shadow");
                self.shadow_layer
            }
        };
        let Some(shadow_layer) = shadow_layer else {
            return ShadowGlobals::default();
        };
        if !ctx.layer_enabled(shadow_layer) {
            return ShadowGlobals::default();
        }

        let msg = shadow_frame_request(image_index);
        let mut rsp = shadow_frame_response_buffer();
        let sent = ctx.send_msg(shadow_layer, &msg, Some(&mut rsp));
        if sent.is_ok() && rsp.error() == Some(0) {
            if let Some(frame) = rsp.body::<ShadowFrameData>() {
                return ShadowGlobals {
                    frame,
                    comparison_enabled: true,
                };
            }
        }
        // Shadow map binding stays in place, comparison sampling disabled
        engine_debug!(SOURCE, "shadow data unavailable; rendering unshadowed");
        ShadowGlobals::default()
    }

    // ===== SCENE SNAPSHOTS =====

    fn collect_scene_lighting(&self) -> (LightingGlobals, Vec<PointLightSnapshot>) {
        let runtime = self.scene.lock().unwrap();
        let scene = runtime.scene();

        let mut lighting = LightingGlobals::default();
        if let Some(directional) = scene.directional_light() {
            lighting.directional_direction = directional.direction;
            lighting.directional_color = directional.color;
            lighting.directional_intensity = directional.intensity;
        }

        let visible_lights: Vec<PointLightSnapshot> = scene
            .point_lights()
            .into_iter()
            .filter(|snapshot| snapshot.light.enabled && scene.is_visible(snapshot.entity))
            .collect();
        for (index, snapshot) in visible_lights.iter().take(MAX_POINT_LIGHTS).enumerate() {
            lighting.points[index] = PointLightGlobal {
                position: snapshot.position,
                color: snapshot.light.color,
                intensity: snapshot.light.intensity,
                range: snapshot.light.range,
            };
            lighting.point_count = index as u32 + 1;
        }
        (lighting, visible_lights)
    }

    // ===== DRAW COLLECTION =====

    fn collect_draws(
        &mut self,
        services: &RenderServices,
        frustum: &Frustum,
        camera_position: Vec3,
        merge_ranges: bool,
    ) {
        self.batcher.clear();
        let mesh_manager = services.mesh_manager.lock().unwrap();
        let materials = services.materials.lock().unwrap();

        for live_index in 0..mesh_manager.count() {
            let Some((mesh_index, slot)) = mesh_manager.mesh_by_live_index(live_index) else {
                continue;
            };
            if !slot.visible {
                continue;
            }
            if !sphere_in_frustum(frustum, slot.bounding_sphere, &slot.model) {
                continue;
            }
            collect_mesh_commands(
                &mut self.batcher,
                &*mesh_manager,
                &*materials,
                mesh_index,
                slot.submesh_count,
                &slot.model,
                slot.render_id,
                MeshInstanceHandle::INVALID,
                false,
                camera_position,
                merge_ranges,
            );
        }

        for live_index in 0..mesh_manager.instance_count() {
            let Some((handle, instance)) = mesh_manager.instance_by_live_index(live_index)
            else {
                continue;
            };
            if !instance.visible {
                continue;
            }
            let Some(slot) = mesh_manager.mesh_slot(instance.mesh_index) else {
                continue;
            };
            if !sphere_in_frustum(frustum, slot.bounding_sphere, &instance.model) {
                continue;
            }
            collect_mesh_commands(
                &mut self.batcher,
                &*mesh_manager,
                &*materials,
                instance.mesh_index,
                slot.submesh_count,
                &instance.model,
                instance.render_id,
                handle,
                true,
                camera_position,
                merge_ranges,
            );
        }
    }

    // ===== TEXT =====

    fn rebind_text_pipelines(
        &mut self,
        services: &RenderServices,
        renderpass: Option<RenderPassHandle>,
    ) {
        let Some(renderpass) = renderpass else {
            return;
        };
        let pipeline = services.pipelines.lock().unwrap().resolve(
            &self.config.text_shader,
            PipelineDomain::Text,
            renderpass,
        );
        let Some(pipeline) = pipeline else {
            engine_warn!(SOURCE, "text shader '{}' unresolvable", self.config.text_shader);
            return;
        };
        let mut world_resources = services.world_resources.lock().unwrap();
        for (_, text_index) in self.texts.active_slots() {
            world_resources.text_rebind_pipeline(text_index, pipeline);
        }
    }

    fn render_texts(&mut self, services: &RenderServices, renderpass: RenderPassHandle) {
        if self.texts.active_count() == 0 {
            return;
        }
        let pipeline = services.pipelines.lock().unwrap().resolve(
            &self.config.text_shader,
            PipelineDomain::Text,
            renderpass,
        );
        let Some(pipeline) = pipeline else {
            engine_warn!(SOURCE, "text pipeline unavailable; world text skipped");
            return;
        };
        services.pipelines.lock().unwrap().bind(pipeline);

        let world_resources = services.world_resources.lock().unwrap();
        let mut frontend = services.renderer.lock().unwrap();
        for (_, text_index) in self.texts.active_slots() {
            let Some(draw) = world_resources.text_draw_data(text_index) else {
                continue;
            };
            frontend.bind_vertex_buffer(draw.vertex_buffer, 0);
            frontend.bind_index_buffer(draw.index_buffer, 0, IndexType::U32);
            frontend.draw_indexed(draw.index_count, 1, 0, 0, 0);
        }
    }

    // ===== POINT-LIGHT GIZMOS =====

    fn ensure_gizmo_states(
        &mut self,
        pipelines: &mut dyn PipelineRegistry,
        pipeline: PipelineHandle,
    ) {
        if self.gizmo_pipeline == Some(pipeline) && !self.gizmo_states.is_empty() {
            return;
        }
        for state in self.gizmo_states.drain(..) {
            pipelines.release_instance_state(state);
        }
        for _ in 0..MAX_POINT_LIGHTS {
            match pipelines.acquire_instance_state(pipeline) {
                Some(state) => self.gizmo_states.push(state),
                None => break,
            }
        }
        self.gizmo_pipeline = Some(pipeline);
    }

    fn render_point_light_gizmos(
        &mut self,
        services: &RenderServices,
        lights: &[PointLightSnapshot],
        renderpass: RenderPassHandle,
    ) {
        if lights.is_empty() {
            return;
        }
        let (Some(geometry), Some(material)) = (self.gizmo_geometry, self.gizmo_material)
        else {
            return;
        };
        let pipeline = services.pipelines.lock().unwrap().resolve(
            &self.config.overlay_shader,
            PipelineDomain::Overlay,
            renderpass,
        );
        let Some(pipeline) = pipeline else {
            return;
        };
        {
            let mut pipelines = services.pipelines.lock().unwrap();
            self.ensure_gizmo_states(&mut *pipelines, pipeline);
            pipelines.bind(pipeline);
        }
        let Some(draw) = services.geometries.lock().unwrap().draw_data(geometry) else {
            return;
        };

        let mut pipelines = services.pipelines.lock().unwrap();
        let mut materials = services.materials.lock().unwrap();
        let mut instance_pool = services.instance_pool.lock().unwrap();
        let mut frontend = services.renderer.lock().unwrap();
        frontend.bind_vertex_buffer(draw.vertex_buffer, 0);
        frontend.bind_index_buffer(draw.index_buffer, 0, IndexType::U32);

        for (index, snapshot) in lights.iter().take(MAX_POINT_LIGHTS).enumerate() {
            let Some(&state) = self.gizmo_states.get(index) else {
                break;
            };
            materials.set_emission_color(material, snapshot.light.color);
            pipelines.apply_instance_material(state, material);
            pipelines.bind_instance_state(state);

            let Some(base) = instance_pool.alloc(1) else {
                engine_warn!(SOURCE, "instance pool exhausted; gizmos dropped");
                break;
            };
            let model = Mat4::from_translation(snapshot.position);
            let object_id = if snapshot.render_id != 0 {
                encode_picking_id(PickKind::Light, snapshot.render_id)
            } else {
                0
            };
            instance_pool.write(base, &InstanceData::new(&model, object_id));
            instance_pool.flush_range(base, 1);
            frontend.draw_indexed(draw.index_count, 1, 0, 0, base);
        }
    }

    // ===== MESSAGE HANDLERS =====

    fn handle_text_create(
        &mut self,
        ctx: &mut LayerContext<'_>,
        state: &LayerState,
        payload: &WorldTextCreatePayload,
        rsp: Option<&mut ResponseBuffer>,
    ) {
        let services = ctx.services().clone();
        let config = Text3dConfig {
            text: unpack_text(&payload.text, payload.text_len),
            size: payload.size,
            color: Vec4::from_array(payload.color),
        };
        let transform = Mat4::from_cols_array(&payload.transform);

        let created = services
            .world_resources
            .lock()
            .unwrap()
            .text_create(&config, &transform);
        let text_index = match created {
            Ok(text_index) => text_index,
            Err(err) => {
                engine_warn!(SOURCE, "world text creation failed: {}", err);
                if let Some(rsp) = rsp {
                    rsp.write_empty(MSG_WORLD_TEXT_CREATE, 1);
                }
                return;
            }
        };

        let Some(slot) = self.texts.allocate(text_index) else {
            engine_warn!(SOURCE, "world text pool full");
            services
                .world_resources
                .lock()
                .unwrap()
                .text_destroy(text_index);
            if let Some(rsp) = rsp {
                rsp.write_empty(MSG_WORLD_TEXT_CREATE, 2);
            }
            return;
        };

        // Bind the fresh text against the pass's current pipeline
        if let Some(renderpass) = state.passes.first().and_then(|p| p.renderpass) {
            let pipeline = services.pipelines.lock().unwrap().resolve(
                &self.config.text_shader,
                PipelineDomain::Text,
                renderpass,
            );
            if let Some(pipeline) = pipeline {
                services
                    .world_resources
                    .lock()
                    .unwrap()
                    .text_rebind_pipeline(text_index, pipeline);
            }
        }

        if let Some(rsp) = rsp {
            rsp.write(MSG_WORLD_TEXT_CREATE, 0, &TextIdResponse { text_id: slot });
        }
    }

    fn handle_toggle_offscreen(&mut self, ctx: &mut LayerContext<'_>, state: &mut LayerState) {
        let result = if self.offscreen.enabled {
            self.offscreen
                .disable(ctx, state, &self.config.onscreen_renderpass)
        } else {
            self.offscreen.enable(ctx, state)
        };
        match result {
            Ok(()) => {
                // Text pipelines must match the new renderpass
                let renderpass = state.passes.first().and_then(|p| p.renderpass);
                let services = ctx.services().clone();
                self.rebind_text_pipelines(&services, renderpass);
            }
            Err(err) => {
                engine_warn!(SOURCE, "offscreen toggle failed: {}", err);
            }
        }
    }

    // ===== CAMERA CONTROL =====

    fn drive_camera(&mut self, input: &InputState, dt: f32) -> bool {
        let mut moved = false;
        let mut axes = Vec3::ZERO;
        if input.is_pressed(KeyCode::KeyW) {
            axes.z += 1.0;
        }
        if input.is_pressed(KeyCode::KeyS) {
            axes.z -= 1.0;
        }
        if input.is_pressed(KeyCode::KeyD) {
            axes.x += 1.0;
        }
        if input.is_pressed(KeyCode::KeyA) {
            axes.x -= 1.0;
        }

        if input.gamepad.connected {
            let dead_zone = self.config.gamepad_dead_zone;
            let left = input.gamepad.left_stick;
            if left.length() > dead_zone {
                axes.x += left.x;
                axes.z -= left.y;
            }
            let right = input.gamepad.right_stick;
            if right.length() > dead_zone {
                self.camera.apply_look(
                    right.x * self.config.look_speed * 600.0 * dt,
                    -right.y * self.config.look_speed * 600.0 * dt,
                );
                moved = true;
            }
        }

        if axes != Vec3::ZERO {
            self.camera.advance(axes, self.config.move_speed * dt);
            moved = true;
        }
        if input.mouse_delta != glam::Vec2::ZERO {
            self.camera.apply_look(
                input.mouse_delta.x * self.config.look_speed,
                -input.mouse_delta.y * self.config.look_speed,
            );
            moved = true;
        }
        if input.wheel_delta != 0.0 {
            self.camera.zoom(input.wheel_delta * self.config.zoom_speed);
            moved = true;
        }
        moved
    }
}

impl LayerCallbacks for WorldViewLayer {
    fn on_create(&mut self, state: &mut LayerState, ctx: &mut LayerContext<'_>) -> Result<()> {
        let services = ctx.services().clone();
        self.gizmo_geometry = Some(
            services
                .geometries
                .lock()
                .unwrap()
                .create_sphere(GIZMO_RADIUS)?,
        );
        self.gizmo_material = Some(
            services
                .materials
                .lock()
                .unwrap()
                .create_colored("gizmo.point_light", Vec4::ONE)?,
        );

        // Acquire the gizmo instance-state pool up front when the builtin
        // renderpass is already registered
        let renderpass = services
            .renderer
            .lock()
            .unwrap()
            .renderpass_by_name(&self.config.onscreen_renderpass);
        if let Some(renderpass) = renderpass {
            let pipeline = services.pipelines.lock().unwrap().resolve(
                &self.config.overlay_shader,
                PipelineDomain::Overlay,
                renderpass,
            );
            if let Some(pipeline) = pipeline {
                let mut pipelines = services.pipelines.lock().unwrap();
                self.ensure_gizmo_states(&mut *pipelines, pipeline);
            }
        }
        self.camera = CameraController::default();
        state.view = self.camera.view_matrix();
        Ok(())
    }

    fn on_resize(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        width: u32,
        height: u32,
    ) {
        // An explicitly requested offscreen size is editor-owned; window
        // resizes do not touch it
        if self.offscreen.explicit_size {
            engine_debug!(SOURCE, "resize ignored; offscreen size is editor-owned");
            return;
        }
        if self.offscreen.enabled {
            if let Err(err) = self.offscreen.resize(ctx, state, width, height) {
                engine_warn!(SOURCE, "offscreen resize failed: {}", err);
            }
        }
    }

    fn on_update(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        dt: f32,
        input: Option<&InputState>,
    ) -> bool {
        let Some(input) = input else {
            return false;
        };
        // Camera control only applies while the window captures the mouse
        if !input.mouse_captured {
            return false;
        }
        let moved = self.drive_camera(input, dt);
        if moved {
            state.view = self.camera.view_matrix();
            ctx.services().pipelines.lock().unwrap().mark_globals_dirty();
        }
        moved
    }

    fn on_render(
        &mut self,
        state: &mut LayerState,
        ctx: &mut LayerContext<'_>,
        _dt: f32,
        pass_index: usize,
        image_index: u32,
    ) -> Result<()> {
        if pass_index != 0 {
            return Ok(());
        }
        let Some(renderpass) = state.passes.first().and_then(|p| p.renderpass) else {
            engine_bail!(RenderpassUnavailable, "world pass has no renderpass");
        };

        // 1. Shadow snapshot from the shadow layer
        let shadow = self.request_shadow_data(ctx, image_index);

        // 2. Lighting + gizmo snapshots from the scene
        let (lighting, point_lights) = self.collect_scene_lighting();

        let services = ctx.services().clone();
        let mdi = {
            let frontend = services.renderer.lock().unwrap();
            self.config.use_indirect
                && frontend.supports_multi_draw_indirect()
                && frontend.supports_indirect_first_instance()
        };

        // 3. Collect and batch
        let frustum = Frustum::from_view_projection(&state.view, &state.projection);
        let camera_position = state.view.inverse().col(3).truncate();
        self.collect_draws(&services, &frustum, camera_position, mdi);
        self.batcher.build();

        // 4. Issue draws
        {
            let mut frontend = services.renderer.lock().unwrap();
            let mut mesh_manager = services.mesh_manager.lock().unwrap();
            let mut pipelines = services.pipelines.lock().unwrap();
            let materials = services.materials.lock().unwrap();
            let mut instance_pool = services.instance_pool.lock().unwrap();
            let mut indirect_pool = services.indirect_pool.lock().unwrap();

            let mut dispatch = DrawDispatch {
                frontend: &mut *frontend,
                mesh_manager: &mut *mesh_manager,
                pipelines: &mut *pipelines,
                materials: &*materials,
                lighting: &lighting,
                shadow: &shadow,
                renderpass,
                bound_pipeline: None,
                bound_buffers: None,
                globals_applied: Vec::new(),
                applied_submeshes: FxHashSet::default(),
            };
            issue_opaque_batches(
                &mut dispatch,
                &mut self.batcher,
                &mut *instance_pool,
                &mut *indirect_pool,
                mdi,
            );
            issue_transparents(&mut dispatch, &self.batcher, &mut *instance_pool);
        }

        // 5. World text and light gizmos
        self.render_texts(&services, renderpass);
        self.render_point_light_gizmos(&services, &point_lights, renderpass);
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
            MSG_WORLD_TEXT_CREATE => {
                if let Some(payload) = msg.payload::<WorldTextCreatePayload>() {
                    self.handle_text_create(ctx, state, &payload, rsp);
                }
            }
            MSG_WORLD_TEXT_UPDATE => {
                let Some(payload) = msg.payload::<WorldTextUpdatePayload>() else {
                    return;
                };
                let Some(text_index) = self.texts.text_index(payload.slot) else {
                    engine_debug!(SOURCE, "text update for inactive slot {}", payload.slot);
                    return;
                };
                let config = Text3dConfig {
                    text: unpack_text(&payload.text, payload.text_len),
                    size: payload.size,
                    color: Vec4::from_array(payload.color),
                };
                let services = ctx.services().clone();
                let result = services
                    .world_resources
                    .lock()
                    .unwrap()
                    .text_update(text_index, &config);
                if let Err(err) = result {
                    engine_warn!(SOURCE, "world text update failed: {}", err);
                }
            }
            MSG_WORLD_TEXT_SET_TRANSFORM => {
                let Some(payload) = msg.payload::<WorldTextSetTransformPayload>() else {
                    return;
                };
                let Some(text_index) = self.texts.text_index(payload.slot) else {
                    return;
                };
                let transform = Mat4::from_cols_array(&payload.transform);
                ctx.services()
                    .world_resources
                    .lock()
                    .unwrap()
                    .text_set_transform(text_index, &transform);
            }
            MSG_WORLD_TEXT_DESTROY => {
                let Some(payload) = msg.payload::<WorldTextDestroyPayload>() else {
                    return;
                };
                if let Some(text_index) = self.texts.release(payload.slot) {
                    ctx.services()
                        .world_resources
                        .lock()
                        .unwrap()
                        .text_destroy(text_index);
                }
            }
            MSG_WORLD_TOGGLE_OFFSCREEN => {
                self.handle_toggle_offscreen(ctx, state);
            }
            MSG_WORLD_SET_OFFSCREEN_SIZE => {
                let Some(payload) = msg.payload::<OffscreenSizePayload>() else {
                    return;
                };
                self.offscreen
                    .set_requested_size(payload.width, payload.height);
                if self.offscreen.enabled {
                    if let Err(err) =
                        self.offscreen
                            .resize(ctx, state, payload.width, payload.height)
                    {
                        engine_warn!(SOURCE, "offscreen resize failed: {}", err);
                    } else {
                        let renderpass = state.passes.first().and_then(|p| p.renderpass);
                        let services = ctx.services().clone();
                        self.rebind_text_pipelines(&services, renderpass);
                    }
                }
            }
            _ => {}
        }
    }

    fn on_destroy(&mut self, _state: &mut LayerState, ctx: &mut LayerContext<'_>) {
        let services = ctx.services().clone();
        self.offscreen.destroy(&services);
        {
            let mut pipelines = services.pipelines.lock().unwrap();
            for state in self.gizmo_states.drain(..) {
                pipelines.release_instance_state(state);
            }
        }
        if let Some(material) = self.gizmo_material.take() {
            services.materials.lock().unwrap().release(material);
        }
        if let Some(geometry) = self.gizmo_geometry.take() {
            services.geometries.lock().unwrap().release(geometry);
        }
        {
            let mut world_resources = services.world_resources.lock().unwrap();
            for text_index in self.texts.drain() {
                world_resources.text_destroy(text_index);
            }
        }
    }
}

/// Build a world-text create message (convenience for callers)
pub fn world_text_create_message(text: &str, size: f32, color: Vec4, transform: &Mat4) -> Message {
    let (packed, text_len) = pack_text(text);
    Message::with_payload(
        MSG_WORLD_TEXT_CREATE,
        &WorldTextCreatePayload {
            text: packed,
            text_len,
            size,
            color: color.to_array(),
            transform: transform.to_cols_array(),
        },
    )
    .expect_response()
}

// ===== CULLING =====

fn max_axis_scale(matrix: &Mat4) -> f32 {
    matrix
        .col(0)
        .truncate()
        .length()
        .max(matrix.col(1).truncate().length())
        .max(matrix.col(2).truncate().length())
}

fn sphere_in_frustum(
    frustum: &Frustum,
    bounding_sphere: Option<(Vec3, f32)>,
    model: &Mat4,
) -> bool {
    match bounding_sphere {
        Some((center, radius)) => {
            let world_center = model.transform_point3(center);
            let world_radius = radius * max_axis_scale(model);
            frustum.test_sphere(world_center, world_radius)
        }
        // No bounds: never cull
        None => true,
    }
}

// ===== COMMAND COLLECTION =====

#[allow(clippy::too_many_arguments)]
fn collect_mesh_commands(
    batcher: &mut DrawBatcher,
    mesh_manager: &dyn MeshManager,
    materials: &dyn MaterialSystem,
    mesh_index: u32,
    submesh_count: u32,
    model: &Mat4,
    render_id: u32,
    instance: MeshInstanceHandle,
    is_instance: bool,
    camera_position: Vec3,
    merge_ranges: bool,
) {
    let object_id = if render_id != 0 {
        encode_picking_id(PickKind::Scene, render_id)
    } else {
        0
    };
    let camera_distance = (model.col(3).truncate() - camera_position).length();

    for submesh_index in 0..submesh_count {
        let Some(submesh) = mesh_manager.submesh(mesh_index, submesh_index) else {
            continue;
        };
        let material = materials
            .material(submesh.material)
            .or_else(|| materials.material(materials.default_material()))
            .unwrap_or_default();
        let cutout = material_is_cutout(&material);

        // Opaque range ids merge away under MDI; transparents always keep
        // theirs (they never merge anyway)
        let range = if cutout || !merge_ranges {
            submesh.range_id
        } else {
            0
        };
        let command = DrawCommand {
            key: DrawKey {
                pipeline: submesh.pipeline.0.id,
                material: submesh.material.0.id,
                geometry: submesh.geometry.0.id,
                range,
            },
            mesh_index,
            submesh_index,
            instance,
            model: *model,
            object_id,
            camera_distance,
            is_instance,
        };
        if cutout {
            batcher.push_transparent(command);
        } else {
            batcher.push_opaque(command);
        }
    }
}

// ===== DRAW ISSUANCE =====

/// Per-frame binding state threaded through draw issuance.
struct DrawDispatch<'a> {
    frontend: &'a mut dyn RendererFrontend,
    mesh_manager: &'a mut dyn MeshManager,
    pipelines: &'a mut dyn PipelineRegistry,
    materials: &'a dyn MaterialSystem,
    lighting: &'a LightingGlobals,
    shadow: &'a ShadowGlobals,
    renderpass: RenderPassHandle,
    bound_pipeline: Option<PipelineHandle>,
    bound_buffers: Option<(BufferHandle, BufferHandle)>,
    globals_applied: Vec<PipelineHandle>,
    applied_submeshes: FxHashSet<(u32, u32)>,
}

impl DrawDispatch<'_> {
    /// The submesh binding contract: resolve material → shader → pipeline,
    /// refresh stale submesh pipeline records, bind on change, apply
    /// lighting/shadow/domain globals once per resolved pipeline, apply
    /// the instance material once per submesh, and bind geometry buffers.
    fn bind_submesh(
        &mut self,
        command: &DrawCommand,
        domain: PipelineDomain,
    ) -> Result<(PipelineHandle, crate::renderer::SubmeshData)> {
        let Some(slot) = self.mesh_manager.mesh_slot(command.mesh_index) else {
            engine_bail!(HandleInvalid, "mesh slot {} vanished", command.mesh_index);
        };
        let Some(mut submesh) = self
            .mesh_manager
            .submesh(command.mesh_index, command.submesh_index)
        else {
            engine_bail!(
                HandleInvalid,
                "submesh {}:{} vanished",
                command.mesh_index,
                command.submesh_index
            );
        };

        let material = self
            .materials
            .material(submesh.material)
            .or_else(|| self.materials.material(self.materials.default_material()))
            .unwrap_or_default();
        let resolved = self
            .pipelines
            .resolve(&material.shader_name, domain, self.renderpass)
            .ok_or_else(|| {
                crate::engine_err!(
                    RenderpassUnavailable,
                    "no {} pipeline for shader '{}'",
                    match domain {
                        PipelineDomain::Opaque => "opaque",
                        PipelineDomain::Transparent => "transparent",
                        PipelineDomain::Overlay => "overlay",
                        PipelineDomain::Text => "text",
                    },
                    material.shader_name
                )
            })?;

        // Stale pipeline record: refresh it and re-acquire instance state
        if submesh.pipeline != resolved {
            let instance_state = self
                .pipelines
                .acquire_instance_state(resolved)
                .unwrap_or(RendererInstanceStateHandle::INVALID);
            if command.is_instance {
                self.mesh_manager.instance_refresh_pipeline(
                    command.instance,
                    command.submesh_index,
                    resolved,
                    instance_state,
                );
            } else {
                self.mesh_manager.refresh_pipeline(
                    command.mesh_index,
                    command.submesh_index,
                    resolved,
                    instance_state,
                );
            }
            submesh.pipeline = resolved;
            submesh.instance_state = instance_state;
        }

        if self.bound_pipeline != Some(resolved) {
            self.pipelines.bind(resolved);
            self.bound_pipeline = Some(resolved);
        }
        if !self.globals_applied.contains(&resolved) {
            self.pipelines.apply_lighting(resolved, self.lighting);
            self.pipelines.apply_shadow_globals(resolved, self.shadow);
            self.pipelines.apply_domain_globals(resolved, domain);
            self.globals_applied.push(resolved);
        }

        let buffers = (slot.vertex_buffer, slot.index_buffer);
        if self.bound_buffers != Some(buffers) {
            self.frontend.bind_vertex_buffer(slot.vertex_buffer, 0);
            self.frontend
                .bind_index_buffer(slot.index_buffer, 0, IndexType::U32);
            self.bound_buffers = Some(buffers);
        }

        let submesh_key = (command.mesh_index, command.submesh_index);
        if !self.applied_submeshes.contains(&submesh_key) {
            self.pipelines
                .apply_instance_material(submesh.instance_state, submesh.material);
            self.applied_submeshes.insert(submesh_key);
        }
        self.pipelines.bind_instance_state(submesh.instance_state);
        Ok((resolved, submesh))
    }
}

fn issue_opaque_batches(
    dispatch: &mut DrawDispatch<'_>,
    batcher: &mut DrawBatcher,
    instance_pool: &mut dyn InstanceBufferPool,
    indirect_pool: &mut dyn IndirectDrawPool,
    mdi: bool,
) {
    for batch_index in 0..batcher.batches().len() {
        let batch = batcher.batches()[batch_index];
        let count = batch.command_count as u32;

        let Some(base) = instance_pool.alloc(count) else {
            engine_warn!(SOURCE, "instance pool exhausted; {} draws dropped", count);
            continue;
        };
        for offset in 0..batch.command_count {
            let command = batcher.opaque()[batch.first_command + offset];
            instance_pool.write(
                base + offset as u32,
                &InstanceData::new(&command.model, command.object_id),
            );
        }
        instance_pool.flush_range(base, count);
        batcher.set_batch_first_instance(batch_index, base);

        // Bind the batch's pipeline and geometry via the first command
        let first = batcher.opaque()[batch.first_command];
        let (_, first_submesh) = match dispatch.bind_submesh(&first, PipelineDomain::Opaque) {
            Ok(bound) => bound,
            Err(err) => {
                engine_warn!(SOURCE, "opaque batch skipped: {}", err);
                continue;
            }
        };

        if mdi {
            issue_batch_indirect(
                dispatch,
                batcher,
                batch_index,
                base,
                first_submesh.geometry,
                indirect_pool,
            );
        } else {
            issue_batch_per_command(dispatch, batcher, batch_index, base, 0);
        }
    }
}

/// Per-command fallback for (part of) a batch, starting at `from`
fn issue_batch_per_command(
    dispatch: &mut DrawDispatch<'_>,
    batcher: &DrawBatcher,
    batch_index: usize,
    base: u32,
    from: usize,
) {
    let batch = batcher.batches()[batch_index];
    for offset in from..batch.command_count {
        let command = batcher.opaque()[batch.first_command + offset];
        let submesh = match dispatch.bind_submesh(&command, PipelineDomain::Opaque) {
            Ok((_, submesh)) => submesh,
            Err(err) => {
                engine_warn!(SOURCE, "opaque draw skipped: {}", err);
                continue;
            }
        };
        dispatch.frontend.draw_indexed(
            submesh.index_count,
            1,
            submesh.first_index,
            submesh.vertex_offset,
            base + offset as u32,
        );
    }
}

/// Issue one batch through the indirect buffer in chunks sized by the
/// pool's remaining capacity. Geometry or index-buffer inconsistency, and
/// pool exhaustion, fall back to per-command issuance for the rest.
fn issue_batch_indirect(
    dispatch: &mut DrawDispatch<'_>,
    batcher: &DrawBatcher,
    batch_index: usize,
    base: u32,
    expected_geometry: crate::renderer::GeometryHandle,
    indirect_pool: &mut dyn IndirectDrawPool,
) {
    let batch = batcher.batches()[batch_index];
    let expected_index_buffer = dispatch
        .mesh_manager
        .mesh_slot(batcher.opaque()[batch.first_command].mesh_index)
        .map(|slot| slot.index_buffer);
    let total = batch.command_count;
    let mut offset = 0usize;

    while offset < total {
        let remaining = indirect_pool.remaining();
        if remaining == 0 {
            engine_warn!(SOURCE, "indirect pool exhausted; falling back to direct draws");
            issue_batch_per_command(dispatch, batcher, batch_index, base, offset);
            return;
        }
        let chunk = remaining.min((total - offset) as u32);
        let Some(command_base) = indirect_pool.alloc(chunk) else {
            issue_batch_per_command(dispatch, batcher, batch_index, base, offset);
            return;
        };

        let mut written = 0u32;
        for position in 0..chunk {
            let command = batcher.opaque()[batch.first_command + offset + position as usize];
            let Some(submesh) = dispatch
                .mesh_manager
                .submesh(command.mesh_index, command.submesh_index)
            else {
                break;
            };
            let slot_index_buffer = dispatch
                .mesh_manager
                .mesh_slot(command.mesh_index)
                .map(|slot| slot.index_buffer);
            if submesh.geometry != expected_geometry || slot_index_buffer != expected_index_buffer
            {
                break;
            }
            indirect_pool.write(
                command_base + position,
                &IndirectDrawCommand {
                    index_count: submesh.index_count,
                    instance_count: 1,
                    first_index: submesh.first_index,
                    vertex_offset: submesh.vertex_offset,
                    first_instance: base + (offset + position as usize) as u32,
                },
            );
            written += 1;
        }

        if written > 0 {
            indirect_pool.flush_range(command_base, written);
            dispatch.frontend.draw_indexed_indirect(
                indirect_pool.buffer(),
                command_base as u64 * INDIRECT_DRAW_STRIDE as u64,
                written,
                INDIRECT_DRAW_STRIDE,
            );
        }
        if written < chunk {
            // Consistency check failed mid-chunk: the rest goes direct
            engine_warn!(SOURCE, "indirect batch inconsistent; falling back to direct draws");
            issue_batch_per_command(dispatch, batcher, batch_index, base, offset + written as usize);
            return;
        }
        offset += written as usize;
    }
}

fn issue_transparents(
    dispatch: &mut DrawDispatch<'_>,
    batcher: &DrawBatcher,
    instance_pool: &mut dyn InstanceBufferPool,
) {
    for index in 0..batcher.transparent().len() {
        let command = batcher.transparent()[index];
        let submesh = match dispatch.bind_submesh(&command, PipelineDomain::Transparent) {
            Ok((_, submesh)) => submesh,
            Err(err) => {
                engine_warn!(SOURCE, "transparent draw skipped: {}", err);
                continue;
            }
        };
        let Some(base) = instance_pool.alloc(1) else {
            engine_warn!(SOURCE, "instance pool exhausted; transparent draw dropped");
            continue;
        };
        instance_pool.write(base, &InstanceData::new(&command.model, command.object_id));
        instance_pool.flush_range(base, 1);
        dispatch.frontend.draw_indexed(
            submesh.index_count,
            1,
            submesh.first_index,
            submesh.vertex_offset,
            base,
        );
    }
}
