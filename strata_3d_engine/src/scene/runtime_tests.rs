/// Tests for SceneRuntime
///
/// Creation, the update/sync forwarders, picking resolution against live
/// entities, and the ordered teardown.

use glam::{Vec3, Vec4};
use super::*;
use crate::renderer::mock::{mock_services, MockServiceHandles};
use crate::renderer::Text3dConfig;
use crate::scene::picking::{encode_picking_id, PickKind};
use crate::scene::scene::ShapeConfig;

fn make_runtime() -> (SceneRuntime, MockServiceHandles) {
    let (services, handles) = mock_services(2);
    let runtime = SceneRuntime::create(services, 1, 64, 16).unwrap();
    (runtime, handles)
}

#[test]
fn test_create_carries_world_id() {
    let (runtime, _handles) = make_runtime();
    assert_eq!(runtime.world_id(), 1);
    assert!(runtime.scene().world().is_empty());
}

#[test]
fn test_update_and_sync_pushes_to_mesh_manager() {
    let (mut runtime, handles) = make_runtime();
    let entity = runtime.scene_mut().spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    runtime.scene_mut().set_mesh_instance(entity, instance, true).unwrap();
    runtime.scene_mut().set_position(entity, Vec3::new(1.0, 2.0, 3.0));

    runtime.update_and_sync(0.016);

    let mesh_manager = handles.mesh_manager.lock().unwrap();
    let pushed = mesh_manager.instance(instance).unwrap();
    assert_eq!(pushed.model.col(3).truncate(), Vec3::new(1.0, 2.0, 3.0));
}

#[test]
fn test_entity_from_picking_id_requires_live_entity() {
    let (mut runtime, handles) = make_runtime();
    let entity = runtime.scene_mut().spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    runtime.scene_mut().set_mesh_instance(entity, instance, true).unwrap();
    runtime.update_and_sync(0.016);

    let render_id = runtime.scene().render_id(entity).unwrap();
    let object_id = encode_picking_id(PickKind::Scene, render_id);
    assert_eq!(runtime.entity_from_picking_id(object_id), Some(entity));

    // A despawned entity no longer resolves, even before the next sync
    runtime.scene_mut().despawn(entity);
    assert_eq!(runtime.entity_from_picking_id(object_id), None);
}

#[test]
fn test_full_sync_forwarder() {
    let (mut runtime, handles) = make_runtime();
    let entity = runtime.scene_mut().spawn("crate").unwrap();
    runtime.scene_mut().set_shape(entity, ShapeConfig::default()).unwrap();
    runtime.update(0.016);
    runtime.full_sync();

    let render_id = runtime.scene().render_id(entity).unwrap();
    assert_eq!(runtime.bridge().entity_for_render_id(render_id), Some(entity));
    let _ = handles;
}

#[test]
fn test_destroy_waits_idle_then_releases() {
    let (mut runtime, handles) = make_runtime();
    let shape = runtime.scene_mut().spawn("crate").unwrap();
    runtime.scene_mut().set_shape(shape, ShapeConfig::default()).unwrap();
    let label = runtime.scene_mut().spawn("label").unwrap();
    runtime
        .scene_mut()
        .set_text3d(
            label,
            &Text3dConfig {
                text: "bye".to_string(),
                size: 1.0,
                color: Vec4::ONE,
            },
        )
        .unwrap();

    runtime.destroy();

    let renderer = handles.renderer.lock().unwrap();
    assert_eq!(renderer.wait_idle_count, 1);
    drop(renderer);
    assert_eq!(handles.mesh_manager.lock().unwrap().destroyed_meshes.len(), 1);
    assert_eq!(handles.world_resources.lock().unwrap().destroyed.len(), 1);

    // Teardown order: the GPU went idle before any release
    let calls = &handles.renderer.lock().unwrap().calls;
    assert_eq!(calls.first().map(|s| s.as_str()), Some("wait_idle"));
}
