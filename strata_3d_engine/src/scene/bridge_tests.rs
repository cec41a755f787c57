/// Tests for SceneRenderBridge
///
/// Full and incremental sync into the mock mesh manager, the render-id →
/// entity mapping invariant, and picking resolution.

use glam::{Mat4, Vec3};
use super::*;
use crate::renderer::mock::{mock_services, MockServiceHandles};
use crate::renderer::MeshManager;
use crate::scene::picking::{encode_picking_id, PickKind};
use crate::scene::scene::{Scene, ShapeConfig};
use crate::scene::world::EntityId;

fn make_scene() -> (Scene, MockServiceHandles) {
    let (services, handles) = mock_services(2);
    (Scene::new(services, 64), handles)
}

fn translation(matrix: &Mat4) -> Vec3 {
    matrix.col(3).truncate()
}

// ============================================================================
// Tests: full sync
// ============================================================================

#[test]
fn test_full_sync_maps_visible_renderables_only() {
    let (mut scene, handles) = make_scene();

    let visible = scene.spawn("visible").unwrap();
    let hidden = scene.spawn("hidden").unwrap();
    let visible_instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    let hidden_instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(visible, visible_instance, true).unwrap();
    scene.set_mesh_instance(hidden, hidden_instance, true).unwrap();
    scene.set_visible(hidden, false, true);
    scene.update(0.016);

    let mut bridge = SceneRenderBridge::new(4);
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.full_sync(&mut scene, &mut *mesh_manager);
    }

    let visible_id = scene.render_id(visible).unwrap();
    let hidden_id = scene.render_id(hidden).unwrap();

    // Mapping invariant: an entry resolves iff the entity is visible
    assert_eq!(bridge.entity_for_render_id(visible_id), Some(visible));
    assert_eq!(bridge.entity_for_render_id(hidden_id), None);

    // Both instances still got their state pushed
    let mesh_manager = handles.mesh_manager.lock().unwrap();
    assert!(mesh_manager.instance(visible_instance).unwrap().visible);
    assert!(!mesh_manager.instance(hidden_instance).unwrap().visible);
    assert_eq!(mesh_manager.instance(visible_instance).unwrap().render_id, visible_id);
}

#[test]
fn test_full_sync_pushes_world_matrices() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(entity, instance, true).unwrap();
    scene.set_position(entity, Vec3::new(3.0, 1.0, 0.0));
    scene.update(0.016);

    let mut bridge = SceneRenderBridge::new(4);
    let mut mesh_manager = handles.mesh_manager.lock().unwrap();
    bridge.full_sync(&mut scene, &mut *mesh_manager);

    let pushed = mesh_manager.instance(instance).unwrap();
    assert_eq!(translation(&pushed.model), Vec3::new(3.0, 1.0, 0.0));
}

#[test]
fn test_full_sync_covers_shapes_via_mesh_slot() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("crate").unwrap();
    scene.set_shape(entity, ShapeConfig::default()).unwrap();
    scene.set_position(entity, Vec3::new(0.0, 4.0, 0.0));
    scene.update(0.016);

    let mesh_index = scene.world().shapes.get(entity).unwrap().mesh_index;
    let mut bridge = SceneRenderBridge::new(4);
    let mut mesh_manager = handles.mesh_manager.lock().unwrap();
    bridge.full_sync(&mut scene, &mut *mesh_manager);

    let slot = mesh_manager.mesh_slot(mesh_index).unwrap();
    assert_eq!(translation(&slot.model), Vec3::new(0.0, 4.0, 0.0));
    assert_eq!(bridge.entity_for_render_id(slot.render_id), Some(entity));
}

#[test]
fn test_full_sync_maps_point_lights() {
    let (mut scene, handles) = make_scene();
    let lamp = scene.spawn("lamp").unwrap();
    scene
        .set_point_light(
            lamp,
            crate::scene::components::ScenePointLight {
                color: Vec3::ONE,
                intensity: 1.0,
                range: 5.0,
                enabled: true,
            },
        )
        .unwrap();
    scene.update(0.016);

    let mut bridge = SceneRenderBridge::new(1);
    let mut mesh_manager = handles.mesh_manager.lock().unwrap();
    bridge.full_sync(&mut scene, &mut *mesh_manager);

    let render_id = scene.render_id(lamp).unwrap();
    assert_eq!(bridge.entity_for_render_id(render_id), Some(lamp));
}

#[test]
fn test_full_sync_grows_mapping() {
    let (mut scene, handles) = make_scene();
    let mut bridge = SceneRenderBridge::new(1);
    for i in 0..8 {
        let entity = scene.spawn(&format!("node{}", i)).unwrap();
        let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
        scene.set_mesh_instance(entity, instance, true).unwrap();
    }
    scene.update(0.016);

    let mut mesh_manager = handles.mesh_manager.lock().unwrap();
    bridge.full_sync(&mut scene, &mut *mesh_manager);
    assert!(bridge.capacity() >= scene.next_render_id() as usize);
}

// ============================================================================
// Tests: incremental sync
// ============================================================================

#[test]
fn test_incremental_sync_after_move() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(entity, instance, true).unwrap();
    scene.update(0.016);

    let mut bridge = SceneRenderBridge::new(4);
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.full_sync(&mut scene, &mut *mesh_manager);
    }

    // Move and resync: the dirty list routes through the incremental path
    scene.set_position(entity, Vec3::new(9.0, 0.0, 0.0));
    scene.update(0.016);
    assert!(!scene.render_full_sync_needed);
    assert!(!scene.render_dirty.is_empty());
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.sync(&mut scene, &mut *mesh_manager);
    }

    let mesh_manager = handles.mesh_manager.lock().unwrap();
    let pushed = mesh_manager.instance(instance).unwrap();
    assert_eq!(translation(&pushed.model), Vec3::new(9.0, 0.0, 0.0));
    assert!(scene.render_dirty.is_empty());
}

#[test]
fn test_incremental_sync_unmaps_hidden_entity() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(entity, instance, true).unwrap();
    scene.update(0.016);

    let mut bridge = SceneRenderBridge::new(4);
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.full_sync(&mut scene, &mut *mesh_manager);
    }
    let render_id = scene.render_id(entity).unwrap();
    assert_eq!(bridge.entity_for_render_id(render_id), Some(entity));

    scene.set_visible(entity, false, true);
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.sync(&mut scene, &mut *mesh_manager);
    }
    assert_eq!(bridge.entity_for_render_id(render_id), None);
}

#[test]
fn test_sync_routes_full_when_flagged() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(entity, instance, true).unwrap();
    scene.update(0.016);

    // set_mesh_instance flags a full sync
    assert!(scene.render_full_sync_needed);
    let mut bridge = SceneRenderBridge::new(4);
    let mut mesh_manager = handles.mesh_manager.lock().unwrap();
    bridge.sync(&mut scene, &mut *mesh_manager);
    assert!(!scene.render_full_sync_needed);
}

// ============================================================================
// Tests: picking resolution
// ============================================================================

#[test]
fn test_entity_from_picking_id() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(entity, instance, true).unwrap();
    scene.update(0.016);

    let mut bridge = SceneRenderBridge::new(4);
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.full_sync(&mut scene, &mut *mesh_manager);
    }

    let render_id = scene.render_id(entity).unwrap();
    let object_id = encode_picking_id(PickKind::Scene, render_id);
    assert_eq!(bridge.entity_from_picking_id(object_id), Some(entity));

    // Light picks resolve through the same mapping
    let light_id = encode_picking_id(PickKind::Light, render_id);
    assert_eq!(bridge.entity_from_picking_id(light_id), Some(entity));

    // Non-entity kinds and the reserved id do not
    let text_id = encode_picking_id(PickKind::WorldText, render_id);
    assert_eq!(bridge.entity_from_picking_id(text_id), None);
    assert_eq!(bridge.entity_from_picking_id(0), None);
}

#[test]
fn test_unassigned_entry_is_invalid() {
    let bridge = SceneRenderBridge::new(8);
    assert_eq!(bridge.entity_for_render_id(3), None);
    assert_eq!(bridge.entity_for_render_id(100), None);
}

#[test]
fn test_mapping_resets_on_full_sync() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(entity, instance, true).unwrap();
    scene.update(0.016);

    let mut bridge = SceneRenderBridge::new(4);
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.full_sync(&mut scene, &mut *mesh_manager);
    }
    let render_id = scene.render_id(entity).unwrap();

    // Despawn flags a full sync; the stale entry must clear
    scene.despawn(entity);
    scene.update(0.016);
    {
        let mut mesh_manager = handles.mesh_manager.lock().unwrap();
        bridge.sync(&mut scene, &mut *mesh_manager);
    }
    assert_eq!(bridge.entity_for_render_id(render_id), None);
    let _: Option<EntityId> = bridge.entity_for_render_id(render_id);
}
