/// Tests for Scene
///
/// Transform hierarchy maintenance (two-pass update with deferred
/// propagation), visibility inheritance, render-id assignment, shape and
/// text spawning against the mock services, and shutdown.

use glam::{Mat4, Quat, Vec3, Vec4};
use super::*;
use crate::error::{EngineError, SceneError};
use crate::renderer::mock::{mock_services, MockServiceHandles};
use crate::renderer::Text3dConfig;
use crate::scene::components::{ScenePointLight, TransformFlags};
use crate::scene::world::EntityId;

fn make_scene() -> (Scene, MockServiceHandles) {
    let (services, handles) = mock_services(2);
    (Scene::new(services, 64), handles)
}

fn translation(matrix: &Mat4) -> Vec3 {
    matrix.col(3).truncate()
}

// ============================================================================
// Tests: spawning
// ============================================================================

#[test]
fn test_spawn_creates_root_transform() {
    let (mut scene, _handles) = make_scene();
    let entity = scene.spawn("node").unwrap();

    assert_eq!(scene.name(entity), Some("node"));
    let transform = scene.world().transforms.get(entity).unwrap();
    assert_eq!(transform.parent, EntityId::default());
    assert!(transform.flags.contains(TransformFlags::DIRTY_LOCAL));
}

#[test]
fn test_spawn_respects_entity_limit() {
    let (services, _handles) = mock_services(2);
    let mut scene = Scene::new(services, 2);
    scene.spawn("a").unwrap();
    scene.spawn("b").unwrap();
    assert_eq!(
        scene.spawn("c"),
        Err(EngineError::Scene(SceneError::EntityLimitReached))
    );
}

// ============================================================================
// Tests: transform hierarchy (root + child literals)
// ============================================================================

#[test]
fn test_world_matrices_compose_parent_child() {
    let (mut scene, _handles) = make_scene();
    let root = scene.spawn("root").unwrap();
    let child = scene.spawn("child").unwrap();
    scene.set_position(root, Vec3::new(1.0, 0.0, 0.0));
    scene.set_position(child, Vec3::new(0.0, 2.0, 0.0));
    scene.set_parent(child, Some(root)).unwrap();

    scene.update(0.016);

    assert_eq!(translation(&scene.world_matrix(root).unwrap()), Vec3::new(1.0, 0.0, 0.0));
    assert_eq!(translation(&scene.world_matrix(child).unwrap()), Vec3::new(1.0, 2.0, 0.0));
}

#[test]
fn test_deferred_propagation_updates_child_in_single_pass() {
    let (mut scene, _handles) = make_scene();
    let root = scene.spawn("root").unwrap();
    let child = scene.spawn("child").unwrap();
    scene.set_position(root, Vec3::new(1.0, 0.0, 0.0));
    scene.set_position(child, Vec3::new(0.0, 2.0, 0.0));
    scene.set_parent(child, Some(root)).unwrap();
    scene.update(0.016);

    // Move only the root; the child must follow in the same update
    scene.set_position(root, Vec3::new(10.0, 0.0, 0.0));
    scene.update(0.016);

    assert_eq!(translation(&scene.world_matrix(root).unwrap()), Vec3::new(10.0, 0.0, 0.0));
    assert_eq!(translation(&scene.world_matrix(child).unwrap()), Vec3::new(10.0, 2.0, 0.0));
}

#[test]
fn test_clean_transforms_are_skipped() {
    let (mut scene, _handles) = make_scene();
    let entity = scene.spawn("static").unwrap();
    scene.set_position(entity, Vec3::ONE);
    scene.update(0.016);

    let flags_after_first = scene.world().transforms.get(entity).unwrap().flags;
    assert!(flags_after_first.contains(TransformFlags::WORLD_UPDATED));

    // Nothing changed: the second update clears the mark and recomputes
    // nothing
    scene.update(0.016);
    let flags = scene.world().transforms.get(entity).unwrap().flags;
    assert!(!flags.contains(TransformFlags::WORLD_UPDATED));
    assert!(!flags.contains(TransformFlags::DIRTY_WORLD));
    assert_eq!(translation(&scene.world_matrix(entity).unwrap()), Vec3::ONE);
}

#[test]
fn test_grandchild_follows_root() {
    let (mut scene, _handles) = make_scene();
    let root = scene.spawn("root").unwrap();
    let child = scene.spawn("child").unwrap();
    let grandchild = scene.spawn("grandchild").unwrap();
    scene.set_parent(child, Some(root)).unwrap();
    scene.set_parent(grandchild, Some(child)).unwrap();
    scene.set_position(child, Vec3::new(0.0, 1.0, 0.0));
    scene.set_position(grandchild, Vec3::new(0.0, 0.0, 3.0));
    scene.update(0.016);

    scene.set_position(root, Vec3::new(5.0, 0.0, 0.0));
    scene.update(0.016);

    assert_eq!(
        translation(&scene.world_matrix(grandchild).unwrap()),
        Vec3::new(5.0, 1.0, 3.0)
    );
}

#[test]
fn test_rotation_and_scale_compose() {
    let (mut scene, _handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    scene.set_rotation(entity, Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
    scene.set_scale(entity, Vec3::splat(2.0));
    scene.update(0.016);

    let world = scene.world_matrix(entity).unwrap();
    let expected = Mat4::from_scale_rotation_translation(
        Vec3::splat(2.0),
        Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        Vec3::ZERO,
    );
    assert!(world.abs_diff_eq(expected, 1e-5));
}

#[test]
fn test_reparent_to_root() {
    let (mut scene, _handles) = make_scene();
    let root = scene.spawn("root").unwrap();
    let child = scene.spawn("child").unwrap();
    scene.set_position(root, Vec3::new(4.0, 0.0, 0.0));
    scene.set_position(child, Vec3::new(0.0, 1.0, 0.0));
    scene.set_parent(child, Some(root)).unwrap();
    scene.update(0.016);
    assert_eq!(translation(&scene.world_matrix(child).unwrap()), Vec3::new(4.0, 1.0, 0.0));

    scene.set_parent(child, None).unwrap();
    scene.update(0.016);
    assert_eq!(translation(&scene.world_matrix(child).unwrap()), Vec3::new(0.0, 1.0, 0.0));
}

#[test]
fn test_set_parent_rejects_self_and_stale() {
    let (mut scene, _handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    assert!(scene.set_parent(entity, Some(entity)).is_err());

    let dead = scene.spawn("dead").unwrap();
    scene.despawn(dead);
    assert!(scene.set_parent(entity, Some(dead)).is_err());
    assert!(scene.set_parent(dead, None).is_err());
}

#[test]
fn test_dead_parent_becomes_root() {
    let (mut scene, _handles) = make_scene();
    let root = scene.spawn("root").unwrap();
    let child = scene.spawn("child").unwrap();
    scene.set_position(root, Vec3::new(7.0, 0.0, 0.0));
    scene.set_position(child, Vec3::new(0.0, 1.0, 0.0));
    scene.set_parent(child, Some(root)).unwrap();
    scene.update(0.016);

    scene.despawn(root);
    scene.set_position(child, Vec3::new(0.0, 2.0, 0.0));
    scene.update(0.016);

    // The orphan is treated as a root
    assert_eq!(translation(&scene.world_matrix(child).unwrap()), Vec3::new(0.0, 2.0, 0.0));
}

#[test]
fn test_cycle_does_not_hang() {
    let (mut scene, _handles) = make_scene();
    let a = scene.spawn("a").unwrap();
    let b = scene.spawn("b").unwrap();
    scene.set_parent(a, Some(b)).unwrap();
    scene.set_parent(b, Some(a)).unwrap();

    // Both entities are in a cycle; the update must terminate and still
    // produce world matrices
    scene.update(0.016);
    assert!(scene.world_matrix(a).is_some());
    assert!(scene.world_matrix(b).is_some());
}

// ============================================================================
// Tests: visibility
// ============================================================================

#[test]
fn test_visibility_inherits_from_ancestors() {
    let (mut scene, _handles) = make_scene();
    let root = scene.spawn("root").unwrap();
    let child = scene.spawn("child").unwrap();
    scene.set_parent(child, Some(root)).unwrap();

    assert!(scene.is_visible(child));
    scene.set_visible(root, false, true);
    assert!(!scene.is_visible(child));
}

#[test]
fn test_non_inheriting_visibility_is_final() {
    let (mut scene, _handles) = make_scene();
    let root = scene.spawn("root").unwrap();
    let child = scene.spawn("child").unwrap();
    scene.set_parent(child, Some(root)).unwrap();

    scene.set_visible(root, false, true);
    scene.set_visible(child, true, false);
    assert!(scene.is_visible(child));
}

#[test]
fn test_invisible_entity_is_hidden_regardless_of_parent() {
    let (mut scene, _handles) = make_scene();
    let entity = scene.spawn("node").unwrap();
    scene.set_visible(entity, false, true);
    assert!(!scene.is_visible(entity));
}

// ============================================================================
// Tests: render ids
// ============================================================================

#[test]
fn test_render_ids_unique_and_nonzero() {
    let (mut scene, _handles) = make_scene();
    let a = scene.spawn("a").unwrap();
    let b = scene.spawn("b").unwrap();

    let id_a = scene.ensure_render_id(a).unwrap();
    let id_b = scene.ensure_render_id(b).unwrap();
    assert_ne!(id_a, 0);
    assert_ne!(id_b, 0);
    assert_ne!(id_a, id_b);

    // Idempotent per entity
    assert_eq!(scene.ensure_render_id(a), Some(id_a));
    assert_eq!(scene.render_id(a), Some(id_a));
}

// ============================================================================
// Tests: shapes
// ============================================================================

#[test]
fn test_set_shape_builds_mesh_and_seeds_slot() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("crate").unwrap();
    scene.set_position(entity, Vec3::new(2.0, 0.0, 0.0));
    scene.update(0.016);

    scene
        .set_shape(
            entity,
            ShapeConfig {
                dimensions: Vec3::new(1.0, 2.0, 3.0),
                color: Vec4::new(1.0, 0.0, 0.0, 1.0),
                ..ShapeConfig::default()
            },
        )
        .unwrap();

    // Geometry created with the requested extents
    let geometries = handles.geometries.lock().unwrap();
    assert_eq!(geometries.cubes.len(), 1);
    assert_eq!(geometries.cubes[0].1, Vec3::new(1.0, 2.0, 3.0));
    drop(geometries);

    // Mesh slot seeded with the entity's world matrix, visibility, and id
    let shape = scene.world().shapes.get(entity).copied().unwrap();
    let mesh_manager = handles.mesh_manager.lock().unwrap();
    let slot = mesh_manager.mesh_slot(shape.mesh_index).unwrap();
    assert_eq!(translation(&slot.model), Vec3::new(2.0, 0.0, 0.0));
    assert!(slot.visible);
    assert_eq!(slot.render_id, scene.render_id(entity).unwrap());
}

#[test]
fn test_set_shape_on_stale_entity_fails() {
    let (mut scene, _handles) = make_scene();
    let entity = scene.spawn("gone").unwrap();
    scene.despawn(entity);
    assert_eq!(
        scene.set_shape(entity, ShapeConfig::default()),
        Err(EngineError::Scene(SceneError::InvalidEntity))
    );
}

#[test]
fn test_despawn_destroys_shape_mesh() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("crate").unwrap();
    scene.set_shape(entity, ShapeConfig::default()).unwrap();
    let mesh_index = scene.world().shapes.get(entity).unwrap().mesh_index;

    scene.despawn(entity);
    assert_eq!(handles.mesh_manager.lock().unwrap().destroyed_meshes, vec![mesh_index]);
}

// ============================================================================
// Tests: 3D text
// ============================================================================

#[test]
fn test_set_text3d_creates_and_updates() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("label").unwrap();

    scene
        .set_text3d(
            entity,
            &Text3dConfig {
                text: "hello".to_string(),
                size: 0.5,
                color: Vec4::ONE,
            },
        )
        .unwrap();
    let text = scene.world().texts.get(entity).copied().unwrap();
    assert!(text.world_width > 0.0);
    assert_eq!(
        handles.world_resources.lock().unwrap().text_content(text.text_index),
        Some("hello".to_string())
    );

    // Updating reuses the same slot
    scene
        .set_text3d(
            entity,
            &Text3dConfig {
                text: "world".to_string(),
                size: 0.5,
                color: Vec4::ONE,
            },
        )
        .unwrap();
    let updated = scene.world().texts.get(entity).copied().unwrap();
    assert_eq!(updated.text_index, text.text_index);
    assert_eq!(
        handles.world_resources.lock().unwrap().text_content(text.text_index),
        Some("world".to_string())
    );
}

#[test]
fn test_moving_text_entity_forwards_transform() {
    let (mut scene, handles) = make_scene();
    let entity = scene.spawn("label").unwrap();
    scene
        .set_text3d(
            entity,
            &Text3dConfig {
                text: "hi".to_string(),
                size: 1.0,
                color: Vec4::ONE,
            },
        )
        .unwrap();
    let text_index = scene.world().texts.get(entity).unwrap().text_index;

    scene.set_position(entity, Vec3::new(0.0, 5.0, 0.0));
    scene.update(0.016);

    let transform = handles
        .world_resources
        .lock()
        .unwrap()
        .text_transform(text_index)
        .unwrap();
    assert_eq!(translation(&transform), Vec3::new(0.0, 5.0, 0.0));
}

// ============================================================================
// Tests: lights
// ============================================================================

#[test]
fn test_point_light_snapshot_has_world_position() {
    let (mut scene, _handles) = make_scene();
    let entity = scene.spawn("lamp").unwrap();
    scene.set_position(entity, Vec3::new(0.0, 3.0, 0.0));
    scene
        .set_point_light(
            entity,
            ScenePointLight {
                color: Vec3::new(1.0, 0.5, 0.0),
                intensity: 2.0,
                range: 10.0,
                enabled: true,
            },
        )
        .unwrap();
    scene.update(0.016);

    let lights = scene.point_lights();
    assert_eq!(lights.len(), 1);
    assert_eq!(lights[0].position, Vec3::new(0.0, 3.0, 0.0));
    assert_ne!(lights[0].render_id, 0);
}

// ============================================================================
// Tests: shutdown
// ============================================================================

#[test]
fn test_shutdown_releases_owned_resources() {
    let (mut scene, handles) = make_scene();
    let shape = scene.spawn("crate").unwrap();
    scene.set_shape(shape, ShapeConfig::default()).unwrap();

    let label = scene.spawn("label").unwrap();
    scene
        .set_text3d(
            label,
            &Text3dConfig {
                text: "bye".to_string(),
                size: 1.0,
                color: Vec4::ONE,
            },
        )
        .unwrap();

    let instanced = scene.spawn("instanced").unwrap();
    let instance = handles.mesh_manager.lock().unwrap().add_instance(0);
    scene.set_mesh_instance(instanced, instance, true).unwrap();

    scene.shutdown();

    let mesh_manager = handles.mesh_manager.lock().unwrap();
    assert_eq!(mesh_manager.destroyed_meshes.len(), 1);
    assert_eq!(mesh_manager.released_instances, vec![instance]);
    drop(mesh_manager);
    assert_eq!(handles.world_resources.lock().unwrap().destroyed.len(), 1);
    assert!(scene.world().is_empty());
}
