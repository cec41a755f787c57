use super::*;
use crate::scene::components::{SceneName, SceneTransform};

#[test]
fn test_spawn_and_despawn() {
    let mut world = SceneWorld::new(16);
    let entity = world.spawn().unwrap();

    assert!(world.is_alive(entity));
    assert_eq!(world.len(), 1);

    assert!(world.despawn(entity));
    assert!(!world.is_alive(entity));
    assert!(world.is_empty());
    assert!(!world.despawn(entity));
}

#[test]
fn test_entity_limit() {
    let mut world = SceneWorld::new(2);
    world.spawn().unwrap();
    world.spawn().unwrap();
    assert_eq!(world.spawn(), Err(SceneError::EntityLimitReached));

    // Freeing a slot makes room again
    let ids: Vec<EntityId> = world.entity_ids().collect();
    world.despawn(ids[0]);
    assert!(world.spawn().is_ok());
}

#[test]
fn test_stale_id_does_not_alias_recycled_entity() {
    let mut world = SceneWorld::new(16);
    let first = world.spawn().unwrap();
    world.names.insert(first, SceneName { name: "first".to_string() });
    world.despawn(first);

    let second = world.spawn().unwrap();
    world.names.insert(second, SceneName { name: "second".to_string() });

    assert_ne!(first, second);
    assert!(!world.is_alive(first));
    assert!(world.names.get(first).is_none());
    assert_eq!(world.names.get(second).map(|n| n.name.as_str()), Some("second"));
}

#[test]
fn test_despawn_removes_components() {
    let mut world = SceneWorld::new(16);
    let entity = world.spawn().unwrap();
    world.transforms.insert(entity, SceneTransform::default());
    world.names.insert(entity, SceneName { name: "node".to_string() });

    world.despawn(entity);
    assert!(world.transforms.get(entity).is_none());
    assert!(world.names.get(entity).is_none());
}

#[test]
fn test_default_entity_is_null() {
    let world = SceneWorld::new(16);
    assert!(!world.is_alive(EntityId::default()));
}

#[test]
fn test_clear() {
    let mut world = SceneWorld::new(16);
    for _ in 0..4 {
        let e = world.spawn().unwrap();
        world.transforms.insert(e, SceneTransform::default());
    }
    world.clear();
    assert!(world.is_empty());
    assert_eq!(world.transforms.len(), 0);
}

#[test]
fn test_capacity_is_nonzero() {
    let world = SceneWorld::new(16);
    assert!(world.capacity() >= 1);
}
