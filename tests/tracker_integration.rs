//! Tracker integration tests: family buckets filled and emptied through
//! scene flushes, component tracking and kind-scoped queries.

use std::sync::Arc;

use cinder2d::colliders::Hitbox;
use cinder2d::components::Component;
use cinder2d::entity::{Entity, EntityKind};
use cinder2d::error::CoreError;
use cinder2d::math::Vec2;
use cinder2d::resources::gameconfig::SceneConfig;
use cinder2d::resources::tracker::TrackerRegistry;
use cinder2d::scene::{Scene, Targets};

struct Enemy;

struct Bat;
struct Slime;
struct Player;
struct Rock;

impl EntityKind for Bat {}
impl EntityKind for Slime {}
impl EntityKind for Player {}
impl EntityKind for Rock {}

#[derive(Debug, PartialEq)]
struct Health(u32);

impl Component for Health {}

struct Untracked;

impl Component for Untracked {}

fn registry() -> Arc<TrackerRegistry> {
    Arc::new(
        TrackerRegistry::builder()
            .entity::<Bat>()
            .entity::<Slime>()
            .entity::<Player>()
            .entity_into::<Bat, Enemy>()
            .entity_into::<Slime, Enemy>()
            .component::<Health>()
            .build(),
    )
}

fn scene(checks: bool) -> Scene {
    Scene::with_registry(
        registry(),
        SceneConfig {
            contract_checks: checks,
            ..SceneConfig::default()
        },
    )
}

fn boxed<K: EntityKind>(kind: K, at: Vec2) -> Entity {
    let mut entity = Entity::with_kind(at, kind);
    entity.set_collider(Hitbox::new(8.0, 8.0));
    entity
}

// ==================== BUCKET TESTS ====================

#[test]
fn test_family_and_own_buckets_fill_on_flush() {
    let mut scene = scene(true);
    let bat = scene.add(boxed(Bat, Vec2::ZERO));
    let slime = scene.add(boxed(Slime, Vec2::ZERO));
    assert!(scene.tracker().entities::<Enemy>().unwrap().is_empty());

    scene.flush().unwrap();
    let tracker = scene.tracker();
    assert_eq!(tracker.entities::<Enemy>().unwrap(), &[bat, slime]);
    assert_eq!(tracker.entities::<Bat>().unwrap(), &[bat]);
    assert_eq!(tracker.entities::<Slime>().unwrap(), &[slime]);
    assert!(tracker.entities::<Player>().unwrap().is_empty());
}

#[test]
fn test_removal_leaves_every_bucket_it_joined_and_no_other() {
    let mut scene = scene(true);
    let bat = scene.add(boxed(Bat, Vec2::ZERO));
    let slime = scene.add(boxed(Slime, Vec2::ZERO));
    let player = scene.add(boxed(Player, Vec2::ZERO));
    scene.flush().unwrap();

    scene.remove(bat);
    scene.flush().unwrap();
    let tracker = scene.tracker();
    assert_eq!(tracker.entities::<Enemy>().unwrap(), &[slime]);
    assert!(tracker.entities::<Bat>().unwrap().is_empty());
    assert_eq!(tracker.entities::<Slime>().unwrap(), &[slime]);
    assert_eq!(tracker.entities::<Player>().unwrap(), &[player]);
}

#[test]
fn test_untracked_kind_is_reported_with_checks_on() {
    let mut scene = scene(true);
    scene.add(boxed(Rock, Vec2::ZERO));
    scene.flush().unwrap();
    assert!(matches!(
        scene.tracker().entities::<Rock>(),
        Err(CoreError::Untracked(_))
    ));
    assert!(scene.tracked::<Rock>().is_err());
}

#[test]
fn test_untracked_kind_is_empty_with_checks_off() {
    let mut scene = scene(false);
    scene.add(boxed(Rock, Vec2::ZERO));
    scene.flush().unwrap();
    assert_eq!(scene.tracker().entities::<Rock>().unwrap().len(), 0);
    assert_eq!(scene.tracked::<Rock>().unwrap().count(), 0);
}

// ==================== COMPONENT TRACKING TESTS ====================

#[test]
fn test_components_tracked_while_owner_is_live() {
    let mut scene = scene(true);
    let mut entity = boxed(Slime, Vec2::ZERO);
    entity.add_component(Health(3)).unwrap();
    entity.add_component(Untracked).unwrap();
    let id = scene.add(entity);
    assert!(scene.tracker().components::<Health>().unwrap().is_empty());

    scene.flush().unwrap();
    let handles = scene.tracker().components::<Health>().unwrap();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].entity, id);
    let (owner, health) = scene.tracked_components::<Health>().unwrap().next().unwrap();
    assert_eq!(owner.id(), Some(id));
    assert_eq!(health, &Health(3));

    // Components attached to a live entity join through the guard.
    scene.entity_mut(id).unwrap().add_component(Health(5)).unwrap();
    assert_eq!(scene.tracker().components::<Health>().unwrap().len(), 2);

    scene.remove(id);
    scene.flush().unwrap();
    assert!(scene.tracker().components::<Health>().unwrap().is_empty());
}

// ==================== QUERY TESTS ====================

#[test]
fn test_kind_scoped_collision_queries() {
    let mut scene = scene(true);
    let bat = scene.add(boxed(Bat, Vec2::new(4.0, 0.0)));
    scene.add(boxed(Slime, Vec2::new(100.0, 0.0)));
    scene.add(boxed(Player, Vec2::new(2.0, 2.0)));
    scene.flush().unwrap();

    let probe = boxed(Player, Vec2::ZERO);
    assert!(scene.collide_check(&probe, Targets::kind::<Enemy>()).unwrap());
    let first = scene.collide_first(&probe, Targets::kind::<Enemy>()).unwrap();
    assert_eq!(first.and_then(Entity::id), Some(bat));
    let all = scene.collide_all(&probe, Targets::All).unwrap();
    assert_eq!(all.len(), 2);
    assert!(!scene.collide_check(&probe, Targets::kind::<Slime>()).unwrap());

    let near_slime = Vec2::new(96.0, 0.0);
    assert!(
        scene
            .collide_check_outside(&probe, Targets::kind::<Slime>(), near_slime)
            .unwrap()
    );
}
