//! Collision integration tests: sector-code routines against brute force,
//! grid line walks through a scene, and compound collider cloning.

use std::sync::Arc;

use fastrand::Rng;

use cinder2d::colliders::collide::{circle_to_line, line_check, rect_to_circle, rect_to_line};
use cinder2d::colliders::{Circle, Collider, ColliderList, Grid, Hitbox};
use cinder2d::entity::Entity;
use cinder2d::error::CoreError;
use cinder2d::math::{Rect, Vec2};
use cinder2d::resources::gameconfig::SceneConfig;
use cinder2d::resources::tracker::TrackerRegistry;
use cinder2d::scene::Scene;

const CASES: usize = 10_000;
const SOLID: usize = 0;

fn random_rect(rng: &mut Rng) -> Rect {
    Rect::new(
        rng.f32() * 100.0 - 50.0,
        rng.f32() * 100.0 - 50.0,
        1.0 + rng.f32() * 49.0,
        1.0 + rng.f32() * 49.0,
    )
}

fn random_point(rng: &mut Rng) -> Vec2 {
    Vec2::new(rng.f32() * 250.0 - 125.0, rng.f32() * 250.0 - 125.0)
}

fn rect_edges(rect: &Rect) -> [(Vec2, Vec2); 4] {
    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    [
        (Vec2::new(l, t), Vec2::new(r, t)),
        (Vec2::new(r, t), Vec2::new(r, b)),
        (Vec2::new(r, b), Vec2::new(l, b)),
        (Vec2::new(l, b), Vec2::new(l, t)),
    ]
}

fn brute_rect_to_circle(rect: &Rect, centre: Vec2, radius: f32) -> bool {
    rect.contains(centre)
        || rect_edges(rect)
            .iter()
            .any(|&(a, b)| circle_to_line(centre, radius, a, b))
}

fn brute_rect_to_line(rect: &Rect, from: Vec2, to: Vec2) -> bool {
    rect.contains(from)
        || rect.contains(to)
        || rect_edges(rect).iter().any(|&(a, b)| line_check(from, to, a, b))
}

fn scene() -> Scene {
    Scene::with_registry(Arc::new(TrackerRegistry::default()), SceneConfig::default())
}

fn single_cell_grid() -> Grid {
    let mut grid = Grid::new(8, 8, 16.0, 16.0);
    grid.set(3, 3, true);
    grid
}

// ==================== SECTOR FUZZ TESTS ====================

#[test]
fn test_rect_to_circle_matches_brute_force() {
    let mut rng = Rng::with_seed(0x5EC7);
    let mut mismatches = Vec::new();
    for case in 0..CASES {
        let rect = random_rect(&mut rng);
        let centre = random_point(&mut rng);
        let radius = 0.5 + rng.f32() * 30.0;
        if rect_to_circle(&rect, centre, radius) != brute_rect_to_circle(&rect, centre, radius) {
            mismatches.push((case, rect, centre, radius));
        }
    }
    assert!(mismatches.is_empty(), "mismatches: {mismatches:?}");
}

#[test]
fn test_rect_to_line_matches_brute_force() {
    let mut rng = Rng::with_seed(0x11_4E);
    let mut mismatches = Vec::new();
    for case in 0..CASES {
        let rect = random_rect(&mut rng);
        let from = random_point(&mut rng);
        let to = random_point(&mut rng);
        if rect_to_line(&rect, from, to) != brute_rect_to_line(&rect, from, to) {
            mismatches.push((case, rect, from, to));
        }
    }
    assert!(mismatches.is_empty(), "mismatches: {mismatches:?}");
}

#[test]
fn test_circle_inside_rect_collides() {
    let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
    assert!(rect_to_circle(&rect, Vec2::new(20.0, 30.0), 2.0));
}

// ==================== GRID TESTS ====================

#[test]
fn test_grid_single_cell_line_walk() {
    let grid = single_cell_grid();
    assert!(grid.collide_line(Vec2::ZERO, Vec2::ZERO, Vec2::new(128.0, 128.0)));
    assert!(!grid.collide_line(Vec2::ZERO, Vec2::ZERO, Vec2::new(128.0, 0.0)));
}

#[test]
fn test_scene_line_walk_stops_before_cell() {
    let mut scene = scene();
    let mut walls = Entity::new(Vec2::ZERO);
    walls.set_collider(single_cell_grid());
    walls.tag(SOLID);
    scene.add(walls);
    scene.flush().unwrap();

    let stop = scene
        .line_walk_check(Vec2::ZERO, Vec2::new(128.0, 128.0), SOLID, 1.0)
        .unwrap();
    assert!(stop.x < 48.0 && stop.x > 46.0, "stopped at {stop}");
    assert!((stop.x - stop.y).abs() < 1e-3);

    let clear = scene
        .line_walk_check(Vec2::ZERO, Vec2::new(128.0, 0.0), SOLID, 1.0)
        .unwrap();
    assert_eq!(clear, Vec2::new(128.0, 0.0));
}

#[test]
fn test_grid_bottom_uses_height() {
    let grid = Grid::new(2, 5, 10.0, 10.0).with_offset(Vec2::new(3.0, 7.0));
    assert_eq!(grid.bottom(), 57.0);
    assert_eq!(grid.right(), 23.0);
}

#[test]
fn test_grid_vs_grid_is_unsupported() {
    let a = Collider::from(single_cell_grid());
    let b = a.clone();
    assert!(matches!(
        a.collide(Vec2::ZERO, &b, Vec2::ZERO),
        Err(CoreError::UnsupportedPair { a: "grid", b: "grid" })
    ));
}

// ==================== COMPOUND TESTS ====================

#[test]
fn test_collider_list_clone_is_deep() {
    let original = ColliderList::default()
        .with(Hitbox::new(8.0, 8.0))
        .with(Circle::new(4.0).with_offset(Vec2::new(20.0, 0.0)));
    let mut copy = original.clone();
    if let Some(Collider::Hitbox(hitbox)) = copy.get_mut(0) {
        hitbox.width = 100.0;
    }
    if let Some(Collider::Circle(circle)) = copy.get_mut(1) {
        circle.radius = 1.0;
    }
    assert_eq!(original.get(0), Some(&Collider::Hitbox(Hitbox::new(8.0, 8.0))));
    assert!(matches!(original.get(1), Some(Collider::Circle(c)) if c.radius == 4.0));
    assert_ne!(original, copy);
}

#[test]
fn test_entities_with_compound_colliders_collide_through_scene() {
    let mut scene = scene();
    let mut probe = Entity::new(Vec2::new(0.0, 0.0));
    probe.set_collider(
        ColliderList::default()
            .with(Hitbox::new(4.0, 4.0))
            .with(Circle::new(3.0).with_offset(Vec2::new(30.0, 0.0))),
    );
    let mut target = Entity::new(Vec2::new(31.0, 1.0));
    target.set_collider(Hitbox::new(2.0, 2.0));
    target.tag(SOLID);
    scene.add(target);
    scene.flush().unwrap();

    assert!(scene.collide_check(&probe, SOLID).unwrap());
    assert!(!scene.collide_check_at(&probe, SOLID, Vec2::new(0.0, 50.0)).unwrap());
    assert_eq!(probe.position, Vec2::ZERO);
}
