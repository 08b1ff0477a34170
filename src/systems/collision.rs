//! Entity-level collision queries.
//!
//! These wrap [`Collider::collide`](crate::colliders::Collider::collide) with
//! the entity rules:
//!
//! - both entities need a collider
//! - the target must be `collidable`
//! - an entity never collides with itself
//!
//! The `_at` variants probe the first entity as if it stood at another
//! position. The entity itself is never moved; the override is passed down
//! to the collider as its origin, so nothing needs restoring afterwards even
//! when a callback panics.
//!
//! # Related
//!
//! - [`crate::entity::Entity`] – method forms of these queries
//! - [`crate::scene::Scene`] – tag and tracker driven forms

use crate::entity::Entity;
use crate::error::CoreResult;
use crate::math::{Rect, Vec2};

fn same(a: &Entity, b: &Entity) -> bool {
    std::ptr::eq(a, b) || (a.id().is_some() && a.id() == b.id())
}

pub fn check(a: &Entity, b: &Entity) -> CoreResult<bool> {
    check_at(a, b, a.position)
}

pub fn check_at(a: &Entity, b: &Entity, at: Vec2) -> CoreResult<bool> {
    if same(a, b) || !b.collidable {
        return Ok(false);
    }
    match (a.collider(), b.collider()) {
        (Some(mine), Some(theirs)) => mine.collide(at, theirs, b.position),
        _ => Ok(false),
    }
}

/// Whether `a` collides with any of `others`.
pub fn any<'e>(a: &Entity, others: impl IntoIterator<Item = &'e Entity>) -> CoreResult<bool> {
    any_at(a, others, a.position)
}

pub fn any_at<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
) -> CoreResult<bool> {
    Ok(first_at(a, others, at)?.is_some())
}

pub fn first<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
) -> CoreResult<Option<&'e Entity>> {
    first_at(a, others, a.position)
}

pub fn first_at<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
) -> CoreResult<Option<&'e Entity>> {
    for other in others {
        if check_at(a, other, at)? {
            return Ok(Some(other));
        }
    }
    Ok(None)
}

pub fn all<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
) -> CoreResult<Vec<&'e Entity>> {
    let mut hits = Vec::new();
    all_into(a, others, a.position, &mut hits)?;
    Ok(hits)
}

pub fn all_at<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
) -> CoreResult<Vec<&'e Entity>> {
    let mut hits = Vec::new();
    all_into(a, others, at, &mut hits)?;
    Ok(hits)
}

/// Appends every hit to `into`, keeping what was already there. Returns how
/// many were appended.
pub fn all_into<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
    into: &mut Vec<&'e Entity>,
) -> CoreResult<usize> {
    let before = into.len();
    for other in others {
        if check_at(a, other, at)? {
            into.push(other);
        }
    }
    Ok(into.len() - before)
}

/// Calls `action` for every hit, in iteration order. Returns the hit count.
pub fn each<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    action: impl FnMut(&'e Entity),
) -> CoreResult<usize> {
    each_at(a, others, a.position, action)
}

pub fn each_at<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
    mut action: impl FnMut(&'e Entity),
) -> CoreResult<usize> {
    let mut hits = 0;
    for other in others {
        if check_at(a, other, at)? {
            action(other);
            hits += 1;
        }
    }
    Ok(hits)
}

/// Not colliding with `b` now, but colliding when `a` is probed at `at`.
pub fn check_outside(a: &Entity, b: &Entity, at: Vec2) -> CoreResult<bool> {
    Ok(!check(a, b)? && check_at(a, b, at)?)
}

pub fn first_outside<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
) -> CoreResult<Option<&'e Entity>> {
    for other in others {
        if check_outside(a, other, at)? {
            return Ok(Some(other));
        }
    }
    Ok(None)
}

pub fn all_outside<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
) -> CoreResult<Vec<&'e Entity>> {
    let mut hits = Vec::new();
    for other in others {
        if check_outside(a, other, at)? {
            hits.push(other);
        }
    }
    Ok(hits)
}

pub fn each_outside<'e>(
    a: &Entity,
    others: impl IntoIterator<Item = &'e Entity>,
    at: Vec2,
    mut action: impl FnMut(&'e Entity),
) -> CoreResult<usize> {
    let mut hits = 0;
    for other in others {
        if check_outside(a, other, at)? {
            action(other);
            hits += 1;
        }
    }
    Ok(hits)
}

// ==================== PROBES ====================

/// A shape tested against entity colliders without an entity of its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Probe {
    Point(Vec2),
    Line(Vec2, Vec2),
    Rect(Rect),
}

impl Probe {
    /// Whether `entity` is collidable and its collider touches the probe.
    pub fn hits(&self, entity: &Entity) -> bool {
        entity.collidable
            && match *self {
                Probe::Point(point) => check_point(entity, point),
                Probe::Line(from, to) => check_line(entity, from, to),
                Probe::Rect(ref rect) => check_rect(entity, rect),
            }
    }
}

impl From<Vec2> for Probe {
    fn from(point: Vec2) -> Self {
        Probe::Point(point)
    }
}

impl From<Rect> for Probe {
    fn from(rect: Rect) -> Self {
        Probe::Rect(rect)
    }
}

pub fn check_point(a: &Entity, point: Vec2) -> bool {
    check_point_at(a, point, a.position)
}

pub fn check_point_at(a: &Entity, point: Vec2, at: Vec2) -> bool {
    a.collider().is_some_and(|c| c.collide_point(at, point))
}

pub fn check_line(a: &Entity, from: Vec2, to: Vec2) -> bool {
    check_line_at(a, from, to, a.position)
}

pub fn check_line_at(a: &Entity, from: Vec2, to: Vec2, at: Vec2) -> bool {
    a.collider().is_some_and(|c| c.collide_line(at, from, to))
}

pub fn check_rect(a: &Entity, rect: &Rect) -> bool {
    check_rect_at(a, rect, a.position)
}

pub fn check_rect_at(a: &Entity, rect: &Rect, at: Vec2) -> bool {
    a.collider().is_some_and(|c| c.collide_rect(at, rect))
}

/// The entity among `others` nearest to `a` by position, skipping `a`.
/// Ties keep the earlier one.
pub fn closest<'e>(a: &Entity, others: impl IntoIterator<Item = &'e Entity>) -> Option<&'e Entity> {
    let mut best: Option<(&'e Entity, f32)> = None;
    for other in others {
        if same(a, other) {
            continue;
        }
        let distance = a.position.distance_squared(other.position);
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((other, distance));
        }
    }
    best.map(|(entity, _)| entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colliders::{Circle, Grid, Hitbox};
    use crate::error::CoreError;

    fn boxed(x: f32, y: f32, size: f32) -> Entity {
        let mut e = Entity::new(Vec2::new(x, y));
        e.set_collider(Hitbox::new(size, size));
        e
    }

    // ==================== GUARD TESTS ====================

    #[test]
    fn test_entity_never_hits_itself() {
        let a = boxed(0.0, 0.0, 8.0);
        assert!(!check(&a, &a).unwrap());
    }

    #[test]
    fn test_target_must_be_collidable() {
        let a = boxed(0.0, 0.0, 8.0);
        let mut b = boxed(4.0, 4.0, 8.0);
        assert!(check(&a, &b).unwrap());
        b.collidable = false;
        assert!(!check(&a, &b).unwrap());
        // Only the target's flag matters.
        assert!(check(&b, &a).unwrap());
    }

    #[test]
    fn test_missing_collider_never_hits() {
        let a = Entity::new(Vec2::ZERO);
        let b = boxed(0.0, 0.0, 8.0);
        assert!(!check(&a, &b).unwrap());
        assert!(!check(&b, &a).unwrap());
        assert!(!check_point(&a, Vec2::ZERO));
    }

    #[test]
    fn test_unsupported_pair_propagates() {
        let mut a = Entity::new(Vec2::ZERO);
        a.set_collider(Grid::new(2, 2, 8.0, 8.0));
        let mut b = Entity::new(Vec2::ZERO);
        b.set_collider(Grid::new(2, 2, 8.0, 8.0));
        assert!(matches!(
            check(&a, &b),
            Err(CoreError::UnsupportedPair { .. })
        ));
    }

    // ==================== AT-POSITION TESTS ====================

    #[test]
    fn test_check_at_leaves_position_untouched() {
        let a = boxed(0.0, 0.0, 4.0);
        let b = boxed(20.0, 0.0, 4.0);
        assert!(!check(&a, &b).unwrap());
        assert!(check_at(&a, &b, Vec2::new(18.0, 0.0)).unwrap());
        assert_eq!(a.position, Vec2::ZERO);
    }

    #[test]
    fn test_each_at_survives_a_panicking_callback() {
        let a = boxed(0.0, 0.0, 4.0);
        let others = vec![boxed(10.0, 0.0, 4.0)];
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = each_at(&a, &others, Vec2::new(9.0, 0.0), |_| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(a.position, Vec2::ZERO);
    }

    // ==================== BATCH TESTS ====================

    #[test]
    fn test_first_all_and_each() {
        let a = boxed(0.0, 0.0, 10.0);
        let others = vec![
            boxed(50.0, 0.0, 4.0),
            boxed(5.0, 5.0, 4.0),
            boxed(-2.0, -2.0, 4.0),
        ];
        let first_hit = first(&a, &others).unwrap().unwrap();
        assert!(std::ptr::eq(first_hit, &others[1]));
        assert_eq!(all(&a, &others).unwrap().len(), 2);
        assert!(any(&a, &others).unwrap());

        let mut into = vec![&others[0]];
        assert_eq!(all_into(&a, &others, a.position, &mut into).unwrap(), 2);
        assert_eq!(into.len(), 3);

        let mut seen = 0;
        assert_eq!(each(&a, &others, |_| seen += 1).unwrap(), 2);
        assert_eq!(seen, 2);

        assert!(first_at(&a, &others, Vec2::new(100.0, 100.0)).unwrap().is_none());
    }

    // ==================== PROBE TESTS ====================

    #[test]
    fn test_probes_use_the_collider() {
        let mut a = Entity::new(Vec2::new(10.0, 10.0));
        a.set_collider(Circle::new(5.0));
        assert!(check_point(&a, Vec2::new(12.0, 10.0)));
        assert!(!check_point(&a, Vec2::new(15.0, 10.0)));
        assert!(check_point_at(&a, Vec2::new(0.0, 0.0), Vec2::ZERO));
        assert!(check_line(&a, Vec2::new(0.0, 10.0), Vec2::new(20.0, 10.0)));
        assert!(!check_line_at(&a, Vec2::new(0.0, 10.0), Vec2::new(20.0, 10.0), Vec2::new(10.0, 50.0)));
        assert!(check_rect(&a, &Rect::new(14.0, 8.0, 4.0, 4.0)));
        assert!(!check_rect_at(&a, &Rect::new(14.0, 8.0, 4.0, 4.0), Vec2::ZERO));
    }

    #[test]
    fn test_outside_variants() {
        let a = boxed(0.0, 0.0, 4.0);
        let others = vec![boxed(2.0, 0.0, 4.0), boxed(10.0, 0.0, 4.0)];
        let at = Vec2::new(8.0, 0.0);
        // The first overlaps already, so only the second counts.
        let hit = first_outside(&a, &others, at).unwrap().unwrap();
        assert!(std::ptr::eq(hit, &others[1]));
        assert_eq!(all_outside(&a, &others, at).unwrap().len(), 1);
        assert_eq!(each_outside(&a, &others, at, |_| {}).unwrap(), 1);
    }

    #[test]
    fn test_probe_requires_collidable() {
        let mut e = boxed(0.0, 0.0, 4.0);
        let probe = Probe::from(Vec2::new(1.0, 1.0));
        assert!(probe.hits(&e));
        assert!(Probe::Line(Vec2::new(-5.0, 2.0), Vec2::new(5.0, 2.0)).hits(&e));
        assert!(!Probe::from(Rect::new(10.0, 10.0, 2.0, 2.0)).hits(&e));
        e.collidable = false;
        assert!(!probe.hits(&e));
    }

    #[test]
    fn test_closest_skips_self() {
        let a = boxed(0.0, 0.0, 1.0);
        let others = vec![boxed(10.0, 0.0, 1.0), boxed(-3.0, 4.0, 1.0), boxed(6.0, 0.0, 1.0)];
        let nearest = closest(&a, others.iter().chain(std::iter::once(&a))).unwrap();
        assert_eq!(nearest.position, Vec2::new(-3.0, 4.0));
        assert!(closest(&a, std::iter::once(&a)).is_none());
    }
}
