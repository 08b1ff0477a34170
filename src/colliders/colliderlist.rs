use crate::colliders::Collider;
use crate::error::CoreResult;
use crate::math::{Rect, Vec2};

/// Compound collider. Every child is positioned relative to the same owner
/// and every predicate is the OR of the children's answers.
///
/// Cloning copies every child, so a clone can be reshaped without touching
/// the original.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColliderList {
    colliders: Vec<Collider>,
}

impl ColliderList {
    pub fn new(colliders: Vec<Collider>) -> Self {
        Self { colliders }
    }

    pub fn with(mut self, collider: impl Into<Collider>) -> Self {
        self.add(collider);
        self
    }

    pub fn add(&mut self, collider: impl Into<Collider>) {
        self.colliders.push(collider.into());
    }

    /// Detaches and returns the child at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Collider> {
        (index < self.colliders.len()).then(|| self.colliders.remove(index))
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Collider> {
        self.colliders.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Collider> {
        self.colliders.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Collider> {
        self.colliders.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Collider> {
        self.colliders.iter_mut()
    }

    fn fold(&self, init: f32, pick: impl Fn(&Collider) -> f32, keep: fn(f32, f32) -> f32) -> f32 {
        if self.colliders.is_empty() {
            return 0.0;
        }
        self.colliders.iter().map(pick).fold(init, keep)
    }

    pub fn left(&self) -> f32 {
        self.fold(f32::INFINITY, Collider::left, f32::min)
    }

    pub fn top(&self) -> f32 {
        self.fold(f32::INFINITY, Collider::top, f32::min)
    }

    pub fn right(&self) -> f32 {
        self.fold(f32::NEG_INFINITY, Collider::right, f32::max)
    }

    pub fn bottom(&self) -> f32 {
        self.fold(f32::NEG_INFINITY, Collider::bottom, f32::max)
    }

    pub fn width(&self) -> f32 {
        self.right() - self.left()
    }

    pub fn height(&self) -> f32 {
        self.bottom() - self.top()
    }

    /// Moves every child by the same offset.
    pub fn translate(&mut self, by: Vec2) {
        for collider in &mut self.colliders {
            collider.translate(by);
        }
    }

    pub fn set_left(&mut self, value: f32) {
        self.translate(Vec2::new(value - self.left(), 0.0));
    }

    pub fn set_top(&mut self, value: f32) {
        self.translate(Vec2::new(0.0, value - self.top()));
    }

    pub fn set_right(&mut self, value: f32) {
        self.translate(Vec2::new(value - self.right(), 0.0));
    }

    pub fn set_bottom(&mut self, value: f32) {
        self.translate(Vec2::new(0.0, value - self.bottom()));
    }

    pub fn bounds(&self, origin: Vec2) -> Rect {
        Rect::new(
            origin.x + self.left(),
            origin.y + self.top(),
            self.width(),
            self.height(),
        )
    }

    pub fn collide_point(&self, origin: Vec2, point: Vec2) -> bool {
        self.colliders.iter().any(|c| c.collide_point(origin, point))
    }

    pub fn collide_rect(&self, origin: Vec2, rect: &Rect) -> bool {
        self.colliders.iter().any(|c| c.collide_rect(origin, rect))
    }

    pub fn collide_line(&self, origin: Vec2, from: Vec2, to: Vec2) -> bool {
        self.colliders.iter().any(|c| c.collide_line(origin, from, to))
    }

    /// Whether any child collides with `other`. The first child that hits
    /// wins, so an unsupported pair further down the list is only reported
    /// when nothing before it collided.
    pub fn collide(&self, origin: Vec2, other: &Collider, other_origin: Vec2) -> CoreResult<bool> {
        for collider in &self.colliders {
            if collider.collide(origin, other, other_origin)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
