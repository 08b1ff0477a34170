use crate::colliders::circle::Circle;
use crate::colliders::collide;
use crate::math::{Rect, Vec2};

/// Axis-aligned box collider. `position` is the top-left corner relative to
/// the owning entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub width: f32,
    pub height: f32,
    pub position: Vec2,
}

impl Hitbox {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            position: Vec2::ZERO,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.position = offset;
        self
    }

    /// Moves the box so the owner's position sits at its centre.
    pub fn centre_origin(&mut self) {
        self.position = Vec2::new(-self.width * 0.5, -self.height * 0.5);
    }

    /// Adopts the offset and size of `rect`.
    pub fn set_from_rect(&mut self, rect: &Rect) {
        self.position = rect.top_left();
        self.width = rect.width;
        self.height = rect.height;
    }

    pub fn left(&self) -> f32 {
        self.position.x
    }

    pub fn top(&self) -> f32 {
        self.position.y
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.height
    }

    pub fn set_left(&mut self, value: f32) {
        self.position.x = value;
    }

    pub fn set_top(&mut self, value: f32) {
        self.position.y = value;
    }

    pub fn set_right(&mut self, value: f32) {
        self.position.x = value - self.width;
    }

    pub fn set_bottom(&mut self, value: f32) {
        self.position.y = value - self.height;
    }

    /// World-space rectangle for an owner at `origin`.
    pub fn bounds(&self, origin: Vec2) -> Rect {
        let corner = origin + self.position;
        Rect::new(corner.x, corner.y, self.width, self.height)
    }

    pub fn intersects(&self, origin: Vec2, rect: &Rect) -> bool {
        self.bounds(origin).intersects(rect)
    }

    /// Half-open: points on the min edges collide, points on the max edges
    /// do not.
    pub fn collide_point(&self, origin: Vec2, point: Vec2) -> bool {
        collide::rect_to_point(&self.bounds(origin), point)
    }

    pub fn collide_rect(&self, origin: Vec2, rect: &Rect) -> bool {
        self.intersects(origin, rect)
    }

    pub fn collide_line(&self, origin: Vec2, from: Vec2, to: Vec2) -> bool {
        collide::rect_to_line(&self.bounds(origin), from, to)
    }

    pub fn collide_hitbox(&self, origin: Vec2, other: &Hitbox, other_origin: Vec2) -> bool {
        self.intersects(origin, &other.bounds(other_origin))
    }

    pub fn collide_circle(&self, origin: Vec2, circle: &Circle, circle_origin: Vec2) -> bool {
        collide::rect_to_circle(
            &self.bounds(origin),
            circle.centre(circle_origin),
            circle.radius,
        )
    }
}
