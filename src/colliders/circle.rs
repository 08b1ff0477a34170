use crate::colliders::collide;
use crate::math::{Rect, Vec2};

/// Circle collider. `position` is the centre, relative to the owning entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub radius: f32,
    pub position: Vec2,
}

impl Circle {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            position: Vec2::ZERO,
        }
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.position = offset;
        self
    }

    pub fn width(&self) -> f32 {
        self.radius * 2.0
    }

    pub fn height(&self) -> f32 {
        self.radius * 2.0
    }

    /// Setting either dimension sets the diameter.
    pub fn set_width(&mut self, width: f32) {
        self.radius = width * 0.5;
    }

    pub fn set_height(&mut self, height: f32) {
        self.radius = height * 0.5;
    }

    pub fn left(&self) -> f32 {
        self.position.x - self.radius
    }

    pub fn top(&self) -> f32 {
        self.position.y - self.radius
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.radius
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.radius
    }

    pub fn set_left(&mut self, value: f32) {
        self.position.x = value + self.radius;
    }

    pub fn set_top(&mut self, value: f32) {
        self.position.y = value + self.radius;
    }

    pub fn set_right(&mut self, value: f32) {
        self.position.x = value - self.radius;
    }

    pub fn set_bottom(&mut self, value: f32) {
        self.position.y = value - self.radius;
    }

    /// Centre in world space for an owner at `origin`.
    pub fn centre(&self, origin: Vec2) -> Vec2 {
        origin + self.position
    }

    pub fn collide_point(&self, origin: Vec2, point: Vec2) -> bool {
        collide::circle_to_point(self.centre(origin), self.radius, point)
    }

    pub fn collide_rect(&self, origin: Vec2, rect: &Rect) -> bool {
        collide::rect_to_circle(rect, self.centre(origin), self.radius)
    }

    pub fn collide_line(&self, origin: Vec2, from: Vec2, to: Vec2) -> bool {
        collide::circle_to_line(self.centre(origin), self.radius, from, to)
    }

    pub fn collide_circle(&self, origin: Vec2, other: &Circle, other_origin: Vec2) -> bool {
        collide::circle_to_circle(
            self.centre(origin),
            self.radius,
            other.centre(other_origin),
            other.radius,
        )
    }
}
