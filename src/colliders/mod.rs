//! Collider shapes and the shape-vs-shape dispatch table.
//!
//! A [`Collider`] is one of four shapes positioned relative to its owning
//! entity. Colliders do not know their owner: every absolute query takes the
//! owner's position as an `origin`, so the same collider can be probed at
//! any position without moving anything.
//!
//! # Dispatch
//!
//! [`Collider::collide`] matches on both shapes at once. Compound lists fold
//! over their children, every other pair maps to one geometric test.
//! Grid-vs-grid has no test and reports [`CoreError::UnsupportedPair`].
//!
//! # Related
//!
//! - [`collide`] – the shared geometric routines
//! - [`crate::systems::collision`] – entity-level batch queries built on top
//! - [`crate::systems::render::draw_collider`] – debug outlines

pub mod circle;
pub mod collide;
pub mod colliderlist;
pub mod grid;
pub mod hitbox;

pub use circle::Circle;
pub use colliderlist::ColliderList;
pub use grid::Grid;
pub use hitbox::Hitbox;

use crate::error::{CoreError, CoreResult};
use crate::math::{Rect, Vec2};
use crate::systems::render::{self, Canvas, Color};

#[derive(Debug, Clone, PartialEq)]
pub enum Collider {
    Circle(Circle),
    Hitbox(Hitbox),
    Grid(Grid),
    List(ColliderList),
}

impl From<Circle> for Collider {
    fn from(circle: Circle) -> Self {
        Collider::Circle(circle)
    }
}

impl From<Hitbox> for Collider {
    fn from(hitbox: Hitbox) -> Self {
        Collider::Hitbox(hitbox)
    }
}

impl From<Grid> for Collider {
    fn from(grid: Grid) -> Self {
        Collider::Grid(grid)
    }
}

impl From<ColliderList> for Collider {
    fn from(list: ColliderList) -> Self {
        Collider::List(list)
    }
}

impl Collider {
    /// Short shape name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Collider::Circle(_) => "circle",
            Collider::Hitbox(_) => "hitbox",
            Collider::Grid(_) => "grid",
            Collider::List(_) => "list",
        }
    }

    pub fn width(&self) -> f32 {
        match self {
            Collider::Circle(c) => c.width(),
            Collider::Hitbox(h) => h.width,
            Collider::Grid(g) => g.width(),
            Collider::List(l) => l.width(),
        }
    }

    pub fn height(&self) -> f32 {
        match self {
            Collider::Circle(c) => c.height(),
            Collider::Hitbox(h) => h.height,
            Collider::Grid(g) => g.height(),
            Collider::List(l) => l.height(),
        }
    }

    pub fn left(&self) -> f32 {
        match self {
            Collider::Circle(c) => c.left(),
            Collider::Hitbox(h) => h.left(),
            Collider::Grid(g) => g.left(),
            Collider::List(l) => l.left(),
        }
    }

    pub fn top(&self) -> f32 {
        match self {
            Collider::Circle(c) => c.top(),
            Collider::Hitbox(h) => h.top(),
            Collider::Grid(g) => g.top(),
            Collider::List(l) => l.top(),
        }
    }

    pub fn right(&self) -> f32 {
        match self {
            Collider::Circle(c) => c.right(),
            Collider::Hitbox(h) => h.right(),
            Collider::Grid(g) => g.right(),
            Collider::List(l) => l.right(),
        }
    }

    pub fn bottom(&self) -> f32 {
        match self {
            Collider::Circle(c) => c.bottom(),
            Collider::Hitbox(h) => h.bottom(),
            Collider::Grid(g) => g.bottom(),
            Collider::List(l) => l.bottom(),
        }
    }

    pub fn set_left(&mut self, value: f32) {
        match self {
            Collider::Circle(c) => c.set_left(value),
            Collider::Hitbox(h) => h.set_left(value),
            Collider::Grid(g) => g.set_left(value),
            Collider::List(l) => l.set_left(value),
        }
    }

    pub fn set_top(&mut self, value: f32) {
        match self {
            Collider::Circle(c) => c.set_top(value),
            Collider::Hitbox(h) => h.set_top(value),
            Collider::Grid(g) => g.set_top(value),
            Collider::List(l) => l.set_top(value),
        }
    }

    pub fn set_right(&mut self, value: f32) {
        match self {
            Collider::Circle(c) => c.set_right(value),
            Collider::Hitbox(h) => h.set_right(value),
            Collider::Grid(g) => g.set_right(value),
            Collider::List(l) => l.set_right(value),
        }
    }

    pub fn set_bottom(&mut self, value: f32) {
        match self {
            Collider::Circle(c) => c.set_bottom(value),
            Collider::Hitbox(h) => h.set_bottom(value),
            Collider::Grid(g) => g.set_bottom(value),
            Collider::List(l) => l.set_bottom(value),
        }
    }

    /// Shifts the collider's local offset.
    pub fn translate(&mut self, by: Vec2) {
        match self {
            Collider::Circle(c) => c.position += by,
            Collider::Hitbox(h) => h.position += by,
            Collider::Grid(g) => g.position += by,
            Collider::List(l) => l.translate(by),
        }
    }

    pub fn centre_x(&self) -> f32 {
        self.left() + self.width() * 0.5
    }

    pub fn centre_y(&self) -> f32 {
        self.top() + self.height() * 0.5
    }

    /// Local centre of the bounding box.
    pub fn centre(&self) -> Vec2 {
        Vec2::new(self.centre_x(), self.centre_y())
    }

    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.left(), self.top())
    }

    pub fn bottom_right(&self) -> Vec2 {
        Vec2::new(self.right(), self.bottom())
    }

    pub fn absolute_left(&self, origin: Vec2) -> f32 {
        origin.x + self.left()
    }

    pub fn absolute_top(&self, origin: Vec2) -> f32 {
        origin.y + self.top()
    }

    pub fn absolute_right(&self, origin: Vec2) -> f32 {
        origin.x + self.right()
    }

    pub fn absolute_bottom(&self, origin: Vec2) -> f32 {
        origin.y + self.bottom()
    }

    /// World-space bounding box for an owner at `origin`.
    pub fn bounds(&self, origin: Vec2) -> Rect {
        Rect::new(
            self.absolute_left(origin),
            self.absolute_top(origin),
            self.width(),
            self.height(),
        )
    }

    pub fn collide_point(&self, origin: Vec2, point: Vec2) -> bool {
        match self {
            Collider::Circle(c) => c.collide_point(origin, point),
            Collider::Hitbox(h) => h.collide_point(origin, point),
            Collider::Grid(g) => g.collide_point(origin, point),
            Collider::List(l) => l.collide_point(origin, point),
        }
    }

    pub fn collide_rect(&self, origin: Vec2, rect: &Rect) -> bool {
        match self {
            Collider::Circle(c) => c.collide_rect(origin, rect),
            Collider::Hitbox(h) => h.collide_rect(origin, rect),
            Collider::Grid(g) => g.collide_rect(origin, rect),
            Collider::List(l) => l.collide_rect(origin, rect),
        }
    }

    pub fn collide_line(&self, origin: Vec2, from: Vec2, to: Vec2) -> bool {
        match self {
            Collider::Circle(c) => c.collide_line(origin, from, to),
            Collider::Hitbox(h) => h.collide_line(origin, from, to),
            Collider::Grid(g) => g.collide_line(origin, from, to),
            Collider::List(l) => l.collide_line(origin, from, to),
        }
    }

    /// Outlines the collider in red on `canvas`.
    pub fn debug_draw(&self, origin: Vec2, canvas: &mut dyn Canvas) {
        render::draw_collider(canvas, self, origin, Color::RED);
    }

    /// Whether this collider, owned at `origin`, overlaps `other`, owned at
    /// `other_origin`.
    pub fn collide(&self, origin: Vec2, other: &Collider, other_origin: Vec2) -> CoreResult<bool> {
        use Collider::*;

        let hit = match (self, other) {
            (List(list), _) => return list.collide(origin, other, other_origin),
            (_, List(list)) => return list.collide(other_origin, self, origin),

            (Circle(a), Circle(b)) => a.collide_circle(origin, b, other_origin),
            (Circle(c), Hitbox(h)) => h.collide_circle(other_origin, c, origin),
            (Circle(c), Grid(g)) => g.collide_circle(other_origin, c, origin),

            (Hitbox(h), Circle(c)) => h.collide_circle(origin, c, other_origin),
            (Hitbox(a), Hitbox(b)) => a.collide_hitbox(origin, b, other_origin),
            (Hitbox(h), Grid(g)) => g.collide_rect(other_origin, &h.bounds(origin)),

            (Grid(g), Circle(c)) => g.collide_circle(origin, c, other_origin),
            (Grid(g), Hitbox(h)) => g.collide_rect(origin, &h.bounds(other_origin)),
            (Grid(_), Grid(_)) => {
                return Err(CoreError::UnsupportedPair {
                    a: self.kind_name(),
                    b: other.kind_name(),
                });
            }
        };
        Ok(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall() -> Collider {
        let mut grid = Grid::new(4, 4, 10.0, 10.0);
        grid.set_rect(0, 3, 4, 1, true);
        grid.into()
    }

    // ==================== DISPATCH TESTS ====================

    #[test]
    fn test_dispatch_is_symmetric() {
        let shapes: Vec<Collider> = vec![
            Circle::new(5.0).into(),
            Hitbox::new(10.0, 10.0).into(),
            wall(),
            ColliderList::default().with(Hitbox::new(2.0, 2.0)).into(),
        ];
        let positions = [Vec2::new(0.0, 0.0), Vec2::new(3.0, 30.0), Vec2::new(100.0, 0.0)];

        for a in &shapes {
            for b in &shapes {
                if matches!((a, b), (Collider::Grid(_), Collider::Grid(_))) {
                    continue;
                }
                for &pa in &positions {
                    for &pb in &positions {
                        assert_eq!(
                            a.collide(pa, b, pb),
                            b.collide(pb, a, pa),
                            "{} at {pa} vs {} at {pb}",
                            a.kind_name(),
                            b.kind_name()
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_grid_vs_grid_is_unsupported() {
        let err = wall().collide(Vec2::ZERO, &wall(), Vec2::ZERO).unwrap_err();
        assert_eq!(err, CoreError::UnsupportedPair { a: "grid", b: "grid" });
    }

    #[test]
    fn test_list_containing_grid_reports_unsupported_against_grid() {
        let list: Collider = ColliderList::default().with(wall()).into();
        assert!(list.collide(Vec2::ZERO, &wall(), Vec2::ZERO).is_err());
    }

    #[test]
    fn test_hitbox_on_grid_floor() {
        let player: Collider = Hitbox::new(8.0, 8.0).into();
        assert!(!player.collide(Vec2::new(10.0, 20.0), &wall(), Vec2::ZERO).unwrap());
        assert!(player.collide(Vec2::new(10.0, 23.0), &wall(), Vec2::ZERO).unwrap());
    }

    // ==================== ACCESSOR TESTS ====================

    #[test]
    fn test_absolute_bounds() {
        let c: Collider = Hitbox::new(4.0, 6.0).with_offset(Vec2::new(-2.0, -3.0)).into();
        assert_eq!(c.bounds(Vec2::new(10.0, 10.0)), Rect::new(8.0, 7.0, 4.0, 6.0));
        assert_eq!(c.centre(), Vec2::ZERO);
        assert_eq!(c.absolute_right(Vec2::new(10.0, 10.0)), 12.0);
    }

    #[test]
    fn test_centre_x_uses_width() {
        let c: Collider = Hitbox::new(10.0, 2.0).with_offset(Vec2::new(20.0, 0.0)).into();
        assert_eq!(c.centre_x(), 25.0);
    }
}
