//! Shared geometric routines used by every collider shape.
//!
//! The rectangle tests classify points with [`PointSectors`]: each axis
//! contributes one bit (left/right, top/bottom) and the centre region is
//! the empty set. Only the edges named by a point's sector bits can be the
//! first edge a circle or segment touches, so those are the only edges the
//! rectangle tests walk.
//!
//! ```text
//!   1001 | 0001 | 0101
//!   -----+------+-----
//!   1000 | 0000 | 0100
//!   -----+------+-----
//!   1010 | 0010 | 0110
//! ```

use arrayvec::ArrayVec;
use bitflags::bitflags;

use crate::math::{Rect, Vec2};

bitflags! {
    /// Region of the plane relative to a rectangle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PointSectors: u8 {
        const TOP = 0b0001;
        const BOTTOM = 0b0010;
        const RIGHT = 0b0100;
        const LEFT = 0b1000;
    }
}

impl PointSectors {
    /// Inside the rectangle.
    pub const CENTRE: PointSectors = PointSectors::empty();
}

/// Classifies `point` against `rect`. Min edges belong to the centre
/// region and max edges to the outer one, like [`Rect::contains`].
pub fn sector_of(rect: &Rect, point: Vec2) -> PointSectors {
    let mut sector = PointSectors::CENTRE;

    if point.x < rect.left() {
        sector |= PointSectors::LEFT;
    } else if point.x >= rect.right() {
        sector |= PointSectors::RIGHT;
    }

    if point.y < rect.top() {
        sector |= PointSectors::TOP;
    } else if point.y >= rect.bottom() {
        sector |= PointSectors::BOTTOM;
    }

    sector
}

/// The rectangle edges named by `sectors`, as segments.
fn edges(rect: &Rect, sectors: PointSectors) -> ArrayVec<(Vec2, Vec2), 4> {
    let top_left = Vec2::new(rect.left(), rect.top());
    let top_right = Vec2::new(rect.right(), rect.top());
    let bottom_left = Vec2::new(rect.left(), rect.bottom());
    let bottom_right = Vec2::new(rect.right(), rect.bottom());

    let mut out = ArrayVec::new();
    if sectors.contains(PointSectors::TOP) {
        out.push((top_left, top_right));
    }
    if sectors.contains(PointSectors::BOTTOM) {
        out.push((bottom_left, bottom_right));
    }
    if sectors.contains(PointSectors::LEFT) {
        out.push((top_left, bottom_left));
    }
    if sectors.contains(PointSectors::RIGHT) {
        out.push((top_right, bottom_right));
    }
    out
}

/// Closest point to `point` on the segment `a`-`b`.
pub fn closest_point_on_line(a: Vec2, b: Vec2, point: Vec2) -> Vec2 {
    let v = b - a;
    let length_squared = v.length_squared();
    if length_squared == 0.0 {
        return a;
    }
    let t = ((point - a).dot(v) / length_squared).clamp(0.0, 1.0);
    a + v * t
}

/// Strict: a point exactly on the circle's edge does not collide.
pub fn circle_to_point(centre: Vec2, radius: f32, point: Vec2) -> bool {
    centre.distance_squared(point) < radius * radius
}

pub fn circle_to_line(centre: Vec2, radius: f32, from: Vec2, to: Vec2) -> bool {
    centre.distance_squared(closest_point_on_line(from, to, centre)) < radius * radius
}

pub fn circle_to_circle(a: Vec2, a_radius: f32, b: Vec2, b_radius: f32) -> bool {
    let reach = a_radius + b_radius;
    a.distance_squared(b) < reach * reach
}

pub fn rect_to_point(rect: &Rect, point: Vec2) -> bool {
    rect.contains(point)
}

/// Segment-segment intersection. Parallel segments never intersect.
pub fn line_check(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let b = a2 - a1;
    let d = b2 - b1;
    let denominator = b.perp_dot(d);
    if denominator == 0.0 {
        return false;
    }

    let c = b1 - a1;
    let t = c.perp_dot(d) / denominator;
    if !(0.0..=1.0).contains(&t) {
        return false;
    }

    let u = c.perp_dot(b) / denominator;
    (0.0..=1.0).contains(&u)
}

pub fn rect_to_circle(rect: &Rect, centre: Vec2, radius: f32) -> bool {
    if circle_to_point(centre, radius, rect.centre()) {
        return true;
    }

    let sector = sector_of(rect, centre);
    if sector == PointSectors::CENTRE {
        return true;
    }

    edges(rect, sector)
        .into_iter()
        .any(|(from, to)| circle_to_line(centre, radius, from, to))
}

pub fn rect_to_line(rect: &Rect, from: Vec2, to: Vec2) -> bool {
    let from_sector = sector_of(rect, from);
    let to_sector = sector_of(rect, to);

    if from_sector == PointSectors::CENTRE || to_sector == PointSectors::CENTRE {
        return true;
    }
    if from_sector.intersects(to_sector) {
        return false;
    }

    edges(rect, from_sector | to_sector)
        .into_iter()
        .any(|(a, b)| line_check(from, to, a, b))
}
