//! Drawing seam and debug overlays.
//!
//! The core never talks to a graphics backend. Everything that draws goes
//! through [`Canvas`], which a host implements over whatever it renders
//! with. [`RecordingCanvas`] keeps the commands in memory instead, which is
//! what the sandbox and the tests draw into.
//!
//! [`debug_overlay`] outlines every collider in a scene and marks each
//! entity position with a small cross.

use serde::Serialize;

use crate::colliders::Collider;
use crate::math::{Rect, Vec2};
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(230, 41, 55);
    pub const GREEN: Color = Color::rgb(0, 228, 48);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 255 }
    }
}

pub trait Canvas {
    fn draw_rectangle_lines(&mut self, rect: Rect, color: Color);

    fn draw_circle_lines(&mut self, centre: Vec2, radius: f32, color: Color);

    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DrawCommand {
    Rect { rect: [f32; 4], color: Color },
    Circle { centre: [f32; 2], radius: f32, color: Color },
    Line { from: [f32; 2], to: [f32; 2], color: Color },
}

/// Canvas that stores what was drawn.
#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    pub commands: Vec<DrawCommand>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Canvas for RecordingCanvas {
    fn draw_rectangle_lines(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::Rect {
            rect: [rect.x, rect.y, rect.width, rect.height],
            color,
        });
    }

    fn draw_circle_lines(&mut self, centre: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            centre: centre.to_array(),
            radius,
            color,
        });
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2, color: Color) {
        self.commands.push(DrawCommand::Line {
            from: from.to_array(),
            to: to.to_array(),
            color,
        });
    }
}

/// Outlines `collider` owned by an entity at `origin`. Grids draw one
/// rectangle per solid cell, lists draw each child.
pub fn draw_collider(canvas: &mut dyn Canvas, collider: &Collider, origin: Vec2, color: Color) {
    match collider {
        Collider::Circle(circle) => {
            canvas.draw_circle_lines(circle.centre(origin), circle.radius, color);
        }
        Collider::Hitbox(hitbox) => canvas.draw_rectangle_lines(hitbox.bounds(origin), color),
        Collider::Grid(grid) => {
            let top_left = origin + grid.position;
            for y in 0..grid.cells_y() {
                for x in 0..grid.cells_x() {
                    if grid.get(x as i32, y as i32) {
                        canvas.draw_rectangle_lines(
                            Rect::new(
                                top_left.x + x as f32 * grid.cell_width(),
                                top_left.y + y as f32 * grid.cell_height(),
                                grid.cell_width(),
                                grid.cell_height(),
                            ),
                            color,
                        );
                    }
                }
            }
        }
        Collider::List(list) => {
            for child in list.iter() {
                draw_collider(canvas, child, origin, color);
            }
        }
    }
}

/// Small cross centred on `position`.
pub fn draw_cross(canvas: &mut dyn Canvas, position: Vec2, color: Color) {
    canvas.draw_line(position - Vec2::X * 5.0, position + Vec2::X * 5.0, color);
    canvas.draw_line(position - Vec2::Y * 5.0, position + Vec2::Y * 5.0, color);
}

/// Debug overlay for every live entity, in depth order.
pub fn debug_overlay(scene: &Scene, canvas: &mut dyn Canvas) {
    for entity in scene.entities().iter() {
        if let Some(collider) = entity.collider() {
            let color = if entity.collidable { Color::RED } else { Color::WHITE };
            draw_collider(canvas, collider, entity.position, color);
        }
        draw_cross(canvas, entity.position, Color::GREEN);
    }
}
