//! Bitmap grid collider.
//!
//! A [`Grid`] is a block of equally sized cells, each either solid or empty,
//! typically used for tile-based level geometry. Cells are addressed with
//! `(x, y)` indices; reads outside the grid are always empty.
//!
//! Rectangle probes convert the world rectangle into a cell range and scan
//! it. Line probes walk the cells under the segment with an error-
//! accumulating step along the dominant axis, swapping axes when the line is
//! steeper than 45 degrees so every step advances one whole cell.

use crate::colliders::circle::Circle;
use crate::colliders::collide;
use crate::error::{CoreError, CoreResult};
use crate::math::{Rect, Vec2};

#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Top-left corner relative to the owning entity.
    pub position: Vec2,
    cell_width: f32,
    cell_height: f32,
    cells_x: usize,
    cells_y: usize,
    /// Row-major occupancy.
    data: Vec<bool>,
}

impl Grid {
    /// An empty grid of `cells_x` by `cells_y` cells.
    pub fn new(cells_x: usize, cells_y: usize, cell_width: f32, cell_height: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            cell_width,
            cell_height,
            cells_x,
            cells_y,
            data: vec![false; cells_x * cells_y],
        }
    }

    /// Builds a grid from row-major occupancy data.
    pub fn from_data(
        cells_x: usize,
        cells_y: usize,
        cell_width: f32,
        cell_height: f32,
        data: Vec<bool>,
    ) -> CoreResult<Self> {
        let expected = cells_x * cells_y;
        if data.len() != expected {
            return Err(CoreError::GridSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            position: Vec2::ZERO,
            cell_width,
            cell_height,
            cells_x,
            cells_y,
            data,
        })
    }

    /// Builds a grid from text rows where `#` marks a solid cell. All rows
    /// must have the same length.
    pub fn from_rows(cell_width: f32, cell_height: f32, rows: &[&str]) -> CoreResult<Self> {
        let cells_x = rows.first().map_or(0, |row| row.chars().count());
        let data: Vec<bool> = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| c == '#'))
            .collect();
        Self::from_data(cells_x, rows.len(), cell_width, cell_height, data)
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.position = offset;
        self
    }

    pub fn cell_width(&self) -> f32 {
        self.cell_width
    }

    pub fn cell_height(&self) -> f32 {
        self.cell_height
    }

    pub fn cells_x(&self) -> usize {
        self.cells_x
    }

    pub fn cells_y(&self) -> usize {
        self.cells_y
    }

    pub fn width(&self) -> f32 {
        self.cell_width * self.cells_x as f32
    }

    pub fn height(&self) -> f32 {
        self.cell_height * self.cells_y as f32
    }

    pub fn left(&self) -> f32 {
        self.position.x
    }

    pub fn top(&self) -> f32 {
        self.position.y
    }

    pub fn right(&self) -> f32 {
        self.position.x + self.width()
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.height()
    }

    pub fn set_left(&mut self, value: f32) {
        self.position.x = value;
    }

    pub fn set_top(&mut self, value: f32) {
        self.position.y = value;
    }

    pub fn set_right(&mut self, value: f32) {
        self.position.x = value - self.width();
    }

    pub fn set_bottom(&mut self, value: f32) {
        self.position.y = value - self.height();
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        (x < self.cells_x && y < self.cells_y).then(|| y * self.cells_x + x)
    }

    /// Occupancy of cell `(x, y)`; cells outside the grid are empty.
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|i| self.data[i])
    }

    /// Sets cell `(x, y)`. Writes outside the grid are ignored.
    pub fn set(&mut self, x: i32, y: i32, value: bool) {
        if let Some(i) = self.index(x, y) {
            self.data[i] = value;
        }
    }

    pub fn clear(&mut self, to: bool) {
        self.data.fill(to);
    }

    pub fn is_empty(&self) -> bool {
        !self.data.contains(&true)
    }

    /// Clamps a cell rectangle to the grid, returning exclusive end indices.
    fn clamp_cells(&self, x: i32, y: i32, width: i32, height: i32) -> (usize, usize, usize, usize) {
        let (cells_x, cells_y) = (self.cells_x as i64, self.cells_y as i64);
        let x0 = i64::from(x).clamp(0, cells_x);
        let y0 = i64::from(y).clamp(0, cells_y);
        let x1 = (i64::from(x) + i64::from(width)).clamp(x0, cells_x);
        let y1 = (i64::from(y) + i64::from(height)).clamp(y0, cells_y);
        (x0 as usize, y0 as usize, x1 as usize, y1 as usize)
    }

    /// Sets every cell of the given cell rectangle, clamped to the grid.
    pub fn set_rect(&mut self, x: i32, y: i32, width: i32, height: i32, to: bool) {
        let (x0, y0, x1, y1) = self.clamp_cells(x, y, width, height);
        for cy in y0..y1 {
            let row = cy * self.cells_x;
            self.data[row + x0..row + x1].fill(to);
        }
    }

    /// Whether any cell of the given cell rectangle is solid, clamped to the
    /// grid.
    pub fn check_rect(&self, x: i32, y: i32, width: i32, height: i32) -> bool {
        let (x0, y0, x1, y1) = self.clamp_cells(x, y, width, height);
        (y0..y1).any(|cy| {
            let row = cy * self.cells_x;
            self.data[row + x0..row + x1].contains(&true)
        })
    }

    /// Whether every cell of row `y` is solid.
    pub fn check_row(&self, y: usize) -> bool {
        y < self.cells_y && (0..self.cells_x).all(|x| self.data[y * self.cells_x + x])
    }

    /// Whether every cell of column `x` is solid.
    pub fn check_column(&self, x: usize) -> bool {
        x < self.cells_x && (0..self.cells_y).all(|y| self.data[y * self.cells_x + x])
    }

    pub fn bounds(&self, origin: Vec2) -> Rect {
        let corner = origin + self.position;
        Rect::new(corner.x, corner.y, self.width(), self.height())
    }

    fn cell_rect(&self, bounds: &Rect, x: i32, y: i32) -> Rect {
        Rect::new(
            bounds.left() + x as f32 * self.cell_width,
            bounds.top() + y as f32 * self.cell_height,
            self.cell_width,
            self.cell_height,
        )
    }

    pub fn collide_point(&self, origin: Vec2, point: Vec2) -> bool {
        let bounds = self.bounds(origin);
        if !bounds.contains(point) {
            return false;
        }
        let x = ((point.x - bounds.left()) / self.cell_width).floor() as i32;
        let y = ((point.y - bounds.top()) / self.cell_height).floor() as i32;
        self.get(x, y)
    }

    /// A cell collides when it overlaps `rect` with positive area.
    pub fn collide_rect(&self, origin: Vec2, rect: &Rect) -> bool {
        let bounds = self.bounds(origin);
        if !rect.intersects(&bounds) {
            return false;
        }
        // Cell indices stay within [-1, cells] so the span cannot overflow.
        let max_x = self.cells_x as f32;
        let max_y = self.cells_y as f32;
        let x0 = ((rect.left() - bounds.left()) / self.cell_width).floor().clamp(-1.0, max_x) as i32;
        let y0 = ((rect.top() - bounds.top()) / self.cell_height).floor().clamp(-1.0, max_y) as i32;
        let x1 = (((rect.right() - bounds.left()) / self.cell_width).ceil() - 1.0).clamp(-1.0, max_x) as i32;
        let y1 = (((rect.bottom() - bounds.top()) / self.cell_height).ceil() - 1.0).clamp(-1.0, max_y) as i32;
        self.check_rect(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
    }

    pub fn collide_line(&self, origin: Vec2, from: Vec2, to: Vec2) -> bool {
        let cell = Vec2::new(self.cell_width, self.cell_height);
        let corner = origin + self.position;
        let mut from = (from - corner) / cell;
        let mut to = (to - corner) / cell;

        let steep = (to.y - from.y).abs() > (to.x - from.x).abs();
        if steep {
            from = Vec2::new(from.y, from.x);
            to = Vec2::new(to.y, to.x);
        }
        if from.x > to.x {
            std::mem::swap(&mut from, &mut to);
        }

        let run = to.x - from.x;
        let delta_error = if run > 0.0 {
            (to.y - from.y).abs() / run
        } else {
            0.0
        };
        let y_step = if from.y < to.y { 1 } else { -1 };
        let mut y = from.y.floor() as i32;
        let mut error = 0.0;

        for x in (from.x.floor() as i32)..=(to.x.floor() as i32) {
            let solid = if steep { self.get(y, x) } else { self.get(x, y) };
            if solid {
                return true;
            }
            error += delta_error;
            if error >= 0.5 {
                y += y_step;
                error -= 1.0;
            }
        }

        false
    }

    /// Tests every solid cell under the circle's bounding box against the
    /// circle.
    pub fn collide_circle(&self, origin: Vec2, circle: &Circle, circle_origin: Vec2) -> bool {
        let bounds = self.bounds(origin);
        let centre = circle.centre(circle_origin);
        let radius = circle.radius;
        let reach = Rect::new(centre.x - radius, centre.y - radius, radius * 2.0, radius * 2.0);
        if !reach.intersects(&bounds) {
            return false;
        }

        let x0 = (((reach.left() - bounds.left()) / self.cell_width).floor() as i32).max(0);
        let y0 = (((reach.top() - bounds.top()) / self.cell_height).floor() as i32).max(0);
        let x1 = (((reach.right() - bounds.left()) / self.cell_width).floor() as i32)
            .min(self.cells_x as i32 - 1);
        let y1 = (((reach.bottom() - bounds.top()) / self.cell_height).floor() as i32)
            .min(self.cells_y as i32 - 1);

        for y in y0..=y1 {
            for x in x0..=x1 {
                if self.get(x, y)
                    && collide::rect_to_circle(&self.cell_rect(&bounds, x, y), centre, radius)
                {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_cell_grid() -> Grid {
        let mut grid = Grid::new(8, 8, 16.0, 16.0);
        grid.set(3, 3, true);
        grid
    }

    // ==================== STORAGE TESTS ====================

    #[test]
    fn test_out_of_range_reads_are_empty() {
        let mut grid = Grid::new(2, 2, 1.0, 1.0);
        grid.clear(true);
        assert!(grid.get(1, 1));
        assert!(!grid.get(-1, 0));
        assert!(!grid.get(2, 0));
        assert!(!grid.get(0, 2));
    }

    #[test]
    fn test_set_rect_clamps() {
        let mut grid = Grid::new(4, 4, 1.0, 1.0);
        grid.set_rect(-2, -2, 4, 3, true);
        assert!(grid.get(0, 0));
        assert!(grid.get(1, 0));
        assert!(!grid.get(2, 0));
        assert!(!grid.get(0, 1));
        assert!(grid.check_rect(-10, -10, 11, 11));
        assert!(!grid.check_rect(2, 2, 10, 10));
    }

    #[test]
    fn test_huge_ranges_do_not_overflow() {
        let mut grid = Grid::new(4, 4, 16.0, 16.0);
        grid.set(3, 3, true);
        assert!(!grid.check_rect(i32::MAX - 1, 0, 10, 1));
        assert!(!grid.check_rect(i32::MIN, i32::MIN, -5, -5));
        assert!(grid.check_rect(i32::MIN, i32::MIN, i32::MAX, i32::MAX));
        grid.set_rect(i32::MAX - 1, i32::MAX - 1, i32::MAX, i32::MAX, true);
        assert!(!grid.get(0, 0));

        let everything = Rect::new(-1e12, -1e12, 2e12, 2e12);
        assert!(grid.collide_rect(Vec2::ZERO, &everything));
        grid.clear(false);
        assert!(!grid.collide_rect(Vec2::ZERO, &everything));
    }

    #[test]
    fn test_rows_and_columns() {
        let grid = Grid::from_rows(1.0, 1.0, &["###", "#..", "#.#"]).unwrap();
        assert!(grid.check_row(0));
        assert!(!grid.check_row(1));
        assert!(!grid.check_row(7));
        assert!(grid.check_column(0));
        assert!(!grid.check_column(2));
    }

    #[test]
    fn test_from_data_rejects_wrong_length() {
        let err = Grid::from_data(3, 3, 1.0, 1.0, vec![false; 8]).unwrap_err();
        assert_eq!(err, CoreError::GridSize { expected: 9, actual: 8 });
    }

    #[test]
    fn test_is_empty() {
        let mut grid = Grid::new(3, 3, 1.0, 1.0);
        assert!(grid.is_empty());
        grid.set(2, 2, true);
        assert!(!grid.is_empty());
    }

    // ==================== BOUNDS TESTS ====================

    #[test]
    fn test_bottom_reads_vertical_axis() {
        let grid = Grid::new(4, 2, 10.0, 5.0).with_offset(Vec2::new(3.0, 7.0));
        assert_eq!(grid.right(), 43.0);
        assert_eq!(grid.bottom(), 17.0);
    }

    #[test]
    fn test_right_and_bottom_setters_move_their_own_axis() {
        let mut grid = Grid::new(4, 2, 10.0, 5.0);
        grid.set_right(100.0);
        assert_eq!(grid.position, Vec2::new(60.0, 0.0));
        grid.set_bottom(100.0);
        assert_eq!(grid.position, Vec2::new(60.0, 90.0));
    }

    // ==================== PROBE TESTS ====================

    #[test]
    fn test_point_probe() {
        let grid = single_cell_grid();
        let origin = Vec2::new(100.0, 0.0);
        assert!(grid.collide_point(origin, Vec2::new(100.0 + 48.0, 48.0)));
        assert!(!grid.collide_point(origin, Vec2::new(100.0 + 64.0, 48.0)));
        assert!(!grid.collide_point(origin, Vec2::new(48.0, 48.0)));
    }

    #[test]
    fn test_rect_probe_cell_edges() {
        let grid = single_cell_grid();
        // Touching the solid cell's left edge only.
        assert!(!grid.collide_rect(Vec2::ZERO, &Rect::new(40.0, 50.0, 8.0, 4.0)));
        assert!(grid.collide_rect(Vec2::ZERO, &Rect::new(40.0, 50.0, 8.5, 4.0)));
        assert!(grid.collide_rect(Vec2::ZERO, &Rect::new(0.0, 0.0, 200.0, 200.0)));
    }

    #[test]
    fn test_line_walk_diagonal_hits_cell() {
        let grid = single_cell_grid();
        assert!(grid.collide_line(Vec2::ZERO, Vec2::new(0.0, 0.0), Vec2::new(128.0, 128.0)));
        assert!(grid.collide_line(Vec2::ZERO, Vec2::new(128.0, 128.0), Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn test_line_walk_horizontal_misses_cell() {
        let grid = single_cell_grid();
        assert!(!grid.collide_line(Vec2::ZERO, Vec2::new(0.0, 0.0), Vec2::new(128.0, 0.0)));
    }

    #[test]
    fn test_line_walk_steep_and_ending_inside() {
        let grid = single_cell_grid();
        assert!(grid.collide_line(Vec2::ZERO, Vec2::new(56.0, 0.0), Vec2::new(56.0, 128.0)));
        assert!(grid.collide_line(Vec2::ZERO, Vec2::new(0.0, 0.0), Vec2::new(56.0, 56.0)));
        assert!(grid.collide_line(Vec2::ZERO, Vec2::new(56.0, 56.0), Vec2::new(56.0, 56.0)));
    }

    #[test]
    fn test_circle_probe() {
        let grid = single_cell_grid();
        let circle = Circle::new(4.0);
        assert!(grid.collide_circle(Vec2::ZERO, &circle, Vec2::new(56.0, 56.0)));
        assert!(grid.collide_circle(Vec2::ZERO, &circle, Vec2::new(45.0, 56.0)));
        assert!(!grid.collide_circle(Vec2::ZERO, &circle, Vec2::new(43.0, 56.0)));
        assert!(!grid.collide_circle(Vec2::ZERO, &circle, Vec2::new(8.0, 8.0)));
    }
}
