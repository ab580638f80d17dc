//! Control point storage for a single warp
//!
//! Holds the ordered grid of normalized 2D control points, the selection
//! state and the generic point-edit operations shared by all warp types.

use glam::{UVec2, Vec2};
use std::time::Instant;

/// Ordered grid of normalized control points for one warp.
///
/// Points are stored column-major (`index = col * rows + row`) and are
/// normalized against the view size; values outside [0,1] are legal while a
/// point is dragged past the surface edge and are never clamped. All indexed
/// accessors silently ignore out-of-range indices: interactive editing code
/// must keep working across a stale selection, never crash on it.
#[derive(Debug, Clone)]
pub struct ControlPointField {
    points: Vec<Vec2>,
    columns: usize,
    rows: usize,
    selected: Option<usize>,
    /// Time of the last selection change, used only for marker pulsing.
    selected_at: Option<Instant>,
    content_size: UVec2,
    view_size: Vec2,
    /// Offset between the pointer and the selected point at pointer-down,
    /// so a drag does not snap the point to the cursor.
    drag_offset: Vec2,
    dirty: bool,
}

impl ControlPointField {
    /// Create a field spanning [0,1]×[0,1] with a uniform `columns × rows`
    /// grid. Both dimensions are raised to a minimum of 2.
    pub fn new(columns: usize, rows: usize) -> Self {
        let mut field = Self {
            points: Vec::new(),
            columns: columns.max(2),
            rows: rows.max(2),
            selected: None,
            selected_at: None,
            content_size: UVec2::new(640, 480),
            view_size: Vec2::new(640.0, 480.0),
            drag_offset: Vec2::ZERO,
            dirty: true,
        };
        field.reset();
        field
    }

    /// Regenerate the uniform grid, keeping the current dimensions.
    pub fn reset(&mut self) {
        self.points.clear();
        for col in 0..self.columns {
            for row in 0..self.rows {
                self.points.push(Vec2::new(
                    col as f32 / (self.columns - 1) as f32,
                    row as f32 / (self.rows - 1) as f32,
                ));
            }
        }
        self.dirty = true;
    }

    /// Change the grid dimensions and regenerate the uniform layout.
    pub fn set_grid_size(&mut self, columns: usize, rows: usize) {
        self.columns = columns.max(2);
        self.rows = rows.max(2);
        self.reset();
    }

    /// Replace the whole grid, e.g. after resampling to a new density.
    ///
    /// The selection is left untouched; a now out-of-range index is simply
    /// ignored by the accessors until the next selection.
    pub fn replace_grid(&mut self, points: Vec<Vec2>, columns: usize, rows: usize) {
        debug_assert_eq!(points.len(), columns * rows);
        self.points = points;
        self.columns = columns;
        self.rows = rows;
        self.dirty = true;
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Normalized coordinates of the point, or zero when out of range.
    pub fn get(&self, index: usize) -> Vec2 {
        self.points.get(index).copied().unwrap_or(Vec2::ZERO)
    }

    /// Set a point's normalized coordinates; out-of-range is a no-op.
    pub fn set(&mut self, index: usize, position: Vec2) {
        if let Some(point) = self.points.get_mut(index) {
            *point = position;
            self.dirty = true;
        }
    }

    /// Shift a point by a normalized delta; out-of-range is a no-op.
    pub fn move_by(&mut self, index: usize, delta: Vec2) {
        if let Some(point) = self.points.get_mut(index) {
            *point += delta;
            self.dirty = true;
        }
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Seconds since the selection last changed, for marker pulsing.
    pub fn seconds_since_selection(&self) -> f32 {
        self.selected_at
            .map(|at| at.elapsed().as_secs_f32())
            .unwrap_or(0.0)
    }

    /// Select a point; out-of-range is a no-op. Re-selecting the current
    /// point does not restart the pulse timer.
    pub fn select(&mut self, index: usize) {
        if index >= self.points.len() || self.selected == Some(index) {
            return;
        }
        self.selected = Some(index);
        self.selected_at = Some(Instant::now());
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Select the next point in storage order, wrapping around.
    pub fn select_next(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let next = match self.selected {
            Some(i) if i + 1 < self.points.len() => i + 1,
            _ => 0,
        };
        self.select(next);
    }

    /// Select the previous point in storage order, wrapping around.
    pub fn select_prev(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let prev = match self.selected {
            Some(i) if i > 0 => i - 1,
            _ => self.points.len() - 1,
        };
        self.select(prev);
    }

    /// Index and view-space distance of the control point closest to `pos`
    /// (view-space pixels). Ties keep the first point in storage order.
    pub fn find_nearest(&self, pos: Vec2) -> Option<(usize, f32)> {
        let mut nearest = None;
        let mut best = f32::MAX;
        for (i, point) in self.points.iter().enumerate() {
            let d = pos.distance(*point * self.view_size);
            if d < best {
                best = d;
                nearest = Some((i, d));
            }
        }
        nearest
    }

    /// View-space position of a point (zero when out of range).
    pub fn denormalized(&self, index: usize) -> Vec2 {
        self.get(index) * self.view_size
    }

    /// Move the selected point by a view-space pixel delta.
    pub fn nudge(&mut self, delta: Vec2) {
        if let Some(index) = self.selected {
            self.move_by(index, delta / self.view_size);
        }
    }

    /// Record the pointer-to-point offset at the start of a drag.
    pub fn begin_drag(&mut self, pos: Vec2) {
        if let Some(index) = self.selected {
            self.drag_offset = pos - self.denormalized(index);
        }
    }

    /// Drag the selected point to follow the pointer, honoring the offset
    /// captured by [`begin_drag`](Self::begin_drag).
    pub fn drag_to(&mut self, pos: Vec2) {
        if let Some(index) = self.selected {
            self.set(index, (pos - self.drag_offset) / self.view_size);
        }
    }

    /// Mirror the grid around its vertical axis (columns reversed).
    pub fn flip_horizontal(&mut self) {
        let mut points = Vec::with_capacity(self.points.len());
        for col in (0..self.columns).rev() {
            for row in 0..self.rows {
                points.push(self.points[col * self.rows + row]);
            }
        }
        self.points = points;
        self.dirty = true;
    }

    /// Mirror the grid around its horizontal axis (rows reversed).
    pub fn flip_vertical(&mut self) {
        let mut points = Vec::with_capacity(self.points.len());
        for col in 0..self.columns {
            for row in (0..self.rows).rev() {
                points.push(self.points[col * self.rows + row]);
            }
        }
        self.points = points;
        self.dirty = true;
    }

    pub fn content_size(&self) -> UVec2 {
        self.content_size
    }

    pub fn set_content_size(&mut self, size: UVec2) {
        self.content_size = size;
        self.dirty = true;
    }

    pub fn view_size(&self) -> Vec2 {
        self.view_size
    }

    pub fn set_view_size(&mut self, size: Vec2) {
        self.view_size = size;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_grid_layout() {
        let field = ControlPointField::new(3, 2);
        assert_eq!(field.len(), 6);
        // column-major: index = col * rows + row
        assert_eq!(field.get(0), Vec2::new(0.0, 0.0));
        assert_eq!(field.get(1), Vec2::new(0.0, 1.0));
        assert_eq!(field.get(4), Vec2::new(1.0, 0.0));
        assert_eq!(field.get(5), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_minimum_dimensions() {
        let field = ControlPointField::new(0, 1);
        assert_eq!(field.columns(), 2);
        assert_eq!(field.rows(), 2);
        assert_eq!(field.len(), 4);
    }

    #[test]
    fn test_out_of_range_accessors_are_noops() {
        let mut field = ControlPointField::new(2, 2);
        assert_eq!(field.get(99), Vec2::ZERO);

        let before = field.points().to_vec();
        field.set(99, Vec2::new(0.5, 0.5));
        field.move_by(99, Vec2::new(0.1, 0.1));
        field.select(99);
        assert_eq!(field.points(), &before[..]);
        assert_eq!(field.selected(), None);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut field = ControlPointField::new(4, 3);
        field.set(5, Vec2::new(0.3, 0.7));
        field.reset();
        let first = field.points().to_vec();
        field.reset();
        assert_eq!(field.points(), &first[..]);
    }

    #[test]
    fn test_find_nearest_prefers_first_on_tie() {
        let mut field = ControlPointField::new(2, 2);
        field.set_view_size(Vec2::new(100.0, 100.0));
        // equidistant between point 0 (0,0) and point 1 (0,1)
        let (index, dist) = field.find_nearest(Vec2::new(0.0, 50.0)).unwrap();
        assert_eq!(index, 0);
        assert!((dist - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_nudge_moves_selected_in_view_space() {
        let mut field = ControlPointField::new(2, 2);
        field.set_view_size(Vec2::new(200.0, 100.0));
        field.select(0);
        field.nudge(Vec2::new(10.0, 5.0));
        let p = field.get(0);
        assert!((p.x - 0.05).abs() < 1e-6);
        assert!((p.y - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_drag_keeps_pointer_offset() {
        let mut field = ControlPointField::new(2, 2);
        field.set_view_size(Vec2::new(100.0, 100.0));
        field.select(0);
        // grab 3px away from the point, drag to (50, 50)
        field.begin_drag(Vec2::new(3.0, 0.0));
        field.drag_to(Vec2::new(50.0, 50.0));
        let p = field.denormalized(0);
        assert!((p.x - 47.0).abs() < 1e-4);
        assert!((p.y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_flip_horizontal_is_involution() {
        let mut field = ControlPointField::new(3, 3);
        field.set(4, Vec2::new(0.4, 0.6));
        let before = field.points().to_vec();
        field.flip_horizontal();
        assert_ne!(field.points(), &before[..]);
        field.flip_horizontal();
        assert_eq!(field.points(), &before[..]);
    }

    #[test]
    fn test_selection_cycling_wraps() {
        let mut field = ControlPointField::new(2, 2);
        field.select(3);
        field.select_next();
        assert_eq!(field.selected(), Some(0));
        field.select_prev();
        assert_eq!(field.selected(), Some(3));
    }
}
