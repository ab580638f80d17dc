//! Grid-based mesh warp with linear or Catmull-Rom interpolation

use glam::{UVec2, Vec2};

use crate::field::ControlPointField;
use crate::geometry::MeshGeometry;
use crate::input::{Key, Modifiers};
use crate::spline::ArcLengthCurve;
use crate::warp::{nudge_step, pulse_scale, ControlPointMarker};

/// Upper bound on the control grid, protecting fixed-capacity point buffers
/// shared with the renderer.
pub const MAX_CONTROL_POINTS: usize = 1024;

/// Smooth mesh warp over a `columns × rows` control grid.
///
/// The grid is tessellated into a finer vertex mesh whose density follows
/// either the content size or, in adaptive mode, the mesh's current
/// bounding box. Tessellation vertex counts are snapped so control-grid
/// boundaries always coincide with tessellation vertices.
#[derive(Debug, Clone)]
pub struct BilinearWarp {
    field: ControlPointField,
    /// Linear interpolation between control points instead of Catmull-Rom.
    linear: bool,
    /// Derive tessellation density from the mesh bounding box instead of
    /// the fixed content size.
    adaptive: bool,
    flip_vertical: bool,
    normalized_tex_coords: bool,
    /// Target quad size in output pixels; higher is coarser.
    resolution: u32,
    brightness: f32,
    geometry: MeshGeometry,
    topology_stale: bool,
}

impl Default for BilinearWarp {
    fn default() -> Self {
        Self::new()
    }
}

impl BilinearWarp {
    /// Create an undistorted 2×2 warp.
    pub fn new() -> Self {
        Self::with_grid(2, 2)
    }

    pub fn with_grid(columns: usize, rows: usize) -> Self {
        Self {
            field: ControlPointField::new(columns, rows),
            linear: false,
            adaptive: false,
            flip_vertical: false,
            normalized_tex_coords: true,
            resolution: 16,
            brightness: 1.0,
            geometry: MeshGeometry::default(),
            topology_stale: true,
        }
    }

    pub fn field(&self) -> &ControlPointField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ControlPointField {
        &mut self.field
    }

    /// Reset control points to the undistorted grid.
    pub fn reset(&mut self) {
        self.field.reset();
    }

    pub fn resize(&mut self, view_size: Vec2) {
        self.field.set_view_size(view_size);
    }

    pub fn content_size(&self) -> UVec2 {
        self.field.content_size()
    }

    pub fn set_content_size(&mut self, size: UVec2) {
        self.field.set_content_size(size);
        self.topology_stale = true;
    }

    pub fn view_size(&self) -> Vec2 {
        self.field.view_size()
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness.clamp(0.0, 1.0);
    }

    pub fn is_linear(&self) -> bool {
        self.linear
    }

    pub fn set_linear(&mut self, linear: bool) {
        self.linear = linear;
        self.field.mark_dirty();
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    pub fn set_adaptive(&mut self, adaptive: bool) {
        self.adaptive = adaptive;
        self.field.mark_dirty();
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Set the target quad size in output pixels.
    pub fn set_resolution(&mut self, resolution: u32) {
        self.resolution = resolution.max(1);
        self.field.mark_dirty();
    }

    pub fn set_flip_vertical(&mut self, flip: bool) {
        self.flip_vertical = flip;
        self.topology_stale = true;
        self.field.mark_dirty();
    }

    /// Texture coordinates span [0,1] when enabled, content pixels when not.
    pub fn set_normalized_tex_coords(&mut self, normalized: bool) {
        self.normalized_tex_coords = normalized;
        self.topology_stale = true;
        self.field.mark_dirty();
    }

    /// Replace the control grid wholesale, e.g. when loading a document.
    /// A point count that does not match the dimensions falls back to the
    /// undistorted grid of that size.
    pub fn apply_grid(&mut self, columns: usize, rows: usize, points: Vec<Vec2>) {
        let columns = columns.max(2);
        let rows = rows.max(2);
        if points.len() == columns * rows {
            self.field.replace_grid(points, columns, rows);
        } else {
            if !points.is_empty() {
                log::warn!(
                    "control point count {} does not match {}x{} grid, resetting",
                    points.len(),
                    columns,
                    rows
                );
            }
            self.field.set_grid_size(columns, rows);
        }
    }

    /// Control point lookup with point-reflected extrapolation past the grid
    /// edges, so boundary interpolation sees a smooth continuation instead
    /// of curling back:
    /// `point_at(-1, row) = 2 * point_at(0, row) - point_at(1, row)`, and
    /// symmetrically at the high edges and on the row axis.
    pub fn point_at(&self, col: i32, row: i32) -> Vec2 {
        let max_col = self.field.columns() as i32 - 1;
        let max_row = self.field.rows() as i32 - 1;

        if col < 0 {
            return 2.0 * self.point_at(0, row) - self.point_at(-col, row);
        }
        if row < 0 {
            return 2.0 * self.point_at(col, 0) - self.point_at(col, -row);
        }
        if col > max_col {
            return 2.0 * self.point_at(max_col, row) - self.point_at(2 * max_col - col, row);
        }
        if row > max_row {
            return 2.0 * self.point_at(col, max_row) - self.point_at(col, 2 * max_row - row);
        }

        self.field.get(col as usize * self.field.rows() + row as usize)
    }

    /// View-space bounding box of the control points, as (min, max).
    pub fn bounds(&self) -> (Vec2, Vec2) {
        let view = self.field.view_size();
        let mut min = Vec2::MAX;
        let mut max = Vec2::MIN;
        for &p in self.field.points() {
            min = min.min(p);
            max = max.max(p);
        }
        (min * view, max * view)
    }

    /// Change the number of columns while preserving the mesh shape: each
    /// row's points become the knots of a spline (piecewise linear or
    /// Catmull-Rom depending on the interpolation mode) and the new points
    /// are sampled at equal arc-length fractions along it.
    pub fn set_columns(&mut self, n: usize) {
        let n = n.max(2);
        let rows = self.field.rows();
        if n == self.field.columns() {
            return;
        }
        if n * rows > MAX_CONTROL_POINTS {
            log::warn!("resample to {}x{} exceeds capacity, ignored", n, rows);
            return;
        }

        let columns = self.field.columns();
        let mut points = vec![Vec2::ZERO; n * rows];
        for row in 0..rows {
            let curve = self.row_curve(row as i32, columns);
            for col in 0..n {
                let t = col as f32 / (n - 1) as f32;
                points[col * rows + row] = curve.position_at(t);
            }
        }
        self.field.replace_grid(points, n, rows);
    }

    /// Row-axis counterpart of [`set_columns`](Self::set_columns).
    pub fn set_rows(&mut self, n: usize) {
        let n = n.max(2);
        let columns = self.field.columns();
        if n == self.field.rows() {
            return;
        }
        if columns * n > MAX_CONTROL_POINTS {
            log::warn!("resample to {}x{} exceeds capacity, ignored", columns, n);
            return;
        }

        let rows = self.field.rows();
        let mut points = vec![Vec2::ZERO; columns * n];
        for col in 0..columns {
            let curve = self.column_curve(col as i32, rows);
            for row in 0..n {
                let t = row as f32 / (n - 1) as f32;
                points[col * n + row] = curve.position_at(t);
            }
        }
        self.field.replace_grid(points, columns, n);
    }

    fn row_curve(&self, row: i32, columns: usize) -> ArcLengthCurve {
        if self.linear {
            ArcLengthCurve::polyline((0..columns as i32).map(|c| self.point_at(c, row)).collect())
        } else {
            let knots: Vec<Vec2> = (-1..=columns as i32)
                .map(|c| self.point_at(c, row))
                .collect();
            ArcLengthCurve::catmull_rom(&knots)
        }
    }

    fn column_curve(&self, col: i32, rows: usize) -> ArcLengthCurve {
        if self.linear {
            ArcLengthCurve::polyline((0..rows as i32).map(|r| self.point_at(col, r)).collect())
        } else {
            let knots: Vec<Vec2> = (-1..=rows as i32).map(|r| self.point_at(col, r)).collect();
            ArcLengthCurve::catmull_rom(&knots)
        }
    }

    /// The tessellated mesh, rebuilt lazily when control points, view size
    /// or tessellation settings changed since the last call.
    pub fn geometry(&mut self) -> &MeshGeometry {
        self.refresh();
        &self.geometry
    }

    fn refresh(&mut self) {
        if !self.field.is_dirty() && !self.topology_stale {
            return;
        }

        let (rx, ry) = self.tessellation_resolution();
        if self.topology_stale
            || rx != self.geometry.resolution_x()
            || ry != self.geometry.resolution_y()
        {
            self.geometry = MeshGeometry::with_topology(
                rx,
                ry,
                self.field.content_size().as_vec2(),
                self.normalized_tex_coords,
                self.flip_vertical,
            );
            self.topology_stale = false;
        }
        self.update_positions();
        self.field.clear_dirty();
    }

    /// Vertex counts for the tessellation: quad counts derived from the
    /// density setting, then snapped so `(resolution - 1)` divides evenly
    /// into `(controls - 1)` spans, keeping tessellation vertices aligned
    /// with control-grid boundaries.
    fn tessellation_resolution(&self) -> (usize, usize) {
        let (quads_x, quads_y) = if self.adaptive {
            let (min, max) = self.bounds();
            let extent = max - min;
            (
                (extent.x / self.resolution as f32) as i32,
                (extent.y / self.resolution as f32) as i32,
            )
        } else {
            let content = self.field.content_size();
            (
                (content.x / self.resolution) as i32,
                (content.y / self.resolution) as i32,
            )
        };

        let controls_x = self.field.columns() as i32;
        let controls_y = self.field.rows() as i32;

        (
            snap_resolution(quads_x + 1, controls_x),
            snap_resolution(quads_y + 1, controls_y),
        )
    }

    fn update_positions(&mut self) {
        let rx = self.geometry.resolution_x();
        let ry = self.geometry.resolution_y();
        let controls_x = self.field.columns();
        let controls_y = self.field.rows();
        let view = self.field.view_size();

        let mut positions = Vec::with_capacity(rx * ry);
        for x in 0..rx {
            for y in 0..ry {
                // fractional grid coordinates of this vertex
                let u = x as f32 * (controls_x - 1) as f32 / (rx - 1) as f32;
                let v = y as f32 * (controls_y - 1) as f32 / (ry - 1) as f32;
                let col = u.floor() as i32;
                let row = v.floor() as i32;
                let u = u - col as f32;
                let v = v - row as f32;

                let p = if self.linear {
                    let p1 = self.point_at(col, row).lerp(self.point_at(col + 1, row), u);
                    let p2 = self
                        .point_at(col, row + 1)
                        .lerp(self.point_at(col + 1, row + 1), u);
                    p1.lerp(p2, v)
                } else {
                    let mut rows = [Vec2::ZERO; 4];
                    for i in -1..3 {
                        let mut cols = [Vec2::ZERO; 4];
                        for j in -1..3 {
                            cols[(j + 1) as usize] = self.point_at(col + i, row + j);
                        }
                        rows[(i + 1) as usize] = catmull_rom(&cols, v);
                    }
                    catmull_rom(&rows, u)
                };

                positions.push(p * view);
            }
        }
        self.geometry.positions_mut().copy_from_slice(&positions);
    }

    pub fn find_nearest(&self, pos: Vec2) -> Option<(usize, f32)> {
        self.field.find_nearest(pos)
    }

    pub fn pointer_down(&mut self, pos: Vec2, edit: bool) -> bool {
        if !edit || self.field.selected().is_none() {
            return false;
        }
        self.field.begin_drag(pos);
        true
    }

    pub fn pointer_drag(&mut self, pos: Vec2, edit: bool) -> bool {
        if !edit || self.field.selected().is_none() {
            return false;
        }
        self.field.drag_to(pos);
        true
    }

    pub fn key_down(&mut self, key: Key, modifiers: Modifiers, edit: bool) -> bool {
        if !edit || self.field.selected().is_none() {
            return false;
        }

        let step = nudge_step(modifiers);
        match key {
            Key::Up => self.field.nudge(Vec2::new(0.0, -step)),
            Key::Down => self.field.nudge(Vec2::new(0.0, step)),
            Key::Left => self.field.nudge(Vec2::new(-step, 0.0)),
            Key::Right => self.field.nudge(Vec2::new(step, 0.0)),
            Key::Minus => self.brightness = (self.brightness - 0.01).max(0.0),
            Key::Plus => self.brightness = (self.brightness + 0.01).min(1.0),
            Key::R => self.reset(),
            Key::Tab => {
                if modifiers.shift {
                    self.field.select_prev();
                } else {
                    self.field.select_next();
                }
            }
            Key::F1 => {
                let columns = self.field.columns();
                let n = if modifiers.shift {
                    columns.saturating_sub(1)
                } else {
                    (columns + 1) / 2
                };
                self.set_columns(n);
            }
            Key::F2 => {
                let columns = self.field.columns();
                let n = if modifiers.shift { columns + 1 } else { 2 * columns - 1 };
                self.set_columns(n);
            }
            Key::F3 => {
                let rows = self.field.rows();
                let n = if modifiers.shift {
                    rows.saturating_sub(1)
                } else {
                    (rows + 1) / 2
                };
                self.set_rows(n);
            }
            Key::F4 => {
                let rows = self.field.rows();
                let n = if modifiers.shift { rows + 1 } else { 2 * rows - 1 };
                self.set_rows(n);
            }
            Key::M => {
                self.linear = !self.linear;
                self.field.mark_dirty();
            }
            Key::F5 => {
                // coarser mesh
                if self.resolution < 64 {
                    self.resolution += 4;
                    self.field.mark_dirty();
                }
            }
            Key::F6 => {
                // finer mesh
                if self.resolution > 4 {
                    self.resolution -= 4;
                    self.field.mark_dirty();
                }
            }
            Key::F7 => {
                self.adaptive = !self.adaptive;
                self.field.mark_dirty();
            }
            Key::F11 => self.field.flip_horizontal(),
            Key::F12 => self.field.flip_vertical(),
            _ => return false,
        }
        true
    }

    pub fn markers(&self) -> Vec<ControlPointMarker> {
        let selected = self.field.selected();
        let pulse = pulse_scale(self.field.seconds_since_selection());
        (0..self.field.len())
            .map(|i| ControlPointMarker {
                position: self.field.denormalized(i),
                selected: selected == Some(i),
                attached: false,
                scale: if selected == Some(i) { pulse } else { 1.0 },
            })
            .collect()
    }
}

/// Snap a vertex count so `(resolution - 1)` spans divide evenly by
/// `(controls - 1)`, choosing whichever multiple minimizes the remainder. A
/// resolution below the control count collapses onto the control grid.
fn snap_resolution(resolution: i32, controls: i32) -> usize {
    if controls < resolution {
        let mut d = (resolution - 1) % (controls - 1);
        if d >= controls / 2 {
            d -= controls - 1;
        }
        (resolution - d) as usize
    } else {
        controls as usize
    }
}

/// Catmull-Rom cubic through knots `k0..k3`, evaluated at `t ∈ [0,1]`
/// between `k1` and `k2`.
fn catmull_rom(k: &[Vec2; 4], t: f32) -> Vec2 {
    k[1] + 0.5
        * t
        * (k[2] - k[0]
            + t * (2.0 * k[0] - 5.0 * k[1] + 4.0 * k[2] - k[3]
                + t * (3.0 * (k[1] - k[2]) + k[3] - k[0])))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn warp_with_view(columns: usize, rows: usize) -> BilinearWarp {
        let mut warp = BilinearWarp::with_grid(columns, rows);
        warp.resize(Vec2::new(640.0, 480.0));
        warp
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut warp = warp_with_view(4, 3);
        warp.field_mut().set(5, Vec2::new(0.2, 0.9));
        warp.reset();
        let first = warp.field().points().to_vec();
        warp.reset();
        assert_eq!(warp.field().points(), &first[..]);
    }

    #[test]
    fn test_extrapolation_symmetry() {
        let mut warp = warp_with_view(4, 4);
        // distort a few points so the reflection is non-trivial
        warp.field_mut().set(1, Vec2::new(0.1, 0.45));
        warp.field_mut().set(6, Vec2::new(0.3, 0.6));

        for row in 0..4 {
            let reflected = warp.point_at(-1, row) + warp.point_at(1, row);
            let center = 2.0 * warp.point_at(0, row);
            assert!(reflected.distance(center) < 1e-5);

            let reflected = warp.point_at(4, row) + warp.point_at(2, row);
            let center = 2.0 * warp.point_at(3, row);
            assert!(reflected.distance(center) < 1e-5);
        }
        for col in 0..4 {
            let reflected = warp.point_at(col, -1) + warp.point_at(col, 1);
            let center = 2.0 * warp.point_at(col, 0);
            assert!(reflected.distance(center) < 1e-5);
        }
    }

    #[test]
    fn test_extrapolation_beyond_resampled_grid() {
        // 2x2 grid widened to 4 columns, then queried out of range
        let mut warp = warp_with_view(2, 2);
        warp.set_linear(true);
        warp.set_columns(4);
        assert_eq!(warp.field().columns(), 4);

        let expected = 2.0 * warp.point_at(3, 0) - warp.point_at(1, 0);
        assert!(warp.point_at(5, 0).distance(expected) < 1e-5);
    }

    #[test]
    fn test_resample_preserves_end_columns() {
        let mut warp = warp_with_view(3, 2);
        warp.set_linear(true);
        warp.field_mut().set(0, Vec2::new(-0.1, 0.05));
        warp.field_mut().set(5, Vec2::new(1.08, 0.97));
        let first = warp.point_at(0, 0);
        let last = warp.point_at(2, 1);

        warp.set_columns(7);
        warp.set_columns(4);
        assert!(warp.point_at(0, 0).distance(first) < 1e-4);
        assert!(warp.point_at(3, 1).distance(last) < 1e-4);
    }

    #[test]
    fn test_resample_capacity_rejected() {
        let mut warp = warp_with_view(4, 4);
        warp.set_columns(2000);
        assert_eq!(warp.field().columns(), 4);
        warp.set_rows(500);
        assert_eq!(warp.field().rows(), 4);
    }

    #[test]
    fn test_resample_clamps_to_minimum() {
        let mut warp = warp_with_view(4, 4);
        warp.set_columns(0);
        assert_eq!(warp.field().columns(), 2);
    }

    #[test]
    fn test_snap_resolution_aligns_with_controls() {
        // 41 vertices snapped against 5 controls: 40 % 4 == 0, stays
        assert_eq!(snap_resolution(41, 5), 41);
        // 42 vertices: remainder 1, drops to 41
        assert_eq!(snap_resolution(42, 5), 41);
        // 44 vertices: remainder 3 >= 2, rounds up to 45
        assert_eq!(snap_resolution(44, 5), 45);
        // fewer vertices than controls collapses onto the control grid
        assert_eq!(snap_resolution(3, 5), 5);
    }

    #[test]
    fn test_identity_geometry_is_uniform() {
        let mut warp = warp_with_view(2, 2);
        warp.set_linear(true);
        let view = warp.view_size();
        let geometry = warp.geometry();
        let rx = geometry.resolution_x();
        let ry = geometry.resolution_y();
        assert!(rx >= 2 && ry >= 2);

        // undistorted grid tessellates to evenly spaced vertices
        for x in 0..rx {
            for y in 0..ry {
                let expected = Vec2::new(
                    x as f32 / (rx - 1) as f32 * view.x,
                    y as f32 / (ry - 1) as f32 * view.y,
                );
                let actual = geometry.positions()[x * ry + y];
                assert!(actual.distance(expected) < 1e-2);
            }
        }
    }

    #[test]
    fn test_curved_identity_stays_identity() {
        let mut warp = warp_with_view(4, 4);
        let view = warp.view_size();
        let geometry = warp.geometry();
        let rx = geometry.resolution_x();
        let ry = geometry.resolution_y();

        // Catmull-Rom through collinear knots reproduces the plane
        for x in 0..rx {
            for y in 0..ry {
                let expected = Vec2::new(
                    x as f32 / (rx - 1) as f32 * view.x,
                    y as f32 / (ry - 1) as f32 * view.y,
                );
                let actual = geometry.positions()[x * ry + y];
                assert!(actual.distance(expected) < 1e-2);
            }
        }
    }

    #[test]
    fn test_geometry_cached_until_dirty() {
        let mut warp = warp_with_view(2, 2);
        let first = warp.geometry().positions().to_vec();
        // untouched warp returns identical positions
        assert_eq!(warp.geometry().positions(), &first[..]);

        warp.field_mut().set(0, Vec2::new(0.1, 0.1));
        assert_ne!(warp.geometry().positions(), &first[..]);
    }

    #[test]
    fn test_adaptive_density_follows_bounds() {
        let mut warp = warp_with_view(2, 2);
        warp.set_adaptive(true);
        // shrink the mesh to a quarter of the view
        for i in 0..4 {
            let p = warp.field().get(i);
            warp.field_mut().set(i, p * 0.5);
        }
        let full = {
            let mut fixed = warp_with_view(2, 2);
            let geometry = fixed.geometry();
            geometry.resolution_x()
        };
        let adaptive = warp.geometry().resolution_x();
        assert!(adaptive < full);
    }

    #[test]
    fn test_brightness_keys_clamp() {
        let mut warp = warp_with_view(2, 2);
        warp.field_mut().select(0);
        warp.set_brightness(0.005);
        assert!(warp.key_down(Key::Minus, Modifiers::NONE, true));
        assert_eq!(warp.brightness(), 0.0);
        warp.set_brightness(1.0);
        assert!(warp.key_down(Key::Plus, Modifiers::NONE, true));
        assert_eq!(warp.brightness(), 1.0);
    }

    #[test]
    fn test_keys_ignored_outside_edit_mode() {
        let mut warp = warp_with_view(2, 2);
        warp.field_mut().select(0);
        assert!(!warp.key_down(Key::Up, Modifiers::NONE, false));
        assert!(!warp.pointer_down(Vec2::ZERO, false));
    }
}
