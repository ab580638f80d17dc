//! Four-corner perspective (homography) warp

use glam::{DMat4, DVec2, Mat4, UVec2, Vec2};

use crate::field::ControlPointField;
use crate::input::{Key, Modifiers};
use crate::matrix::{apply_projective, lift_to_mat4, solve_projective};
use crate::warp::{nudge_step, pulse_scale, ControlPointMarker};

/// Projective warp mapping the content rectangle onto an arbitrary quad.
///
/// The four control points are the destination corners in the order
/// top-left, top-right, bottom-right, bottom-left. Forward and inverse
/// matrices are cached and recomputed only when a corner, the content size
/// or the view size changed, since the renderer queries the transform every
/// frame.
#[derive(Debug, Clone)]
pub struct PerspectiveWarp {
    field: ControlPointField,
    brightness: f32,
    /// Last solved projective coefficients, carried into the next solve so
    /// a degenerate corner configuration degrades gracefully.
    coeffs: [f64; 8],
    forward: DMat4,
    inverse: DMat4,
}

impl Default for PerspectiveWarp {
    fn default() -> Self {
        Self::new()
    }
}

impl PerspectiveWarp {
    pub fn new() -> Self {
        let mut field = ControlPointField::new(2, 2);
        reset_corners(&mut field);
        Self {
            field,
            brightness: 1.0,
            coeffs: [0.0; 8],
            forward: DMat4::IDENTITY,
            inverse: DMat4::IDENTITY,
        }
    }

    pub fn field(&self) -> &ControlPointField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ControlPointField {
        &mut self.field
    }

    /// Reset the destination corners to the unit square.
    pub fn reset(&mut self) {
        reset_corners(&mut self.field);
    }

    pub fn resize(&mut self, view_size: Vec2) {
        self.field.set_view_size(view_size);
    }

    pub fn content_size(&self) -> UVec2 {
        self.field.content_size()
    }

    pub fn set_content_size(&mut self, size: UVec2) {
        self.field.set_content_size(size);
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

    /// Forward transform for the renderer's matrix stack.
    pub fn transform(&mut self) -> Mat4 {
        self.refresh();
        self.forward.as_mat4()
    }

    /// Inverse transform for the renderer.
    pub fn inverse_transform(&mut self) -> Mat4 {
        self.refresh();
        self.inverse.as_mat4()
    }

    /// Forward transform in f64, for coordinate conversions.
    pub fn transform_d(&mut self) -> DMat4 {
        self.refresh();
        self.forward
    }

    /// Inverse transform in f64, for coordinate conversions.
    pub fn inverse_transform_d(&mut self) -> DMat4 {
        self.refresh();
        self.inverse
    }

    fn refresh(&mut self) {
        if !self.field.is_dirty() {
            return;
        }

        let content = self.field.content_size().as_dvec2();
        let source = [
            DVec2::new(0.0, 0.0),
            DVec2::new(content.x, 0.0),
            DVec2::new(content.x, content.y),
            DVec2::new(0.0, content.y),
        ];

        let view = self.field.view_size().as_dvec2();
        let destination = [
            self.field.get(0).as_dvec2() * view,
            self.field.get(1).as_dvec2() * view,
            self.field.get(2).as_dvec2() * view,
            self.field.get(3).as_dvec2() * view,
        ];

        solve_projective(&source, &destination, &mut self.coeffs);
        self.forward = lift_to_mat4(&self.coeffs);

        // keep the previous inverse when the forward collapses, so callers
        // see a stale transform rather than NaNs
        let det = self.forward.determinant();
        if det.abs() > f64::EPSILON {
            self.inverse = self.forward.inverse();
        } else {
            log::debug!("degenerate perspective frame, inverse not updated");
        }

        self.field.clear_dirty();
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
            Key::F9 => self.rotate_ccw(),
            Key::F10 => self.rotate_cw(),
            Key::F11 => self.flip_horizontal(),
            Key::F12 => self.flip_vertical(),
            _ => return false,
        }
        true
    }

    /// Rotate the content counter-clockwise by cycling the corners.
    pub fn rotate_ccw(&mut self) {
        let p = [
            self.field.get(0),
            self.field.get(1),
            self.field.get(2),
            self.field.get(3),
        ];
        self.field.set(0, p[3]);
        self.field.set(1, p[0]);
        self.field.set(2, p[1]);
        self.field.set(3, p[2]);
        if let Some(selected) = self.field.selected() {
            self.field.deselect();
            self.field.select((selected + 1) % 4);
        }
    }

    /// Rotate the content clockwise by cycling the corners.
    pub fn rotate_cw(&mut self) {
        let p = [
            self.field.get(0),
            self.field.get(1),
            self.field.get(2),
            self.field.get(3),
        ];
        self.field.set(0, p[1]);
        self.field.set(1, p[2]);
        self.field.set(2, p[3]);
        self.field.set(3, p[0]);
        if let Some(selected) = self.field.selected() {
            self.field.deselect();
            self.field.select((selected + 3) % 4);
        }
    }

    /// Flip the content horizontally by swapping left and right corners.
    pub fn flip_horizontal(&mut self) {
        let p = [
            self.field.get(0),
            self.field.get(1),
            self.field.get(2),
            self.field.get(3),
        ];
        self.field.set(0, p[1]);
        self.field.set(1, p[0]);
        self.field.set(2, p[3]);
        self.field.set(3, p[2]);
        if let Some(selected) = self.field.selected() {
            let flipped = [1, 0, 3, 2][selected.min(3)];
            self.field.deselect();
            self.field.select(flipped);
        }
    }

    /// Flip the content vertically by swapping top and bottom corners.
    pub fn flip_vertical(&mut self) {
        let p = [
            self.field.get(0),
            self.field.get(1),
            self.field.get(2),
            self.field.get(3),
        ];
        self.field.set(0, p[3]);
        self.field.set(1, p[2]);
        self.field.set(2, p[1]);
        self.field.set(3, p[0]);
        if let Some(selected) = self.field.selected() {
            let flipped = [3, 2, 1, 0][selected.min(3)];
            self.field.deselect();
            self.field.select(flipped);
        }
    }

    /// Apply the forward transform to a content-space point, with the
    /// projective divide.
    pub fn transform_point(&mut self, p: DVec2) -> DVec2 {
        let m = self.transform_d();
        apply_projective(&m, p)
    }

    /// Apply the inverse transform to a view-space point.
    pub fn untransform_point(&mut self, p: DVec2) -> DVec2 {
        let m = self.inverse_transform_d();
        apply_projective(&m, p)
    }

    pub fn markers(&self) -> Vec<ControlPointMarker> {
        let selected = self.field.selected();
        let pulse = pulse_scale(self.field.seconds_since_selection());
        (0..4)
            .map(|i| ControlPointMarker {
                position: self.field.denormalized(i),
                selected: selected == Some(i),
                attached: false,
                scale: if selected == Some(i) { pulse } else { 1.0 },
            })
            .collect()
    }
}

fn reset_corners(field: &mut ControlPointField) {
    field.replace_grid(
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ],
        2,
        2,
    );
}
