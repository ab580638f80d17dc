//! Mesh warp nested inside a perspective-corrected frame
//!
//! The mesh's four extremal grid points act as aliases for the perspective
//! warp's corners; every other point belongs to the mesh but is presented
//! to the operator in the perspective-corrected output space.

use glam::{Mat4, UVec2, Vec2};

use crate::blend::EdgeBlend;
use crate::geometry::MeshGeometry;
use crate::input::{Key, Modifiers};
use crate::matrix::apply_projective;
use crate::warp::{pulse_scale, BilinearWarp, ControlPointMarker, PerspectiveWarp};

/// Composite warp: a [`BilinearWarp`] drawn inside a [`PerspectiveWarp`]'s
/// coordinate frame.
///
/// The perspective warp treats the mesh's rendered output as its source
/// rectangle, so its content size tracks the *view* size, not the original
/// content size. Interior mesh points are stored in the pre-perspective
/// rectangle but exposed in final screen space, which keeps dragging
/// intuitive under any frame distortion.
#[derive(Debug, Clone)]
pub struct PerspectiveBilinearWarp {
    mesh: BilinearWarp,
    perspective: PerspectiveWarp,
    blend: EdgeBlend,
    /// Pointer offset for interior-point drags, kept in view space.
    drag_offset: Vec2,
}

impl Default for PerspectiveBilinearWarp {
    fn default() -> Self {
        Self::new()
    }
}

impl PerspectiveBilinearWarp {
    pub fn new() -> Self {
        let mesh = BilinearWarp::new();
        let mut perspective = PerspectiveWarp::new();
        // the nested frame's source rectangle is the mesh's rendered output
        perspective.set_content_size(mesh.view_size().as_uvec2());
        Self {
            mesh,
            perspective,
            blend: EdgeBlend::default(),
            drag_offset: Vec2::ZERO,
        }
    }

    pub fn mesh(&self) -> &BilinearWarp {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut BilinearWarp {
        &mut self.mesh
    }

    pub fn perspective(&self) -> &PerspectiveWarp {
        &self.perspective
    }

    pub fn perspective_mut(&mut self) -> &mut PerspectiveWarp {
        &mut self.perspective
    }

    pub fn blend(&self) -> &EdgeBlend {
        &self.blend
    }

    pub fn blend_mut(&mut self) -> &mut EdgeBlend {
        &mut self.blend
    }

    pub fn set_blend(&mut self, blend: EdgeBlend) {
        self.blend = blend;
    }

    /// Reset both the inner grid and the outer frame.
    pub fn reset(&mut self) {
        self.mesh.reset();
        self.perspective.reset();
    }

    /// The perspective frame's content size must track the view size before
    /// the mesh sees the new view, or the inner/outer conversions drift.
    pub fn resize(&mut self, view_size: Vec2) {
        self.perspective.set_content_size(view_size.as_uvec2());
        self.perspective.resize(view_size);
        self.mesh.resize(view_size);
    }

    pub fn content_size(&self) -> UVec2 {
        self.mesh.content_size()
    }

    pub fn set_content_size(&mut self, size: UVec2) {
        self.perspective
            .set_content_size(self.mesh.view_size().as_uvec2());
        self.mesh.set_content_size(size);
    }

    pub fn view_size(&self) -> Vec2 {
        self.mesh.view_size()
    }

    pub fn brightness(&self) -> f32 {
        self.mesh.brightness()
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        self.mesh.set_brightness(brightness);
    }

    pub fn control_point_count(&self) -> usize {
        self.mesh.field().len()
    }

    pub fn selected(&self) -> Option<usize> {
        self.mesh.field().selected()
    }

    /// Whether a mesh-grid index addresses one of the four extremal corner
    /// positions, which route to the perspective warp.
    pub fn is_corner(&self, index: usize) -> bool {
        let columns = self.mesh.field().columns();
        let rows = self.mesh.field().rows();
        let count = columns * rows;
        index == 0 || index == count - rows || index == count - 1 || index == rows - 1
    }

    /// Map a corner mesh index onto the perspective warp's point order
    /// (top-left, top-right, bottom-right, bottom-left). Non-corner indices
    /// pass through unchanged.
    pub fn convert_corner_index(&self, index: usize) -> usize {
        let rows = self.mesh.field().rows();
        let count = self.mesh.field().columns() * rows;
        if index == 0 {
            0
        } else if index == count - rows {
            1
        } else if index == count - 1 {
            2
        } else if index == rows - 1 {
            3
        } else {
            index
        }
    }

    /// Control point in the outer (perspective-corrected) space.
    pub fn control_point(&mut self, index: usize) -> Vec2 {
        if self.is_corner(index) {
            let corner = self.convert_corner_index(index);
            self.perspective.field().get(corner)
        } else {
            let frame = self.perspective.content_size().as_vec2();
            let view = self.view_size();
            let inner = self.mesh.field().get(index) * frame;
            let outer = apply_projective(&self.perspective.transform_d(), inner.as_dvec2());
            outer.as_vec2() / view
        }
    }

    /// Set a control point given in the outer space; interior points are
    /// converted back into the mesh's pre-perspective rectangle.
    pub fn set_control_point(&mut self, index: usize, pos: Vec2) {
        if self.is_corner(index) {
            let corner = self.convert_corner_index(index);
            self.perspective.field_mut().set(corner, pos);
        } else {
            let frame = self.perspective.content_size().as_vec2();
            let view = self.view_size();
            let outer = pos * view;
            let inner = apply_projective(&self.perspective.inverse_transform_d(), outer.as_dvec2());
            self.mesh.field_mut().set(index, inner.as_vec2() / frame);
        }
    }

    pub fn move_control_point(&mut self, index: usize, delta: Vec2) {
        if self.is_corner(index) {
            let corner = self.convert_corner_index(index);
            self.perspective.field_mut().move_by(corner, delta);
        } else {
            let current = self.control_point(index);
            self.set_control_point(index, current + delta);
        }
    }

    /// Select a point; corners also select the matching perspective corner,
    /// interior points clear the perspective selection. The mesh selection
    /// always tracks the editing focus.
    pub fn select_control_point(&mut self, index: usize) {
        if self.is_corner(index) {
            let corner = self.convert_corner_index(index);
            self.perspective.field_mut().select(corner);
        } else {
            self.perspective.field_mut().deselect();
        }
        self.mesh.field_mut().select(index);
    }

    pub fn deselect_control_point(&mut self) {
        self.perspective.field_mut().deselect();
        self.mesh.field_mut().deselect();
    }

    /// Nearest control point measured in the outer space.
    pub fn find_nearest(&mut self, pos: Vec2) -> Option<(usize, f32)> {
        let view = self.view_size();
        let mut nearest = None;
        let mut best = f32::MAX;
        for i in 0..self.control_point_count() {
            let d = pos.distance(self.control_point(i) * view);
            if d < best {
                best = d;
                nearest = Some((i, d));
            }
        }
        nearest
    }

    pub fn geometry(&mut self) -> &MeshGeometry {
        self.mesh.geometry()
    }

    /// The outer frame's transform, applied by the renderer around the mesh.
    pub fn transform(&mut self) -> Mat4 {
        self.perspective.transform()
    }

    pub fn inverse_transform(&mut self) -> Mat4 {
        self.perspective.inverse_transform()
    }

    pub fn pointer_down(&mut self, pos: Vec2, edit: bool) -> bool {
        if !edit {
            return false;
        }
        let Some(selected) = self.selected() else {
            return false;
        };
        if self.is_corner(selected) {
            self.perspective.pointer_down(pos, edit)
        } else {
            let point = self.control_point(selected) * self.view_size();
            self.drag_offset = pos - point;
            true
        }
    }

    pub fn pointer_drag(&mut self, pos: Vec2, edit: bool) -> bool {
        if !edit {
            return false;
        }
        let Some(selected) = self.selected() else {
            return false;
        };
        if self.is_corner(selected) {
            self.perspective.pointer_drag(pos, edit)
        } else {
            let target = (pos - self.drag_offset) / self.view_size();
            self.set_control_point(selected, target);
            true
        }
    }

    pub fn key_down(&mut self, key: Key, modifiers: Modifiers, edit: bool) -> bool {
        if !edit || self.selected().is_none() {
            return false;
        }

        match key {
            Key::Up | Key::Down | Key::Left | Key::Right => {
                // cursor keys must be handled by exactly one sub-warp
                if self.perspective.key_down(key, modifiers, edit) {
                    true
                } else {
                    self.mesh.key_down(key, modifiers, edit)
                }
            }
            // only the perspective warp rotates content
            Key::F9 | Key::F10 => self.perspective.key_down(key, modifiers, edit),
            // only the mesh warp flips control points
            Key::F11 | Key::F12 => self.mesh.key_down(key, modifiers, edit),
            _ => {
                let handled = self.perspective.key_down(key, modifiers, edit);
                self.mesh.key_down(key, modifiers, edit) || handled
            }
        }
    }

    pub fn markers(&mut self) -> Vec<ControlPointMarker> {
        let selected = self.selected();
        let pulse = pulse_scale(self.mesh.field().seconds_since_selection());
        let view = self.view_size();
        (0..self.control_point_count())
            .map(|i| ControlPointMarker {
                position: self.control_point(i) * view,
                selected: selected == Some(i),
                attached: self.is_corner(i),
                scale: if selected == Some(i) { pulse } else { 1.0 },
            })
            .collect()
    }
}
