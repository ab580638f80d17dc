//! Warp variants and multi-warp coordination
//!
//! A [`Warp`] is one of three remapping families: a smooth mesh warp, a
//! four-corner perspective warp, or a composite nesting a mesh inside a
//! perspective frame. Each variant owns its data by value; a [`WarpSet`]
//! holds them in draw order and routes input across them.

mod bilinear;
mod perspective;
mod perspective_bilinear;
mod set;

pub use bilinear::{BilinearWarp, MAX_CONTROL_POINTS};
pub use perspective::PerspectiveWarp;
pub use perspective_bilinear::PerspectiveBilinearWarp;
pub use set::WarpSet;

use glam::{Mat4, UVec2, Vec2};

use crate::geometry::MeshGeometry;
use crate::input::{Key, Modifiers};

/// The remapping family of a warp, matching the `method` attribute in the
/// serialized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarpKind {
    Bilinear,
    Perspective,
    PerspectiveBilinear,
}

impl WarpKind {
    /// The `method` attribute value used in `warpconfig` documents.
    pub fn method(&self) -> &'static str {
        match self {
            WarpKind::Bilinear => "bilinear",
            WarpKind::Perspective => "perspective",
            WarpKind::PerspectiveBilinear => "perspectivebilinear",
        }
    }
}

/// Per-control-point marker record for the host to render.
///
/// The crate produces marker data only; drawing circles, colors and the
/// wireframe is the host's concern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPointMarker {
    /// View-space position in pixels.
    pub position: Vec2,
    pub selected: bool,
    /// Set on composite corner points routed to the nested perspective, so
    /// hosts can tint them differently.
    pub attached: bool,
    /// Pulse scale for the selected marker, 1.0 otherwise.
    pub scale: f32,
}

/// Keyboard nudge step in view-space pixels.
pub(crate) fn nudge_step(modifiers: Modifiers) -> f32 {
    if modifiers.shift {
        10.0
    } else {
        0.5
    }
}

/// Marker pulse around the moment of selection.
pub(crate) fn pulse_scale(seconds_since_selection: f32) -> f32 {
    0.9 + 0.2 * (6.0 * seconds_since_selection).sin()
}

/// A single warp of any family.
#[derive(Debug, Clone)]
pub enum Warp {
    Bilinear(BilinearWarp),
    Perspective(PerspectiveWarp),
    PerspectiveBilinear(PerspectiveBilinearWarp),
}

impl Warp {
    pub fn kind(&self) -> WarpKind {
        match self {
            Warp::Bilinear(_) => WarpKind::Bilinear,
            Warp::Perspective(_) => WarpKind::Perspective,
            Warp::PerspectiveBilinear(_) => WarpKind::PerspectiveBilinear,
        }
    }

    /// Reset control points to the undistorted layout.
    pub fn reset(&mut self) {
        match self {
            Warp::Bilinear(w) => w.reset(),
            Warp::Perspective(w) => w.reset(),
            Warp::PerspectiveBilinear(w) => w.reset(),
        }
    }

    /// Track a new output surface size.
    pub fn resize(&mut self, view_size: Vec2) {
        match self {
            Warp::Bilinear(w) => w.resize(view_size),
            Warp::Perspective(w) => w.resize(view_size),
            Warp::PerspectiveBilinear(w) => w.resize(view_size),
        }
    }

    pub fn content_size(&self) -> UVec2 {
        match self {
            Warp::Bilinear(w) => w.content_size(),
            Warp::Perspective(w) => w.content_size(),
            Warp::PerspectiveBilinear(w) => w.content_size(),
        }
    }

    pub fn set_content_size(&mut self, size: UVec2) {
        match self {
            Warp::Bilinear(w) => w.set_content_size(size),
            Warp::Perspective(w) => w.set_content_size(size),
            Warp::PerspectiveBilinear(w) => w.set_content_size(size),
        }
    }

    pub fn view_size(&self) -> Vec2 {
        match self {
            Warp::Bilinear(w) => w.view_size(),
            Warp::Perspective(w) => w.view_size(),
            Warp::PerspectiveBilinear(w) => w.view_size(),
        }
    }

    pub fn brightness(&self) -> f32 {
        match self {
            Warp::Bilinear(w) => w.brightness(),
            Warp::Perspective(w) => w.brightness(),
            Warp::PerspectiveBilinear(w) => w.brightness(),
        }
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        match self {
            Warp::Bilinear(w) => w.set_brightness(brightness),
            Warp::Perspective(w) => w.set_brightness(brightness),
            Warp::PerspectiveBilinear(w) => w.set_brightness(brightness),
        }
    }

    pub fn control_point_count(&self) -> usize {
        match self {
            Warp::Bilinear(w) => w.field().len(),
            Warp::Perspective(w) => w.field().len(),
            Warp::PerspectiveBilinear(w) => w.control_point_count(),
        }
    }

    /// Control point in the warp's public coordinate space (normalized
    /// view coordinates). Out-of-range indices return zero.
    pub fn control_point(&mut self, index: usize) -> Vec2 {
        match self {
            Warp::Bilinear(w) => w.field().get(index),
            Warp::Perspective(w) => w.field().get(index),
            Warp::PerspectiveBilinear(w) => w.control_point(index),
        }
    }

    /// Set a control point; out-of-range indices are ignored.
    pub fn set_control_point(&mut self, index: usize, pos: Vec2) {
        match self {
            Warp::Bilinear(w) => w.field_mut().set(index, pos),
            Warp::Perspective(w) => w.field_mut().set(index, pos),
            Warp::PerspectiveBilinear(w) => w.set_control_point(index, pos),
        }
    }

    /// Move a control point by a normalized delta; out-of-range is a no-op.
    pub fn move_control_point(&mut self, index: usize, delta: Vec2) {
        match self {
            Warp::Bilinear(w) => w.field_mut().move_by(index, delta),
            Warp::Perspective(w) => w.field_mut().move_by(index, delta),
            Warp::PerspectiveBilinear(w) => w.move_control_point(index, delta),
        }
    }

    pub fn select_control_point(&mut self, index: usize) {
        match self {
            Warp::Bilinear(w) => w.field_mut().select(index),
            Warp::Perspective(w) => w.field_mut().select(index),
            Warp::PerspectiveBilinear(w) => w.select_control_point(index),
        }
    }

    pub fn deselect_control_point(&mut self) {
        match self {
            Warp::Bilinear(w) => w.field_mut().deselect(),
            Warp::Perspective(w) => w.field_mut().deselect(),
            Warp::PerspectiveBilinear(w) => w.deselect_control_point(),
        }
    }

    pub fn selected(&self) -> Option<usize> {
        match self {
            Warp::Bilinear(w) => w.field().selected(),
            Warp::Perspective(w) => w.field().selected(),
            Warp::PerspectiveBilinear(w) => w.selected(),
        }
    }

    /// Nearest control point to a view-space position, with its distance.
    pub fn find_nearest(&mut self, pos: Vec2) -> Option<(usize, f32)> {
        match self {
            Warp::Bilinear(w) => w.find_nearest(pos),
            Warp::Perspective(w) => w.find_nearest(pos),
            Warp::PerspectiveBilinear(w) => w.find_nearest(pos),
        }
    }

    pub fn pointer_down(&mut self, pos: Vec2, edit: bool) -> bool {
        match self {
            Warp::Bilinear(w) => w.pointer_down(pos, edit),
            Warp::Perspective(w) => w.pointer_down(pos, edit),
            Warp::PerspectiveBilinear(w) => w.pointer_down(pos, edit),
        }
    }

    pub fn pointer_drag(&mut self, pos: Vec2, edit: bool) -> bool {
        match self {
            Warp::Bilinear(w) => w.pointer_drag(pos, edit),
            Warp::Perspective(w) => w.pointer_drag(pos, edit),
            Warp::PerspectiveBilinear(w) => w.pointer_drag(pos, edit),
        }
    }

    pub fn key_down(&mut self, key: Key, modifiers: Modifiers, edit: bool) -> bool {
        match self {
            Warp::Bilinear(w) => w.key_down(key, modifiers, edit),
            Warp::Perspective(w) => w.key_down(key, modifiers, edit),
            Warp::PerspectiveBilinear(w) => w.key_down(key, modifiers, edit),
        }
    }

    pub fn key_up(&mut self, _key: Key, _modifiers: Modifiers, _edit: bool) -> bool {
        false
    }

    /// Tessellated output geometry, for the warp families that render a
    /// textured mesh. Perspective warps render a plain quad under their
    /// transform instead.
    pub fn output_geometry(&mut self) -> Option<&MeshGeometry> {
        match self {
            Warp::Bilinear(w) => Some(w.geometry()),
            Warp::Perspective(_) => None,
            Warp::PerspectiveBilinear(w) => Some(w.geometry()),
        }
    }

    /// Transform the host pushes around this warp's content at frame begin
    /// and pops at frame end. Mesh warps bake everything into their vertex
    /// positions and need no transform.
    pub fn transform_matrix(&mut self) -> Option<Mat4> {
        match self {
            Warp::Bilinear(_) => None,
            Warp::Perspective(w) => Some(w.transform()),
            Warp::PerspectiveBilinear(w) => Some(w.transform()),
        }
    }

    /// Marker data for the host's control-point overlay.
    pub fn markers(&mut self) -> Vec<ControlPointMarker> {
        match self {
            Warp::Bilinear(w) => w.markers(),
            Warp::Perspective(w) => w.markers(),
            Warp::PerspectiveBilinear(w) => w.markers(),
        }
    }
}

impl From<BilinearWarp> for Warp {
    fn from(warp: BilinearWarp) -> Self {
        Warp::Bilinear(warp)
    }
}

impl From<PerspectiveWarp> for Warp {
    fn from(warp: PerspectiveWarp) -> Self {
        Warp::Perspective(warp)
    }
}

impl From<PerspectiveBilinearWarp> for Warp {
    fn from(warp: PerspectiveBilinearWarp) -> Self {
        Warp::PerspectiveBilinear(warp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_method_names() {
        assert_eq!(Warp::from(BilinearWarp::new()).kind().method(), "bilinear");
        assert_eq!(
            Warp::from(PerspectiveWarp::new()).kind().method(),
            "perspective"
        );
        assert_eq!(
            Warp::from(PerspectiveBilinearWarp::new()).kind().method(),
            "perspectivebilinear"
        );
    }

    #[test]
    fn test_enum_dispatch_roundtrip() {
        let mut warp = Warp::from(BilinearWarp::new());
        warp.set_control_point(0, Vec2::new(0.25, 0.25));
        assert_eq!(warp.control_point(0), Vec2::new(0.25, 0.25));
        warp.reset();
        assert_eq!(warp.control_point(0), Vec2::ZERO);
    }

    #[test]
    fn test_out_of_range_dispatch_is_noop() {
        let mut warp = Warp::from(PerspectiveWarp::new());
        warp.set_control_point(40, Vec2::ONE);
        assert_eq!(warp.control_point(40), Vec2::ZERO);
    }
}
