//! Warp geometry engine for projection mapping
//!
//! Maintains a set of warps (grid-based mesh warps, 4-corner perspective
//! warps and a composite that nests a mesh inside a perspective frame) and
//! turns their control points into render-ready geometry: tessellated vertex
//! buffers for mesh warps, a projective transform matrix for perspective
//! warps. The host application owns the window, the input loop and the
//! renderer; this crate owns the coordinate math, control-point editing and
//! the `warpconfig` document schema.

pub mod blend;
pub mod config;
pub mod field;
pub mod geometry;
pub mod input;
pub mod matrix;
pub mod spline;
pub mod warp;

// Re-export commonly used types
pub use blend::{BlendEdges, EdgeBlend, Rgb};
pub use config::ConfigError;
pub use field::ControlPointField;
pub use geometry::{MeshGeometry, MeshVertex};
pub use input::{Key, Modifiers};
pub use warp::{
    BilinearWarp, ControlPointMarker, PerspectiveBilinearWarp, PerspectiveWarp, Warp, WarpKind,
    WarpSet,
};
