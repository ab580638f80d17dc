//! Tessellated mesh buffers handed to the rendering collaborator
//!
//! The topology (texture coordinates and triangle indices) is static for a
//! given tessellation resolution; vertex positions are dynamic and rewritten
//! whenever a control point or the view size changes.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Interleaved vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 2],
    pub tex_coord: [f32; 2],
}

/// Vertex and index buffers for one tessellated warp mesh.
///
/// Vertices are stored column-major (`index = x * resolution_y + y`),
/// matching the control-grid layout, with two counter-clockwise triangles
/// per quad.
#[derive(Debug, Clone, Default)]
pub struct MeshGeometry {
    positions: Vec<Vec2>,
    tex_coords: Vec<Vec2>,
    indices: Vec<u32>,
    resolution_x: usize,
    resolution_y: usize,
}

impl MeshGeometry {
    /// Build the static topology for `resolution_x × resolution_y` vertices.
    ///
    /// Texture coordinates span [0,1] when `normalized`, or `content_size`
    /// pixels otherwise (rectangle textures); `flip_vertical` mirrors the V
    /// axis. Positions are zeroed until the first update.
    pub fn with_topology(
        resolution_x: usize,
        resolution_y: usize,
        content_size: Vec2,
        normalized: bool,
        flip_vertical: bool,
    ) -> Self {
        let vertex_count = resolution_x * resolution_y;
        let quad_count = (resolution_x - 1) * (resolution_y - 1);

        let size = if normalized { Vec2::ONE } else { content_size };

        let mut tex_coords = Vec::with_capacity(vertex_count);
        let mut indices = Vec::with_capacity(quad_count * 6);
        for x in 0..resolution_x {
            for y in 0..resolution_y {
                if x + 1 < resolution_x && y + 1 < resolution_y {
                    let i00 = (x * resolution_y + y) as u32;
                    let i10 = ((x + 1) * resolution_y + y) as u32;
                    let i11 = ((x + 1) * resolution_y + y + 1) as u32;
                    let i01 = (x * resolution_y + y + 1) as u32;
                    indices.extend_from_slice(&[i00, i10, i11, i00, i11, i01]);
                }

                let u = x as f32 / (resolution_x - 1) as f32;
                let v = y as f32 / (resolution_y - 1) as f32;
                let v = if flip_vertical { 1.0 - v } else { v };
                tex_coords.push(Vec2::new(u * size.x, v * size.y));
            }
        }

        Self {
            positions: vec![Vec2::ZERO; vertex_count],
            tex_coords,
            indices,
            resolution_x,
            resolution_y,
        }
    }

    pub fn resolution_x(&self) -> usize {
        self.resolution_x
    }

    pub fn resolution_y(&self) -> usize {
        self.resolution_y
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vec2] {
        &mut self.positions
    }

    pub fn tex_coords(&self) -> &[Vec2] {
        &self.tex_coords
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Interleave positions and texture coordinates for upload.
    pub fn vertices(&self) -> Vec<MeshVertex> {
        self.positions
            .iter()
            .zip(&self.tex_coords)
            .map(|(p, t)| MeshVertex {
                position: [p.x, p.y],
                tex_coord: [t.x, t.y],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_counts() {
        let geo = MeshGeometry::with_topology(4, 3, Vec2::new(640.0, 480.0), true, false);
        assert_eq!(geo.vertex_count(), 12);
        assert_eq!(geo.tex_coords().len(), 12);
        // (4-1)*(3-1) quads, 6 indices each
        assert_eq!(geo.indices().len(), 36);
    }

    #[test]
    fn test_normalized_tex_coords_span_unit_square() {
        let geo = MeshGeometry::with_topology(3, 3, Vec2::new(640.0, 480.0), true, false);
        assert_eq!(geo.tex_coords()[0], Vec2::new(0.0, 0.0));
        // last vertex is (x = 2, y = 2)
        assert_eq!(*geo.tex_coords().last().unwrap(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_pixel_tex_coords_span_content() {
        let geo = MeshGeometry::with_topology(2, 2, Vec2::new(640.0, 480.0), false, false);
        assert_eq!(*geo.tex_coords().last().unwrap(), Vec2::new(640.0, 480.0));
    }

    #[test]
    fn test_flip_vertical_mirrors_v() {
        let geo = MeshGeometry::with_topology(2, 2, Vec2::ONE, true, true);
        // first vertex (x=0, y=0) has v flipped to 1
        assert_eq!(geo.tex_coords()[0], Vec2::new(0.0, 1.0));
        assert_eq!(geo.tex_coords()[1], Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_indices_in_range() {
        let geo = MeshGeometry::with_topology(5, 4, Vec2::ONE, true, false);
        let max = geo.vertex_count() as u32;
        assert!(geo.indices().iter().all(|&i| i < max));
    }
}
