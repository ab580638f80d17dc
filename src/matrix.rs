//! Projective transform estimation
//!
//! Solves the 4-point-to-4-point planar homography as an 8×8 linear system
//! and lifts the 3×3 result into a 4×4 transform the renderer can push onto
//! its matrix stack. All math runs in f64; callers convert to f32 at the
//! GPU boundary.

use glam::{DMat4, DVec2, DVec4};

/// Near-zero guard for the projective divide.
const W_EPSILON: f64 = 1.0e-10;

/// Solve for the 8 projective coefficients mapping `src[i]` onto `dst[i]`.
///
/// The system rows come in pairs per correspondence:
///
/// ```text
/// [x  y  1  0  0  0  -x·x' -y·x' | x']
/// [0  0  0  x  y  1  -x·y' -y·y' | y']
/// ```
///
/// Gaussian elimination with partial pivoting; a column whose remaining
/// entries are all zero (three collinear corners, coincident points) is
/// skipped, and back-substitution then leaves that coefficient at whatever
/// value `coeffs` carried in. Passing the previous solution keeps the
/// transform stable instead of failing while an operator drags a corner
/// through a degenerate configuration.
pub fn solve_projective(src: &[DVec2; 4], dst: &[DVec2; 4], coeffs: &mut [f64; 8]) {
    let mut a = [[0.0f64; 9]; 8];
    for i in 0..4 {
        let (sx, sy) = (src[i].x, src[i].y);
        let (dx, dy) = (dst[i].x, dst[i].y);
        a[i] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -sx * dx, -sy * dx, dx];
        a[i + 4] = [0.0, 0.0, 0.0, sx, sy, 1.0, -sx * dy, -sy * dy, dy];
    }

    // forward elimination; pivot_col[r] records which column row r solves
    let mut pivot_col = [usize::MAX; 8];
    let mut row = 0;
    for col in 0..8 {
        if row >= 8 {
            break;
        }
        let mut max_row = row;
        for r in row + 1..8 {
            if a[r][col].abs() > a[max_row][col].abs() {
                max_row = r;
            }
        }
        if a[max_row][col] == 0.0 {
            continue;
        }
        a.swap(row, max_row);

        let pivot = a[row][col];
        for c in col..9 {
            a[row][c] /= pivot;
        }
        for r in row + 1..8 {
            let factor = a[r][col];
            if factor != 0.0 {
                for c in col..9 {
                    a[r][c] -= factor * a[row][c];
                }
            }
        }
        pivot_col[row] = col;
        row += 1;
    }

    // back substitution, highest pivot column first; skipped columns keep
    // their incoming value
    for r in (0..row).rev() {
        let col = pivot_col[r];
        let mut value = a[r][8];
        for c in col + 1..8 {
            value -= a[r][c] * coeffs[c];
        }
        coeffs[col] = value;
    }
}

/// Embed the 8 projective coefficients into a 4×4 matrix whose third row and
/// column are identity, so the 2D transform passes through a 3D pipeline
/// without touching z.
pub fn lift_to_mat4(c: &[f64; 8]) -> DMat4 {
    DMat4::from_cols(
        DVec4::new(c[0], c[3], 0.0, c[6]),
        DVec4::new(c[1], c[4], 0.0, c[7]),
        DVec4::new(0.0, 0.0, 1.0, 0.0),
        DVec4::new(c[2], c[5], 0.0, 1.0),
    )
}

/// Apply a lifted projective matrix to a 2D point, including the projective
/// divide. A vanishing w returns zero rather than an infinity.
pub fn apply_projective(m: &DMat4, p: DVec2) -> DVec2 {
    let v = *m * DVec4::new(p.x, p.y, 0.0, 1.0);
    if v.w.abs() < W_EPSILON {
        return DVec2::ZERO;
    }
    DVec2::new(v.x / v.w, v.y / v.w)
}
