//! Arc-length sampled curves for control-grid resampling
//!
//! When a warp changes its control-point density, the existing points along
//! each row/column become the knots of a parametric curve and the new points
//! are read back at equal arc-length fractions, so the mesh keeps its shape
//! while gaining or losing control resolution.

use glam::Vec2;

/// Flattening density per cubic segment. The cumulative-length table is
/// piecewise linear between these samples.
const SEGMENT_SAMPLES: usize = 32;

/// A curve reduced to a dense polyline with a cumulative arc-length table,
/// supporting position lookup by arc-length fraction.
#[derive(Debug, Clone)]
pub struct ArcLengthCurve {
    samples: Vec<Vec2>,
    cumulative: Vec<f32>,
    total: f32,
}

impl ArcLengthCurve {
    /// Piecewise-linear curve through `points` (at least 2).
    pub fn polyline(points: Vec<Vec2>) -> Self {
        Self::from_samples(points)
    }

    /// Piecewise-cubic curve through `knots[1..knots.len()-1]`, shaped by a
    /// Catmull-Rom fit: each span `p1 → p2` becomes a cubic Bezier with
    /// inner control points `p1 + (p2 - p0)/6` and `p2 - (p3 - p1)/6`.
    ///
    /// `knots` must carry one extra (extrapolated) point at each end, so a
    /// curve through `n` points takes `n + 2` knots.
    pub fn catmull_rom(knots: &[Vec2]) -> Self {
        assert!(knots.len() >= 4, "need at least one cubic span");

        let spans = knots.len() - 3;
        let mut samples = Vec::with_capacity(spans * SEGMENT_SAMPLES + 1);
        samples.push(knots[1]);

        for i in 0..spans {
            let p0 = knots[i];
            let p1 = knots[i + 1];
            let p2 = knots[i + 2];
            let p3 = knots[i + 3];
            let b1 = p1 + (p2 - p0) / 6.0;
            let b2 = p2 - (p3 - p1) / 6.0;

            for s in 1..=SEGMENT_SAMPLES {
                let t = s as f32 / SEGMENT_SAMPLES as f32;
                samples.push(cubic_bezier(p1, b1, b2, p2, t));
            }
        }

        Self::from_samples(samples)
    }

    fn from_samples(samples: Vec<Vec2>) -> Self {
        assert!(samples.len() >= 2, "need at least two samples");

        let mut cumulative = Vec::with_capacity(samples.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in samples.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }

        Self {
            samples,
            cumulative,
            total,
        }
    }

    pub fn total_length(&self) -> f32 {
        self.total
    }

    /// Position at arc-length fraction `t ∈ [0,1]`. The endpoints are exact;
    /// a degenerate zero-length curve returns its first sample.
    pub fn position_at(&self, t: f32) -> Vec2 {
        let t = t.clamp(0.0, 1.0);
        if self.total <= 0.0 {
            return self.samples[0];
        }
        if t >= 1.0 {
            return *self.samples.last().unwrap();
        }

        let target = t * self.total;
        // first sample index whose cumulative length exceeds the target
        let hi = self.cumulative.partition_point(|&len| len <= target);
        let hi = hi.min(self.samples.len() - 1);
        let lo = hi - 1;

        let span = self.cumulative[hi] - self.cumulative[lo];
        if span <= 0.0 {
            return self.samples[lo];
        }
        let f = (target - self.cumulative[lo]) / span;
        self.samples[lo].lerp(self.samples[hi], f)
    }
}

fn cubic_bezier(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_endpoints_exact() {
        let curve = ArcLengthCurve::polyline(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.3, 0.8),
            Vec2::new(1.0, 1.0),
        ]);
        assert_eq!(curve.position_at(0.0), Vec2::new(0.0, 0.0));
        assert_eq!(curve.position_at(1.0), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_polyline_equal_spacing_on_straight_line() {
        let curve = ArcLengthCurve::polyline(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.1, 0.0),
            Vec2::new(1.0, 0.0),
        ]);
        // arc-length fractions ignore the uneven knot spacing
        let mid = curve.position_at(0.5);
        assert!((mid.x - 0.5).abs() < 1e-5);
        assert!(mid.y.abs() < 1e-5);
    }

    #[test]
    fn test_catmull_rom_endpoints_exact() {
        let knots = vec![
            Vec2::new(-1.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.5, 0.4),
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
        ];
        let curve = ArcLengthCurve::catmull_rom(&knots);
        assert!(curve.position_at(0.0).distance(knots[1]) < 1e-6);
        assert!(curve.position_at(1.0).distance(knots[3]) < 1e-6);
    }

    #[test]
    fn test_catmull_rom_straight_knots_stay_straight() {
        let knots: Vec<Vec2> = (-1..4).map(|i| Vec2::new(i as f32, 0.0)).collect();
        let curve = ArcLengthCurve::catmull_rom(&knots);
        for i in 0..=10 {
            let p = curve.position_at(i as f32 / 10.0);
            assert!(p.y.abs() < 1e-5);
        }
    }

    #[test]
    fn test_zero_length_curve() {
        let curve = ArcLengthCurve::polyline(vec![Vec2::new(0.5, 0.5); 3]);
        assert_eq!(curve.position_at(0.7), Vec2::new(0.5, 0.5));
    }
}
