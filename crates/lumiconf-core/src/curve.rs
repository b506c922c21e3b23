//! Quadratic Bézier curves for line junctions.
//!
//! Positions along a curve are arc-length parameterized: `point_at(0.5)` is
//! halfway along the curve by distance, not by Bézier parameter.

use glam::DVec3;

/// Number of divisions used for the arc-length table.
pub const ARC_LENGTH_DIVISIONS: usize = 200;

/// Quadratic Bézier curve in world or local space.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadBezier3 {
    pub start: DVec3,
    pub control: DVec3,
    pub end: DVec3,
    lengths: Vec<f64>,
}

impl QuadBezier3 {
    pub fn new(start: DVec3, control: DVec3, end: DVec3) -> Self {
        let mut curve = Self {
            start,
            control,
            end,
            lengths: Vec::new(),
        };
        curve.lengths = curve.compute_lengths(ARC_LENGTH_DIVISIONS);
        curve
    }

    /// Point at Bézier parameter `t`.
    pub fn point(&self, t: f64) -> DVec3 {
        let mt = 1.0 - t;
        self.start * (mt * mt) + self.control * (2.0 * mt * t) + self.end * (t * t)
    }

    /// Derivative at Bézier parameter `t`.
    pub fn derivative(&self, t: f64) -> DVec3 {
        (self.control - self.start) * (2.0 * (1.0 - t)) + (self.end - self.control) * (2.0 * t)
    }

    /// Total arc length.
    pub fn length(&self) -> f64 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Point at arc-length fraction `u` in `[0, 1]`.
    pub fn point_at(&self, u: f64) -> DVec3 {
        self.point(self.u_to_t(u))
    }

    /// Unit tangent at arc-length fraction `u`. Zero for degenerate curves.
    pub fn tangent_at(&self, u: f64) -> DVec3 {
        self.derivative(self.u_to_t(u)).normalize_or_zero()
    }

    /// `divisions + 1` points equally spaced by arc length.
    pub fn spaced_points(&self, divisions: usize) -> Vec<DVec3> {
        let divisions = divisions.max(1);
        (0..=divisions)
            .map(|d| self.point_at(d as f64 / divisions as f64))
            .collect()
    }

    /// Arc-length fraction of the spaced sample nearest to `target`.
    ///
    /// Samples closer than `margin` to either end are never chosen. Falls back
    /// to the midpoint when every sample is excluded.
    pub fn nearest_spaced_fraction(&self, target: DVec3, divisions: usize, margin: f64) -> f64 {
        let divisions = divisions.max(1);
        let points = self.spaced_points(divisions);
        let mut best: Option<(usize, f64)> = None;
        for (i, point) in points.iter().enumerate() {
            let t = i as f64 / divisions as f64;
            if t < margin || t > 1.0 - margin {
                continue;
            }
            let distance = point.distance_squared(target);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((i, distance));
            }
        }
        best.map(|(i, _)| i as f64 / divisions as f64).unwrap_or(0.5)
    }

    fn compute_lengths(&self, divisions: usize) -> Vec<f64> {
        let mut lengths = Vec::with_capacity(divisions + 1);
        let mut sum = 0.0;
        let mut last = self.point(0.0);
        lengths.push(0.0);
        for p in 1..=divisions {
            let current = self.point(p as f64 / divisions as f64);
            sum += current.distance(last);
            lengths.push(sum);
            last = current;
        }
        lengths
    }

    fn u_to_t(&self, u: f64) -> f64 {
        let u = u.clamp(0.0, 1.0);
        let total = self.length();
        let n = self.lengths.len();
        if total <= f64::EPSILON || n < 2 {
            return u;
        }
        let target = u * total;

        // Last index whose cumulative length does not exceed the target.
        let i = self.lengths.partition_point(|&l| l <= target).saturating_sub(1);
        if i >= n - 1 {
            return 1.0;
        }
        let before = self.lengths[i];
        let after = self.lengths[i + 1];
        let segment = after - before;
        let fraction = if segment > 0.0 { (target - before) / segment } else { 0.0 };
        (i as f64 + fraction) / (n - 1) as f64
    }
}
