//! Monotone curve evaluation and 1D LUT baking from control points.
//!
//! Uses piecewise cubic Hermite interpolation with Fritsch–Carlson tangent
//! limiting, so a curve through non-decreasing control points never dips
//! between them.
//!
//! # Algorithm
//! For nodes `(x_k, y_k)` with secants `d_k = (y_{k+1} - y_k) / (x_{k+1} - x_k)`:
//! ```text
//! m_0 = d_0, m_{n-1} = d_{n-2}
//! m_k = 0                         if d_{k-1} * d_k <= 0
//! m_k = (d_{k-1} + d_k) / 2       otherwise
//! ```
//! then on every segment with `a = m_k / d_k`, `b = m_{k+1} / d_k` and
//! `a² + b² > 9`, both tangents are scaled by `3 / sqrt(a² + b²)`.
//!
//! # Complexity
//! - Evaluate: O(log N) binary search + O(1) interpolation
//! - Bake to 1D LUT: O(256 log N)
//!
//! # Reference
//! Fritsch, F. N. & Carlson, R. E. (1980). "Monotone Piecewise Cubic
//! Interpolation". SIAM J. Numer. Anal. 17(2).

use super::{LUT_SIZE, Lut1D};
use crate::error::{Error, Result};

/// Monotone cubic spline through a set of sorted nodes.
#[derive(Debug, Clone)]
pub struct MonotoneSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    tangents: Vec<f64>,
}

impl MonotoneSpline {
    /// Builds the spline from nodes sorted by strictly increasing x with
    /// non-decreasing y. Callers normalize control points first.
    fn from_sorted(nodes: &[(f64, f64)]) -> Self {
        let xs: Vec<f64> = nodes.iter().map(|n| n.0).collect();
        let ys: Vec<f64> = nodes.iter().map(|n| n.1).collect();
        let n = xs.len();
        if n < 2 {
            return Self {
                xs,
                ys,
                tangents: vec![0.0; n],
            };
        }

        let secants: Vec<f64> = (0..n - 1)
            .map(|k| (ys[k + 1] - ys[k]) / (xs[k + 1] - xs[k]))
            .collect();

        let mut tangents = vec![0.0; n];
        tangents[0] = secants[0];
        tangents[n - 1] = secants[n - 2];
        for k in 1..n - 1 {
            let (d0, d1) = (secants[k - 1], secants[k]);
            tangents[k] = if d0 * d1 <= 0.0 { 0.0 } else { 0.5 * (d0 + d1) };
        }

        for (k, &d) in secants.iter().enumerate() {
            if d == 0.0 {
                tangents[k] = 0.0;
                tangents[k + 1] = 0.0;
                continue;
            }
            let a = tangents[k] / d;
            let b = tangents[k + 1] / d;
            let r = a * a + b * b;
            if r > 9.0 {
                let tau = 3.0 / r.sqrt();
                tangents[k] = tau * a * d;
                tangents[k + 1] = tau * b * d;
            }
        }

        Self { xs, ys, tangents }
    }

    /// Evaluate the curve at `t`.
    ///
    /// Values outside the node span are clamped to the first/last node's y.
    /// An empty spline is the identity.
    pub fn evaluate(&self, t: f64) -> f64 {
        let n = self.xs.len();
        match n {
            0 => return t,
            1 => return self.ys[0],
            _ => {}
        }
        if t <= self.xs[0] {
            return self.ys[0];
        }
        if t >= self.xs[n - 1] {
            return self.ys[n - 1];
        }

        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] <= t {
                lo = mid;
            } else {
                hi = mid;
            }
        }

        let h = self.xs[hi] - self.xs[lo];
        let s = (t - self.xs[lo]) / h;
        hermite(
            self.ys[lo],
            self.ys[hi],
            self.tangents[lo] * h,
            self.tangents[hi] * h,
            s,
        )
    }
}

/// Cubic Hermite basis evaluated at `s` in `[0, 1]`.
fn hermite(y0: f64, y1: f64, m0: f64, m1: f64, s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    (2.0 * s3 - 3.0 * s2 + 1.0) * y0
        + (s3 - 2.0 * s2 + s) * m0
        + (-2.0 * s3 + 3.0 * s2) * y1
        + (s3 - s2) * m1
}

/// Bake user control points into a monotone 8-bit 1D LUT.
///
/// Control points are `[x, y]` pairs in the `[0, 255]` domain, in any order.
/// - x outside `[0, 255]` (or non-finite) is rejected with a range error
/// - y is clamped to `[0, 255]`
/// - for duplicate x the last point wins
/// - a y below an earlier node's y is lifted to it
///
/// No points yields the identity; a single point a constant curve.
pub fn build_lut_from_control_points(points: &[[f32; 2]]) -> Result<Lut1D> {
    if points.is_empty() {
        return Ok(Lut1D::identity());
    }

    let mut nodes: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for &[x, y] in points {
        let (x, y) = (x as f64, y as f64);
        Error::check_range("control point x", x, 0.0, 255.0)?;
        if y.is_nan() {
            return Err(Error::Range {
                what: "control point y",
                value: y,
                min: 0.0,
                max: 255.0,
            });
        }
        nodes.push((x, y.clamp(0.0, 255.0)));
    }

    // Stable sort keeps input order among equal x, so the last one survives dedup.
    nodes.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut dedup: Vec<(f64, f64)> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match dedup.last_mut() {
            Some(last) if last.0 == node.0 => *last = node,
            _ => dedup.push(node),
        }
    }

    let mut lifted = false;
    let mut floor = f64::NEG_INFINITY;
    for node in dedup.iter_mut() {
        if node.1 < floor {
            node.1 = floor;
            lifted = true;
        }
        floor = node.1;
    }
    if lifted {
        tracing::debug!("Curve control points lifted to keep the curve monotone");
    }

    let spline = MonotoneSpline::from_sorted(&dedup);
    Ok(Lut1D::from_samples(
        (0..LUT_SIZE).map(|i| spline.evaluate(i as f64)),
    ))
}
