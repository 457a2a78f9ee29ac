//! Savitzky–Golay smoothing of 1D signals (histograms).
//!
//! The filter fits a polynomial of degree `order` over a sliding window of
//! `window` samples by least squares and keeps its value at the window
//! center. The edges are padded by point-reflecting the first and last
//! `window / 2` samples around the end values, which keeps the local slope
//! at the ends.
//!
//! # Reference
//! Savitzky, A. & Golay, M. J. E. (1964). "Smoothing and Differentiation of
//! Data by Simplified Least Squares Procedures". Anal. Chem. 36(8).

use glam::DMat4;

use crate::error::{Error, Result};

/// Maximum supported polynomial order (the normal matrix must fit a `DMat4`).
pub const MAX_ORDER: usize = 3;

/// Smooths `signal` with a Savitzky–Golay filter.
///
/// `window` must be odd and at least `order + 2`, and `order <= 3`. The
/// signal must hold more than `window / 2` samples.
pub fn savitzky_golay(signal: &[f64], window: usize, order: usize) -> Result<Vec<f64>> {
    let coeffs = coefficients(window, order)?;
    let half = window / 2;
    let n = signal.len();
    if n <= half {
        return Err(Error::Range {
            what: "signal length",
            value: n as f64,
            min: (half + 1) as f64,
            max: f64::INFINITY,
        });
    }
    if half == 0 {
        return Ok(signal.to_vec());
    }

    let first = signal[0];
    let last = signal[n - 1];
    let mut padded = Vec::with_capacity(n + 2 * half);
    padded.extend(
        signal[1..=half]
            .iter()
            .rev()
            .map(|&v| first - (v - first).abs()),
    );
    padded.extend_from_slice(signal);
    padded.extend(
        signal[n - 1 - half..n - 1]
            .iter()
            .rev()
            .map(|&v| last + (v - last).abs()),
    );

    Ok(padded
        .windows(window)
        .map(|w| w.iter().zip(&coeffs).map(|(v, c)| v * c).sum())
        .collect())
}

/// Convolution weights for smoothing (zeroth derivative).
///
/// With the Vandermonde matrix `B[k][i] = k^i` for `k` in `-h..=h`, the
/// weights are the first row of `(BᵀB)⁻¹ Bᵀ`. Unused rows and columns of the
/// 4x4 normal matrix are filled with the identity so its inverse keeps the
/// fitted block intact.
fn coefficients(window: usize, order: usize) -> Result<Vec<f64>> {
    if order > MAX_ORDER {
        return Err(Error::Range {
            what: "Savitzky-Golay order",
            value: order as f64,
            min: 0.0,
            max: MAX_ORDER as f64,
        });
    }
    if window % 2 == 0 || window < order + 2 {
        return Err(Error::Range {
            what: "Savitzky-Golay window",
            value: window as f64,
            min: (order + 2) as f64,
            max: f64::INFINITY,
        });
    }

    let half = (window / 2) as i64;
    let mut normal = [[0.0f64; 4]; 4];
    for (i, row) in normal.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = if i <= order && j <= order {
                (-half..=half).map(|k| (k as f64).powi((i + j) as i32)).sum()
            } else if i == j {
                1.0
            } else {
                0.0
            };
        }
    }

    // Symmetric, so column/row orientation does not matter.
    let normal = DMat4::from_cols_array_2d(&normal);
    let det = normal.determinant();
    if !det.is_finite() || det.abs() < 1e-12 {
        return Err(Error::SingularMatrix(det));
    }
    let inv = normal.inverse().to_cols_array_2d();

    Ok((-half..=half)
        .map(|k| {
            (0..=order)
                .map(|j| inv[0][j] * (k as f64).powi(j as i32))
                .sum()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_known_coefficients() {
        // Classic 5-point quadratic smoother: (-3, 12, 17, 12, -3) / 35.
        let c = coefficients(5, 2).expect("valid");
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|v| v / 35.0);
        for (a, b) in c.iter().zip(expected) {
            assert!((a - b).abs() < EPSILON, "{a} vs {b}");
        }
    }

    #[test]
    fn test_coefficients_sum_to_one() {
        for (window, order) in [(5, 0), (7, 1), (11, 3), (21, 2)] {
            let sum: f64 = coefficients(window, order).expect("valid").iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "window {window} order {order}");
        }
    }

    #[test]
    fn test_preserves_polynomials() {
        let signal: Vec<f64> = (0..64).map(|i| 0.5 * i as f64 + 3.0).collect();
        let smoothed = savitzky_golay(&signal, 11, 3).expect("valid");
        assert_eq!(smoothed.len(), signal.len());
        for (a, b) in smoothed.iter().zip(&signal) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_reduces_noise() {
        let signal: Vec<f64> = (0..100)
            .map(|i| if i % 2 == 0 { 10.0 } else { 0.0 })
            .collect();
        let smoothed = savitzky_golay(&signal, 11, 2).expect("valid");
        let spread = |s: &[f64]| {
            s[20..80].iter().cloned().fold(f64::MIN, f64::max)
                - s[20..80].iter().cloned().fold(f64::MAX, f64::min)
        };
        assert!(spread(&smoothed) < spread(&signal) / 2.0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(savitzky_golay(&[1.0; 32], 4, 2), Err(Error::Range { .. })));
        assert!(matches!(savitzky_golay(&[1.0; 32], 3, 2), Err(Error::Range { .. })));
        assert!(matches!(savitzky_golay(&[1.0; 32], 11, 4), Err(Error::Range { .. })));
        assert!(matches!(savitzky_golay(&[1.0; 4], 11, 2), Err(Error::Range { .. })));
    }
}
