//! Temperature and tint ↔ camera RGB multipliers.
//!
//! The white point of a blackbody at temperature `T` is taken from the
//! Planckian locus, converted to XYZ (Y = 1) and projected into camera RGB
//! through the camera's XYZ → camera matrix. The resulting triple is the
//! white point expressed in camera coordinates; raw white-balance multipliers
//! are the daylight reference divided by it. Tint scales the green
//! coordinate only.
//!
//! # Reference
//! - Krystek, M. (1985), rational Chebyshev approximation of the Planckian
//!   locus in CIE 1960 UCS.

use glam::{DMat3, DVec3};

use crate::error::{Error, Result};

/// Row-major 3x3 matrix.
pub type Matrix3 = [[f64; 3]; 3];

/// Mired bounds searched when recovering a temperature (100000 K .. 1500 K).
const MIRED_MIN: f64 = 10.0;
const MIRED_MAX: f64 = 1.0e6 / 1500.0;
const BISECTION_STEPS: usize = 200;

/// Planckian locus in CIE 1960 uv (Krystek 1985).
pub fn planckian_uv(kelvin: f64) -> (f64, f64) {
    let t = kelvin;
    let t2 = t * t;
    let u = (0.860117757 + 1.54118254e-4 * t + 1.28641212e-7 * t2)
        / (1.0 + 8.42420235e-4 * t + 7.08145163e-7 * t2);
    let v = (0.317398726 + 4.22806245e-5 * t + 4.20481691e-8 * t2)
        / (1.0 - 2.89741816e-5 * t + 1.61456053e-7 * t2);
    (u, v)
}

/// Planckian locus chromaticity in CIE 1931 xy.
pub fn planckian_xy(kelvin: f64) -> (f64, f64) {
    let (u, v) = planckian_uv(kelvin);
    let d = 2.0 * u - 8.0 * v + 4.0;
    (3.0 * u / d, 2.0 * v / d)
}

/// XYZ of a chromaticity at luminance Y = 1.
#[inline]
pub fn xy_to_xyz(x: f64, y: f64) -> [f64; 3] {
    [x / y, 1.0, (1.0 - x - y) / y]
}

pub(crate) fn to_dmat3(m: &Matrix3) -> DMat3 {
    DMat3::from_cols_array_2d(m).transpose()
}

pub(crate) fn from_dmat3(m: DMat3) -> Matrix3 {
    m.transpose().to_cols_array_2d()
}

/// Inverts a row-major 3x3 matrix.
///
/// A (numerically) singular matrix is reported, never patched up.
pub fn invert_matrix(m: &Matrix3) -> Result<Matrix3> {
    let d = to_dmat3(m);
    let det = d.determinant();
    if !det.is_finite() || det.abs() < 1e-12 {
        return Err(Error::SingularMatrix(det));
    }
    Ok(from_dmat3(d.inverse()))
}

fn camera_white(kelvin: f64, xyz_to_camera: &DMat3) -> DVec3 {
    let (x, y) = planckian_xy(kelvin);
    *xyz_to_camera * DVec3::from_array(xy_to_xyz(x, y))
}

fn check_kelvin(kelvin: f64) -> Result<()> {
    Error::check_range("temperature", kelvin, f64::MIN_POSITIVE, f64::MAX)
}

/// Converts a temperature/tint pair into camera white point coordinates.
///
/// `inverse_sensor` maps camera RGB to XYZ (the inverse of the sensor's
/// XYZ → camera matrix). The green coordinate is multiplied by `tint`.
/// The temperature is not clamped; callers validate it against the slider
/// range.
pub fn temperature_and_tint_to_rgb_multipliers(
    kelvin: f64,
    tint: f64,
    inverse_sensor: &Matrix3,
) -> Result<[f64; 3]> {
    check_kelvin(kelvin)?;
    let xyz_to_camera = to_dmat3(&invert_matrix(inverse_sensor)?);
    let w = camera_white(kelvin, &xyz_to_camera);
    Ok([w.x, w.y * tint, w.z])
}

/// Inverse of [`temperature_and_tint_to_rgb_multipliers`].
///
/// The temperature is found by bisection on the mired scale so that the
/// blue/red ratio of the locus white matches `b / r`; the tint is the ratio
/// between the given and the locus green/red ratios. The triple may be
/// scaled arbitrarily.
pub fn rgb_multipliers_to_temperature_and_tint(
    r: f64,
    g: f64,
    b: f64,
    inverse_sensor: &Matrix3,
) -> Result<(f64, f64)> {
    Error::check_range("red multiplier", r, f64::MIN_POSITIVE, f64::MAX)?;
    Error::check_range("green multiplier", g, f64::MIN_POSITIVE, f64::MAX)?;
    Error::check_range("blue multiplier", b, f64::MIN_POSITIVE, f64::MAX)?;

    let xyz_to_camera = to_dmat3(&invert_matrix(inverse_sensor)?);
    let target = b / r;
    let ratio = |mired: f64| {
        let w = camera_white(1.0e6 / mired, &xyz_to_camera);
        w.z / w.x
    };

    let (mut lo, mut hi) = (MIRED_MIN, MIRED_MAX);
    let (r_lo, r_hi) = (ratio(lo), ratio(hi));
    if (r_lo - target).signum() == (r_hi - target).signum() {
        return Err(Error::Range {
            what: "blue/red multiplier ratio",
            value: target,
            min: r_lo.min(r_hi),
            max: r_lo.max(r_hi),
        });
    }
    let ascending = r_hi > r_lo;

    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if (ratio(mid) < target) == ascending {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo < 1e-13 {
            break;
        }
    }

    let kelvin = 1.0e6 / (0.5 * (lo + hi));
    let w = camera_white(kelvin, &xyz_to_camera);
    let tint = (g / r) / (w.y / w.x);
    Ok((kelvin, tint))
}
