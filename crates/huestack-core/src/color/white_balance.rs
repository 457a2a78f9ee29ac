//! Chromatic adaptation toward a blackbody white point.
//!
//! Temperature layers in adaptation mode move the D65 reference white onto
//! the Planckian white at the requested temperature with a Bradford cone
//! transform, applied in linear sRGB. Below ~6500 K the image warms, above
//! it cools.
//!
//! # Reference
//! - Lindbloom, Bruce J., Bradford chromatic adaptation

use glam::{DMat3, DVec3};

use super::space::{SRGB_TO_XYZ, XYZ_TO_SRGB};
use super::temperature::{Matrix3, from_dmat3, planckian_xy, to_dmat3, xy_to_xyz};

/// CIE xy of the D65 reference white.
pub const D65_XY: (f64, f64) = (0.3127, 0.3290);

/// Bradford cone response, XYZ → LMS.
const BRADFORD: Matrix3 = [
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
];

/// XYZ → XYZ matrix adapting white `src_xy` to `dst_xy`.
pub fn bradford_adaptation(src_xy: (f64, f64), dst_xy: (f64, f64)) -> Matrix3 {
    let cone = to_dmat3(&BRADFORD);
    let src = cone * DVec3::from_array(xy_to_xyz(src_xy.0, src_xy.1));
    let dst = cone * DVec3::from_array(xy_to_xyz(dst_xy.0, dst_xy.1));
    let gain = DMat3::from_diagonal(dst / src);
    from_dmat3(cone.inverse() * gain * cone)
}

/// Linear sRGB → linear sRGB matrix moving D65 onto the blackbody white at
/// `kelvin`.
pub fn temperature_adaptation_matrix(kelvin: f64) -> Matrix3 {
    let adapt = to_dmat3(&bradford_adaptation(D65_XY, planckian_xy(kelvin)));
    from_dmat3(to_dmat3(&XYZ_TO_SRGB) * adapt * to_dmat3(&SRGB_TO_XYZ))
}

/// Applies a row-major 3x3 matrix to a linear RGB triple.
#[inline]
pub fn apply_matrix(m: &Matrix3, rgb: [f32; 3]) -> [f32; 3] {
    let v = DVec3::new(rgb[0] as f64, rgb[1] as f64, rgb[2] as f64);
    let out = DVec3::new(
        DVec3::from_array(m[0]).dot(v),
        DVec3::from_array(m[1]).dot(v),
        DVec3::from_array(m[2]).dot(v),
    );
    [out.x as f32, out.y as f32, out.z as f32]
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_same_white_is_identity() {
        let m = bradford_adaptation(D65_XY, D65_XY);
        let rgb = [0.5, 0.4, 0.3];
        let out = apply_matrix(&m, rgb);
        for c in 0..3 {
            assert!((out[c] - rgb[c]).abs() < EPSILON, "channel {c}: {out:?}");
        }
    }

    #[test]
    fn test_adaptation_maps_source_white_to_target() {
        let target = planckian_xy(4000.0);
        let m = bradford_adaptation(D65_XY, target);
        let white = xy_to_xyz(D65_XY.0, D65_XY.1);
        let adapted = apply_matrix(&m, white.map(|v| v as f32));
        let expected = xy_to_xyz(target.0, target.1);
        for c in 0..3 {
            assert!((adapted[c] - expected[c] as f32).abs() < 1e-3, "{adapted:?}");
        }
    }

    #[test]
    fn test_low_temperature_warms() {
        let out = apply_matrix(&temperature_adaptation_matrix(3000.0), [0.5, 0.5, 0.5]);
        assert!(out[2] < 0.5, "warming lowers blue: {out:?}");
        assert!(out[0] > out[2]);
    }

    #[test]
    fn test_high_temperature_cools() {
        let out = apply_matrix(&temperature_adaptation_matrix(12000.0), [0.5, 0.5, 0.5]);
        assert!(out[2] > out[0], "cooling favors blue: {out:?}");
    }
}
