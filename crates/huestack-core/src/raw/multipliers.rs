//! Raw white-balance multipliers.
//!
//! Multipliers are kept relative: after every update the smallest of the
//! three primary gains is exactly 1.0. The fourth entry is the second green
//! of the Bayer pattern and always follows the first.

use crate::color::{Matrix3, temperature_and_tint_to_rgb_multipliers};
use crate::error::{Error, Result};

/// Camera data supplied by the raw decoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMetadata {
    /// As-shot white balance gains (R, G, B, G2).
    pub camera_multipliers: [f64; 4],
    /// Daylight reference gains (R, G, B, G2).
    pub daylight_multipliers: [f64; 4],
    /// XYZ → camera RGB matrix (first three rows of the sensor matrix).
    pub xyz_to_camera: Matrix3,
}

impl RawMetadata {
    /// As-shot gains with a missing second green filled in and the
    /// minimum primary gain normalized to 1.
    pub fn normalized_camera_multipliers(&self) -> Result<[f64; 4]> {
        let mut m = self.camera_multipliers;
        if m[3] == 0.0 {
            m[3] = m[1];
        }
        check_positive("camera multiplier", &m[..3])?;
        normalize(m)
    }

    /// Camera white point in camera RGB, up to the tint applied to green:
    /// the daylight gains divided by the as-shot gains.
    pub fn camera_white(&self) -> Result<[f64; 3]> {
        check_positive("camera multiplier", &self.camera_multipliers[..3])?;
        check_positive("daylight multiplier", &self.daylight_multipliers[..3])?;
        Ok(std::array::from_fn(|i| {
            self.daylight_multipliers[i] / self.camera_multipliers[i]
        }))
    }
}

/// Computes raw multipliers for a temperature/tint correction.
///
/// The steps run in a fixed order: white point at tint 1.0, green scaled by
/// `base_tint * tint_correction`, inversion against the daylight reference,
/// and renormalization so the smallest primary gain is 1.
pub fn derive_multipliers(
    temperature: f64,
    tint_correction: f64,
    base_tint: f64,
    inverse_sensor: &Matrix3,
    daylight: &[f64; 4],
) -> Result<[f64; 4]> {
    check_positive("daylight multiplier", &daylight[..3])?;
    let white = temperature_and_tint_to_rgb_multipliers(temperature, 1.0, inverse_sensor)?;
    let white = [white[0], white[1] * (base_tint * tint_correction), white[2]];
    if white.iter().any(|&c| !(c.is_finite() && c > 0.0)) {
        return Err(Error::conversion(format!(
            "white point {white:?} at {temperature} K is not positive in camera RGB"
        )));
    }
    let raw = [
        daylight[0] / white[0],
        daylight[1] / white[1],
        daylight[2] / white[2],
        daylight[1] / white[1],
    ];
    normalize(raw)
}

/// Divides all four gains by the smallest of the first three.
pub(crate) fn normalize(m: [f64; 4]) -> Result<[f64; 4]> {
    let min = m[0].min(m[1]).min(m[2]);
    if !(min.is_finite() && min > 0.0) {
        return Err(Error::conversion(format!("cannot normalize multipliers {m:?}")));
    }
    Ok(m.map(|v| v / min))
}

pub(crate) fn check_positive(what: &'static str, values: &[f64]) -> Result<()> {
    for &v in values {
        Error::check_range(what, v, f64::MIN_POSITIVE, f64::MAX)?;
    }
    Ok(())
}
