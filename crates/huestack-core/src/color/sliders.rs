//! Slider position ↔ physical value mappings for raw development controls.
//!
//! Every pair is invertible at the slider's integer resolution:
//! `x_to_slider(slider_to_x(v)) == v` for every valid slider position `v`.
//! Positions or values outside the declared domain are rejected.

use crate::error::{Error, Result};

/// Inclusive integer range of a slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliderRange {
    pub min: i32,
    pub max: i32,
}

impl SliderRange {
    const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    fn check(&self, what: &'static str, v: i32) -> Result<()> {
        Error::check_range(what, v as f64, self.min as f64, self.max as f64)
    }

    /// Rounds a fractional slider position and checks it, reporting the
    /// error against the physical domain `[lo, hi]`.
    fn snap(&self, what: &'static str, position: f64, value: f64, lo: f64, hi: f64) -> Result<i32> {
        let snapped = position.round();
        if !snapped.is_finite() || snapped < self.min as f64 || snapped > self.max as f64 {
            return Err(Error::Range {
                what,
                value,
                min: lo,
                max: hi,
            });
        }
        Ok(snapped as i32)
    }
}

pub const TEMPERATURE: SliderRange = SliderRange::new(0, 130);
pub const TINT: SliderRange = SliderRange::new(0, 150);
pub const EXPOSURE: SliderRange = SliderRange::new(0, 100);
pub const BRIGHTNESS: SliderRange = SliderRange::new(1, 101);
pub const CONTRAST: SliderRange = SliderRange::new(0, 20);
pub const SATURATION: SliderRange = SliderRange::new(0, 100);
pub const HIGHLIGHT: SliderRange = SliderRange::new(0, 9);

/// Temperature in Kelvin: `2000 + v²`.
pub fn slider_to_temperature(v: i32) -> Result<f64> {
    TEMPERATURE.check("temperature slider", v)?;
    Ok(2000.0 + (v * v) as f64)
}

pub fn temperature_to_slider(kelvin: f64) -> Result<i32> {
    let (lo, hi) = (2000.0, 2000.0 + (TEMPERATURE.max * TEMPERATURE.max) as f64);
    if !(kelvin >= lo) {
        return Err(Error::Range {
            what: "temperature",
            value: kelvin,
            min: lo,
            max: hi,
        });
    }
    TEMPERATURE.snap("temperature", (kelvin - 2000.0).sqrt(), kelvin, lo, hi)
}

/// Tint correction factor: `0.1 + 0.0125 v`.
pub fn slider_to_tint(v: i32) -> Result<f64> {
    TINT.check("tint slider", v)?;
    Ok(0.1 + 0.0125 * v as f64)
}

pub fn tint_to_slider(tint: f64) -> Result<i32> {
    TINT.snap("tint", (tint - 0.1) / 0.0125, tint, 0.1, 0.1 + 0.0125 * TINT.max as f64)
}

/// Exposure correction in EV: `v / 20 - 2`.
pub fn slider_to_exposure(v: i32) -> Result<f64> {
    EXPOSURE.check("exposure slider", v)?;
    Ok(v as f64 / 20.0 - 2.0)
}

pub fn exposure_to_slider(ev: f64) -> Result<i32> {
    EXPOSURE.snap("exposure", (ev + 2.0) * 20.0, ev, -2.0, EXPOSURE.max as f64 / 20.0 - 2.0)
}

/// Brightness factor: `(3^(v/50) - 1) / 2`. Slider 50 is the neutral 1.0.
pub fn slider_to_brightness(v: i32) -> Result<f64> {
    BRIGHTNESS.check("brightness slider", v)?;
    Ok((3f64.powf(v as f64 / 50.0) - 1.0) / 2.0)
}

pub fn brightness_to_slider(bright: f64) -> Result<i32> {
    let lo = (3f64.powf(BRIGHTNESS.min as f64 / 50.0) - 1.0) / 2.0;
    let hi = (3f64.powf(BRIGHTNESS.max as f64 / 50.0) - 1.0) / 2.0;
    if !(bright > -0.5) {
        return Err(Error::Range {
            what: "brightness",
            value: bright,
            min: lo,
            max: hi,
        });
    }
    let position = 50.0 * (2.0 * bright + 1.0).ln() / 3f64.ln();
    BRIGHTNESS.snap("brightness", position, bright, lo, hi)
}

/// Contrast correction, identity mapping.
pub fn slider_to_contrast(v: i32) -> Result<f64> {
    CONTRAST.check("contrast slider", v)?;
    Ok(v as f64)
}

pub fn contrast_to_slider(contrast: f64) -> Result<i32> {
    CONTRAST.snap("contrast", contrast, contrast, CONTRAST.min as f64, CONTRAST.max as f64)
}

/// Saturation correction: `v - 50`.
pub fn slider_to_saturation(v: i32) -> Result<f64> {
    SATURATION.check("saturation slider", v)?;
    Ok((v - 50) as f64)
}

pub fn saturation_to_slider(sat: f64) -> Result<i32> {
    SATURATION.snap("saturation", sat + 50.0, sat, -50.0, 50.0)
}

/// Highlight recovery mode, identity mapping.
pub fn slider_to_highlight(v: i32) -> Result<u8> {
    HIGHLIGHT.check("highlight slider", v)?;
    Ok(v as u8)
}

pub fn highlight_to_slider(mode: u8) -> Result<i32> {
    let v = mode as i32;
    HIGHLIGHT.check("highlight", v)?;
    Ok(v)
}

/// Tint slider position as shown to the user (75 is neutral-ish).
pub fn tint_slider_to_user(v: i32) -> i32 {
    v - 75
}

/// Brightness slider position as shown to the user (50 is neutral).
pub fn brightness_slider_to_user(v: i32) -> i32 {
    v - 50
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_roundtrip(
        range: SliderRange,
        forward: impl Fn(i32) -> Result<f64>,
        back: impl Fn(f64) -> Result<i32>,
    ) {
        for v in range.min..=range.max {
            let x = forward(v).expect("slider in range");
            let back = back(x).expect("value in range");
            assert_eq!(back, v, "slider {v} -> {x} -> {back}");
        }
    }

    #[test]
    fn test_every_slider_roundtrips_exactly() {
        assert_roundtrip(TEMPERATURE, slider_to_temperature, temperature_to_slider);
        assert_roundtrip(TINT, slider_to_tint, tint_to_slider);
        assert_roundtrip(EXPOSURE, slider_to_exposure, exposure_to_slider);
        assert_roundtrip(BRIGHTNESS, slider_to_brightness, brightness_to_slider);
        assert_roundtrip(CONTRAST, slider_to_contrast, contrast_to_slider);
        assert_roundtrip(SATURATION, slider_to_saturation, saturation_to_slider);
        for v in HIGHLIGHT.min..=HIGHLIGHT.max {
            let mode = slider_to_highlight(v).expect("in range");
            assert_eq!(highlight_to_slider(mode).expect("in range"), v);
        }
    }

    #[test]
    fn test_known_values() {
        assert_eq!(slider_to_temperature(0).ok(), Some(2000.0));
        assert_eq!(slider_to_temperature(130).ok(), Some(18900.0));
        assert_eq!(slider_to_exposure(40).ok(), Some(0.0));
        assert!((slider_to_brightness(50).expect("in range") - 1.0).abs() < 1e-12);
        assert_eq!(slider_to_saturation(50).ok(), Some(0.0));
        assert_eq!(tint_slider_to_user(75), 0);
    }

    #[test]
    fn test_out_of_range_positions_are_rejected() {
        assert!(matches!(slider_to_temperature(131), Err(Error::Range { .. })));
        assert!(matches!(slider_to_brightness(0), Err(Error::Range { .. })));
        assert!(matches!(slider_to_exposure(-1), Err(Error::Range { .. })));
        assert!(matches!(slider_to_highlight(10), Err(Error::Range { .. })));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(matches!(temperature_to_slider(1500.0), Err(Error::Range { .. })));
        assert!(matches!(temperature_to_slider(30000.0), Err(Error::Range { .. })));
        assert!(matches!(exposure_to_slider(4.0), Err(Error::Range { .. })));
        assert!(matches!(saturation_to_slider(f64::NAN), Err(Error::Range { .. })));
        assert!(matches!(brightness_to_slider(-1.0), Err(Error::Range { .. })));
    }
}
