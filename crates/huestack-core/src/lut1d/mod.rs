//! 1D lookup tables over the 8-bit intensity range.
//!
//! A [`Lut1D`] is always non-decreasing: every constructor either builds a
//! monotone table or rejects its input, so applying a curve can never
//! invert tone order.

mod apply;
mod auto_contrast;
pub mod smoothing;
mod spline;

pub use apply::{ChannelCurves, ColorModel};
pub use auto_contrast::build_auto_contrast_curve;
pub use smoothing::savitzky_golay;
pub use spline::{MonotoneSpline, build_lut_from_control_points};

use crate::error::{Error, Result};

/// Number of entries in a 1D LUT.
pub const LUT_SIZE: usize = 256;

/// Monotone (non-decreasing) 8-bit tone curve.
#[derive(Clone, PartialEq, Eq)]
pub struct Lut1D {
    table: [u8; LUT_SIZE],
}

impl std::fmt::Debug for Lut1D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let identity = self.is_identity();
        f.debug_struct("Lut1D")
            .field("identity", &identity)
            .field("black", &self.table[0])
            .field("white", &self.table[LUT_SIZE - 1])
            .finish()
    }
}

impl Default for Lut1D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Lut1D {
    pub fn identity() -> Self {
        let mut table = [0u8; LUT_SIZE];
        for (i, v) in table.iter_mut().enumerate() {
            *v = i as u8;
        }
        Self { table }
    }

    /// Wraps an explicit table. Decreasing tables are rejected.
    pub fn from_table(table: &[u8]) -> Result<Self> {
        let table: [u8; LUT_SIZE] = table.try_into().map_err(|_| {
            Error::format(format!("1D LUT needs {LUT_SIZE} entries, got {}", table.len()))
        })?;
        if let Some(i) = table.windows(2).position(|w| w[1] < w[0]) {
            return Err(Error::format(format!(
                "1D LUT decreases at index {}: {} -> {}",
                i + 1,
                table[i],
                table[i + 1]
            )));
        }
        Ok(Self { table })
    }

    /// Builds a table from real-valued samples, rounding, clamping to
    /// `[0, 255]` and lifting any residual dip so the result is monotone.
    pub(crate) fn from_samples(samples: impl Iterator<Item = f64>) -> Self {
        let mut table = [0u8; LUT_SIZE];
        let mut floor = 0u8;
        for (slot, y) in table.iter_mut().zip(samples) {
            let v = if y.is_nan() { 0.0 } else { y.round().clamp(0.0, 255.0) } as u8;
            floor = floor.max(v);
            *slot = floor;
        }
        Self { table }
    }

    #[inline]
    pub fn lookup(&self, v: u8) -> u8 {
        self.table[v as usize]
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.table
    }

    pub fn is_identity(&self) -> bool {
        self.table.iter().enumerate().all(|(i, &v)| v as usize == i)
    }

    pub fn is_monotone(&self) -> bool {
        self.table.windows(2).all(|w| w[0] <= w[1])
    }

    /// Curve applying `self` first, then `next`.
    pub fn then(&self, next: &Lut1D) -> Lut1D {
        let mut table = [0u8; LUT_SIZE];
        for (slot, &v) in table.iter_mut().zip(self.table.iter()) {
            *slot = next.lookup(v);
        }
        Lut1D { table }
    }
}

/// Brightness curve `255 (x / 255)^(1 / bright)`; `bright = 1` is the identity.
pub fn brightness_curve(bright: f64) -> Result<Lut1D> {
    Error::check_range("brightness", bright, 1e-3, 100.0)?;
    let gamma = 1.0 / bright;
    Ok(Lut1D::from_samples(
        (0..LUT_SIZE).map(|i| 255.0 * (i as f64 / 255.0).powf(gamma)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_lookup() {
        let lut = Lut1D::identity();
        assert!(lut.is_identity());
        assert_eq!(lut.lookup(0), 0);
        assert_eq!(lut.lookup(200), 200);
    }

    #[test]
    fn test_from_table_rejects_decreasing() {
        let mut table: Vec<u8> = (0..=255).collect();
        table[100] = 5;
        assert!(matches!(Lut1D::from_table(&table), Err(Error::Format(_))));
        assert!(matches!(Lut1D::from_table(&[0, 1, 2]), Err(Error::Format(_))));
    }

    #[test]
    fn test_composition_order() {
        let lift = Lut1D::from_samples((0..LUT_SIZE).map(|i| (i as f64 + 10.0).min(255.0)));
        let crush = Lut1D::from_samples((0..LUT_SIZE).map(|i| i as f64 / 2.0));
        let a = lift.then(&crush);
        let b = crush.then(&lift);
        assert_eq!(a.lookup(0), 5);
        assert_eq!(b.lookup(0), 10);
        assert!(a.is_monotone() && b.is_monotone());
    }

    #[test]
    fn test_brightness_curve() {
        assert!(brightness_curve(1.0).expect("valid").is_identity());
        let bright = brightness_curve(2.0).expect("valid");
        assert!(bright.is_monotone());
        assert!(bright.lookup(64) > 64);
        assert_eq!(bright.lookup(255), 255);
        assert!(matches!(brightness_curve(0.0), Err(Error::Range { .. })));
    }
}
