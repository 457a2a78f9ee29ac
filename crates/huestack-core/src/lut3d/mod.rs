//! 3D LUT lattice, trilinear lookup, and conversions to Hald images and
//! `.cube` files.

mod cube;
mod hald;

use crate::error::{Error, Result};
use crate::image::PixelBuffer;

/// Smallest supported lattice size.
pub const MIN_SIZE: usize = 2;
/// Largest supported lattice size.
pub const MAX_SIZE: usize = 256;
/// Largest lattice encoded as a square Hald image (a 4096x4096 image).
pub const MAX_HALD_SIZE: usize = 64;

/// A 3D lookup table for fast color transform application.
///
/// The lattice has `size³` RGB nodes with values in `[0, 1]`, stored R
/// fastest: node `(r, g, b)` lives at `r + g·size + b·size²`. The same
/// order is used by `.cube` files and Hald images.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3D {
    size: usize,
    data: Vec<[f32; 3]>,
}

/// Coordinate of lattice node `i` on one axis, quantized to 8 bits.
///
/// Using the 8-bit value makes the identity lattice exactly representable
/// in a Hald image.
#[inline]
pub fn node_value(i: usize, size: usize) -> f32 {
    node_level(i, size) as f32 / 255.0
}

#[inline]
pub(crate) fn node_level(i: usize, size: usize) -> u8 {
    (i as f64 * 255.0 / (size - 1) as f64).round() as u8
}

fn check_size(size: usize) -> Result<()> {
    Error::check_range("3D LUT size", size as f64, MIN_SIZE as f64, MAX_SIZE as f64)
}

impl Lut3D {
    /// Identity lattice of `size³` nodes.
    pub fn identity(size: usize) -> Result<Self> {
        check_size(size)?;
        let mut data = Vec::with_capacity(size * size * size);
        for b in 0..size {
            for g in 0..size {
                for r in 0..size {
                    data.push([
                        node_value(r, size),
                        node_value(g, size),
                        node_value(b, size),
                    ]);
                }
            }
        }
        Ok(Self { size, data })
    }

    /// Wraps R-fastest node data. Values must be finite and in `[0, 1]`.
    pub fn from_data(size: usize, data: Vec<[f32; 3]>) -> Result<Self> {
        check_size(size)?;
        let expected = size * size * size;
        if data.len() != expected {
            return Err(Error::format(format!(
                "3D LUT of size {size} needs {expected} nodes, got {}",
                data.len()
            )));
        }
        if let Some(i) = data
            .iter()
            .position(|v| v.iter().any(|c| !(0.0..=1.0).contains(c)))
        {
            return Err(Error::format(format!(
                "3D LUT node {i} out of [0, 1]: {:?}",
                data[i]
            )));
        }
        Ok(Self { size, data })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn data(&self) -> &[[f32; 3]] {
        &self.data
    }

    #[inline]
    fn index(&self, r: usize, g: usize, b: usize) -> usize {
        r + g * self.size + b * self.size * self.size
    }

    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[self.index(r, g, b)]
    }

    /// Overwrites one node. The value is clamped to `[0, 1]`.
    pub fn set(&mut self, r: usize, g: usize, b: usize, value: [f32; 3]) -> Result<()> {
        let max = (self.size - 1) as f64;
        for (what, v) in [("node r", r), ("node g", g), ("node b", b)] {
            Error::check_range(what, v as f64, 0.0, max)?;
        }
        if value.iter().any(|c| c.is_nan()) {
            return Err(Error::format(format!("NaN node value {value:?}")));
        }
        let idx = self.index(r, g, b);
        self.data[idx] = value.map(|c| c.clamp(0.0, 1.0));
        Ok(())
    }

    /// Trilinear interpolation at `rgb`, clamped to `[0, 1]`.
    ///
    /// The cell is `floor(c·(size−1))`, clamped so the top face uses the
    /// last cell; this keeps the result continuous across cell faces.
    pub fn lookup_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let n = (self.size - 1) as f32;
        let norm = |c: f32| if c.is_nan() { 0.0 } else { c.clamp(0.0, 1.0) * n };
        let (r, g, b) = (norm(rgb[0]), norm(rgb[1]), norm(rgb[2]));

        let ri = (r.floor() as usize).min(self.size - 2);
        let gi = (g.floor() as usize).min(self.size - 2);
        let bi = (b.floor() as usize).min(self.size - 2);

        let rf = r - ri as f32;
        let gf = g - gi as f32;
        let bf = b - bi as f32;

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut result = [0.0f32; 3];
        for i in 0..3 {
            let c00 = c000[i] * (1.0 - rf) + c100[i] * rf;
            let c01 = c001[i] * (1.0 - rf) + c101[i] * rf;
            let c10 = c010[i] * (1.0 - rf) + c110[i] * rf;
            let c11 = c011[i] * (1.0 - rf) + c111[i] * rf;

            let c0 = c00 * (1.0 - gf) + c10 * gf;
            let c1 = c01 * (1.0 - gf) + c11 * gf;

            result[i] = c0 * (1.0 - bf) + c1 * bf;
        }
        result
    }

    /// Maps every pixel through the LUT. Alpha is kept.
    pub fn apply_in_place(&self, buffer: &mut PixelBuffer) {
        for px in buffer.pixels.iter_mut() {
            let out = self.lookup_trilinear([
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]);
            px[0] = to_u8(out[0]);
            px[1] = to_u8(out[1]);
            px[2] = to_u8(out[2]);
        }
    }

    /// Applies the LUT to a copy; `buffer` is not modified.
    pub fn apply(&self, buffer: &PixelBuffer) -> PixelBuffer {
        let mut out = buffer.clone();
        self.apply_in_place(&mut out);
        out
    }

    /// Builds a LUT by running the identity Hald image through `transform`
    /// and decoding the result.
    pub fn from_image_transform<F>(size: usize, transform: F) -> Result<Self>
    where
        F: FnOnce(&PixelBuffer) -> Result<PixelBuffer>,
    {
        let hald = Self::identity(size)?.hald_image()?;
        let transformed = transform(&hald)?;
        tracing::debug!(
            "Baking {size}^3 LUT from a {}x{} transformed Hald image",
            transformed.width,
            transformed.height
        );
        Self::from_hald_image(&transformed, size)
    }
}

#[inline]
pub(crate) fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
