//! Convolution filters for filter layers.
//!
//! All filters share one separable Gaussian pass with edge clamping:
//! - `Blur` returns the blurred image
//! - `Sharpen` and `Unsharp` add `amount · (image − blurred)` back
//!
//! `Sharpen` always uses a radius of 1; `Unsharp` uses the layer's radius.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::image::PixelBuffer;

/// Largest supported kernel radius.
pub const MAX_RADIUS: u32 = 64;

/// Largest supported sharpening amount.
pub const MAX_AMOUNT: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    Blur,
    Sharpen,
    Unsharp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub kind: FilterKind,
    /// Kernel radius in pixels.
    pub radius: u32,
    /// Sharpening strength; ignored by `Blur`.
    pub amount: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            kind: FilterKind::Unsharp,
            radius: 2,
            amount: 1.0,
        }
    }
}

impl FilterParams {
    pub fn validate(&self) -> Result<()> {
        Error::check_range("filter radius", self.radius as f64, 1.0, MAX_RADIUS as f64)?;
        Error::check_range("filter amount", self.amount as f64, 0.0, MAX_AMOUNT as f64)
    }

    pub fn execute(&self, input: &PixelBuffer) -> Result<PixelBuffer> {
        self.validate()?;
        if input.is_empty() {
            return Ok(input.clone());
        }
        let radius = match self.kind {
            FilterKind::Sharpen => 1,
            FilterKind::Blur | FilterKind::Unsharp => self.radius as usize,
        };
        let blurred = gaussian_blur(input, radius);
        if self.kind == FilterKind::Blur {
            return Ok(blurred);
        }

        let mut out = input.clone();
        for (dst, soft) in out.pixels.iter_mut().zip(blurred.pixels.iter()) {
            for c in 0..3 {
                let v = dst[c] as f32;
                let sharpened = v + self.amount * (v - soft[c] as f32);
                dst[c] = sharpened.round().clamp(0.0, 255.0) as u8;
            }
        }
        Ok(out)
    }
}

/// Normalized 1D Gaussian weights for `radius`, with `sigma = radius / 2`.
fn gaussian_kernel(radius: usize) -> Vec<f32> {
    let sigma = (radius as f32 / 2.0).max(0.5);
    let sigma2 = 2.0 * sigma * sigma;
    let half = radius as i32;
    let mut weights: Vec<f32> = (-half..=half)
        .map(|x| (-((x * x) as f32) / sigma2).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Two-pass separable Gaussian blur of the RGB channels. Alpha is kept.
fn gaussian_blur(input: &PixelBuffer, radius: usize) -> PixelBuffer {
    let width = input.width as usize;
    let height = input.height as usize;
    let kernel = gaussian_kernel(radius);
    let half = radius as isize;

    let src: Vec<[f32; 3]> = input
        .pixels
        .iter()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();

    let mut temp = vec![[0.0f32; 3]; width * height];
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (k, w) in kernel.iter().enumerate() {
                let sx = (x as isize + k as isize - half).clamp(0, width as isize - 1) as usize;
                let s = src[y * width + sx];
                for c in 0..3 {
                    acc[c] += w * s[c];
                }
            }
            temp[y * width + x] = acc;
        }
    }

    let mut out = input.clone();
    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; 3];
            for (k, w) in kernel.iter().enumerate() {
                let sy = (y as isize + k as isize - half).clamp(0, height as isize - 1) as usize;
                let s = temp[sy * width + x];
                for c in 0..3 {
                    acc[c] += w * s[c];
                }
            }
            let px = &mut out.pixels[y * width + x];
            for c in 0..3 {
                px[c] = acc[c].round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge() -> PixelBuffer {
        let mut buf = PixelBuffer::new(8, 8);
        for y in 0..8 {
            for x in 4..8 {
                buf.put(x, y, [200, 200, 200, 255]);
            }
        }
        for y in 0..8 {
            for x in 0..4 {
                buf.put(x, y, [50, 50, 50, 255]);
            }
        }
        buf
    }

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        for radius in [1, 3, 10] {
            let k = gaussian_kernel(radius);
            assert_eq!(k.len(), 2 * radius + 1);
            assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            assert!((k[0] - k[2 * radius]).abs() < 1e-7);
        }
    }

    #[test]
    fn test_flat_image_is_unchanged() {
        let flat = PixelBuffer::filled(6, 5, [90, 120, 30, 255]);
        for kind in [FilterKind::Blur, FilterKind::Sharpen, FilterKind::Unsharp] {
            let params = FilterParams {
                kind,
                radius: 3,
                amount: 2.0,
            };
            assert_eq!(params.execute(&flat).expect("valid"), flat, "{kind:?}");
        }
    }

    #[test]
    fn test_blur_softens_and_sharpen_boosts_edge() {
        let img = edge();
        let blur = FilterParams {
            kind: FilterKind::Blur,
            radius: 2,
            amount: 0.0,
        }
        .execute(&img)
        .expect("valid");
        assert!(blur.get(3, 4)[0] > 50);
        assert!(blur.get(4, 4)[0] < 200);

        let sharp = FilterParams {
            kind: FilterKind::Unsharp,
            radius: 2,
            amount: 1.0,
        }
        .execute(&img)
        .expect("valid");
        assert!(sharp.get(3, 4)[0] < 50);
        assert!(sharp.get(4, 4)[0] > 200);
        assert_eq!(sharp.get(4, 4)[3], 255);
    }

    #[test]
    fn test_invalid_parameters() {
        let img = edge();
        let bad_radius = FilterParams {
            kind: FilterKind::Blur,
            radius: 0,
            amount: 1.0,
        };
        assert!(matches!(bad_radius.execute(&img), Err(Error::Range { .. })));
        let bad_amount = FilterParams {
            amount: -1.0,
            ..FilterParams::default()
        };
        assert!(matches!(bad_amount.execute(&img), Err(Error::Range { .. })));
    }
}
