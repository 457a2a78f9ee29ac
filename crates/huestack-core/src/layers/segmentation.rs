//! Foreground/background segmentation layer.
//!
//! A user rectangle marks the region holding the subject; everything outside
//! it is background. Two mean-color models are seeded from inside and
//! outside the rectangle, then refined for a few rounds by assigning every
//! pixel inside the rectangle to the closer model. Background pixels are
//! then desaturated or replaced by a solid color.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::histogram::luma;
use crate::image::{Mask, PixelBuffer, Rect, Rgba8};

/// Treatment of pixels classified as background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Background {
    Desaturate,
    Fill([u8; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationParams {
    /// Region known to contain the foreground.
    pub rect: Rect,
    pub background: Background,
    /// Refinement rounds of the two color models.
    pub iterations: u32,
}

impl SegmentationParams {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            background: Background::Desaturate,
            iterations: 5,
        }
    }

    /// Foreground mask: 255 for subject pixels, 0 for background.
    pub fn segmentation_mask(&self, input: &PixelBuffer) -> Result<Mask> {
        let rect = self.rect.clamp_to(input.width, input.height).ok_or_else(|| {
            Error::conversion(format!(
                "segmentation rect {:?} lies outside the {}x{} image",
                self.rect, input.width, input.height
            ))
        })?;

        let mut mask = Mask::from_rect(input.width, input.height, rect);
        let outside: Vec<Rgba8> = input
            .pixels
            .iter()
            .zip(&mask.data)
            .filter(|(_, m)| **m == 0)
            .map(|(p, _)| *p)
            .collect();
        let Some(mut bg_model) = mean_color(outside.iter()) else {
            // Rectangle covers the whole image: nothing is known background.
            return Ok(mask);
        };
        let seed = mask.clone();

        for round in 0..self.iterations.max(1) {
            let fg_pixels = input
                .pixels
                .iter()
                .zip(&mask.data)
                .filter(|(_, m)| **m != 0)
                .map(|(p, _)| p);
            let Some(fg_model) = mean_color(fg_pixels) else {
                break;
            };

            let mut changed = 0usize;
            for ((px, m), s) in input.pixels.iter().zip(mask.data.iter_mut()).zip(&seed.data) {
                if *s == 0 {
                    continue;
                }
                let is_fg = distance2(px, &fg_model) <= distance2(px, &bg_model);
                let v = if is_fg { 255 } else { 0 };
                if *m != v {
                    changed += 1;
                    *m = v;
                }
            }
            tracing::debug!("Segmentation round {round}: {changed} pixel(s) reassigned");
            if changed == 0 {
                break;
            }

            let background = input
                .pixels
                .iter()
                .zip(&mask.data)
                .filter(|(_, m)| **m == 0)
                .map(|(p, _)| p);
            if let Some(model) = mean_color(background) {
                bg_model = model;
            }
        }
        Ok(mask)
    }

    pub fn execute(&self, input: &PixelBuffer) -> Result<PixelBuffer> {
        let mask = self.segmentation_mask(input)?;
        let mut out = input.clone();
        for (px, m) in out.pixels.iter_mut().zip(&mask.data) {
            if *m != 0 {
                continue;
            }
            match self.background {
                Background::Desaturate => {
                    let y = luma(*px);
                    *px = [y, y, y, px[3]];
                }
                Background::Fill(rgb) => *px = [rgb[0], rgb[1], rgb[2], px[3]],
            }
        }
        Ok(out)
    }
}

fn mean_color<'a>(pixels: impl Iterator<Item = &'a Rgba8>) -> Option<[f32; 3]> {
    let mut sum = [0.0f64; 3];
    let mut count = 0usize;
    for p in pixels {
        for c in 0..3 {
            sum[c] += p[c] as f64;
        }
        count += 1;
    }
    (count > 0).then(|| sum.map(|s| (s / count as f64) as f32))
}

#[inline]
fn distance2(px: &Rgba8, model: &[f32; 3]) -> f32 {
    (0..3)
        .map(|c| {
            let d = px[c] as f32 - model[c];
            d * d
        })
        .sum()
}
