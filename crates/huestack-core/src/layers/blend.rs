//! Blend modes and the per-layer compositing step.
//!
//! Formulas follow the W3C Compositing and Blending recommendation, per
//! channel on values in `[0, 1]`, with `b` the backdrop (accumulated stack)
//! and `s` the layer.

use serde::{Deserialize, Serialize};

use crate::image::{Mask, PixelBuffer, Rect};

/// How a layer's output is combined with the layers beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Layer replaces the backdrop.
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    /// Linear dodge, clipped at white.
    Plus,
}

impl BlendMode {
    pub const ALL: [BlendMode; 13] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::ColorDodge,
        BlendMode::ColorBurn,
        BlendMode::HardLight,
        BlendMode::SoftLight,
        BlendMode::Difference,
        BlendMode::Exclusion,
        BlendMode::Plus,
    ];

    /// Blends one channel.
    #[inline]
    pub fn blend(self, b: f32, s: f32) -> f32 {
        match self {
            BlendMode::Normal => s,
            BlendMode::Multiply => b * s,
            BlendMode::Screen => 1.0 - (1.0 - b) * (1.0 - s),
            BlendMode::Overlay => hard_light(s, b),
            BlendMode::Darken => b.min(s),
            BlendMode::Lighten => b.max(s),
            BlendMode::ColorDodge => {
                if b <= 0.0 {
                    0.0
                } else if s >= 1.0 {
                    1.0
                } else {
                    (b / (1.0 - s)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if b >= 1.0 {
                    1.0
                } else if s <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - b) / s).min(1.0)
                }
            }
            BlendMode::HardLight => hard_light(b, s),
            BlendMode::SoftLight => {
                if s <= 0.5 {
                    b - (1.0 - 2.0 * s) * b * (1.0 - b)
                } else {
                    let d = if b <= 0.25 {
                        ((16.0 * b - 12.0) * b + 4.0) * b
                    } else {
                        b.sqrt()
                    };
                    b + (2.0 * s - 1.0) * (d - b)
                }
            }
            BlendMode::Difference => (b - s).abs(),
            BlendMode::Exclusion => b + s - 2.0 * b * s,
            BlendMode::Plus => (b + s).min(1.0),
        }
    }
}

#[inline]
fn hard_light(b: f32, s: f32) -> f32 {
    if s <= 0.5 {
        2.0 * b * s
    } else {
        1.0 - 2.0 * (1.0 - b) * (1.0 - s)
    }
}

/// Per-layer compositing attributes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Composite<'a> {
    pub mode: BlendMode,
    pub opacity: f32,
    pub mask: Option<&'a Mask>,
    pub rect: Option<Rect>,
}

impl Composite<'_> {
    /// Composites `layer` over `backdrop` in place.
    ///
    /// The effective alpha is `opacity · mask coverage`, and zero outside
    /// `rect`. Alpha of the backdrop is kept. Both buffers must have the same
    /// shape; the caller checks.
    pub fn apply(&self, backdrop: &mut PixelBuffer, layer: &PixelBuffer) {
        if self.opacity <= 0.0 {
            return;
        }
        let width = backdrop.width;
        let rect = self
            .rect
            .and_then(|r| r.clamp_to(backdrop.width, backdrop.height));
        if self.rect.is_some() && rect.is_none() {
            return;
        }

        for (i, (dst, src)) in backdrop
            .pixels
            .iter_mut()
            .zip(layer.pixels.iter())
            .enumerate()
        {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            if rect.is_some_and(|r| !r.contains(x, y)) {
                continue;
            }
            let coverage = self.mask.map_or(1.0, |m| m.coverage(x, y));
            let alpha = self.opacity * coverage;
            if alpha <= 0.0 {
                continue;
            }
            for c in 0..3 {
                let b = dst[c] as f32 / 255.0;
                let s = src[c] as f32 / 255.0;
                let blended = self.mode.blend(b, s);
                let out = b + (blended - b) * alpha;
                dst[c] = (out * 255.0).round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
