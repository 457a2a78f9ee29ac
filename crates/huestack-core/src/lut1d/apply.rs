//! Per-channel application of 1D LUTs in RGB, HSB or Lab.

use serde::{Deserialize, Serialize};

use super::Lut1D;
use crate::color::space::{hsb_to_rgb8, lab_to_rgb8, rgb8_to_hsb, rgb8_to_lab};
use crate::image::{PixelBuffer, Rgba8};

/// Color model whose three channels the curves act on.
///
/// Channel values are mapped onto the 0..=255 LUT index as:
/// - `Rgb`: the 8-bit value itself
/// - `Hsb`: hue `[0, 360)` and saturation/brightness `[0, 1]` scaled to 255
/// - `Lab`: L `[0, 100]` scaled to 255, a and b offset by 128
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorModel {
    #[default]
    Rgb,
    Hsb,
    Lab,
}

/// Up to three curves, one per channel of a [`ColorModel`].
///
/// A `None` channel is left untouched, including its precision: a pixel is
/// only converted to HSB or Lab when one of the curves is set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelCurves {
    pub model: ColorModel,
    pub curves: [Option<Lut1D>; 3],
}

impl ChannelCurves {
    pub fn new(model: ColorModel) -> Self {
        Self {
            model,
            curves: [None, None, None],
        }
    }

    /// Same curve on R, G and B.
    pub fn master(lut: Lut1D) -> Self {
        Self {
            model: ColorModel::Rgb,
            curves: [Some(lut.clone()), Some(lut.clone()), Some(lut)],
        }
    }

    pub fn with_channel(mut self, channel: usize, lut: Lut1D) -> Self {
        if let Some(slot) = self.curves.get_mut(channel) {
            *slot = Some(lut);
        }
        self
    }

    /// True when applying the curves cannot change any pixel.
    pub fn is_identity(&self) -> bool {
        self.curves
            .iter()
            .all(|c| c.as_ref().is_none_or(Lut1D::is_identity))
    }

    pub fn apply_in_place(&self, buffer: &mut PixelBuffer) {
        if self.curves.iter().all(Option::is_none) {
            return;
        }
        for px in buffer.pixels.iter_mut() {
            *px = self.map_pixel(*px);
        }
    }

    /// Applies the curves to a copy; `buffer` is not modified.
    pub fn apply(&self, buffer: &PixelBuffer) -> PixelBuffer {
        let mut out = buffer.clone();
        self.apply_in_place(&mut out);
        out
    }

    fn map_pixel(&self, px: Rgba8) -> Rgba8 {
        let [c0, c1, c2] = &self.curves;
        match self.model {
            ColorModel::Rgb => [
                c0.as_ref().map_or(px[0], |l| l.lookup(px[0])),
                c1.as_ref().map_or(px[1], |l| l.lookup(px[1])),
                c2.as_ref().map_or(px[2], |l| l.lookup(px[2])),
                px[3],
            ],
            ColorModel::Hsb => {
                let [h, s, b] = rgb8_to_hsb(px);
                let h = map_scaled(c0, h, 360.0 / 255.0, 0.0);
                let s = map_scaled(c1, s, 1.0 / 255.0, 0.0);
                let b = map_scaled(c2, b, 1.0 / 255.0, 0.0);
                let [r, g, bl] = hsb_to_rgb8([h % 360.0, s, b]);
                [r, g, bl, px[3]]
            }
            ColorModel::Lab => {
                let [l, a, b] = rgb8_to_lab(px);
                let l = map_scaled(c0, l, 100.0 / 255.0, 0.0);
                let a = map_scaled(c1, a, 1.0, -128.0);
                let b = map_scaled(c2, b, 1.0, -128.0);
                let [r, g, bl] = lab_to_rgb8([l, a, b]);
                [r, g, bl, px[3]]
            }
        }
    }
}

/// Maps a channel value `v = index * scale + offset` through `lut`.
fn map_scaled(lut: &Option<Lut1D>, v: f32, scale: f32, offset: f32) -> f32 {
    match lut {
        None => v,
        Some(lut) => {
            let index = ((v - offset) / scale).round().clamp(0.0, 255.0) as u8;
            lut.lookup(index) as f32 * scale + offset
        }
    }
}
