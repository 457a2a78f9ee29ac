//! 256-bin histograms of the R, G, B and luma channels, the input of
//! automatic contrast curves.

use serde::{Deserialize, Serialize};

use crate::image::PixelBuffer;

/// Rec. 709 luminance weights.
pub const LUMA_REC709: [f32; 3] = [0.2126, 0.7152, 0.0722];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramData {
    /// `[R, G, B, luma]` counts, 256 bins each.
    pub bins: [Vec<u32>; 4],
    /// Largest bin over all four channels.
    pub peak: u32,
}

impl HistogramData {
    /// Luminance bins.
    pub fn luma(&self) -> &[u32] {
        &self.bins[3]
    }
}

/// Compute histogram from a pixel buffer. Alpha is ignored.
pub fn compute(image: &PixelBuffer) -> HistogramData {
    let mut bins = [vec![0u32; 256], vec![0u32; 256], vec![0u32; 256], vec![0u32; 256]];
    for px in &image.pixels {
        for c in 0..3 {
            bins[c][px[c] as usize] += 1;
        }
        bins[3][luma(*px) as usize] += 1;
    }
    let peak = bins.iter().flat_map(|b| b.iter()).copied().max().unwrap_or(0);
    HistogramData { bins, peak }
}

/// Rec. 709 luma of an 8-bit pixel, rounded.
#[inline]
pub fn luma(px: [u8; 4]) -> u8 {
    let y = LUMA_REC709[0] * px[0] as f32 + LUMA_REC709[1] * px[1] as f32 + LUMA_REC709[2] * px[2] as f32;
    y.round().clamp(0.0, 255.0) as u8
}
