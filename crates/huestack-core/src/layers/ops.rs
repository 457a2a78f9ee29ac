//! Layer operations.
//!
//! Each layer carries exactly one [`LayerOp`]; the variant owns the
//! operation's parameters and knows how to turn the stack beneath it into
//! the layer's output.

use serde::{Deserialize, Serialize};

use super::filter::FilterParams;
use super::segmentation::SegmentationParams;
use crate::color::space::{blackbody_linear_srgb, linear_to_rgb8, rgb8_to_linear};
use crate::color::white_balance::{apply_matrix, temperature_adaptation_matrix};
use crate::error::{Error, Result};
use crate::histogram::LUMA_REC709;
use crate::image::PixelBuffer;
use crate::lut1d::ChannelCurves;
use crate::lut3d::Lut3D;

/// Temperature range accepted by temperature layers, in Kelvin.
pub const LAYER_TEMPERATURE_RANGE: (f64, f64) = (1000.0, 25000.0);

/// The operation a layer performs on its input.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerOp {
    /// The base image; passes its input through.
    Source,
    Curve1D(ChannelCurves),
    Lut3D(Lut3DParams),
    Temperature(TemperatureParams),
    Filter(FilterParams),
    Segmentation(SegmentationParams),
}

impl LayerOp {
    /// Short stable name, used in logs and scripts.
    pub fn kind(&self) -> &'static str {
        match self {
            LayerOp::Source => "source",
            LayerOp::Curve1D(_) => "curve1d",
            LayerOp::Lut3D(_) => "lut3d",
            LayerOp::Temperature(_) => "temperature",
            LayerOp::Filter(_) => "filter",
            LayerOp::Segmentation(_) => "segmentation",
        }
    }

    /// True when the operation maps each color independently of its
    /// position, so it can be expressed as a 3D LUT.
    pub fn is_color_transform(&self) -> bool {
        matches!(
            self,
            LayerOp::Source | LayerOp::Curve1D(_) | LayerOp::Lut3D(_) | LayerOp::Temperature(_)
        )
    }

    /// Runs the operation. `input` is never modified.
    pub fn execute(&self, input: &PixelBuffer) -> Result<PixelBuffer> {
        match self {
            LayerOp::Source => Ok(input.clone()),
            LayerOp::Curve1D(curves) => Ok(curves.apply(input)),
            LayerOp::Lut3D(params) => Ok(params.to_lut()?.apply(input)),
            LayerOp::Temperature(params) => params.execute(input),
            LayerOp::Filter(params) => params.execute(input),
            LayerOp::Segmentation(params) => params.execute(input),
        }
    }
}

/// Imported 3D LUT lattice.
///
/// The lattice is kept as raw node data and checked every time the layer
/// runs, so a corrupt import fails the layer instead of producing garbage.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut3DParams {
    pub size: usize,
    pub data: Vec<[f32; 3]>,
}

impl Lut3DParams {
    pub fn to_lut(&self) -> Result<Lut3D> {
        Lut3D::from_data(self.size, self.data.clone())
    }
}

impl From<&Lut3D> for Lut3DParams {
    fn from(lut: &Lut3D) -> Self {
        Self {
            size: lut.size(),
            data: lut.data().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureMethod {
    /// Tints the image with the blackbody color, keeping luminance.
    #[default]
    PhotoFilter,
    /// Bradford adaptation of the D65 white onto the blackbody white.
    ChromaticAdaptation,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureParams {
    pub kelvin: f64,
    pub method: TemperatureMethod,
}

impl Default for TemperatureParams {
    fn default() -> Self {
        Self {
            kelvin: 6500.0,
            method: TemperatureMethod::PhotoFilter,
        }
    }
}

impl TemperatureParams {
    pub fn execute(&self, input: &PixelBuffer) -> Result<PixelBuffer> {
        let (lo, hi) = LAYER_TEMPERATURE_RANGE;
        Error::check_range("layer temperature", self.kelvin, lo, hi)?;

        let mut out = input.clone();
        match self.method {
            TemperatureMethod::PhotoFilter => {
                let filter = blackbody_linear_srgb(self.kelvin);
                for px in out.pixels.iter_mut() {
                    let lin = rgb8_to_linear(*px);
                    let lum_in = luminance(lin);
                    let tinted = [lin[0] * filter[0], lin[1] * filter[1], lin[2] * filter[2]];
                    let lum_out = luminance(tinted);
                    let scale = if lum_out > 1e-6 { lum_in / lum_out } else { 1.0 };
                    let rgb = linear_to_rgb8(tinted.map(|c| c * scale));
                    *px = [rgb[0], rgb[1], rgb[2], px[3]];
                }
            }
            TemperatureMethod::ChromaticAdaptation => {
                let m = temperature_adaptation_matrix(self.kelvin);
                for px in out.pixels.iter_mut() {
                    let rgb = linear_to_rgb8(apply_matrix(&m, rgb8_to_linear(*px)));
                    *px = [rgb[0], rgb[1], rgb[2], px[3]];
                }
            }
        }
        Ok(out)
    }
}

#[inline]
fn luminance(rgb: [f32; 3]) -> f32 {
    LUMA_REC709[0] * rgb[0] + LUMA_REC709[1] * rgb[1] + LUMA_REC709[2] * rgb[2]
}
