//! Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lut1d::smoothing::MAX_ORDER;
use crate::lut3d::{MAX_HALD_SIZE, MIN_SIZE};

/// Default lattice size for baked 3D LUTs.
const DEFAULT_LUT3D_SIZE: usize = 33;
/// Default Savitzky–Golay window for histogram smoothing.
const DEFAULT_SMOOTHING_WINDOW: usize = 11;
/// Default Savitzky–Golay polynomial order.
const DEFAULT_SMOOTHING_ORDER: usize = 3;
/// Default minimum histogram mass of a contrast mode.
const DEFAULT_MIN_MODE_MASS: f64 = 0.05;

/// Runtime configuration for the processing core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lattice size used when baking 3D LUTs. Baking goes through a Hald
    /// image, so the size is capped at `MAX_HALD_SIZE`.
    pub lut3d_size: usize,
    pub auto_curve: AutoCurveConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lut3d_size: std::env::var("HUESTACK_LUT_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_LUT3D_SIZE),
            auto_curve: AutoCurveConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::info!("Loaded engine config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Error::check_range(
            "lut3d_size",
            self.lut3d_size as f64,
            MIN_SIZE as f64,
            MAX_HALD_SIZE as f64,
        )?;
        self.auto_curve.validate()
    }
}

/// Histogram smoothing and mode detection for automatic contrast curves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoCurveConfig {
    /// Savitzky–Golay window length (odd).
    pub window: usize,
    /// Savitzky–Golay polynomial order.
    pub order: usize,
    /// Histogram fraction below which a mode is merged into a neighbor.
    pub min_mode_mass: f64,
}

impl Default for AutoCurveConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_SMOOTHING_WINDOW,
            order: DEFAULT_SMOOTHING_ORDER,
            min_mode_mass: DEFAULT_MIN_MODE_MASS,
        }
    }
}

impl AutoCurveConfig {
    pub fn validate(&self) -> Result<()> {
        Error::check_range("auto_curve.order", self.order as f64, 0.0, MAX_ORDER as f64)?;
        if self.window % 2 == 0 || self.window < self.order + 2 || self.window > 255 {
            return Err(Error::Range {
                what: "auto_curve.window",
                value: self.window as f64,
                min: (self.order + 2) as f64,
                max: 255.0,
            });
        }
        Error::check_range("auto_curve.min_mode_mass", self.min_mode_mass, 0.0, 1.0)
    }
}
