//! Huestack Core: image adjustment engine.
//!
//! Color and temperature math, 1D and 3D lookup tables, a layer stack with
//! dirty-watermark recomputation, raw development parameters and the stack
//! script format. No GUI or decoder dependencies.

pub mod color;
pub mod config;
pub mod context;
pub mod error;
pub mod histogram;
pub mod image;
pub mod layers;
pub mod lut1d;
pub mod lut3d;
pub mod raw;
pub mod script;

// Re-exports for convenience.
pub use config::{AutoCurveConfig, EngineConfig};
pub use context::{AppContext, Document, SharedDocument};
pub use error::{Error, Result};
pub use image::{Mask, PixelBuffer, Rect, Rgba8};
pub use layers::{BlendMode, Layer, LayerOp, LayerStack};
pub use lut1d::{Lut1D, build_lut_from_control_points};
pub use lut3d::Lut3D;
pub use raw::{RawDevelopment, RawMetadata, derive_multipliers};
pub use script::StackScript;
