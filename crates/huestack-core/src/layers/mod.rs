//! Layer stack compositing: layer operations, blend modes and the stack
//! with its dirty-watermark recomputation.

pub mod blend;
pub mod filter;
pub mod ops;
pub mod segmentation;
pub mod stack;

pub use blend::BlendMode;
pub use filter::{FilterKind, FilterParams};
pub use ops::{LayerOp, Lut3DParams, TemperatureMethod, TemperatureParams};
pub use segmentation::{Background, SegmentationParams};
pub use stack::{Layer, LayerStack, LayerState};
