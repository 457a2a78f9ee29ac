//! Raw development parameters: white-balance multipliers, exposure and
//! tone corrections handed to an external raw decoder.

mod development;
mod multipliers;

pub use development::{PostProcessParams, RawDecoder, RawDevelopment, WhiteBalance};
pub use multipliers::{RawMetadata, derive_multipliers};
