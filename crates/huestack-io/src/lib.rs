//! File adapters for huestack: raster images, Hald images and `.cube`
//! tables.
//!
//! Everything is decoded into the core's 8-bit RGBA [`PixelBuffer`]; the
//! processing core itself never touches the filesystem for pixels.

mod error;
mod lut;
mod raster;

pub use error::{IoError, Result};
pub use lut::{load_cube, load_hald, save_cube, save_hald};
pub use raster::{load_image, save_image};

pub use huestack_core::PixelBuffer;
