use std::path::Path;

use huestack_core::Lut3D;

use crate::error::Result;
use crate::raster::{load_image, save_image};

/// Read a Hald image of lattice size `size`.
pub fn load_hald(path: impl AsRef<Path>, size: usize) -> Result<Lut3D> {
    let path = path.as_ref();
    let lut = Lut3D::from_hald_image(&load_image(path)?, size)?;
    tracing::info!("Loaded {size}³ Hald LUT from {}", path.display());
    Ok(lut)
}

/// Write the lattice as a square Hald image. Use a lossless format.
pub fn save_hald(path: impl AsRef<Path>, lut: &Lut3D) -> Result<()> {
    let path = path.as_ref();
    save_image(path, &lut.hald_image()?)?;
    tracing::info!("Saved {}³ Hald LUT to {}", lut.size(), path.display());
    Ok(())
}

pub fn load_cube(path: impl AsRef<Path>) -> Result<Lut3D> {
    Ok(Lut3D::read_cube(path)?)
}

pub fn save_cube(path: impl AsRef<Path>, lut: &Lut3D) -> Result<()> {
    Ok(lut.write_cube_file(path)?)
}
