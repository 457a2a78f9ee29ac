//! Hald image encoding of a 3D LUT.
//!
//! The lattice is written pixel by pixel in row-major order, node `k` (R
//! fastest) at linear pixel index `k`, and repeated until the image is full.
//! Decoding reads the first `size³` pixels back. Both directions share the
//! 8-bit quantization of [`node_value`](super::node_value), so encoding the
//! identity and decoding it again is exact.

use super::{Lut3D, MAX_HALD_SIZE, to_u8};
use crate::error::{Error, Result};
use crate::image::PixelBuffer;

impl Lut3D {
    /// Square Hald image of side `size²`.
    ///
    /// Lattices above [`MAX_HALD_SIZE`] are rejected; use
    /// [`hald_image_sized`](Self::hald_image_sized) or a `.cube` file for
    /// those.
    pub fn hald_image(&self) -> Result<PixelBuffer> {
        if self.size > MAX_HALD_SIZE {
            return Err(Error::Range {
                what: "Hald lattice size",
                value: self.size as f64,
                min: super::MIN_SIZE as f64,
                max: MAX_HALD_SIZE as f64,
            });
        }
        let side = (self.size * self.size) as u32;
        Ok(self.tile_into(PixelBuffer::new(side, side)))
    }

    /// Hald image with explicit dimensions; must hold at least `size³` pixels.
    pub fn hald_image_sized(&self, width: u32, height: u32) -> Result<PixelBuffer> {
        let nodes = self.data.len();
        let pixels = width as usize * height as usize;
        if pixels < nodes {
            return Err(Error::conversion(format!(
                "{width}x{height} image is too small for a {0}^3 Hald lattice ({nodes} pixels needed)",
                self.size
            )));
        }
        Ok(self.tile_into(PixelBuffer::new(width, height)))
    }

    fn tile_into(&self, mut image: PixelBuffer) -> PixelBuffer {
        for (px, node) in image.pixels.iter_mut().zip(self.data.iter().cycle()) {
            *px = [to_u8(node[0]), to_u8(node[1]), to_u8(node[2]), 255];
        }
        image
    }

    /// Decodes a lattice of `size³` nodes from the first pixels of `image`.
    pub fn from_hald_image(image: &PixelBuffer, size: usize) -> Result<Self> {
        super::check_size(size)?;
        let nodes = size * size * size;
        if image.len() < nodes {
            return Err(Error::conversion(format!(
                "{}x{} image holds {} pixels, a {size}^3 Hald lattice needs {nodes}",
                image.width,
                image.height,
                image.len()
            )));
        }
        let data = image.pixels[..nodes]
            .iter()
            .map(|px| {
                [
                    px[0] as f32 / 255.0,
                    px[1] as f32 / 255.0,
                    px[2] as f32 / 255.0,
                ]
            })
            .collect();
        Ok(Self { size, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip_is_exact() {
        for size in [2, 9, 17] {
            let lut = Lut3D::identity(size).expect("valid size");
            let hald = lut.hald_image().expect("small lattice");
            assert_eq!(hald.width as usize, size * size);
            let back = Lut3D::from_hald_image(&hald, size).expect("decodes");
            assert_eq!(back, lut, "size {size}");
        }
    }

    #[test]
    fn test_pixel_layout_is_r_fastest() {
        let lut = Lut3D::identity(3).expect("valid size");
        let hald = lut.hald_image().expect("small lattice");
        assert_eq!(hald.pixels[0], [0, 0, 0, 255]);
        assert_eq!(hald.pixels[1], [128, 0, 0, 255]);
        assert_eq!(hald.pixels[3], [0, 128, 0, 255]);
        assert_eq!(hald.pixels[9], [0, 0, 128, 255]);
        // Tiling restarts after the 27 nodes.
        assert_eq!(hald.pixels[27], hald.pixels[0]);
    }

    #[test]
    fn test_square_image_rejects_large_lattices() {
        let lut = Lut3D::identity(MAX_HALD_SIZE + 1).expect("valid size");
        assert!(matches!(lut.hald_image(), Err(Error::Range { .. })));
        let sized = lut.hald_image_sized(600, 500).expect("explicit dimensions");
        assert_eq!(Lut3D::from_hald_image(&sized, MAX_HALD_SIZE + 1).expect("decodes"), lut);
    }

    #[test]
    fn test_sized_image() {
        let lut = Lut3D::identity(4).expect("valid size");
        let hald = lut.hald_image_sized(8, 8).expect("large enough");
        assert_eq!(Lut3D::from_hald_image(&hald, 4).expect("decodes"), lut);
        assert!(matches!(lut.hald_image_sized(7, 9), Err(Error::Conversion(_))));
    }

    #[test]
    fn test_too_small_image_is_rejected() {
        let image = PixelBuffer::new(10, 10);
        assert!(matches!(
            Lut3D::from_hald_image(&image, 5),
            Err(Error::Conversion(_))
        ));
    }
}
