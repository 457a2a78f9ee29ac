//! Pixel buffers, selection rectangles and masks.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// 8-bit RGBA pixel, straight alpha.
pub type Rgba8 = [u8; 4];

/// Image representation consumed and produced by every layer.
///
/// Always stored as RGBA 8-bit with straight (non-premultiplied) alpha,
/// row-major, top row first.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Pixel data, `width * height` entries.
    pub pixels: Vec<Rgba8>,
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .finish()
    }
}

impl PixelBuffer {
    /// Opaque black image.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, [0, 0, 0, 255])
    }

    /// Image filled with a single color.
    pub fn filled(width: u32, height: u32, pixel: Rgba8) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; width as usize * height as usize],
        }
    }

    /// Wraps existing pixel data, checking its length.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgba8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(Error::conversion(format!(
                "{width}x{height} buffer needs {expected} pixels, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Builds a buffer from tightly packed RGBA bytes.
    pub fn from_rgba_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::conversion(format!(
                "RGBA byte length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let pixels: &[Rgba8] = bytemuck::cast_slice(bytes);
        Self::from_pixels(width, height, pixels.to_vec())
    }

    /// Raw RGBA bytes of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Rgba8 {
        self.pixels[self.index(x, y)]
    }

    #[inline]
    pub fn put(&mut self, x: u32, y: u32, pixel: Rgba8) {
        let i = self.index(x, y);
        self.pixels[i] = pixel;
    }

    /// Fails with a conversion error unless `other` has the same dimensions.
    pub fn ensure_same_shape(&self, other: &Self) -> Result<()> {
        if self.width != other.width || self.height != other.height {
            return Err(Error::conversion(format!(
                "shape mismatch: {}x{} vs {}x{}",
                self.width, self.height, other.width, other.height
            )));
        }
        Ok(())
    }

    /// Full-image rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// Converts into an `image` crate buffer for encoding.
    pub fn to_rgba_image(&self) -> Result<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.as_bytes().to_vec())
            .ok_or_else(|| Error::conversion("pixel data does not match image dimensions"))
    }
}

impl From<image::RgbaImage> for PixelBuffer {
    fn from(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.pixels().map(|p| p.0).collect(),
        }
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x
            && y >= self.y
            && (x - self.x) < self.width
            && (y - self.y) < self.height
    }

    /// Overlap of two rectangles, `None` when they are disjoint.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self
            .x
            .saturating_add(self.width)
            .min(other.x.saturating_add(other.width));
        let y1 = self
            .y
            .saturating_add(self.height)
            .min(other.y.saturating_add(other.height));
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Restricts the rectangle to a `width` x `height` image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        self.intersect(&Rect::new(0, 0, width, height))
    }
}

/// Binary coverage mask. Values are 0 (excluded) or 255 (included).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl fmt::Debug for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mask")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Mask {
    /// Mask covering every pixel.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![255; width as usize * height as usize],
        }
    }

    /// Mask covering nothing.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize],
        }
    }

    /// Wraps mask bytes, binarizing them at 128.
    pub fn from_data(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::conversion(format!(
                "{width}x{height} mask needs {} bytes, got {}",
                width as usize * height as usize,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data: data.into_iter().map(|v| if v >= 128 { 255 } else { 0 }).collect(),
        })
    }

    /// Mask covering `rect` only.
    pub fn from_rect(width: u32, height: u32, rect: Rect) -> Self {
        let mut mask = Self::empty(width, height);
        if let Some(r) = rect.clamp_to(width, height) {
            for y in r.y..r.y + r.height {
                let row = y as usize * width as usize;
                mask.data[row + r.x as usize..row + (r.x + r.width) as usize].fill(255);
            }
        }
        mask
    }

    pub fn invert(&mut self) {
        for v in &mut self.data {
            *v = 255 - *v;
        }
    }

    /// Coverage in `[0, 1]` at a pixel.
    #[inline]
    pub fn coverage(&self, x: u32, y: u32) -> f32 {
        self.data[y as usize * self.width as usize + x as usize] as f32 / 255.0
    }

    /// Fails unless the mask matches the buffer dimensions.
    pub fn ensure_fits(&self, buffer: &PixelBuffer) -> Result<()> {
        if self.width != buffer.width || self.height != buffer.height {
            return Err(Error::conversion(format!(
                "mask {}x{} does not match image {}x{}",
                self.width, self.height, buffer.width, buffer.height
            )));
        }
        if self.data.len() != self.width as usize * self.height as usize {
            return Err(Error::conversion(format!(
                "{}x{} mask holds {} bytes",
                self.width,
                self.height,
                self.data.len()
            )));
        }
        Ok(())
    }
}
