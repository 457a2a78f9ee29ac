use std::path::Path;

use huestack_core::PixelBuffer;
use image::{DynamicImage, ImageFormat};

use crate::error::{IoError, Result};

/// Load an image from disk as 8-bit RGBA.
///
/// Supports the formats enabled in the `image` crate (PNG, JPEG, TIFF, ...).
/// Higher bit depths are quantized to 8 bits; images without alpha get an
/// opaque alpha channel.
pub fn load_image(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    let path = path.as_ref();
    let img = image::open(path).map_err(IoError::Decode)?;
    tracing::debug!(
        "Decoded {} ({}x{}, {:?})",
        path.display(),
        img.width(),
        img.height(),
        img.color()
    );
    Ok(PixelBuffer::from(img.to_rgba8()))
}

/// Save a buffer, choosing the format from the file extension.
///
/// Formats without an alpha channel (JPEG) drop it.
pub fn save_image(path: impl AsRef<Path>, buffer: &PixelBuffer) -> Result<()> {
    let path = path.as_ref();
    let format = ImageFormat::from_path(path).map_err(IoError::Encode)?;
    let rgba = DynamicImage::ImageRgba8(buffer.to_rgba_image()?);
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(rgba.to_rgb8()),
        _ => rgba,
    };
    img.save_with_format(path, format).map_err(IoError::Encode)?;
    tracing::debug!("Encoded {} as {format:?}", path.display());
    Ok(())
}
