//! Conversion of canvas-style RGBA buffers to the grayscale input of the engine.

use image::{DynamicImage, GrayImage, RgbaImage};

use crate::error::DetectError;

/// Convert a row-major RGBA buffer (4 bytes per pixel) to Rec. 709 luma.
pub fn luma_from_rgba(rgba: &[u8], width: u32, height: u32) -> Result<GrayImage, DetectError> {
    if width == 0 || height == 0 {
        return Err(DetectError::InvalidImage(format!(
            "image dimensions are zero: {width}x{height}"
        )));
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| {
            DetectError::InvalidImage(format!("image too large: {width}x{height}"))
        })?;
    if rgba.len() != expected {
        return Err(DetectError::InvalidImage(format!(
            "RGBA buffer holds {} bytes, expected {expected} for {width}x{height}",
            rgba.len()
        )));
    }
    let image = RgbaImage::from_raw(width, height, rgba.to_vec()).ok_or_else(|| {
        DetectError::InvalidImage(format!("cannot wrap RGBA buffer as {width}x{height}"))
    })?;
    Ok(DynamicImage::ImageRgba8(image).into_luma8())
}
