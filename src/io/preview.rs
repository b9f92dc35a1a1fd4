use std::path::Path;

use image::GrayImage;

use crate::error::Result;
use crate::math::tensor::Tensor;

/// Writes channel 0 of `tensor` as an 8-bit grayscale PNG, min-max scaled.
pub fn save_preview(tensor: &Tensor, path: &Path) -> Result<()> {
    if tensor.data.len() != tensor.height * tensor.width * tensor.channels {
        return Err(tensor.buffer_error());
    }
    let gray = to_grayscale(&tensor.channel(0))?;
    gray.save(path)?;
    Ok(())
}

fn to_grayscale(field: &Tensor) -> Result<GrayImage> {
    let (lo, hi) = field.min_max();
    let span = if hi > lo { hi - lo } else { 1.0 };
    let pixels = field.data.iter()
        .map(|&v| (((v - lo) / span) * 255.0).round().clamp(0.0, 255.0) as u8)
        .collect();
    GrayImage::from_raw(field.width as u32, field.height as u32, pixels)
        .ok_or_else(|| field.buffer_error())
}
