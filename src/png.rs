//! PNG validation of captured images
//!
//! The whole image is decoded, so a truncated stream or corrupt pixel data
//! is caught before any byte reaches a caller.

use crate::{Error, Result};
use image::{GenericImageView, ImageFormat};

/// Dimensions of a PNG that decoded cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngInfo {
    pub width: u32,
    pub height: u32,
}

impl PngInfo {
    /// Decode `data` as PNG and report its size
    pub fn inspect(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory_with_format(data, ImageFormat::Png)
            .map_err(|e| Error::RenderError(format!("captured image is not a valid PNG: {}", e)))?;

        let (width, height) = img.dimensions();
        Ok(Self { width, height })
    }
}
