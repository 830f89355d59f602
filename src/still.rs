//! Still image extraction from pixel buffers
//!
//! A pixel buffer is first decoded into an intermediate colour-converted
//! `DynamicImage`, then rendered into a concrete RGBA bitmap. Only the
//! rendered bitmap is handed out: it is what UI layers and encoders can
//! consume directly.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};

use crate::errors::ChunkerError;
use crate::types::{PixelBuffer, PixelFormat};

/// A rendered still frame
#[derive(Debug, Clone, PartialEq)]
pub struct StillImage {
    bitmap: RgbaImage,
}

impl StillImage {
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.bitmap
    }

    /// Encode as JPEG. `quality` is clamped to 1..=100.
    pub fn to_jpeg(&self, quality: u8) -> Result<Vec<u8>, ChunkerError> {
        let rgb = DynamicImage::ImageRgba8(self.bitmap.clone()).to_rgb8();
        let mut out = Vec::new();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|e| ChunkerError::EncodingError(format!("Failed to encode JPEG: {}", e)))?;
        Ok(out)
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ChunkerError> {
        let mut out = Cursor::new(Vec::new());
        self.bitmap
            .write_to(&mut out, ImageFormat::Png)
            .map_err(|e| ChunkerError::EncodingError(format!("Failed to encode PNG: {}", e)))?;
        Ok(out.into_inner())
    }

    /// Save to disk; the format follows the file extension
    pub fn save<P: AsRef<Path>>(&self, path: P, jpeg_quality: u8) -> Result<(), ChunkerError> {
        let path = path.as_ref();
        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
            .unwrap_or(false);

        let bytes = if is_jpeg {
            self.to_jpeg(jpeg_quality)?
        } else {
            self.to_png()?
        };

        std::fs::write(path, bytes).map_err(|e| {
            ChunkerError::IoError(format!("Failed to write still image {:?}: {}", path, e))
        })?;
        log::debug!("Saved still image to {:?}", path);
        Ok(())
    }
}

impl From<RgbaImage> for StillImage {
    fn from(bitmap: RgbaImage) -> Self {
        Self { bitmap }
    }
}

/// Render a pixel buffer into a displayable still image.
///
/// Returns `None` if the buffer cannot be decoded or rendered.
pub fn render_still(buffer: &PixelBuffer) -> Option<StillImage> {
    let intermediate = decode_intermediate(buffer)?;
    Some(StillImage {
        bitmap: intermediate.to_rgba8(),
    })
}

fn decode_intermediate(buffer: &PixelBuffer) -> Option<DynamicImage> {
    let image = match buffer.format() {
        PixelFormat::Rgb24 => {
            RgbImage::from_raw(buffer.width(), buffer.height(), buffer.data().to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        PixelFormat::Bgra32 | PixelFormat::Nv12 => {
            RgbImage::from_raw(buffer.width(), buffer.height(), buffer.to_rgb())
                .map(DynamicImage::ImageRgb8)
        }
    };
    if image.is_none() {
        log::debug!(
            "Could not decode {} buffer {}x{}",
            buffer.format(),
            buffer.width(),
            buffer.height()
        );
    }
    image
}
