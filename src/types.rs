//! Frame and pixel buffer types shared by the capture pipeline

use serde::{Deserialize, Serialize};

use crate::errors::ChunkerError;
use crate::timing::MediaTime;

/// Memory layout of a pixel buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Packed 8-bit R, G, B
    Rgb24,
    /// Packed 8-bit B, G, R, A (common on Apple and Windows capture stacks)
    Bgra32,
    /// Bi-planar 4:2:0: a full-resolution Y plane followed by interleaved CbCr
    Nv12,
}

impl PixelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Bgra32 => "bgra32",
            PixelFormat::Nv12 => "nv12",
        }
    }

    /// Number of bytes a `width` x `height` image occupies in this format
    pub fn frame_len(&self, width: u32, height: u32) -> usize {
        let w = width as usize;
        let h = height as usize;
        match self {
            PixelFormat::Rgb24 => w * h * 3,
            PixelFormat::Bgra32 => w * h * 4,
            PixelFormat::Nv12 => w * h + w.div_ceil(2) * h.div_ceil(2) * 2,
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uncompressed image as delivered by a camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl PixelBuffer {
    /// Wrap raw bytes, checking that the length matches the layout
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, ChunkerError> {
        if width == 0 || height == 0 {
            return Err(ChunkerError::InvalidFrame(format!(
                "Empty dimensions {}x{}",
                width, height
            )));
        }
        if format == PixelFormat::Nv12 && (width % 2 != 0 || height % 2 != 0) {
            return Err(ChunkerError::InvalidFrame(format!(
                "NV12 requires even dimensions, got {}x{}",
                width, height
            )));
        }
        let expected = format.frame_len(width, height);
        if data.len() != expected {
            return Err(ChunkerError::InvalidFrame(format!(
                "Invalid {} buffer size: expected {} bytes, got {}",
                format,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Convert to packed RGB24
    pub fn to_rgb(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgb24 => self.data.clone(),
            PixelFormat::Bgra32 => self
                .data
                .chunks_exact(4)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
            PixelFormat::Nv12 => nv12_to_rgb(&self.data, self.width, self.height),
        }
    }
}

/// BT.601 limited-range YCbCr to RGB
fn nv12_to_rgb(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let (y_plane, uv_plane) = data.split_at(w * h);
    let mut rgb = vec![0u8; w * h * 3];

    for row in 0..h {
        for col in 0..w {
            let y = y_plane[row * w + col] as i32 - 16;
            let uv_idx = (row / 2) * w + (col / 2) * 2;
            let u = uv_plane[uv_idx] as i32 - 128;
            let v = uv_plane[uv_idx + 1] as i32 - 128;

            let c = 298 * y;
            let r = (c + 409 * v + 128) >> 8;
            let g = (c - 100 * u - 208 * v + 128) >> 8;
            let b = (c + 516 * u + 128) >> 8;

            let idx = (row * w + col) * 3;
            rgb[idx] = r.clamp(0, 255) as u8;
            rgb[idx + 1] = g.clamp(0, 255) as u8;
            rgb[idx + 2] = b.clamp(0, 255) as u8;
        }
    }

    rgb
}

/// One captured sample: an optional image plus its capture timestamp
#[derive(Debug, Clone)]
pub struct Frame {
    pub pixel_buffer: Option<PixelBuffer>,
    pub timestamp: MediaTime,
}

impl Frame {
    pub fn new(pixel_buffer: PixelBuffer, timestamp: MediaTime) -> Self {
        Self {
            pixel_buffer: Some(pixel_buffer),
            timestamp,
        }
    }

    /// A sample that carries no image data (e.g. a metadata-only callback)
    pub fn empty(timestamp: MediaTime) -> Self {
        Self {
            pixel_buffer: None,
            timestamp,
        }
    }

    pub fn pixel_buffer(&self) -> Option<&PixelBuffer> {
        self.pixel_buffer.as_ref()
    }
}
