//! Synthetic frames for offline testing
//!
//! Gradient images that change every frame, stamped with a monotonic
//! nanosecond clock like a camera capture callback would be.

use crate::timing::MediaTime;
use crate::types::{Frame, PixelBuffer, PixelFormat};

/// Build a gradient buffer whose contents shift with `frame_number`.
///
/// # Panics
/// Panics if `format` is `Nv12` and a dimension is odd.
pub fn synthetic_pixel_buffer(
    frame_number: u64,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> PixelBuffer {
    let base = (frame_number % 256) as u8;
    let (w, h) = (width as usize, height as usize);

    let data = match format {
        PixelFormat::Rgb24 | PixelFormat::Bgra32 => {
            let channels = if format == PixelFormat::Rgb24 { 3 } else { 4 };
            let mut data = vec![0u8; w * h * channels];
            for y in 0..h {
                for x in 0..w {
                    let idx = (y * w + x) * channels;
                    data[idx] = base.wrapping_add((x % 256) as u8);
                    data[idx + 1] = base.wrapping_add((y % 256) as u8);
                    data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8);
                    if channels == 4 {
                        data[idx + 3] = 255;
                    }
                }
            }
            data
        }
        PixelFormat::Nv12 => {
            let mut data = vec![128u8; format.frame_len(width, height)];
            for y in 0..h {
                for x in 0..w {
                    data[y * w + x] = base.wrapping_add(((x + y) % 220) as u8);
                }
            }
            data
        }
    };

    PixelBuffer::new(data, width, height, format).expect("synthetic buffer has a valid layout")
}

/// A fake camera producing frames at a fixed rate
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    fps: f64,
    format: PixelFormat,
    start: MediaTime,
    frame_number: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32, fps: f64, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            fps: if fps > 0.0 { fps } else { 30.0 },
            format,
            start: MediaTime::from_nanos(0),
            frame_number: 0,
        }
    }

    /// Start the capture clock at `start` instead of zero
    pub fn starting_at(mut self, start: MediaTime) -> Self {
        self.start = start;
        self
    }

    pub fn frames_produced(&self) -> u64 {
        self.frame_number
    }

    /// Capture timestamp of frame `n`
    pub fn timestamp_of(&self, n: u64) -> MediaTime {
        let start = self.start.convert_scale(crate::timing::NANOSECOND_TIMESCALE);
        let offset = (n as f64 * 1e9 / self.fps).round() as i64;
        MediaTime::from_nanos(start.value() + offset)
    }

    pub fn next_frame(&mut self) -> Frame {
        let n = self.frame_number;
        self.frame_number += 1;
        Frame::new(
            synthetic_pixel_buffer(n, self.width, self.height, self.format),
            self.timestamp_of(n),
        )
    }

    /// The buffer the camera would show right now, without advancing
    pub fn preview(&self) -> PixelBuffer {
        synthetic_pixel_buffer(self.frame_number, self.width, self.height, self.format)
    }
}

impl Iterator for SyntheticCamera {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        Some(self.next_frame())
    }
}
