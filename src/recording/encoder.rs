//! H.264 encoder wrapper using openh264

use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameRate, FrameType, RateControlMode};
use openh264::formats::YUVBuffer;
use openh264::OpenH264API;

use crate::errors::ChunkerError;
use crate::types::{PixelBuffer, PixelFormat};

/// H.264 encoder for fixed-size pixel buffers
pub struct H264Encoder {
    encoder: Encoder,
    width: u32,
    height: u32,
    frame_count: u64,
}

impl H264Encoder {
    /// Create an encoder for `width` x `height` frames, rate-controlled to
    /// `bitrate` bits per second at up to `fps` frames per second.
    ///
    /// openh264 infers the picture size from the YUV source at encode time;
    /// the dimensions here are used to validate incoming buffers.
    pub fn new(width: u32, height: u32, fps: f64, bitrate: u32) -> Result<Self, ChunkerError> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(ChunkerError::EncodingError(format!(
                "H.264 needs non-zero even dimensions, got {}x{}",
                width, height
            )));
        }
        if !(fps > 0.0) || bitrate == 0 {
            return Err(ChunkerError::EncodingError(format!(
                "Invalid rate control: {} fps, {} bps",
                fps, bitrate
            )));
        }

        let config = EncoderConfig::new()
            .bitrate(BitRate::from_bps(bitrate))
            .max_frame_rate(FrameRate::from_hz(fps as f32))
            .rate_control_mode(RateControlMode::Bitrate);
        let encoder = Encoder::with_api_config(OpenH264API::from_source(), config)
            .map_err(|e| ChunkerError::EncodingError(format!("Failed to create encoder: {}", e)))?;

        Ok(Self {
            encoder,
            width,
            height,
            frame_count: 0,
        })
    }

    /// Encode one pixel buffer into Annex B NAL units
    pub fn encode(&mut self, buffer: &PixelBuffer) -> Result<EncodedFrame, ChunkerError> {
        if buffer.width() != self.width || buffer.height() != self.height {
            return Err(ChunkerError::InvalidFrame(format!(
                "Frame dimensions {}x{} don't match encoder {}x{}",
                buffer.width(),
                buffer.height(),
                self.width,
                self.height
            )));
        }

        let yuv = to_i420(buffer);
        let yuv_buffer = YUVBuffer::from_vec(yuv, self.width as usize, self.height as usize);

        let bitstream = self
            .encoder
            .encode(&yuv_buffer)
            .map_err(|e| ChunkerError::EncodingError(format!("Encoding failed: {}", e)))?;

        self.frame_count += 1;

        let is_keyframe = matches!(bitstream.frame_type(), FrameType::IDR | FrameType::I);

        Ok(EncodedFrame {
            data: bitstream.to_vec(),
            is_keyframe,
        })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Result of encoding a single frame
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Annex B data (with start codes); may be empty when the encoder skips
    pub data: Vec<u8>,
    pub is_keyframe: bool,
}

/// Planar I420 (Y, then U, then V) for any supported buffer layout
pub(crate) fn to_i420(buffer: &PixelBuffer) -> Vec<u8> {
    match buffer.format() {
        PixelFormat::Rgb24 => rgb_to_i420(buffer.data(), buffer.width(), buffer.height()),
        PixelFormat::Bgra32 => rgb_to_i420(&buffer.to_rgb(), buffer.width(), buffer.height()),
        PixelFormat::Nv12 => nv12_to_i420(buffer.data(), buffer.width(), buffer.height()),
    }
}

fn rgb_to_i420(rgb: &[u8], width: u32, height: u32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;

    let y_size = w * h;
    let uv_size = (w / 2) * (h / 2);
    let mut yuv = vec![0u8; y_size + uv_size * 2];

    let (y_plane, uv_planes) = yuv.split_at_mut(y_size);
    let (u_plane, v_plane) = uv_planes.split_at_mut(uv_size);

    for y in 0..h {
        for x in 0..w {
            let rgb_idx = (y * w + x) * 3;
            let r = rgb[rgb_idx] as i32;
            let g = rgb[rgb_idx + 1] as i32;
            let b = rgb[rgb_idx + 2] as i32;

            // BT.601
            let y_val = ((66 * r + 129 * g + 25 * b + 128) >> 8) + 16;
            y_plane[y * w + x] = y_val.clamp(0, 255) as u8;

            if y % 2 == 0 && x % 2 == 0 {
                let uv_idx = (y / 2) * (w / 2) + (x / 2);
                let u_val = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
                let v_val = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
                u_plane[uv_idx] = u_val.clamp(0, 255) as u8;
                v_plane[uv_idx] = v_val.clamp(0, 255) as u8;
            }
        }
    }

    yuv
}

fn nv12_to_i420(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let y_size = (width * height) as usize;
    let (y_plane, uv_interleaved) = data.split_at(y_size);

    let mut yuv = Vec::with_capacity(data.len());
    yuv.extend_from_slice(y_plane);
    yuv.extend(uv_interleaved.iter().step_by(2));
    yuv.extend(uv_interleaved.iter().skip(1).step_by(2));
    yuv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i420_size_for_each_format() {
        let (w, h) = (64u32, 48u32);
        let expected = (w * h * 3 / 2) as usize;
        for format in [PixelFormat::Rgb24, PixelFormat::Bgra32, PixelFormat::Nv12] {
            let buffer =
                PixelBuffer::new(vec![100; format.frame_len(w, h)], w, h, format).unwrap();
            assert_eq!(to_i420(&buffer).len(), expected, "{}", format);
        }
    }

    #[test]
    fn test_nv12_deinterleave() {
        let mut data = vec![7u8; 4];
        data.extend_from_slice(&[1, 2]);
        assert_eq!(nv12_to_i420(&data, 2, 2), vec![7, 7, 7, 7, 1, 2]);
    }

    #[test]
    fn test_encoder_rejects_odd_dimensions() {
        assert!(H264Encoder::new(641, 480, 30.0, 1_000_000).is_err());
        assert!(H264Encoder::new(0, 480, 30.0, 1_000_000).is_err());
    }

    #[test]
    fn test_encoder_rejects_invalid_rate_control() {
        assert!(H264Encoder::new(320, 240, 0.0, 1_000_000).is_err());
        assert!(H264Encoder::new(320, 240, 30.0, 0).is_err());
    }

    #[test]
    fn test_lower_bitrate_gives_smaller_output() {
        fn encoded_size(bitrate: u32) -> usize {
            let mut encoder = H264Encoder::new(320, 240, 30.0, bitrate).unwrap();
            (0..30u64)
                .map(|n| {
                    let buffer = crate::testing::synthetic_pixel_buffer(
                        n * 7,
                        320,
                        240,
                        PixelFormat::Nv12,
                    );
                    encoder.encode(&buffer).unwrap().data.len()
                })
                .sum()
        }

        let low = encoded_size(64_000);
        let high = encoded_size(4_000_000);
        assert!(low < high, "64 kbps gave {} bytes, 4 Mbps gave {}", low, high);
    }

    #[test]
    fn test_encode_first_frame_is_keyframe() {
        let mut encoder =
            H264Encoder::new(320, 240, 30.0, 1_000_000).expect("Encoder creation failed");
        let buffer =
            PixelBuffer::new(vec![128u8; 320 * 240 * 3], 320, 240, PixelFormat::Rgb24).unwrap();

        let encoded = encoder.encode(&buffer).expect("Encoding should succeed");
        assert!(!encoded.data.is_empty());
        assert!(
            encoded.data.starts_with(&[0x00, 0x00, 0x00, 0x01])
                || encoded.data.starts_with(&[0x00, 0x00, 0x01]),
            "Should start with Annex B start code"
        );
        assert!(encoded.is_keyframe);
        assert_eq!(encoder.frame_count(), 1);
    }

    #[test]
    fn test_encode_rejects_mismatched_buffer() {
        let mut encoder = H264Encoder::new(320, 240, 30.0, 1_000_000).unwrap();
        let buffer =
            PixelBuffer::new(vec![0u8; 160 * 120 * 3], 160, 120, PixelFormat::Rgb24).unwrap();
        assert!(matches!(
            encoder.encode(&buffer),
            Err(ChunkerError::InvalidFrame(_))
        ));
    }
}
