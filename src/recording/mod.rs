//! MP4 recording backend for the video chunker
//!
//! This module provides a [`MediaWriter`](crate::writer::MediaWriter) built on:
//! - openh264 for H.264 encoding
//! - muxide for MP4 muxing
//!
//! # Example
//! ```rust,ignore
//! use face_liveness_capture::recording::{Mp4Writer, RecordingConfig};
//! use face_liveness_capture::VideoChunker;
//!
//! let writer = Mp4Writer::new("session.mp4", RecordingConfig::new(480, 640, 30.0));
//! let mut chunker = VideoChunker::new(writer);
//! chunker.start();
//!
//! // From the capture callback:
//! chunker.consume(&frame);
//!
//! // When the face check is done:
//! chunker.finish(Box::new(|still| { /* show or upload */ }));
//! ```

mod config;
mod encoder;
mod mp4;

pub use config::{RecordingConfig, RecordingStats};
pub use encoder::{EncodedFrame, H264Encoder};
pub use mp4::Mp4Writer;
