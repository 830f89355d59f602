//! Testing utilities
//!
//! An in-memory media writer and synthetic camera frames for exercising the
//! chunker without an encoder or camera.

pub mod recording_writer;
pub mod synthetic_data;

pub use recording_writer::{AppendedSample, RecordingWriter};
pub use synthetic_data::{synthetic_pixel_buffer, SyntheticCamera};
