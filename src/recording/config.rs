//! Recording configuration types

use serde::{Deserialize, Serialize};

/// Configuration for an MP4 recording
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate written to the track header
    pub fps: f64,
    /// Target bitrate in bits per second
    pub bitrate: u32,
    /// Write moov before mdat so the file can be streamed
    pub fast_start: bool,
    pub title: Option<String>,
    /// Frames the encoder thread may have queued before the writer reports busy
    pub queue_depth: usize,
}

impl RecordingConfig {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            bitrate: 1_000_000,
            fast_start: true,
            title: None,
            queue_depth: 8,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_fast_start(mut self, enabled: bool) -> Self {
        self.fast_start = enabled;
        self
    }

    pub fn with_bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self::new(480, 640, 30.0)
    }
}

/// Statistics available once a recording has been finalized
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingStats {
    pub video_frames: u64,
    pub duration_secs: f64,
    pub bytes_written: u64,
    /// Frames accepted by the writer but skipped by the encoder or muxer
    pub dropped_frames: u64,
    pub output_path: String,
}

impl RecordingStats {
    pub fn avg_bitrate(&self) -> f64 {
        if self.duration_secs > 0.0 {
            (self.bytes_written as f64 * 8.0) / self.duration_secs
        } else {
            0.0
        }
    }
}
