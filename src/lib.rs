//! Face liveness capture: records the live camera feed of a face liveness
//! check into a single video container and extracts a still frame when the
//! check ends.
//!
//! # Features
//! - `VideoChunker` state machine with timestamp rebasing and backpressure
//! - Pluggable `MediaWriter` capability, with an H.264/MP4 implementation
//! - Still frame extraction to JPEG/PNG
//! - Headless liveness flow controller (permissions, screens, error mapping)
//!
//! # Usage
//! ```rust,ignore
//! use face_liveness_capture::recording::{Mp4Writer, RecordingConfig};
//! use face_liveness_capture::{ChunkerHandle, VideoChunker};
//!
//! let writer = Mp4Writer::new("session.mp4", RecordingConfig::new(480, 640, 30.0));
//! let chunker = ChunkerHandle::new(VideoChunker::new(writer));
//! chunker.start();
//! // camera callback: chunker.consume(&frame);
//! chunker.finish(Box::new(|still| { let _ = still.save("final.jpg", 90); }));
//! ```
pub mod capture;
pub mod chunker;
pub mod config;
pub mod errors;
pub mod flow;
pub mod still;
pub mod timing;
pub mod types;
pub mod writer;

#[cfg(feature = "recording")]
pub mod recording;

// Testing utilities - in-memory writer and synthetic frames
pub mod testing;

pub use capture::{ChunkerHandle, FrameObserver, FrameSink, SampleCapturer};
pub use chunker::{ChunkerState, PreviewSource, StillFrameCallback, StillRenderer, VideoChunker};
pub use config::LivenessConfig;
pub use errors::ChunkerError;
pub use still::{render_still, StillImage};
pub use timing::{MediaTime, PRESENTATION_TIMESCALE};
pub use types::{Frame, PixelBuffer, PixelFormat};
pub use writer::{FinishCallback, MediaWriter, WriterStatus};

/// Initialize logging
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "face_liveness_capture=info");
    }
    let _ = env_logger::try_init();
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        recording: cfg!(feature = "recording"),
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Whether the MP4 writer is compiled in
    pub recording: bool,
}
