//! Media writer capability consumed by the chunker
//!
//! A writer muxes timestamped pixel buffers into a container. The chunker
//! only relies on the operations below, so platform muxers and test doubles
//! are interchangeable.

use serde::{Deserialize, Serialize};

use crate::errors::ChunkerError;
use crate::timing::MediaTime;
use crate::types::PixelBuffer;

/// Lifecycle of a media writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriterStatus {
    /// Not opened yet
    Unknown,
    /// Session open, accepting samples
    Writing,
    /// Container finalized and closed
    Completed,
    /// A write or finalize step failed; no more samples are accepted
    Failed,
    /// Finalize was requested before a session was ever opened
    Cancelled,
}

impl std::fmt::Display for WriterStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WriterStatus::Unknown => "unknown",
            WriterStatus::Writing => "writing",
            WriterStatus::Completed => "completed",
            WriterStatus::Failed => "failed",
            WriterStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Called once finalization has finished, from whatever thread performed it
pub type FinishCallback = Box<dyn FnOnce(WriterStatus) + Send + 'static>;

pub trait MediaWriter: Send {
    /// Open the container and start a session whose timeline begins at `origin`
    fn open_session(&mut self, origin: MediaTime) -> Result<(), ChunkerError>;

    /// Backpressure signal: `false` means an append right now would be rejected
    fn is_ready_for_more_media_data(&self) -> bool;

    /// Append one image at a presentation time relative to the session origin
    fn append(
        &mut self,
        buffer: &PixelBuffer,
        presentation_time: MediaTime,
    ) -> Result<(), ChunkerError>;

    /// Flush and close the container without blocking the caller
    fn finish_writing(&mut self, on_done: FinishCallback);

    fn status(&self) -> WriterStatus;
}

impl<W: MediaWriter + ?Sized> MediaWriter for Box<W> {
    fn open_session(&mut self, origin: MediaTime) -> Result<(), ChunkerError> {
        (**self).open_session(origin)
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        (**self).is_ready_for_more_media_data()
    }

    fn append(
        &mut self,
        buffer: &PixelBuffer,
        presentation_time: MediaTime,
    ) -> Result<(), ChunkerError> {
        (**self).append(buffer, presentation_time)
    }

    fn finish_writing(&mut self, on_done: FinishCallback) {
        (**self).finish_writing(on_done)
    }

    fn status(&self) -> WriterStatus {
        (**self).status()
    }
}
