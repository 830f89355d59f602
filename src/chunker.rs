//! Video chunker: writes live frames into one container with rebased
//! timestamps and hands out a single still frame when the session ends.
//!
//! ```text
//!   Pending --start()--> Writing --finish(cb)--> AwaitingSingleFrame --consume()--> Complete
//! ```
//!
//! Per-frame problems (writer busy, missing pixel buffer, failed render) are
//! never reported to the caller. They are logged and counted, and recording
//! carries on.

use serde::{Deserialize, Serialize};

use crate::still::{render_still, StillImage};
use crate::timing::{MediaTime, PRESENTATION_TIMESCALE};
use crate::types::{Frame, PixelBuffer};
use crate::writer::{MediaWriter, WriterStatus};

/// One-shot receiver of a rendered still frame
pub type StillFrameCallback = Box<dyn FnOnce(StillImage) + Send + 'static>;

/// Supplies the most recent preview buffer, if the capture pipeline has one
pub type PreviewSource = Box<dyn Fn() -> Option<PixelBuffer> + Send + 'static>;

/// Turns a pixel buffer into a still image; `None` means it could not be rendered
pub type StillRenderer = Box<dyn Fn(&PixelBuffer) -> Option<StillImage> + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkerState {
    Pending,
    Writing,
    AwaitingSingleFrame,
    Complete,
}

impl std::fmt::Display for ChunkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChunkerState::Pending => "pending",
            ChunkerState::Writing => "writing",
            ChunkerState::AwaitingSingleFrame => "awaiting_single_frame",
            ChunkerState::Complete => "complete",
        };
        f.write_str(s)
    }
}

enum StillFrameRequest {
    NoPendingRequest,
    PendingStillFrame(StillFrameCallback),
}

/// A callback paired with the image it should receive. Invoking is left to
/// the caller so it can happen outside any lock.
pub(crate) struct StillDelivery {
    callback: StillFrameCallback,
    image: StillImage,
}

impl StillDelivery {
    pub(crate) fn deliver(self) {
        (self.callback)(self.image);
    }
}

pub struct VideoChunker<W: MediaWriter> {
    state: ChunkerState,
    writer: W,
    session_origin: Option<MediaTime>,
    still_request: StillFrameRequest,
    on_initial_frame: Option<StillFrameCallback>,
    preview_source: Option<PreviewSource>,
    renderer: StillRenderer,
    appended_frames: u64,
    dropped_frames: u64,
}

impl<W: MediaWriter> VideoChunker<W> {
    pub fn new(writer: W) -> Self {
        Self {
            state: ChunkerState::Pending,
            writer,
            session_origin: None,
            still_request: StillFrameRequest::NoPendingRequest,
            on_initial_frame: None,
            preview_source: None,
            renderer: Box::new(render_still),
            appended_frames: 0,
            dropped_frames: 0,
        }
    }

    /// Notify `callback` with a still frame captured when the session starts,
    /// if the preview source has one at that moment.
    pub fn with_initial_frame_callback(mut self, callback: StillFrameCallback) -> Self {
        self.on_initial_frame = Some(callback);
        self
    }

    pub fn with_preview_source(mut self, source: PreviewSource) -> Self {
        self.preview_source = Some(source);
        self
    }

    /// Replace the default renderer (`render_still`), e.g. to crop or
    /// mirror the still before it is handed out.
    pub fn with_still_renderer(mut self, renderer: StillRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn state(&self) -> ChunkerState {
        self.state
    }

    /// Capture timestamp of the first frame written in this session
    pub fn session_origin(&self) -> Option<MediaTime> {
        self.session_origin
    }

    pub fn appended_frames(&self) -> u64 {
        self.appended_frames
    }

    /// Frames that arrived while writing but never reached the container
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn has_pending_still_request(&self) -> bool {
        matches!(self.still_request, StillFrameRequest::PendingStillFrame(_))
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Open the container and begin accepting frames. No-op unless pending.
    pub fn start(&mut self) {
        if let Some(delivery) = self.start_inner() {
            delivery.deliver();
        }
    }

    /// Feed one captured frame. Safe to call in any state.
    pub fn consume(&mut self, frame: &Frame) {
        if let Some(delivery) = self.consume_inner(frame) {
            delivery.deliver();
        }
    }

    /// Stop writing, close the container in the background, and deliver the
    /// next consumed frame to `callback`.
    pub fn finish(&mut self, callback: StillFrameCallback) {
        if self.has_pending_still_request() {
            log::debug!("Replacing outstanding still frame request");
        }
        self.still_request = StillFrameRequest::PendingStillFrame(callback);
        self.state = ChunkerState::AwaitingSingleFrame;

        if self.writer.status() != WriterStatus::Completed {
            let appended = self.appended_frames;
            self.writer.finish_writing(Box::new(move |status| {
                log::debug!(
                    "Media writer finished with status {} after {} frames",
                    status,
                    appended
                );
            }));
        }
    }

    pub(crate) fn start_inner(&mut self) -> Option<StillDelivery> {
        if self.state != ChunkerState::Pending {
            return None;
        }

        if let Err(e) = self.writer.open_session(MediaTime::ZERO) {
            log::error!("Failed to open media writer session: {}", e);
        }
        self.state = ChunkerState::Writing;
        log::info!("Video chunker started");

        let image = self.capture_single_frame()?;
        let callback = self.on_initial_frame.take()?;
        Some(StillDelivery { callback, image })
    }

    pub(crate) fn consume_inner(&mut self, frame: &Frame) -> Option<StillDelivery> {
        match self.state {
            ChunkerState::AwaitingSingleFrame => self.take_single_frame(frame),
            ChunkerState::Writing => {
                self.write_frame(frame);
                None
            }
            ChunkerState::Pending | ChunkerState::Complete => None,
        }
    }

    fn take_single_frame(&mut self, frame: &Frame) -> Option<StillDelivery> {
        // Without a buffer the request stays armed for the next frame.
        let buffer = frame.pixel_buffer()?;
        let request = std::mem::replace(
            &mut self.still_request,
            StillFrameRequest::NoPendingRequest,
        );
        self.state = ChunkerState::Complete;

        let StillFrameRequest::PendingStillFrame(callback) = request else {
            return None;
        };
        match (self.renderer)(buffer) {
            Some(image) => {
                log::debug!(
                    "Captured final still frame {}x{} at {}",
                    image.width(),
                    image.height(),
                    frame.timestamp
                );
                Some(StillDelivery { callback, image })
            }
            None => {
                log::debug!("Final still frame could not be rendered; skipping delivery");
                None
            }
        }
    }

    fn write_frame(&mut self, frame: &Frame) {
        if !self.writer.is_ready_for_more_media_data() {
            self.dropped_frames += 1;
            log::trace!("Writer busy, dropping frame at {}", frame.timestamp);
            return;
        }

        let origin = *self.session_origin.get_or_insert(frame.timestamp);
        let Some(presentation_time) = frame
            .timestamp
            .checked_sub(origin, PRESENTATION_TIMESCALE)
        else {
            self.dropped_frames += 1;
            log::trace!("Cannot rebase frame at {} against {}", frame.timestamp, origin);
            return;
        };
        let Some(buffer) = frame.pixel_buffer() else {
            self.dropped_frames += 1;
            log::trace!("Frame at {} has no pixel buffer", frame.timestamp);
            return;
        };

        match self.writer.append(buffer, presentation_time) {
            Ok(()) => self.appended_frames += 1,
            Err(e) => {
                self.dropped_frames += 1;
                log::debug!("Dropping frame at {}: {}", presentation_time, e);
            }
        }
    }

    fn capture_single_frame(&self) -> Option<StillImage> {
        let source = self.preview_source.as_ref()?;
        let buffer = source()?;
        (self.renderer)(&buffer)
    }
}
