//! In-memory media writer that records what the chunker asks of it

use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::ChunkerError;
use crate::timing::MediaTime;
use crate::types::{PixelBuffer, PixelFormat};
use crate::writer::{FinishCallback, MediaWriter, WriterStatus};

/// One append as seen by the writer
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedSample {
    pub presentation_time: MediaTime,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub first_byte: u8,
}

struct Inner {
    status: WriterStatus,
    ready: bool,
    fail_open: bool,
    complete_on_finish: bool,
    opened_at: Option<MediaTime>,
    open_count: u32,
    finish_count: u32,
    appended: Vec<AppendedSample>,
}

/// Cloneable handle; clones share the same recorded state so a test can
/// keep one while the chunker owns another.
#[derive(Clone)]
pub struct RecordingWriter {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                status: WriterStatus::Unknown,
                ready: true,
                fail_open: false,
                complete_on_finish: true,
                opened_at: None,
                open_count: 0,
                finish_count: 0,
                appended: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Toggle the backpressure signal
    pub fn set_ready(&self, ready: bool) {
        self.lock().ready = ready;
    }

    pub fn set_status(&self, status: WriterStatus) {
        self.lock().status = status;
    }

    /// Make the next `open_session` fail
    pub fn fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// When false, `finish_writing` leaves the status at `Writing` and never
    /// calls back, like a writer whose finalization is still in flight.
    pub fn complete_on_finish(&self, complete: bool) {
        self.lock().complete_on_finish = complete;
    }

    pub fn appended(&self) -> Vec<AppendedSample> {
        self.lock().appended.clone()
    }

    pub fn open_count(&self) -> u32 {
        self.lock().open_count
    }

    pub fn finish_count(&self) -> u32 {
        self.lock().finish_count
    }

    pub fn opened_at(&self) -> Option<MediaTime> {
        self.lock().opened_at
    }
}

impl Default for RecordingWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaWriter for RecordingWriter {
    fn open_session(&mut self, origin: MediaTime) -> Result<(), ChunkerError> {
        let mut inner = self.lock();
        inner.open_count += 1;
        if inner.fail_open {
            inner.status = WriterStatus::Failed;
            return Err(ChunkerError::IoError("open refused".to_string()));
        }
        inner.status = WriterStatus::Writing;
        inner.opened_at = Some(origin);
        Ok(())
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        let inner = self.lock();
        inner.ready && inner.status == WriterStatus::Writing
    }

    fn append(
        &mut self,
        buffer: &PixelBuffer,
        presentation_time: MediaTime,
    ) -> Result<(), ChunkerError> {
        let mut inner = self.lock();
        if inner.status != WriterStatus::Writing {
            return Err(ChunkerError::WriterNotOpen(inner.status.to_string()));
        }
        if !inner.ready {
            return Err(ChunkerError::WriterBusy);
        }
        inner.appended.push(AppendedSample {
            presentation_time,
            width: buffer.width(),
            height: buffer.height(),
            format: buffer.format(),
            first_byte: buffer.data().first().copied().unwrap_or_default(),
        });
        Ok(())
    }

    fn finish_writing(&mut self, on_done: FinishCallback) {
        let status = {
            let mut inner = self.lock();
            inner.finish_count += 1;
            if !inner.complete_on_finish {
                return;
            }
            inner.status = WriterStatus::Completed;
            inner.status
        };
        on_done(status);
    }

    fn status(&self) -> WriterStatus {
        self.lock().status
    }
}
