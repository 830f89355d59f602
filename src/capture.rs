//! Capture-side plumbing: a shareable chunker handle and the fan-out that
//! feeds each captured frame to face detection and to the chunker.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::chunker::{ChunkerState, StillFrameCallback, VideoChunker};
use crate::types::Frame;
use crate::writer::MediaWriter;

/// Receives frames from a capture pipeline
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: &Frame);
}

/// Sees every frame before it is recorded (e.g. a face detector).
pub trait FrameObserver: Send {
    fn observe(&mut self, frame: &Frame);
}

impl<F> FrameObserver for F
where
    F: FnMut(&Frame) + Send,
{
    fn observe(&mut self, frame: &Frame) {
        self(frame)
    }
}

/// A chunker shared between the capture thread and a controller.
///
/// Callbacks run on the calling thread after the internal lock is released,
/// so they may call back into the handle.
pub struct ChunkerHandle<W: MediaWriter> {
    inner: Arc<Mutex<VideoChunker<W>>>,
}

impl<W: MediaWriter> Clone for ChunkerHandle<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W: MediaWriter> ChunkerHandle<W> {
    pub fn new(chunker: VideoChunker<W>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chunker)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VideoChunker<W>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn start(&self) {
        let delivery = self.lock().start_inner();
        if let Some(delivery) = delivery {
            delivery.deliver();
        }
    }

    pub fn consume(&self, frame: &Frame) {
        let delivery = self.lock().consume_inner(frame);
        if let Some(delivery) = delivery {
            delivery.deliver();
        }
    }

    pub fn finish(&self, callback: StillFrameCallback) {
        self.lock().finish(callback);
    }

    pub fn state(&self) -> ChunkerState {
        self.lock().state()
    }

    /// Run `f` with the chunker locked
    pub fn with_chunker<R>(&self, f: impl FnOnce(&VideoChunker<W>) -> R) -> R {
        f(&self.lock())
    }
}

impl<W: MediaWriter + 'static> FrameSink for ChunkerHandle<W> {
    fn on_frame(&self, frame: &Frame) {
        self.consume(frame);
    }
}

/// Capture output delegate: every frame goes to the observer, then to the
/// chunker.
pub struct SampleCapturer<O: FrameObserver, W: MediaWriter> {
    observer: Mutex<O>,
    chunker: ChunkerHandle<W>,
}

impl<O: FrameObserver, W: MediaWriter> SampleCapturer<O, W> {
    pub fn new(observer: O, chunker: ChunkerHandle<W>) -> Self {
        Self {
            observer: Mutex::new(observer),
            chunker,
        }
    }

    pub fn chunker(&self) -> &ChunkerHandle<W> {
        &self.chunker
    }

    pub fn capture(&self, frame: &Frame) {
        self.observer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .observe(frame);
        self.chunker.consume(frame);
    }
}

impl<O: FrameObserver, W: MediaWriter + 'static> FrameSink for SampleCapturer<O, W> {
    fn on_frame(&self, frame: &Frame) {
        self.capture(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingWriter, SyntheticCamera};
    use crate::types::PixelFormat;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_handle_across_threads() {
        let writer = RecordingWriter::new();
        let handle = ChunkerHandle::new(VideoChunker::new(writer.clone()));
        handle.start();

        let producer = handle.clone();
        let thread = std::thread::spawn(move || {
            let mut camera = SyntheticCamera::new(8, 8, 30.0, PixelFormat::Rgb24);
            for _ in 0..20 {
                producer.on_frame(&camera.next_frame());
            }
        });
        thread.join().unwrap();

        assert_eq!(writer.appended().len(), 20);
        assert_eq!(handle.with_chunker(|c| c.appended_frames()), 20);
    }

    #[test]
    fn test_callback_may_reenter_handle() {
        let handle = ChunkerHandle::new(VideoChunker::new(RecordingWriter::new()));
        handle.start();

        let (tx, rx) = mpsc::channel();
        let reentrant = handle.clone();
        handle.finish(Box::new(move |_still| {
            tx.send(reentrant.state()).unwrap();
        }));

        let mut camera = SyntheticCamera::new(8, 8, 30.0, PixelFormat::Rgb24);
        handle.consume(&camera.next_frame());
        assert_eq!(rx.try_recv().unwrap(), ChunkerState::Complete);
    }

    #[test]
    fn test_sample_capturer_fans_out() {
        let writer = RecordingWriter::new();
        let handle = ChunkerHandle::new(VideoChunker::new(writer.clone()));
        let seen = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&seen);
        let capturer = SampleCapturer::new(
            move |_frame: &Frame| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            handle.clone(),
        );

        let mut camera = SyntheticCamera::new(8, 8, 30.0, PixelFormat::Rgb24);
        capturer.capture(&camera.next_frame());
        handle.start();
        capturer.capture(&camera.next_frame());
        capturer.capture(&camera.next_frame());

        // The observer sees every frame; only frames after start are written.
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(writer.appended().len(), 2);
    }
}
