//! MP4 media writer: openh264 encoding and muxide muxing on a worker thread

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use muxide::api::{Metadata, MuxerBuilder, VideoCodec};

use super::config::{RecordingConfig, RecordingStats};
use super::encoder::H264Encoder;
use crate::errors::ChunkerError;
use crate::timing::MediaTime;
use crate::types::PixelBuffer;
use crate::writer::{FinishCallback, MediaWriter, WriterStatus};

type Muxer = muxide::api::Muxer<BufWriter<File>>;

struct PendingFrame {
    buffer: PixelBuffer,
    pts_secs: f64,
}

struct SharedState {
    status: WriterStatus,
    stats: Option<RecordingStats>,
    on_done: Option<FinishCallback>,
}

struct Shared {
    state: Mutex<SharedState>,
    cv: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: WriterStatus) {
        self.lock().status = status;
        self.cv.notify_all();
    }
}

/// Writes H.264 video into an MP4 file.
///
/// Samples are handed to a worker thread through a bounded queue; a full
/// queue is reported as "not ready for more media data".
pub struct Mp4Writer {
    output_path: PathBuf,
    config: RecordingConfig,
    shared: Arc<Shared>,
    sender: Option<Sender<PendingFrame>>,
    worker: Option<JoinHandle<()>>,
    origin: MediaTime,
    last_pts: Option<MediaTime>,
}

impl Mp4Writer {
    /// Prepare a writer for `output_path`. Nothing is created on disk until
    /// the session is opened.
    pub fn new<P: AsRef<Path>>(output_path: P, config: RecordingConfig) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
            config,
            shared: Arc::new(Shared {
                state: Mutex::new(SharedState {
                    status: WriterStatus::Unknown,
                    stats: None,
                    on_done: None,
                }),
                cv: Condvar::new(),
            }),
            sender: None,
            worker: None,
            origin: MediaTime::ZERO,
            last_pts: None,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn config(&self) -> &RecordingConfig {
        &self.config
    }

    /// Block until the container is finalized or `timeout` elapses.
    ///
    /// Returns the recording statistics when finalization succeeded.
    pub fn wait_for_completion(&self, timeout: Duration) -> Option<RecordingStats> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        loop {
            match state.status {
                WriterStatus::Completed => return state.stats.clone(),
                WriterStatus::Failed | WriterStatus::Cancelled => return None,
                WriterStatus::Unknown if self.sender.is_none() && self.worker.is_none() => {
                    return None
                }
                _ => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .shared
                .cv
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }
}

impl MediaWriter for Mp4Writer {
    fn open_session(&mut self, origin: MediaTime) -> Result<(), ChunkerError> {
        let status = self.status();
        if status != WriterStatus::Unknown {
            return Err(ChunkerError::WriterNotOpen(format!(
                "session cannot be opened from status {}",
                status
            )));
        }

        // Encoder and muxer live on the worker; setup errors are reported
        // back so the caller sees them synchronously.
        let (ready_tx, ready_rx) = bounded::<Result<(), ChunkerError>>(1);
        let (tx, rx) = bounded::<PendingFrame>(self.config.queue_depth.max(1));
        let shared = Arc::clone(&self.shared);
        let config = self.config.clone();
        let output_path = self.output_path.clone();

        let worker = std::thread::Builder::new()
            .name("mp4-writer".to_string())
            .spawn(move || {
                let setup =
                    H264Encoder::new(config.width, config.height, config.fps, config.bitrate)
                    .and_then(|encoder| Ok((encoder, build_muxer(&output_path, &config)?)));
                match setup {
                    Ok((encoder, muxer)) => {
                        let _ = ready_tx.send(Ok(()));
                        let output_path = output_path.to_string_lossy().to_string();
                        run_worker(encoder, muxer, rx, shared, output_path);
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| ChunkerError::IoError(format!("Failed to spawn writer thread: {}", e)))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                self.shared.set_status(WriterStatus::Failed);
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                self.shared.set_status(WriterStatus::Failed);
                return Err(ChunkerError::EncodingError(
                    "Writer thread exited during setup".to_string(),
                ));
            }
        }

        self.origin = origin;
        self.sender = Some(tx);
        self.worker = Some(worker);
        self.shared.set_status(WriterStatus::Writing);
        log::info!(
            "Opened MP4 session at {:?} ({}x{} @ {} fps)",
            self.output_path,
            self.config.width,
            self.config.height,
            self.config.fps
        );
        Ok(())
    }

    fn is_ready_for_more_media_data(&self) -> bool {
        match &self.sender {
            Some(sender) => self.status() == WriterStatus::Writing && !sender.is_full(),
            None => false,
        }
    }

    fn append(
        &mut self,
        buffer: &PixelBuffer,
        presentation_time: MediaTime,
    ) -> Result<(), ChunkerError> {
        let status = self.status();
        let sender = match (&self.sender, status) {
            (Some(sender), WriterStatus::Writing) => sender,
            _ => {
                return Err(ChunkerError::WriterNotOpen(format!(
                    "cannot append while {}",
                    status
                )))
            }
        };

        if buffer.width() != self.config.width || buffer.height() != self.config.height {
            return Err(ChunkerError::InvalidFrame(format!(
                "Frame dimensions {}x{} don't match recording config {}x{}",
                buffer.width(),
                buffer.height(),
                self.config.width,
                self.config.height
            )));
        }

        if presentation_time < self.origin {
            return Err(ChunkerError::InvalidFrame(format!(
                "Presentation time {} precedes session origin {}",
                presentation_time, self.origin
            )));
        }
        if let Some(last) = self.last_pts {
            if presentation_time <= last {
                return Err(ChunkerError::InvalidFrame(format!(
                    "Presentation time {} is not after previous {}",
                    presentation_time, last
                )));
            }
        }

        let pts_secs = presentation_time.seconds() - self.origin.seconds();
        let pending = PendingFrame {
            buffer: buffer.clone(),
            pts_secs,
        };

        match sender.try_send(pending) {
            Ok(()) => {
                self.last_pts = Some(presentation_time);
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(ChunkerError::WriterBusy),
            Err(TrySendError::Disconnected(_)) => Err(ChunkerError::WriterNotOpen(
                "writer thread has stopped".to_string(),
            )),
        }
    }

    fn finish_writing(&mut self, on_done: FinishCallback) {
        match self.sender.take() {
            Some(sender) => {
                // Dropping the sender lets the worker drain the queue and finalize.
                self.shared.lock().on_done = Some(on_done);
                drop(sender);
                log::debug!("Requested finalization of {:?}", self.output_path);
            }
            None => {
                let status = {
                    let mut state = self.shared.lock();
                    if state.status == WriterStatus::Unknown {
                        state.status = WriterStatus::Cancelled;
                    }
                    state.status
                };
                self.shared.cv.notify_all();
                on_done(status);
            }
        }
    }

    fn status(&self) -> WriterStatus {
        self.shared.lock().status
    }
}

impl Drop for Mp4Writer {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("MP4 writer thread panicked");
            }
        }
    }
}

fn build_muxer(output_path: &Path, config: &RecordingConfig) -> Result<Muxer, ChunkerError> {
    let file = File::create(output_path).map_err(|e| {
        ChunkerError::IoError(format!(
            "Failed to create output file {:?}: {}",
            output_path, e
        ))
    })?;
    let writer = BufWriter::new(file);

    let mut metadata = Metadata::new().with_current_time();
    if let Some(ref title) = config.title {
        metadata = metadata.with_title(title);
    }

    MuxerBuilder::new(writer)
        .video(VideoCodec::H264, config.width, config.height, config.fps)
        .with_fast_start(config.fast_start)
        .with_metadata(metadata)
        .build()
        .map_err(|e| ChunkerError::MuxingError(format!("Failed to create muxer: {}", e)))
}

fn run_worker(
    mut encoder: H264Encoder,
    mut muxer: Muxer,
    rx: Receiver<PendingFrame>,
    shared: Arc<Shared>,
    output_path: String,
) {
    let mut dropped_frames = 0u64;
    let mut failed = false;

    for frame in rx.iter() {
        if failed {
            dropped_frames += 1;
            continue;
        }

        let encoded = match encoder.encode(&frame.buffer) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("Dropping frame at {:.3}s: {}", frame.pts_secs, e);
                dropped_frames += 1;
                continue;
            }
        };

        // The encoder may skip frames under rate control.
        if encoded.data.is_empty() {
            dropped_frames += 1;
            continue;
        }

        if let Err(e) = muxer.write_video(frame.pts_secs, &encoded.data, encoded.is_keyframe) {
            log::error!("Failed to write frame at {:.3}s: {}", frame.pts_secs, e);
            failed = true;
            shared.set_status(WriterStatus::Failed);
            dropped_frames += 1;
        }
    }

    let status = match muxer.finish_with_stats() {
        Ok(stats) if !failed => {
            let stats = RecordingStats {
                video_frames: stats.video_frames,
                duration_secs: stats.duration_secs,
                bytes_written: stats.bytes_written,
                dropped_frames,
                output_path,
            };
            log::info!(
                "Finalized {} ({} frames, {:.2}s, {} bytes)",
                stats.output_path,
                stats.video_frames,
                stats.duration_secs,
                stats.bytes_written
            );
            shared.lock().stats = Some(stats);
            WriterStatus::Completed
        }
        Ok(_) => WriterStatus::Failed,
        Err(e) => {
            log::error!("Failed to finalize recording {}: {}", output_path, e);
            WriterStatus::Failed
        }
    };

    let on_done = {
        let mut state = shared.lock();
        state.status = status;
        state.on_done.take()
    };
    shared.cv.notify_all();

    if let Some(on_done) = on_done {
        on_done(status);
    }
}
