//! Property-based tests for the video chunker state machine
//!
//! Driven against the in-memory `RecordingWriter` so every property checks
//! exactly what reached the writer.
//!
//! Run with: cargo test --test chunker_props

use face_liveness_capture::testing::{synthetic_pixel_buffer, RecordingWriter};
use face_liveness_capture::{
    ChunkerState, Frame, MediaTime, MediaWriter, PixelFormat, VideoChunker, WriterStatus,
    PRESENTATION_TIMESCALE,
};
use proptest::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

fn frame_at_nanos(n: u64, nanos: i64) -> Frame {
    Frame::new(
        synthetic_pixel_buffer(n, 8, 6, PixelFormat::Rgb24),
        MediaTime::from_nanos(nanos),
    )
}

/// Non-decreasing capture timestamps in nanoseconds, starting anywhere
fn capture_times() -> impl Strategy<Value = Vec<i64>> {
    (
        0i64..10_000_000_000,
        prop::collection::vec(0i64..100_000_000, 1..40),
    )
        .prop_map(|(start, gaps)| {
            gaps.iter()
                .scan(start, |t, gap| {
                    *t += gap;
                    Some(*t)
                })
                .collect()
        })
}

// ═══════════════════════════════════════════════════════════════════════════
// STATE MACHINE INVARIANTS
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// INVARIANT: Nothing is written before start, and the chunker stays pending
    #[test]
    fn consume_before_start_writes_nothing(times in capture_times()) {
        let writer = RecordingWriter::new();
        let mut chunker = VideoChunker::new(writer.clone());

        for (n, t) in times.iter().enumerate() {
            chunker.consume(&frame_at_nanos(n as u64, *t));
        }

        prop_assert_eq!(chunker.state(), ChunkerState::Pending);
        prop_assert!(writer.appended().is_empty());
        prop_assert_eq!(writer.open_count(), 0);
        prop_assert!(chunker.session_origin().is_none());
    }

    /// INVARIANT: The first written frame fixes the origin and every
    /// presentation time is its capture time minus that origin
    #[test]
    fn presentation_times_are_rebased(times in capture_times()) {
        let writer = RecordingWriter::new();
        let mut chunker = VideoChunker::new(writer.clone());
        chunker.start();

        for (n, t) in times.iter().enumerate() {
            chunker.consume(&frame_at_nanos(n as u64, *t));
        }

        let origin = MediaTime::from_nanos(times[0]);
        prop_assert_eq!(chunker.session_origin(), Some(origin));

        let appended = writer.appended();
        prop_assert_eq!(appended.len(), times.len());
        prop_assert_eq!(appended[0].presentation_time, MediaTime::ZERO);

        for (sample, t) in appended.iter().zip(&times) {
            let expected = MediaTime::from_nanos(*t)
                .checked_sub(origin, PRESENTATION_TIMESCALE)
                .unwrap();
            prop_assert_eq!(sample.presentation_time, expected);
            prop_assert_eq!(sample.presentation_time.timescale(), PRESENTATION_TIMESCALE);
        }
        for pair in appended.windows(2) {
            prop_assert!(pair[0].presentation_time <= pair[1].presentation_time);
        }
    }

    /// INVARIANT: start is idempotent
    #[test]
    fn repeated_start_opens_once(extra_starts in 1usize..5, times in capture_times()) {
        let writer = RecordingWriter::new();
        let mut chunker = VideoChunker::new(writer.clone());
        chunker.start();
        chunker.consume(&frame_at_nanos(0, times[0]));

        for _ in 0..extra_starts {
            chunker.start();
        }

        prop_assert_eq!(writer.open_count(), 1);
        prop_assert_eq!(chunker.state(), ChunkerState::Writing);
        prop_assert_eq!(chunker.session_origin(), Some(MediaTime::from_nanos(times[0])));
    }

    /// INVARIANT: After finish, the next frame fires the callback exactly
    /// once and nothing more is appended
    #[test]
    fn finish_delivers_next_frame_once(
        before in capture_times(),
        after in 1usize..10,
    ) {
        let writer = RecordingWriter::new();
        let mut chunker = VideoChunker::new(writer.clone());
        chunker.start();
        for (n, t) in before.iter().enumerate() {
            chunker.consume(&frame_at_nanos(n as u64, *t));
        }
        let appended_before = writer.appended().len();

        let calls = Arc::new(AtomicU32::new(0));
        let seen = Arc::new(Mutex::new(None));
        {
            let calls = Arc::clone(&calls);
            let seen = Arc::clone(&seen);
            chunker.finish(Box::new(move |still| {
                calls.fetch_add(1, Ordering::SeqCst);
                *seen.lock().unwrap() = Some((still.width(), still.height()));
            }));
        }
        prop_assert_eq!(chunker.state(), ChunkerState::AwaitingSingleFrame);
        prop_assert_eq!(calls.load(Ordering::SeqCst), 0);

        let last = *before.last().unwrap();
        for i in 0..after {
            chunker.consume(&frame_at_nanos(1000 + i as u64, last + 1 + i as i64));
        }

        prop_assert_eq!(calls.load(Ordering::SeqCst), 1);
        prop_assert_eq!(*seen.lock().unwrap(), Some((8, 6)));
        prop_assert_eq!(chunker.state(), ChunkerState::Complete);
        prop_assert_eq!(writer.appended().len(), appended_before);
        prop_assert!(!chunker.has_pending_still_request());
    }

    /// INVARIANT: A writer that already completed is not asked to finalize again
    #[test]
    fn finish_skips_completed_writer(finishes in 1usize..4) {
        let writer = RecordingWriter::new();
        let mut chunker = VideoChunker::new(writer.clone());
        chunker.start();
        chunker.consume(&frame_at_nanos(0, 0));

        for _ in 0..finishes {
            chunker.finish(Box::new(|_| {}));
        }

        // The first finish completes the in-memory writer synchronously.
        prop_assert_eq!(writer.status(), WriterStatus::Completed);
        prop_assert_eq!(writer.finish_count(), 1);
    }

    /// INVARIANT: Frames arriving while the writer is busy are dropped
    /// without blocking, and writing resumes when it is ready again
    #[test]
    fn busy_writer_drops_frames(
        pattern in prop::collection::vec(any::<bool>(), 1..40),
    ) {
        let writer = RecordingWriter::new();
        let mut chunker = VideoChunker::new(writer.clone());
        chunker.start();

        for (n, ready) in pattern.iter().enumerate() {
            writer.set_ready(*ready);
            chunker.consume(&frame_at_nanos(n as u64, n as i64 * 33_333_333));
        }

        let expected_written = pattern.iter().filter(|r| **r).count();
        prop_assert_eq!(writer.appended().len(), expected_written);
        prop_assert_eq!(chunker.appended_frames(), expected_written as u64);
        prop_assert_eq!(
            chunker.dropped_frames(),
            (pattern.len() - expected_written) as u64
        );
        prop_assert_eq!(chunker.state(), ChunkerState::Writing);

        // The origin comes from the first frame the writer accepted.
        if let Some(first_ready) = pattern.iter().position(|r| *r) {
            prop_assert_eq!(
                chunker.session_origin(),
                Some(MediaTime::from_nanos(first_ready as i64 * 33_333_333))
            );
            prop_assert_eq!(writer.appended()[0].presentation_time, MediaTime::ZERO);
        } else {
            prop_assert!(chunker.session_origin().is_none());
        }
    }
}
