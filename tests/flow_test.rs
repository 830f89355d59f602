//! Liveness flow tests: session start, final frame retrieval, and outcomes

use face_liveness_capture::flow::{
    request_final_frame, DisplayState, FaceLivenessDetectionError, FinalImageSlot, LivenessError,
    LivenessFlow, LivenessState, PermissionAction, PermissionStatus, SessionError,
};
use face_liveness_capture::testing::{RecordingWriter, SyntheticCamera};
use face_liveness_capture::{ChunkerHandle, ChunkerState, PixelFormat, VideoChunker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn flow_awaiting_session(disable_start_view: bool) -> LivenessFlow {
    let mut flow = LivenessFlow::new("session-1", disable_start_view);
    assert_eq!(
        flow.check_camera_permission(PermissionStatus::Granted),
        PermissionAction::Proceed
    );
    flow
}

#[tokio::test]
async fn test_session_start_shows_get_ready_view() {
    let mut flow = flow_awaiting_session(false);
    let session = flow
        .await_session(async { Ok::<_, SessionError>("stream") })
        .await
        .unwrap();

    assert_eq!(session, Some("stream"));
    assert_eq!(flow.display_state(), DisplayState::DisplayingGetReadyView);
    assert!(flow.begin());
    assert_eq!(flow.display_state(), DisplayState::DisplayingLiveness);
}

#[tokio::test]
async fn test_session_start_skips_get_ready_view() {
    let mut flow = flow_awaiting_session(true);
    flow.await_session(async { Ok::<_, SessionError>(()) })
        .await
        .unwrap();
    assert_eq!(flow.display_state(), DisplayState::DisplayingLiveness);
    assert!(!flow.begin());
}

#[tokio::test]
async fn test_session_start_is_guarded() {
    let mut flow = flow_awaiting_session(true);
    flow.await_session(async { Ok::<_, SessionError>(1) })
        .await
        .unwrap();

    let polled = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&polled);
    let again = flow
        .await_session(async move {
            flag.store(true, Ordering::SeqCst);
            Ok::<_, SessionError>(2)
        })
        .await
        .unwrap();

    assert_eq!(again, None);
    assert!(!polled.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_session_failure_is_access_denied() {
    let mut flow = flow_awaiting_session(false);
    let result = flow
        .await_session(async { Err::<(), _>(SessionError::Other("tls".to_string())) })
        .await;

    assert_eq!(result, Err(FaceLivenessDetectionError::AccessDenied));
    assert_eq!(flow.display_state(), DisplayState::AwaitingLivenessSession);
}

#[tokio::test]
async fn test_liveness_outcomes() {
    let mut flow = flow_awaiting_session(true);
    flow.await_session(async { Ok::<_, SessionError>(()) })
        .await
        .unwrap();

    assert!(flow.on_liveness_state(&LivenessState::InProgress).is_none());

    let outcome = flow
        .on_liveness_state(&LivenessState::EncounteredUnrecoverableError(
            LivenessError::TimedOut,
        ))
        .unwrap();
    assert_eq!(
        outcome.result,
        Err(FaceLivenessDetectionError::FaceInOvalMatchExceededTimeLimit)
    );
    assert_eq!(outcome.close_code, Some(4001));

    // Only the first terminal state is reported
    assert!(flow.on_liveness_state(&LivenessState::Completed).is_none());
    assert!(flow.close().is_none());
    assert_eq!(flow.outcome(), Some(&outcome));
}

#[tokio::test]
async fn test_socket_closed_uses_normal_closure() {
    let mut flow = flow_awaiting_session(true);
    flow.await_session(async { Ok::<_, SessionError>(()) })
        .await
        .unwrap();

    let outcome = flow
        .on_liveness_state(&LivenessState::EncounteredUnrecoverableError(
            LivenessError::SocketClosed,
        ))
        .unwrap();
    assert_eq!(outcome.result, Err(FaceLivenessDetectionError::SocketClosed));
    assert_eq!(outcome.close_code, Some(1000));
}

#[tokio::test]
async fn test_request_final_frame_while_capturing() {
    let writer = RecordingWriter::new();
    let initial = FinalImageSlot::new();
    let camera = SyntheticCamera::new(32, 24, 30.0, PixelFormat::Nv12);
    let preview = camera.preview();
    let handle = ChunkerHandle::new(
        VideoChunker::new(writer.clone())
            .with_preview_source(Box::new(move || Some(preview.clone())))
            .with_initial_frame_callback(initial.callback()),
    );
    handle.start();
    assert!(initial.get().is_some());

    let producer = {
        let handle = handle.clone();
        thread::spawn(move || {
            let mut camera = camera;
            while handle.state() != ChunkerState::Complete {
                handle.consume(&camera.next_frame());
                thread::sleep(Duration::from_millis(1));
            }
        })
    };

    // Let a few frames reach the writer first
    while writer.appended().len() < 3 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let still = request_final_frame(&handle, Duration::from_secs(5))
        .await
        .expect("still frame before timeout");
    producer.join().unwrap();

    assert_eq!((still.width(), still.height()), (32, 24));
    assert_eq!(handle.state(), ChunkerState::Complete);
    assert_eq!(writer.finish_count(), 1);
}

#[tokio::test]
async fn test_request_final_frame_times_out_without_frames() {
    let handle = ChunkerHandle::new(VideoChunker::new(RecordingWriter::new()));
    handle.start();

    let still = request_final_frame(&handle, Duration::from_millis(50)).await;
    assert!(still.is_none());
    assert_eq!(handle.state(), ChunkerState::AwaitingSingleFrame);
}

#[tokio::test]
async fn test_superseded_request_resolves_to_none() {
    let handle = ChunkerHandle::new(VideoChunker::new(RecordingWriter::new()));
    handle.start();

    let first = {
        let handle = handle.clone();
        tokio::spawn(async move { request_final_frame(&handle, Duration::from_secs(5)).await })
    };
    while !handle.with_chunker(|c| c.has_pending_still_request()) {
        tokio::task::yield_now().await;
    }

    // A second finish replaces the first callback, which is dropped
    handle.finish(Box::new(|_| {}));
    assert_eq!(first.await.unwrap(), None);
}
