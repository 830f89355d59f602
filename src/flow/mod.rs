//! Headless controller for a face liveness check.
//!
//! Tracks which screen the host UI should show, turns permission and
//! session results into transitions, and maps failures to
//! [`FaceLivenessDetectionError`]. Rendering is left to the host.

pub mod errors;
pub mod permissions;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::ChunkerHandle;
use crate::chunker::StillFrameCallback;
use crate::config::LivenessConfig;
use crate::still::StillImage;
use crate::writer::MediaWriter;

pub use errors::{
    map_liveness_error, map_session_error, FaceLivenessDetectionError, LivenessError,
    SessionError, NORMAL_CLOSURE,
};
pub use permissions::{PermissionAction, PermissionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayState {
    AwaitingCameraPermission,
    AwaitingLivenessSession,
    DisplayingGetReadyView,
    DisplayingLiveness,
}

/// Progress reported by the liveness check while it is on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessState {
    InProgress,
    Completed,
    EncounteredUnrecoverableError(LivenessError),
}

/// How a check ended, and how the service connection should be closed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowOutcome {
    pub result: Result<(), FaceLivenessDetectionError>,
    /// Close code for the service socket, when it must be closed by us
    pub close_code: Option<u16>,
}

pub struct LivenessFlow {
    session_id: String,
    display_state: DisplayState,
    disable_start_view: bool,
    showing_permission_alert: bool,
    outcome: Option<FlowOutcome>,
}

impl LivenessFlow {
    pub fn new(session_id: impl Into<String>, disable_start_view: bool) -> Self {
        Self {
            session_id: session_id.into(),
            display_state: DisplayState::AwaitingCameraPermission,
            disable_start_view,
            showing_permission_alert: false,
            outcome: None,
        }
    }

    /// Build a flow using the `[flow]` section of `config`
    pub fn from_config(session_id: impl Into<String>, config: &LivenessConfig) -> Self {
        Self::new(session_id, config.flow.disable_start_view)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn display_state(&self) -> DisplayState {
        self.display_state
    }

    pub fn is_showing_permission_alert(&self) -> bool {
        self.showing_permission_alert
    }

    pub fn outcome(&self) -> Option<&FlowOutcome> {
        self.outcome.as_ref()
    }

    pub fn check_camera_permission(&mut self, status: PermissionStatus) -> PermissionAction {
        let action = status.action();
        match action {
            PermissionAction::Proceed => {
                self.display_state = DisplayState::AwaitingLivenessSession;
            }
            PermissionAction::ShowPermissionAlert => {
                self.showing_permission_alert = true;
            }
            PermissionAction::RequestAccess => {}
        }
        log::debug!(
            "Camera permission {} for session {}: {:?}",
            status,
            self.session_id,
            action
        );
        action
    }

    /// Result of the access prompt triggered by `RequestAccess`
    pub fn on_access_requested(&mut self, granted: bool) {
        if granted && self.display_state == DisplayState::AwaitingCameraPermission {
            self.display_state = DisplayState::AwaitingLivenessSession;
        }
    }

    /// Wait for the remote session to start, then move to the next screen.
    ///
    /// Returns `Ok(None)` if the flow is not waiting for a session.
    pub async fn await_session<S, F>(
        &mut self,
        session: F,
    ) -> Result<Option<S>, FaceLivenessDetectionError>
    where
        F: Future<Output = Result<S, SessionError>>,
    {
        if self.display_state != DisplayState::AwaitingLivenessSession {
            return Ok(None);
        }
        let next = if self.disable_start_view {
            DisplayState::DisplayingLiveness
        } else {
            DisplayState::DisplayingGetReadyView
        };

        match session.await {
            Ok(session) => {
                log::info!("Liveness session {} started", self.session_id);
                self.display_state = next;
                Ok(Some(session))
            }
            Err(e) => {
                log::warn!("Liveness session {} failed to start: {}", self.session_id, e);
                Err(FaceLivenessDetectionError::AccessDenied)
            }
        }
    }

    /// The user pressed "begin" on the get-ready screen
    pub fn begin(&mut self) -> bool {
        if self.display_state != DisplayState::DisplayingGetReadyView {
            return false;
        }
        self.display_state = DisplayState::DisplayingLiveness;
        true
    }

    /// Feed a liveness state update. Returns the outcome the first time the
    /// check reaches a terminal state.
    pub fn on_liveness_state(&mut self, state: &LivenessState) -> Option<FlowOutcome> {
        if self.outcome.is_some() || self.display_state != DisplayState::DisplayingLiveness {
            return None;
        }
        let outcome = match state {
            LivenessState::InProgress => return None,
            LivenessState::Completed => FlowOutcome {
                result: Ok(()),
                close_code: None,
            },
            LivenessState::EncounteredUnrecoverableError(error) => FlowOutcome {
                result: Err(map_liveness_error(error)),
                close_code: Some(error.web_socket_close_code().unwrap_or(NORMAL_CLOSURE)),
            },
        };
        log::info!(
            "Liveness session {} finished: {:?}",
            self.session_id,
            outcome.result
        );
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }

    /// The user closed the check
    pub fn close(&mut self) -> Option<FlowOutcome> {
        if self.outcome.is_some() {
            return None;
        }
        let outcome = FlowOutcome {
            result: Err(FaceLivenessDetectionError::UserCancelled),
            close_code: None,
        };
        self.outcome = Some(outcome.clone());
        Some(outcome)
    }
}

/// Holds the frame captured when recording starts, for the host UI
#[derive(Clone, Default)]
pub struct FinalImageSlot {
    image: Arc<Mutex<Option<StillImage>>>,
}

impl FinalImageSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that stores the image it receives in this slot
    pub fn callback(&self) -> StillFrameCallback {
        let slot = Arc::clone(&self.image);
        Box::new(move |image| {
            *slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(image);
        })
    }

    pub fn get(&self) -> Option<StillImage> {
        self.image.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn take(&self) -> Option<StillImage> {
        self.image.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

/// Finish recording and wait up to `timeout` for the final still frame.
///
/// The chunker delivers the frame only when another frame arrives, so the
/// capture pipeline must keep running while this is awaited.
pub async fn request_final_frame<W: MediaWriter + 'static>(
    handle: &ChunkerHandle<W>,
    timeout: Duration,
) -> Option<StillImage> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    handle.finish(Box::new(move |still| {
        let _ = tx.send(still);
    }));

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(still)) => Some(still),
        Ok(Err(_)) => {
            log::debug!("Final frame request was superseded");
            None
        }
        Err(_) => {
            log::warn!("No final frame within {:?}", timeout);
            None
        }
    }
}
