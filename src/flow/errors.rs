//! Errors surfaced by a face liveness check, and the mappings into the
//! single user-facing error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// WebSocket close code for a normal closure
pub const NORMAL_CLOSURE: u16 = 1000;

/// Why a face liveness check did not succeed, as reported to the host app
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FaceLivenessDetectionError {
    #[error("the user cancelled the face liveness check")]
    UserCancelled,
    #[error("the face did not fit the oval within the time limit")]
    FaceInOvalMatchExceededTimeLimit,
    #[error("the connection to the liveness service closed unexpectedly")]
    SocketClosed,
    #[error("the camera is not available")]
    CameraNotAvailable,
    #[error("camera permission was denied")]
    CameraPermissionDenied,
    #[error("the liveness service region is invalid")]
    InvalidRegion,
    #[error("access to the liveness session was denied")]
    AccessDenied,
    #[error("the liveness session request failed validation")]
    Validation,
    #[error("the liveness service reported an internal error")]
    InternalServer,
    #[error("the liveness service throttled the request")]
    Throttling,
    #[error("the liveness service quota was exceeded")]
    ServiceQuotaExceeded,
    #[error("the liveness service is unavailable")]
    ServiceUnavailable,
    #[error("the liveness session was not found")]
    SessionNotFound,
    #[error("the request signature was rejected")]
    InvalidSignature,
    #[error("an unknown error occurred")]
    Unknown,
}

/// Failure while the liveness check itself is running
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LivenessError {
    #[error("user cancelled")]
    UserCancelled,
    #[error("view resigned")]
    ViewResignation,
    #[error("timed out")]
    TimedOut,
    #[error("socket closed")]
    SocketClosed,
    #[error("camera not available")]
    CameraNotAvailable,
    #[error("camera permission denied")]
    CameraPermissionDenied,
    #[error("could not open stream")]
    CouldNotOpenStream,
    #[error("unknown liveness error")]
    Unknown,
}

impl LivenessError {
    /// Close code to send when tearing down the service connection,
    /// if this error implies a specific one
    pub fn web_socket_close_code(&self) -> Option<u16> {
        match self {
            LivenessError::UserCancelled | LivenessError::ViewResignation => Some(4003),
            LivenessError::TimedOut => Some(4001),
            LivenessError::SocketClosed => None,
            LivenessError::CameraNotAvailable
            | LivenessError::CameraPermissionDenied
            | LivenessError::CouldNotOpenStream => Some(4005),
            LivenessError::Unknown => Some(4005),
        }
    }
}

/// Failure reported by the remote session when starting or completing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid region")]
    InvalidRegion,
    #[error("access denied")]
    AccessDenied,
    #[error("validation failed")]
    Validation,
    #[error("internal server error")]
    InternalServer,
    #[error("throttled")]
    Throttling,
    #[error("service quota exceeded")]
    ServiceQuotaExceeded,
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("session not found")]
    SessionNotFound,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("session error: {0}")]
    Other(String),
}

pub fn map_liveness_error(error: &LivenessError) -> FaceLivenessDetectionError {
    match error {
        LivenessError::UserCancelled | LivenessError::ViewResignation => {
            FaceLivenessDetectionError::UserCancelled
        }
        LivenessError::TimedOut => FaceLivenessDetectionError::FaceInOvalMatchExceededTimeLimit,
        LivenessError::SocketClosed => FaceLivenessDetectionError::SocketClosed,
        LivenessError::CameraNotAvailable => FaceLivenessDetectionError::CameraNotAvailable,
        _ => FaceLivenessDetectionError::CameraPermissionDenied,
    }
}

pub fn map_session_error(error: &SessionError) -> FaceLivenessDetectionError {
    match error {
        SessionError::InvalidRegion => FaceLivenessDetectionError::InvalidRegion,
        SessionError::AccessDenied => FaceLivenessDetectionError::AccessDenied,
        SessionError::Validation => FaceLivenessDetectionError::Validation,
        SessionError::InternalServer => FaceLivenessDetectionError::InternalServer,
        SessionError::Throttling => FaceLivenessDetectionError::Throttling,
        SessionError::ServiceQuotaExceeded => FaceLivenessDetectionError::ServiceQuotaExceeded,
        SessionError::ServiceUnavailable => FaceLivenessDetectionError::ServiceUnavailable,
        SessionError::SessionNotFound => FaceLivenessDetectionError::SessionNotFound,
        SessionError::InvalidSignature => FaceLivenessDetectionError::InvalidSignature,
        SessionError::Other(_) => FaceLivenessDetectionError::Unknown,
    }
}
