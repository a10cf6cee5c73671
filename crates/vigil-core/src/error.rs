//! Monitor error types.

/// Errors that can occur while running a focus session.
///
/// None of these are fatal to the hosting process. Only
/// [`MonitorError::PermissionDenied`] is meant to reach the user as an
/// explicit status; the frame loop absorbs the rest.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The user (or the platform) refused camera access.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The camera could not be opened, or its stream broke.
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The landmark model failed on a single frame.
    #[error("landmark inference failed: {0}")]
    InferenceFailure(String),

    /// The audio output rejected a tone.
    #[error("audio output unavailable: {0}")]
    AudioUnavailable(String),

    /// `start` was called while a session task is still running.
    #[error("a focus session is already active")]
    SessionActive,

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
