pub mod alert;
pub mod camera;
pub mod classifier;
pub mod config;
pub mod error;
pub mod landmarks;
pub mod monitor;
pub mod session;
pub mod status;

#[cfg(test)]
mod test_support;

pub use alert::{AlertDispatcher, AlertEvent, AudioOutput};
pub use camera::{CameraManager, VideoFrame, VideoStream};
pub use classifier::{AlertKind, AttentionState, EarMeasurement, EyeStateClassifier, FrameOutcome};
pub use config::MonitorConfig;
pub use error::MonitorError;
pub use landmarks::{FaceLandmarks, FrameSample, LandmarkProvider, Point3};
pub use monitor::{EndReason, FocusMonitor, MonitorState, SessionReport, SessionStats};
pub use session::{Lifecycle, Session, SessionController, TickOutcome};
pub use status::{StatusReporter, StatusSnapshot, StatusTone};
