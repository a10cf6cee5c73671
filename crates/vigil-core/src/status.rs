//! Read-only status projection for the presentation layer.

use crate::classifier::AttentionState;
use crate::monitor::MonitorState;
use crate::session::{Lifecycle, Session};
use serde::Serialize;
use std::sync::Arc;

/// Visual severity of the status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Idle,
    Ok,
    Warn,
}

/// Everything a UI needs to render the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub attention: AttentionState,
    pub lifecycle: Lifecycle,
    pub remaining_seconds: u32,
    pub configured_duration_seconds: u32,
    /// User-visible problem, e.g. a refused camera
    pub notice: Option<String>,
}

impl StatusSnapshot {
    /// Combine attention and session fields
    #[must_use]
    pub fn project(attention: AttentionState, session: &Session, notice: Option<String>) -> Self {
        Self {
            attention,
            lifecycle: session.lifecycle,
            remaining_seconds: session.remaining_or_configured(),
            configured_duration_seconds: session.configured_duration_seconds,
            notice,
        }
    }

    /// Badge text
    #[must_use]
    pub fn label(&self) -> &str {
        if let Some(notice) = &self.notice {
            return notice;
        }
        match self.attention {
            AttentionState::Unknown => "Start focusing!",
            AttentionState::Focused => "Focused",
            AttentionState::EyesClosed => "Eyes Closed",
            AttentionState::NoFace => "No Face Detected",
        }
    }

    #[must_use]
    pub const fn tone(&self) -> StatusTone {
        if self.notice.is_some() {
            return StatusTone::Warn;
        }
        match self.attention {
            AttentionState::Unknown => StatusTone::Idle,
            AttentionState::Focused => StatusTone::Ok,
            AttentionState::EyesClosed | AttentionState::NoFace => StatusTone::Warn,
        }
    }

    /// Countdown as `MM:SS`
    #[must_use]
    pub fn countdown(&self) -> String {
        format_countdown(self.remaining_seconds)
    }

    /// Caption under the timer
    #[must_use]
    pub const fn progress_caption(&self) -> &'static str {
        self.lifecycle.description()
    }

    /// Caption for the pause/resume toggle
    #[must_use]
    pub const fn toggle_caption(&self) -> &'static str {
        match self.lifecycle {
            Lifecycle::Running => "Pause Timer",
            _ => "Resume Timer",
        }
    }
}

/// Format seconds as zero-padded `MM:SS`; minutes may exceed 59
#[must_use]
pub fn format_countdown(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Reads the shared monitor state without mutating it
#[derive(Clone)]
pub struct StatusReporter {
    state: Arc<MonitorState>,
}

impl StatusReporter {
    #[must_use]
    pub fn new(state: Arc<MonitorState>) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let attention = self.state.attention();
        let session = self.state.session_snapshot();
        StatusSnapshot::project(attention, &session, self.state.notice())
    }
}
