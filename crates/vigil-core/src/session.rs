use crate::config::SessionConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Countdown session lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    /// Waiting for a duration and a start command
    #[default]
    Idle,
    /// Counting down
    Running,
    /// Countdown frozen; camera keeps running
    Paused,
    /// Finished, either by expiry or by an explicit end
    Ended,
}

impl Lifecycle {
    /// Check if a session is in progress (running or paused)
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Get human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Not started",
            Self::Running | Self::Paused => "In progress",
            Self::Ended => "Finished",
        }
    }
}

/// Snapshot of session fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub lifecycle: Lifecycle,
    pub configured_duration_seconds: u32,
    /// Unset between reopening a finished session and starting it
    pub remaining_seconds: Option<u32>,
}

impl Session {
    fn idle(duration_seconds: u32) -> Self {
        Self {
            id: None,
            started_at: None,
            lifecycle: Lifecycle::Idle,
            configured_duration_seconds: duration_seconds,
            remaining_seconds: Some(duration_seconds),
        }
    }

    /// Remaining seconds, falling back to the configured duration when unset
    #[must_use]
    pub fn remaining_or_configured(&self) -> u32 {
        self.remaining_seconds
            .unwrap_or(self.configured_duration_seconds)
    }

    /// Seconds counted down so far
    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.configured_duration_seconds
            .saturating_sub(self.remaining_or_configured())
    }
}

/// Result of one countdown tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Session not running; nothing changed
    Ignored,
    /// One second removed; the value is what remains
    Counted(u32),
    /// Countdown reached zero on this tick
    Expired,
}

/// Owns the countdown and the session lifecycle
///
/// `Idle -> Running -> {Paused <-> Running} -> Ended`. A finished session
/// returns to `Idle` only when a new one is started.
pub struct SessionController {
    session: Session,
    default_duration_seconds: u32,
}

impl SessionController {
    /// Create a controller with the configured default preset
    #[must_use]
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_default_duration(config.default_duration_seconds())
    }

    #[must_use]
    pub fn with_default_duration(default_duration_seconds: u32) -> Self {
        Self {
            session: Session::idle(default_duration_seconds),
            default_duration_seconds,
        }
    }

    /// Read-only view of the session
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn lifecycle(&self) -> Lifecycle {
        self.session.lifecycle
    }

    #[must_use]
    pub const fn default_duration_seconds(&self) -> u32 {
        self.default_duration_seconds
    }

    /// Set the countdown length. Only applies while idle, and the length must
    /// be at least one second.
    pub fn configure(&mut self, duration_seconds: u32) -> bool {
        if duration_seconds == 0 {
            log::debug!("Ignoring zero-length configure");
            return false;
        }
        if self.session.lifecycle != Lifecycle::Idle {
            log::debug!(
                "Ignoring configure({duration_seconds}) in {:?}",
                self.session.lifecycle
            );
            return false;
        }
        self.session.configured_duration_seconds = duration_seconds;
        self.session.remaining_seconds = Some(duration_seconds);
        true
    }

    /// Preset helper, e.g. 25, 50 or 90 minutes
    pub fn configure_minutes(&mut self, minutes: u32) -> bool {
        self.configure(minutes.saturating_mul(60))
    }

    /// Return a finished session to `Idle`, keeping the configured duration
    pub fn reopen(&mut self) -> bool {
        if self.session.lifecycle != Lifecycle::Ended {
            return false;
        }
        self.session.id = None;
        self.session.started_at = None;
        self.session.lifecycle = Lifecycle::Idle;
        self.session.remaining_seconds = None;
        true
    }

    /// `Idle -> Running`. Returns the new session id.
    pub fn start(&mut self) -> Option<Uuid> {
        if self.session.lifecycle != Lifecycle::Idle {
            log::debug!("Ignoring start in {:?}", self.session.lifecycle);
            return None;
        }
        let id = Uuid::new_v4();
        let remaining = self
            .session
            .remaining_seconds
            .get_or_insert(self.session.configured_duration_seconds);
        log::info!("Focus session {id} started ({remaining}s)");

        self.session.id = Some(id);
        self.session.started_at = Some(Utc::now());
        self.session.lifecycle = Lifecycle::Running;
        Some(id)
    }

    pub fn pause(&mut self) -> bool {
        if self.session.lifecycle != Lifecycle::Running {
            return false;
        }
        self.session.lifecycle = Lifecycle::Paused;
        log::info!("Focus session paused");
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.session.lifecycle != Lifecycle::Paused {
            return false;
        }
        self.session.lifecycle = Lifecycle::Running;
        log::info!("Focus session resumed");
        true
    }

    /// Flip between running and paused
    pub fn toggle_pause(&mut self) -> bool {
        self.pause() || self.resume()
    }

    /// Advance the countdown by one second.
    ///
    /// Only effective while running; reports [`TickOutcome::Expired`] exactly
    /// once, on the tick that reaches zero.
    pub fn tick(&mut self) -> TickOutcome {
        if self.session.lifecycle != Lifecycle::Running {
            return TickOutcome::Ignored;
        }
        let configured = self.session.configured_duration_seconds;
        let remaining = self.session.remaining_seconds.get_or_insert(configured);
        *remaining = remaining.saturating_sub(1);

        if *remaining == 0 {
            self.session.lifecycle = Lifecycle::Ended;
            log::info!("Focus session countdown finished");
            TickOutcome::Expired
        } else {
            TickOutcome::Counted(*remaining)
        }
    }

    /// User-initiated end from any non-idle state.
    ///
    /// Restores the default preset for both durations.
    pub fn end(&mut self) -> bool {
        if self.session.lifecycle == Lifecycle::Idle {
            return false;
        }
        self.session.lifecycle = Lifecycle::Ended;
        self.session.configured_duration_seconds = self.default_duration_seconds;
        self.session.remaining_seconds = Some(self.default_duration_seconds);
        log::info!("Focus session ended by user");
        true
    }
}
