use crate::classifier::{AlertKind, AttentionState, FrameOutcome};
use crate::config::AlertConfig;
use crate::error::MonitorError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Audio output capability
pub trait AudioOutput: Send + Sync {
    /// Whether the output can play a tone right now
    fn is_ready(&self) -> bool;

    /// Fire-and-forget tone.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::AudioUnavailable`] if the audio subsystem
    /// rejected the request.
    fn beep(&self, frequency_hz: f32, duration: Duration) -> Result<(), MonitorError>;
}

/// A fired alert
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub fired_at: DateTime<Utc>,
    /// False when the tone was dropped because audio was unavailable
    pub delivered: bool,
}

/// Emits one tone per contiguous run of a negative attention state
pub struct AlertDispatcher {
    audio: Arc<dyn AudioOutput>,
    config: AlertConfig,
    eyes_closed_armed: bool,
    no_face_armed: bool,
}

impl AlertDispatcher {
    #[must_use]
    pub fn new(audio: Arc<dyn AudioOutput>, config: AlertConfig) -> Self {
        Self {
            audio,
            config,
            eyes_closed_armed: true,
            no_face_armed: true,
        }
    }

    /// Route a classifier outcome: entry events may fire, `Focused` re-arms
    pub fn observe(&mut self, outcome: &FrameOutcome) -> Option<AlertEvent> {
        if outcome.state == AttentionState::Focused {
            self.on_focused();
            return None;
        }
        outcome.entered.and_then(|kind| self.on_state_entry(kind))
    }

    /// Handle the first frame of a negative run.
    ///
    /// Returns `None` if this kind already fired and has not been re-armed.
    pub fn on_state_entry(&mut self, kind: AlertKind) -> Option<AlertEvent> {
        let armed = match kind {
            AlertKind::EyesClosed => &mut self.eyes_closed_armed,
            AlertKind::NoFace => &mut self.no_face_armed,
        };
        if !*armed {
            log::debug!("Alert {kind} suppressed until attention returns");
            return None;
        }
        *armed = false;

        let delivered = self.play_tone(kind);
        Some(AlertEvent {
            kind,
            fired_at: Utc::now(),
            delivered,
        })
    }

    fn play_tone(&self, kind: AlertKind) -> bool {
        if !self.audio.is_ready() {
            log::warn!("Audio output not running, dropping {kind} alert");
            return false;
        }
        match self
            .audio
            .beep(self.config.frequency_hz, self.config.duration())
        {
            Ok(()) => {
                log::info!("Alert fired: {kind}");
                true
            }
            Err(e) => {
                log::warn!("Failed to play {kind} alert: {e}");
                false
            }
        }
    }

    /// Re-arm both alert kinds
    pub fn on_focused(&mut self) {
        self.eyes_closed_armed = true;
        self.no_face_armed = true;
    }

    /// Clear arming state at session end
    pub fn reset(&mut self) {
        self.on_focused();
    }

    #[must_use]
    pub const fn is_armed(&self, kind: AlertKind) -> bool {
        match kind {
            AlertKind::EyesClosed => self.eyes_closed_armed,
            AlertKind::NoFace => self.no_face_armed,
        }
    }
}
