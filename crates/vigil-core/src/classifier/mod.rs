//! Eye State Classifier - turns per-frame landmarks into an attention state
//!
//! Each frame yields a raw eye aspect ratio (EAR) averaged over both eyes.
//! The raw value goes through a short FIFO window to damp frame-to-frame
//! noise, and the smoothed value is compared against a fixed threshold:
//! - No landmarks, or an eye that cannot be measured -> `NoFace`
//! - Smoothed EAR below threshold -> `EyesClosed`
//! - Otherwise -> `Focused`
//!
//! The classifier lives for exactly one session. Its counters and window are
//! cleared by [`EyeStateClassifier::reset`] on session end.

use crate::config::ClassifierConfig;
use crate::landmarks::{eye_indices, EyePoints, FrameSample};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;


/// Discrete attention state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionState {
    /// No frame has been classified yet
    #[default]
    Unknown,
    Focused,
    EyesClosed,
    NoFace,
}

impl AttentionState {
    /// Check whether this state should raise an alert
    #[must_use]
    pub const fn is_negative(&self) -> bool {
        matches!(self, Self::EyesClosed | Self::NoFace)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Focused => "focused",
            Self::EyesClosed => "eyes_closed",
            Self::NoFace => "no_face",
        }
    }
}

impl fmt::Display for AttentionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which negative run just began
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    EyesClosed,
    NoFace,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EyesClosed => f.write_str("eyes_closed"),
            Self::NoFace => f.write_str("no_face"),
        }
    }
}

/// EAR values for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarMeasurement {
    pub left_ear: f32,
    pub right_ear: f32,
    pub raw_average: f32,
    /// Mean of the smoothing window after this frame was pushed
    pub smoothed_average: f32,
}

/// Result of classifying one fresh frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub state: AttentionState,
    /// Set only on the first frame of a negative run
    pub entered: Option<AlertKind>,
    /// `None` for no-face and degenerate frames
    pub measurement: Option<EarMeasurement>,
}

/// Bounded FIFO of raw EAR samples
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SmoothingWindow {
    /// A zero capacity is bumped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a sample, evicting the oldest beyond capacity, and return the mean
    pub fn push(&mut self, sample: f32) -> f32 {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.mean().unwrap_or(sample)
    }

    /// Arithmetic mean of the current contents
    #[must_use]
    pub fn mean(&self) -> Option<f32> {
        if self.samples.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let len = self.samples.len() as f32;
        Some(self.samples.iter().sum::<f32>() / len)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Per-session eye state classifier
pub struct EyeStateClassifier {
    config: ClassifierConfig,
    window: SmoothingWindow,
    closed_frames: u32,
    no_face_frames: u32,
    last_timestamp: Option<Duration>,
    state: AttentionState,
}

impl EyeStateClassifier {
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        let window = SmoothingWindow::new(config.smoothing_window);
        Self {
            config,
            window,
            closed_frames: 0,
            no_face_frames: 0,
            last_timestamp: None,
            state: AttentionState::Unknown,
        }
    }

    /// Classify a frame and return the resulting state.
    ///
    /// A duplicate frame leaves everything untouched and returns the current
    /// state.
    pub fn classify(&mut self, frame: &FrameSample) -> AttentionState {
        self.process(frame).map_or(self.state, |outcome| outcome.state)
    }

    /// Check whether a frame with this timestamp would be processed
    #[must_use]
    pub fn is_fresh(&self, timestamp: Duration) -> bool {
        self.last_timestamp != Some(timestamp)
    }

    /// Classify a frame with full outcome metadata.
    ///
    /// Returns `None` when the frame repeats the previous timestamp.
    pub fn process(&mut self, frame: &FrameSample) -> Option<FrameOutcome> {
        if !self.is_fresh(frame.timestamp) {
            log::debug!("Dropping duplicate frame at {:?}", frame.timestamp);
            return None;
        }
        self.last_timestamp = Some(frame.timestamp);

        let outcome = match Self::measure(frame) {
            Some((left_ear, right_ear)) => self.on_measurement(left_ear, right_ear),
            None => self.on_no_face(),
        };

        if outcome.state != self.state {
            log::debug!(
                "Attention {} -> {} at {:?}",
                self.state,
                outcome.state,
                frame.timestamp
            );
        }
        self.state = outcome.state;
        Some(outcome)
    }

    /// Per-eye EAR, or `None` if either eye is undefined
    fn measure(frame: &FrameSample) -> Option<(f32, f32)> {
        if frame.landmarks.is_empty() {
            return None;
        }
        let left = EyePoints::extract(&frame.landmarks, &eye_indices::LEFT_EYE)?.aspect_ratio();
        let right =
            EyePoints::extract(&frame.landmarks, &eye_indices::RIGHT_EYE)?.aspect_ratio();

        if left.is_finite() && right.is_finite() {
            Some((left, right))
        } else {
            log::debug!("Degenerate eye landmarks (left={left}, right={right})");
            None
        }
    }

    fn on_no_face(&mut self) -> FrameOutcome {
        self.no_face_frames = self.no_face_frames.saturating_add(1);
        FrameOutcome {
            state: AttentionState::NoFace,
            entered: (self.no_face_frames == 1).then_some(AlertKind::NoFace),
            measurement: None,
        }
    }

    fn on_measurement(&mut self, left_ear: f32, right_ear: f32) -> FrameOutcome {
        self.no_face_frames = 0;

        let raw_average = (left_ear + right_ear) / 2.0;
        let smoothed_average = self.window.push(raw_average);
        let measurement = Some(EarMeasurement {
            left_ear,
            right_ear,
            raw_average,
            smoothed_average,
        });

        if smoothed_average < self.config.ear_threshold {
            self.closed_frames = self.closed_frames.saturating_add(1);
            FrameOutcome {
                state: AttentionState::EyesClosed,
                entered: (self.closed_frames == 1).then_some(AlertKind::EyesClosed),
                measurement,
            }
        } else {
            self.closed_frames = 0;
            FrameOutcome {
                state: AttentionState::Focused,
                entered: None,
                measurement,
            }
        }
    }

    /// Clear window, counters and the duplicate guard
    pub fn reset(&mut self) {
        self.window.clear();
        self.closed_frames = 0;
        self.no_face_frames = 0;
        self.last_timestamp = None;
        self.state = AttentionState::Unknown;
    }

    #[must_use]
    pub const fn state(&self) -> AttentionState {
        self.state
    }

    #[must_use]
    pub const fn window(&self) -> &SmoothingWindow {
        &self.window
    }

    #[must_use]
    pub const fn closed_frames(&self) -> u32 {
        self.closed_frames
    }

    #[must_use]
    pub const fn no_face_frames(&self) -> u32 {
        self.no_face_frames
    }

    #[must_use]
    pub const fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

impl Default for EyeStateClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
