//! Recorded landmark traces
//!
//! A trace is a JSON-lines file, one frame per line:
//! `{"t_ms": 33, "landmarks": [[x, y, z], ...]}`. A `null` or empty
//! landmark list means no face was in view.
//!
//! [`TraceCamera`] replays the frame clock and [`TraceDetector`] answers with
//! the recorded landmarks, so a trace stands in for both the camera and the
//! landmark model.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use vigil_core::{
    CameraManager, FaceLandmarks, FrameSample, LandmarkProvider, MonitorError, VideoFrame,
    VideoStream,
};

#[derive(Debug, Deserialize)]
struct TraceLine {
    t_ms: u64,
    #[serde(default)]
    landmarks: Option<FaceLandmarks>,
}

/// Parsed trace, ordered by timestamp
#[derive(Debug, Default)]
pub struct Trace {
    frames: BTreeMap<Duration, FaceLandmarks>,
}

impl Trace {
    /// Read a trace file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read trace {}", path.display()))?;
        Self::parse(&raw)
    }

    /// Parse JSON lines; blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first malformed line.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut frames = BTreeMap::new();
        for (number, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: TraceLine = serde_json::from_str(line)
                .with_context(|| format!("Invalid trace line {}", number + 1))?;
            frames.insert(
                Duration::from_millis(parsed.t_ms),
                parsed.landmarks.unwrap_or_default(),
            );
        }
        log::debug!("Parsed trace with {} frames", frames.len());
        Ok(Self { frames })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames as classifier samples, in order
    pub fn samples(&self) -> impl Iterator<Item = FrameSample> + '_ {
        self.frames
            .iter()
            .map(|(t, landmarks)| FrameSample::new(*t, landmarks.clone()))
    }

    /// Length of one pass, including one frame period after the last frame
    fn period(&self, frame_period: Duration) -> Duration {
        self.frames
            .keys()
            .next_back()
            .map_or(frame_period, |last| *last + frame_period)
    }

    fn landmarks_at(&self, timestamp: Duration) -> Option<&FaceLandmarks> {
        self.frames.get(&timestamp)
    }
}

/// Camera backed by a trace file
pub struct TraceCamera {
    trace: Arc<Trace>,
    fps: u32,
    repeat: bool,
}

impl TraceCamera {
    #[must_use]
    pub fn new(trace: Arc<Trace>, fps: u32, repeat: bool) -> Self {
        Self {
            trace,
            fps: fps.max(1),
            repeat,
        }
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs(1) / self.fps
    }
}

#[async_trait]
impl CameraManager for TraceCamera {
    async fn acquire(&self) -> Result<Box<dyn VideoStream>, MonitorError> {
        if self.trace.is_empty() {
            return Err(MonitorError::CameraUnavailable(
                "trace has no frames".to_string(),
            ));
        }
        let mut clock = interval(self.frame_period());
        clock.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Ok(Box::new(TraceStream {
            timestamps: self.trace.frames.keys().copied().collect(),
            cursor: 0,
            offset: Duration::ZERO,
            period: self.trace.period(self.frame_period()),
            repeat: self.repeat,
            clock,
        }))
    }

    async fn release(&self, stream: Box<dyn VideoStream>) {
        log::info!("Released camera: {}", stream.label());
    }
}

struct TraceStream {
    timestamps: Vec<Duration>,
    cursor: usize,
    /// Added to every timestamp on repeated passes
    offset: Duration,
    period: Duration,
    repeat: bool,
    clock: Interval,
}

#[async_trait]
impl VideoStream for TraceStream {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, MonitorError> {
        if self.cursor == self.timestamps.len() {
            if !self.repeat {
                return Ok(None);
            }
            self.cursor = 0;
            self.offset += self.period;
        }
        self.clock.tick().await;

        let timestamp = self.timestamps[self.cursor] + self.offset;
        self.cursor += 1;
        Ok(Some(VideoFrame::at(timestamp)))
    }

    fn label(&self) -> &str {
        "trace replay"
    }
}

/// Landmark provider answering from the recorded trace
pub struct TraceDetector {
    trace: Arc<Trace>,
    frame_period: Duration,
}

impl TraceDetector {
    #[must_use]
    pub fn new(trace: Arc<Trace>, fps: u32) -> Self {
        Self {
            trace,
            frame_period: Duration::from_secs(1) / fps.max(1),
        }
    }
}

#[async_trait]
impl LandmarkProvider for TraceDetector {
    async fn detect(&self, frame: &VideoFrame) -> Result<Option<FaceLandmarks>, MonitorError> {
        let period = self.trace.period(self.frame_period);
        let period_ns = period.as_nanos().max(1);
        let within = frame.timestamp.as_nanos() % period_ns;
        let local = Duration::from_nanos(u64::try_from(within).unwrap_or(u64::MAX));

        match self.trace.landmarks_at(local) {
            Some(landmarks) if landmarks.is_empty() => Ok(None),
            Some(landmarks) => Ok(Some(landmarks.clone())),
            None => Err(MonitorError::InferenceFailure(format!(
                "no recorded landmarks at {local:?}"
            ))),
        }
    }
}
