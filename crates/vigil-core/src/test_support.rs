//! Fixtures shared by unit tests: synthetic faces and scripted collaborators.

use crate::alert::AudioOutput;
use crate::camera::{CameraManager, VideoFrame, VideoStream};
use crate::error::MonitorError;
use crate::landmarks::{eye_indices, FaceLandmarks, FrameSample, LandmarkProvider, Point3};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MESH_SIZE: usize = 468;

fn place_eye(landmarks: &mut [Point3], indices: &[usize; 6], ear: f32, offset: f32) {
    let half = ear / 2.0;
    landmarks[indices[0]] = Point3::new(offset, 0.0, 0.0);
    landmarks[indices[3]] = Point3::new(offset + 1.0, 0.0, 0.0);
    landmarks[indices[1]] = Point3::new(offset + 0.3, half, 0.0);
    landmarks[indices[5]] = Point3::new(offset + 0.3, -half, 0.0);
    landmarks[indices[2]] = Point3::new(offset + 0.7, half, 0.0);
    landmarks[indices[4]] = Point3::new(offset + 0.7, -half, 0.0);
}

/// A full face mesh whose eyes both measure `ear`
pub fn face_with_ear(ear: f32) -> FaceLandmarks {
    let mut landmarks = vec![Point3::default(); MESH_SIZE];
    place_eye(&mut landmarks, &eye_indices::LEFT_EYE, ear, 0.0);
    place_eye(&mut landmarks, &eye_indices::RIGHT_EYE, ear, 2.0);
    landmarks
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// Frame sample at `t_ms` whose raw average EAR is `ear`
pub fn sample_with_ear(t_ms: u64, ear: f32) -> FrameSample {
    FrameSample::new(ms(t_ms), face_with_ear(ear))
}

/// Audio output that records every tone it is asked to play
#[derive(Default)]
pub struct RecordingAudio {
    muted: AtomicBool,
    beeps: Mutex<Vec<(f32, Duration)>>,
}

impl RecordingAudio {
    pub fn muted() -> Self {
        let audio = Self::default();
        audio.muted.store(true, Ordering::SeqCst);
        audio
    }

    pub fn beep_count(&self) -> usize {
        self.beeps.lock().unwrap().len()
    }

    pub fn beeps(&self) -> Vec<(f32, Duration)> {
        self.beeps.lock().unwrap().clone()
    }
}

impl AudioOutput for RecordingAudio {
    fn is_ready(&self) -> bool {
        !self.muted.load(Ordering::SeqCst)
    }

    fn beep(&self, frequency_hz: f32, duration: Duration) -> Result<(), MonitorError> {
        self.beeps.lock().unwrap().push((frequency_hz, duration));
        Ok(())
    }
}

/// What a scripted camera stream does after its frames run out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterScript {
    /// Wait forever, like an idle camera
    Hang,
    /// Report the stream as closed
    Close,
}

pub struct ScriptedStream {
    frames: VecDeque<VideoFrame>,
    after: AfterScript,
}

#[async_trait]
impl VideoStream for ScriptedStream {
    async fn next_frame(&mut self) -> Result<Option<VideoFrame>, MonitorError> {
        if let Some(frame) = self.frames.pop_front() {
            return Ok(Some(frame));
        }
        match self.after {
            AfterScript::Hang => std::future::pending().await,
            AfterScript::Close => Ok(None),
        }
    }

    fn label(&self) -> &str {
        "scripted"
    }
}

/// Camera that replays fixed frame timestamps
pub struct ScriptedCamera {
    timestamps: Vec<Duration>,
    after: AfterScript,
    deny: bool,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
}

impl ScriptedCamera {
    pub fn new(timestamps: Vec<Duration>, after: AfterScript) -> Self {
        Self {
            timestamps,
            after,
            deny: false,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new(Vec::new(), AfterScript::Hang)
        }
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraManager for ScriptedCamera {
    async fn acquire(&self) -> Result<Box<dyn VideoStream>, MonitorError> {
        if self.deny {
            return Err(MonitorError::PermissionDenied);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            frames: self.timestamps.iter().copied().map(VideoFrame::at).collect(),
            after: self.after,
        }))
    }

    async fn release(&self, _stream: Box<dyn VideoStream>) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Landmark provider answering from a timestamp table
#[derive(Default)]
pub struct ScriptedDetector {
    faces: HashMap<Duration, Option<FaceLandmarks>>,
    failures: HashSet<Duration>,
    pub calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn with_face(mut self, t_ms: u64, ear: f32) -> Self {
        self.faces.insert(ms(t_ms), Some(face_with_ear(ear)));
        self
    }

    pub fn with_no_face(mut self, t_ms: u64) -> Self {
        self.faces.insert(ms(t_ms), None);
        self
    }

    pub fn with_failure(mut self, t_ms: u64) -> Self {
        self.failures.insert(ms(t_ms));
        self
    }
}

#[async_trait]
impl LandmarkProvider for ScriptedDetector {
    async fn detect(&self, frame: &VideoFrame) -> Result<Option<FaceLandmarks>, MonitorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.contains(&frame.timestamp) {
            return Err(MonitorError::InferenceFailure("scripted failure".to_string()));
        }
        Ok(self.faces.get(&frame.timestamp).cloned().flatten())
    }
}

/// Shorthand for sharing fixtures as trait objects
pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
