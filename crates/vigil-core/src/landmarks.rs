//! Face landmark types and the landmark provider seam.
//!
//! Landmarks follow the 468-point face mesh convention: an ordered list of
//! normalized 3D points for a single face.

use crate::camera::VideoFrame;
use crate::error::MonitorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Face mesh indices for the six EAR points of each eye.
///
/// Order is outer corner, two upper-lid points, inner corner, two lower-lid
/// points. The right eye mirrors the left.
pub mod eye_indices {
    pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];
    pub const RIGHT_EYE: [usize; 6] = [263, 387, 385, 362, 380, 373];
}

/// A single normalized landmark
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 3]", into = "[f32; 3]")]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in 3D
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl From<[f32; 3]> for Point3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Point3> for [f32; 3] {
    fn from(p: Point3) -> Self {
        [p.x, p.y, p.z]
    }
}

/// Landmarks for at most one detected face
pub type FaceLandmarks = Vec<Point3>;

/// One frame's worth of landmarks, ready for classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSample {
    pub timestamp: Duration,
    /// Empty when no face was detected
    pub landmarks: FaceLandmarks,
}

impl FrameSample {
    #[must_use]
    pub fn new(timestamp: Duration, landmarks: FaceLandmarks) -> Self {
        Self {
            timestamp,
            landmarks,
        }
    }

    /// Sample with no face in view
    #[must_use]
    pub fn empty(timestamp: Duration) -> Self {
        Self {
            timestamp,
            landmarks: Vec::new(),
        }
    }
}

/// The six EAR points of one eye
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyePoints([Point3; 6]);

impl EyePoints {
    /// Pick the eye's points out of a landmark set.
    ///
    /// Returns `None` when any index is out of range, i.e. fewer than six
    /// points resolve and the measurement is undefined.
    #[must_use]
    pub fn extract(landmarks: &[Point3], indices: &[usize; 6]) -> Option<Self> {
        let mut points = [Point3::default(); 6];
        for (slot, &idx) in points.iter_mut().zip(indices) {
            *slot = *landmarks.get(idx)?;
        }
        Some(Self(points))
    }

    /// Eye aspect ratio: `(|p1-p5| + |p2-p4|) / (2 |p0-p3|)`.
    ///
    /// A zero-width eye yields a non-finite value; callers treat that as
    /// undefined.
    #[must_use]
    pub fn aspect_ratio(&self) -> f32 {
        let p = &self.0;
        (p[1].distance(&p[5]) + p[2].distance(&p[4])) / (2.0 * p[0].distance(&p[3]))
    }
}

/// External face landmark model
#[async_trait]
pub trait LandmarkProvider: Send + Sync {
    /// Detect landmarks for at most one face.
    ///
    /// Latency is unbounded; the caller keeps showing the last known state
    /// until this resolves.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InferenceFailure`] when the model fails on this
    /// frame. The frame is skipped.
    async fn detect(&self, frame: &VideoFrame) -> Result<Option<FaceLandmarks>, MonitorError>;
}
