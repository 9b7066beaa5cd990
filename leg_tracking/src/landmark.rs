//! Body landmarks as delivered by the pose detector.
//!
//! The detector uses the 33-point MediaPipe pose topology.  Only the hips
//! and ankles matter here, but the whole set is carried so recordings stay
//! faithful to what the detector produced.

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

// ════════════════════════════════════════════════════════════════════════════
// Joint ids
// ════════════════════════════════════════════════════════════════════════════

/// Number of landmarks in one detected pose.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// Values per landmark in a flat buffer: x, y, z, visibility.
pub const VALUES_PER_LANDMARK: usize = 4;

/// Joints the tracking pipeline reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Joint {
    LeftHip,
    RightHip,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    /// Index into the 33-point pose topology.
    pub fn index(self) -> usize {
        match self {
            Joint::LeftHip    => 23,
            Joint::RightHip   => 24,
            Joint::LeftAnkle  => 27,
            Joint::RightAnkle => 28,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// One joint position in normalized frame coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth; reported by some detectors, unused by the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
    /// Detector confidence that the joint is in view (0–1).
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Landmark { x, y, z: None, visibility }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PoseLandmarks
// ════════════════════════════════════════════════════════════════════════════

/// The full landmark set of one detected person.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoseLandmarks {
    points: Vec<Landmark>,
}

impl PoseLandmarks {
    /// A pose with every joint at the origin and zero visibility.
    pub fn empty() -> Self {
        PoseLandmarks { points: vec![Landmark::default(); POSE_LANDMARK_COUNT] }
    }

    /// Build from a flat `[x, y, z, visibility] × 33` buffer.
    pub fn from_flat(data: &[f32]) -> Result<Self, TrackingError> {
        let expected = POSE_LANDMARK_COUNT * VALUES_PER_LANDMARK;
        if data.len() != expected {
            return Err(TrackingError::MalformedLandmarks { expected, got: data.len() });
        }
        let points = data
            .chunks_exact(VALUES_PER_LANDMARK)
            .map(|c| Landmark { x: c[0], y: c[1], z: Some(c[2]), visibility: c[3] })
            .collect();
        Ok(PoseLandmarks { points })
    }

    /// Build from an explicit point list.  Lists shorter than the full
    /// topology are padded with invisible landmarks.
    pub fn from_points(mut points: Vec<Landmark>) -> Self {
        if points.len() < POSE_LANDMARK_COUNT {
            points.resize(POSE_LANDMARK_COUNT, Landmark::default());
        }
        PoseLandmarks { points }
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.points.get(joint.index())
    }

    pub fn set(&mut self, joint: Joint, landmark: Landmark) {
        let i = joint.index();
        if i >= self.points.len() {
            self.points.resize(i + 1, Landmark::default());
        }
        self.points[i] = landmark;
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }
}
