//! Error types for the tracking pipeline.
//!
//! Only two things can go wrong in a way the caller must see: the detector
//! cannot be brought up at all, or a configuration / recording is invalid.
//! Everything that happens inside a running loop is recoverable and is
//! reported as a [`DetectError`] for that single frame.

use std::fmt;

/// Hard failures of the tracking pipeline.
#[derive(Debug)]
pub enum TrackingError {
    /// The landmark detector could not be initialised; no tracking is possible.
    DetectorUnavailable(String),
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// A flat landmark buffer had the wrong number of values.
    MalformedLandmarks { expected: usize, got: usize },
    /// A session recording could not be read or written.
    Recording { line: usize, message: String },
}

impl fmt::Display for TrackingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingError::DetectorUnavailable(msg) => {
                write!(f, "landmark detector unavailable: {}", msg)
            }
            TrackingError::InvalidConfig(msg) => write!(f, "invalid tracking config: {}", msg),
            TrackingError::MalformedLandmarks { expected, got } => write!(
                f,
                "malformed landmark buffer: expected {} values, got {}",
                expected, got
            ),
            TrackingError::Recording { line, message } => {
                write!(f, "recording error at line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for TrackingError {}

/// A single failed detector invocation.  The frame is skipped and the next
/// frame is tried again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectError {
    pub message: String,
}

impl DetectError {
    pub fn new(message: impl Into<String>) -> Self {
        DetectError { message: message.into() }
    }
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "detection failed: {}", self.message)
    }
}

impl std::error::Error for DetectError {}
