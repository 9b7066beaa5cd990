//! # leg_tracking
//!
//! Turns per-frame body landmarks into a low-jitter control signal for two
//! musical voices: the left ankle selects melody notes, the right ankle
//! selects harmony chords.
//!
//! ## Pipeline
//!
//! ```text
//! LandmarkSource ──► geometry::map_position ──► slice::quantize
//!                                          └──► ActivationFilter
//!                                                      │
//!                      Calibrator ◄── LegPair ◄────────┘
//!                          │
//!                          └── CalibrationOffset ──► geometry (next frame)
//! ```
//!
//! ## Units
//!
//! Landmark positions are normalized frame fractions (0–1).  Distances are
//! scaled by [`geometry::DISTANCE_SCALE`] into thousandths of the frame, so
//! the default deadzone of `40.0` means "4 % of the frame".
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use leg_tracking::{Tracker, TrackerConfig, Landmark, PoseLandmarks, Joint};
//! use leg_tracking::source::ScriptedSource;
//!
//! let mut pose = PoseLandmarks::empty();
//! pose.set(Joint::LeftAnkle,  Landmark::new(0.30, 0.50, 0.9));
//! pose.set(Joint::RightAnkle, Landmark::new(0.70, 0.50, 0.9));
//!
//! let source = ScriptedSource::repeating(Some(pose));
//! let mut tracker = Tracker::new(source, TrackerConfig::default()).unwrap();
//!
//! tracker.process(&(), Duration::from_millis(33), Duration::from_millis(33));
//! assert!(tracker.legs().left.is_active);
//! ```

pub mod activation;
pub mod calibration;
pub mod control;
pub mod error;
pub mod geometry;
pub mod landmark;
pub mod recording;
pub mod slice;
pub mod source;
pub mod tracker;

pub use activation::{Activation, ActivationFilter};
pub use calibration::{
    CalibrationAbandoned, CalibrationOutcome, CalibrationPhase, CalibrationTicket, Calibrator,
};
pub use control::{ControlSnapshot, LegPair, Limb, LimbControlState};
pub use error::{DetectError, TrackingError};
pub use geometry::{CalibrationOffset, PolarSample};
pub use landmark::{Joint, Landmark, PoseLandmarks};
pub use recording::{RecordedFrame, RecordingSource, RecordingWriter, ReplayDetector};
pub use source::LandmarkSource;
pub use tracker::{FrameOutcome, Tracker, TrackerConfig};
