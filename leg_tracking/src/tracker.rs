//! The per-frame update loop.
//!
//! [`Tracker`] owns the landmark source, the calibrator and both limb
//! records.  The host calls [`Tracker::process`] once per presented video
//! frame; frames whose video timestamp has not changed are skipped without
//! touching the detector.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activation::{
    ActivationFilter, DEFAULT_ACTIVATION_DEADZONE, DEFAULT_VISIBILITY_THRESHOLD,
};
use crate::calibration::{CalibrationPhase, CalibrationTicket, Calibrator};
use crate::control::{ControlSnapshot, LegPair, Limb, LimbControlState};
use crate::error::{DetectError, TrackingError};
use crate::geometry::{map_position, CalibrationOffset};
use crate::landmark::{Landmark, PoseLandmarks};
use crate::slice::{quantize, DEFAULT_SLICE_COUNT};
use crate::source::LandmarkSource;

// ════════════════════════════════════════════════════════════════════════════
// TrackerConfig
// ════════════════════════════════════════════════════════════════════════════

/// Session-wide tracking options.  Fixed once the tracker is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of angular slices around the body centre.
    pub slice_count: usize,
    /// Minimum ankle visibility (exclusive) for a limb to count.
    pub visibility_threshold: f32,
    /// Deadzone radius, per-mille of the frame.
    pub activation_deadzone: f32,
    /// Settle window between a calibration request and the sample.
    pub calibration_settle_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            slice_count:           DEFAULT_SLICE_COUNT,
            visibility_threshold:  DEFAULT_VISIBILITY_THRESHOLD,
            activation_deadzone:   DEFAULT_ACTIVATION_DEADZONE,
            calibration_settle_ms: 1000,
        }
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.slice_count == 0 || self.slice_count > 360 {
            return Err(TrackingError::InvalidConfig(format!(
                "slice_count must be 1–360, got {}",
                self.slice_count
            )));
        }
        if !(0.0..=1.0).contains(&self.visibility_threshold) {
            return Err(TrackingError::InvalidConfig(format!(
                "visibility_threshold must be 0–1, got {}",
                self.visibility_threshold
            )));
        }
        if !self.activation_deadzone.is_finite() || self.activation_deadzone < 0.0 {
            return Err(TrackingError::InvalidConfig(format!(
                "activation_deadzone must be a non-negative number, got {}",
                self.activation_deadzone
            )));
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.calibration_settle_ms)
    }

    pub fn activation_filter(&self) -> ActivationFilter {
        ActivationFilter::new(self.visibility_threshold, self.activation_deadzone)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameOutcome
// ════════════════════════════════════════════════════════════════════════════

/// What one call to [`Tracker::process`] did.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// Video time did not advance; nothing was recomputed.
    Stale,
    /// The detector failed on this frame; limb records unchanged.
    Skipped(DetectError),
    /// Nobody in view; both limbs forced inactive.
    NoPose,
    /// Both limbs recomputed from fresh landmarks.
    Tracked,
}

impl FrameOutcome {
    /// True when the detector actually ran and produced a verdict.
    pub fn is_fresh(&self) -> bool {
        matches!(self, FrameOutcome::NoPose | FrameOutcome::Tracked)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tracker
// ════════════════════════════════════════════════════════════════════════════

pub struct Tracker<S: LandmarkSource> {
    source:          S,
    config:          TrackerConfig,
    filter:          ActivationFilter,
    calibrator:      Calibrator,
    legs:            LegPair,
    last_video_time: Option<Duration>,
    last_detect_ms:  Option<u64>,
    frames:          u64,
}

impl<S: LandmarkSource> Tracker<S> {
    /// Take ownership of `source` for the lifetime of the tracker.
    pub fn new(source: S, config: TrackerConfig) -> Result<Self, TrackingError> {
        config.validate()?;
        info!(
            slices = config.slice_count,
            visibility = config.visibility_threshold,
            deadzone = config.activation_deadzone,
            "tracker started"
        );
        Ok(Tracker {
            source,
            filter: config.activation_filter(),
            calibrator: Calibrator::new(config.settle()),
            config,
            legs: LegPair::default(),
            last_video_time: None,
            last_detect_ms: None,
            frames: 0,
        })
    }

    /// Run one pass for the frame presented at `video_time`.
    ///
    /// `now` is the host clock; it drives detector timestamps and the
    /// calibration deadline.  The calibrator is ticked on every pass, stale
    /// or not, so a settle window still ends while the video is frozen.
    pub fn process(&mut self, frame: &S::Frame, video_time: Duration, now: Duration) -> FrameOutcome {
        let outcome = self.update(frame, video_time, now);
        self.calibrator.tick(now, &self.legs);
        outcome
    }

    fn update(&mut self, frame: &S::Frame, video_time: Duration, now: Duration) -> FrameOutcome {
        if self.last_video_time == Some(video_time) {
            return FrameOutcome::Stale;
        }
        self.last_video_time = Some(video_time);

        let timestamp = self.next_timestamp(now);
        self.frames += 1;

        let pose = match self.source.detect(frame, timestamp) {
            Ok(Some(pose)) => pose,
            Ok(None) => {
                self.legs.deactivate_all();
                return FrameOutcome::NoPose;
            }
            Err(e) => {
                warn!(frame = self.frames, error = %e, "skipping frame");
                return FrameOutcome::Skipped(e);
            }
        };

        let offset = *self.calibrator.offset();
        let mut next = self.legs;
        for limb in Limb::BOTH {
            let prev = *self.legs.get(limb);
            let state = self.limb_from_pose(limb, &pose, &offset, prev);
            if state.is_active != prev.is_active {
                debug!(limb = limb.name(), active = state.is_active, slice = state.slice, "limb changed");
            }
            *next.get_mut(limb) = state;
        }
        self.legs = next;
        FrameOutcome::Tracked
    }

    fn limb_from_pose(
        &self,
        limb: Limb,
        pose: &PoseLandmarks,
        offset: &CalibrationOffset,
        prev: LimbControlState,
    ) -> LimbControlState {
        match pose.get(limb.ankle()) {
            Some(ankle) => limb_state(
                ankle,
                pose.get(limb.hip()),
                offset,
                &self.filter,
                self.config.slice_count,
                prev,
            ),
            None => prev.deactivated(),
        }
    }

    /// Detector timestamps must strictly increase even if the host clock
    /// stalls or two frames land in the same millisecond.
    fn next_timestamp(&mut self, now: Duration) -> u64 {
        let ms = now.as_millis() as u64;
        let ts = match self.last_detect_ms {
            Some(last) if ms <= last => last + 1,
            _ => ms,
        };
        self.last_detect_ms = Some(ts);
        ts
    }

    // ── calibration ──────────────────────────────────────────────────────

    /// Start calibrating.  The ticket resolves after the settle window, on
    /// the first pass whose `now` reaches the deadline.
    pub fn request_calibration(&mut self, now: Duration) -> CalibrationTicket {
        self.calibrator.request(now)
    }

    pub fn abandon_calibration(&mut self) {
        self.calibrator.abandon();
    }

    pub fn calibration_phase(&self) -> CalibrationPhase {
        self.calibrator.phase()
    }

    pub fn offset(&self) -> &CalibrationOffset {
        self.calibrator.offset()
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrator.offset().is_set
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn legs(&self) -> &LegPair              { &self.legs }
    pub fn config(&self) -> &TrackerConfig      { &self.config }
    pub fn frames_processed(&self) -> u64       { self.frames }
    pub fn source(&self) -> &S                  { &self.source }
    pub fn source_mut(&mut self) -> &mut S      { &mut self.source }

    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            frame: self.frames,
            left: self.legs.left,
            right: self.legs.right,
            calibrated: self.is_calibrated(),
        }
    }

    /// Stop tracking and hand the source back.  A calibration still
    /// sampling is abandoned; its ticket resolves as such.
    pub fn shutdown(mut self) -> S {
        self.calibrator.abandon();
        info!(frames = self.frames, "tracker stopped");
        self.source
    }
}

/// Compute one limb's record from its ankle landmark.
///
/// The hip is passed along for refinements that need a body-relative axis;
/// the current mapping uses the ankle alone.  An invisible ankle keeps the
/// previous geometry and only drops the active flag.
pub fn limb_state(
    ankle: &Landmark,
    _hip: Option<&Landmark>,
    offset: &CalibrationOffset,
    filter: &ActivationFilter,
    slice_count: usize,
    prev: LimbControlState,
) -> LimbControlState {
    if !filter.is_visible(ankle.visibility) {
        return prev.deactivated();
    }
    let sample = map_position(ankle.x, ankle.y, offset);
    let activation = filter.evaluate(ankle.visibility, sample.distance);
    LimbControlState {
        slice: quantize(sample.angle_deg, slice_count) as i32,
        x: sample.x,
        y: sample.y,
        distance: sample.distance,
        is_active: activation.is_active(),
        center: offset.shift(),
    }
}
