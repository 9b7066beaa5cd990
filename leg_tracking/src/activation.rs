//! Per-limb engagement gate.
//!
//! A limb only produces control events when the detector is confident it is
//! in view *and* it has moved clear of the rest position.  The deadzone
//! swallows detector jitter and body sway around the calibration centre.

/// Default minimum visibility (exclusive).
pub const DEFAULT_VISIBILITY_THRESHOLD: f32 = 0.5;

/// Default deadzone radius in per-mille units (4 % of the frame).
pub const DEFAULT_ACTIVATION_DEADZONE: f32 = 40.0;

/// Verdict for one limb on one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Activation {
    /// Visibility at or below threshold.  Geometry is not trusted.
    Hidden,
    /// Visible but inside the deadzone.
    Resting,
    /// Visible and displaced: emits control events.
    Engaged,
}

impl Activation {
    pub fn is_active(self) -> bool {
        self == Activation::Engaged
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivationFilter {
    pub visibility_threshold: f32,
    pub deadzone: f32,
}

impl Default for ActivationFilter {
    fn default() -> Self {
        ActivationFilter {
            visibility_threshold: DEFAULT_VISIBILITY_THRESHOLD,
            deadzone: DEFAULT_ACTIVATION_DEADZONE,
        }
    }
}

impl ActivationFilter {
    pub fn new(visibility_threshold: f32, deadzone: f32) -> Self {
        ActivationFilter { visibility_threshold, deadzone }
    }

    pub fn is_visible(&self, visibility: f32) -> bool {
        visibility > self.visibility_threshold
    }

    /// Classify a limb from its visibility and (per-mille) distance.
    pub fn evaluate(&self, visibility: f32, distance: f32) -> Activation {
        if !self.is_visible(visibility) {
            Activation::Hidden
        } else if distance > self.deadzone {
            Activation::Engaged
        } else {
            Activation::Resting
        }
    }
}
