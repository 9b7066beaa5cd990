//! Per-limb control state: the pipeline's observable output.

use crate::landmark::Joint;

/// Distance (per-mille) at which expression saturates at 1.0.
pub const EXPRESSION_FULL_SCALE: f32 = 300.0;

// ════════════════════════════════════════════════════════════════════════════
// Limb
// ════════════════════════════════════════════════════════════════════════════

/// A tracked leg.  Left drives the melody voice, right the harmony voice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Limb {
    Left,
    Right,
}

impl Limb {
    pub const BOTH: [Limb; 2] = [Limb::Left, Limb::Right];

    pub fn ankle(self) -> Joint {
        match self {
            Limb::Left  => Joint::LeftAnkle,
            Limb::Right => Joint::RightAnkle,
        }
    }

    pub fn hip(self) -> Joint {
        match self {
            Limb::Left  => Joint::LeftHip,
            Limb::Right => Joint::RightHip,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Limb::Left  => "left",
            Limb::Right => "right",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LimbControlState
// ════════════════════════════════════════════════════════════════════════════

/// Control record for one limb.
///
/// `slice` is only meaningful while `is_active` is true; check the flag (or
/// use [`LimbControlState::active_slice`]) before indexing anything with it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimbControlState {
    /// Slice index in `[0, n-1]`, or `-1` before the limb was ever seen.
    pub slice: i32,
    /// Centered x, normalized frame units.
    pub x: f32,
    /// Centered y, normalized frame units.
    pub y: f32,
    /// Per-mille distance from the centre.
    pub distance: f32,
    pub is_active: bool,
    /// Calibration shift `x`/`y` are relative to.  Adding it back gives the
    /// absolute frame position the record was computed from.
    pub center: (f32, f32),
}

impl Default for LimbControlState {
    fn default() -> Self {
        LimbControlState::NO_SIGNAL
    }
}

impl LimbControlState {
    /// Canonical "nothing tracked yet" value.
    pub const NO_SIGNAL: LimbControlState = LimbControlState {
        slice: -1,
        x: 0.0,
        y: 0.0,
        distance: 0.0,
        is_active: false,
        center: (0.0, 0.0),
    };

    /// The slice index if the limb is active.
    pub fn active_slice(&self) -> Option<usize> {
        if self.is_active && self.slice >= 0 { Some(self.slice as usize) } else { None }
    }

    /// Expression intensity in `[0, 1]`.
    pub fn expression(&self) -> f32 {
        (self.distance / EXPRESSION_FULL_SCALE).clamp(0.0, 1.0)
    }

    /// Absolute frame position the record was computed from.
    pub fn absolute_position(&self) -> (f32, f32) {
        (self.x + self.center.0, self.y + self.center.1)
    }

    /// Same geometry, inactive.  Used when the limb drops out of view.
    pub fn deactivated(self) -> Self {
        LimbControlState { is_active: false, ..self }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LegPair
// ════════════════════════════════════════════════════════════════════════════

/// The two limb records, always updated together by one pass.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct LegPair {
    pub left:  LimbControlState,
    pub right: LimbControlState,
}

impl LegPair {
    pub fn get(&self, limb: Limb) -> &LimbControlState {
        match limb {
            Limb::Left  => &self.left,
            Limb::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, limb: Limb) -> &mut LimbControlState {
        match limb {
            Limb::Left  => &mut self.left,
            Limb::Right => &mut self.right,
        }
    }

    pub fn deactivate_all(&mut self) {
        self.left  = self.left.deactivated();
        self.right = self.right.deactivated();
    }

    pub fn any_active(&self) -> bool {
        self.left.is_active || self.right.is_active
    }
}

/// Consistent view published after each pass.  `Copy`, so a reader on
/// another thread always gets a whole record.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct ControlSnapshot {
    /// Number of frames the detector has been run on.
    pub frame: u64,
    pub left:  LimbControlState,
    pub right: LimbControlState,
    pub calibrated: bool,
}

impl ControlSnapshot {
    pub fn get(&self, limb: Limb) -> &LimbControlState {
        match limb {
            Limb::Left  => &self.left,
            Limb::Right => &self.right,
        }
    }
}
