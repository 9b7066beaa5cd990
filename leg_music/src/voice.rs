//! Per-limb voice: remembers what is sounding and decides what to send next.

use tracing::debug;

use leg_tracking::LimbControlState;

/// Level change per unit of expression, in dB.
const EXPRESSION_RANGE_DB: f32 = 15.0;

/// Map a dB level onto a 7-bit controller value with the General MIDI
/// volume curve, `127 · 10^(dB/40)`.
pub fn db_to_cc(db: f32) -> u8 {
    (127.0 * 10f32.powf(db / 40.0)).round().clamp(0.0, 127.0) as u8
}

// ════════════════════════════════════════════════════════════════════════════
// VoiceRole
// ════════════════════════════════════════════════════════════════════════════

/// Which musical part a voice plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoiceRole {
    /// Single notes, driven by the left leg.
    Melody,
    /// Triads, driven by the right leg.
    Harmony,
}

impl VoiceRole {
    /// Level at zero expression.
    pub fn floor_db(self) -> f32 {
        match self {
            VoiceRole::Melody  => -20.0,
            VoiceRole::Harmony => -25.0,
        }
    }

    /// Level for an expression in `[0, 1]`.
    pub fn level_db(self, expression: f32) -> f32 {
        self.floor_db() + expression.clamp(0.0, 1.0) * EXPRESSION_RANGE_DB
    }

    pub fn name(self) -> &'static str {
        match self {
            VoiceRole::Melody  => "melody",
            VoiceRole::Harmony => "harmony",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// VoiceAction
// ════════════════════════════════════════════════════════════════════════════

/// What the audio engine should do for one voice.
#[derive(Clone, Debug, PartialEq)]
pub enum VoiceAction {
    /// Set the level, then start `notes`.
    Attack  { notes: Vec<u8>, level_db: f32 },
    /// Stop `notes`.
    Release { notes: Vec<u8> },
    /// Same notes keep sounding at a new level.
    Level   { level_db: f32 },
}

// ════════════════════════════════════════════════════════════════════════════
// Voice
// ════════════════════════════════════════════════════════════════════════════

/// Note-holding state machine for one limb.
///
/// ```text
///            play(i)                  play(j≠i)
///   Silent ──────────► Sounding(i) ──────────────► Sounding(j)
///     ▲                  │   │ play(i): level only
///     └──── release ─────┘   └─────┘
/// ```
#[derive(Clone, Debug)]
pub struct Voice {
    role:     VoiceRole,
    sounding: Option<Vec<u8>>,
}

impl Voice {
    pub fn new(role: VoiceRole) -> Self {
        Voice { role, sounding: None }
    }

    /// Notes currently held, if any.
    pub fn sounding(&self) -> Option<&[u8]> {
        self.sounding.as_deref()
    }

    /// Feed one limb record.
    ///
    /// Plays while the limb is active and `gate_open` (calibration done);
    /// otherwise releases whatever is held.  `palette` is indexed by slice.
    pub fn drive(
        &mut self,
        limb:      &LimbControlState,
        gate_open: bool,
        palette:   &[Vec<u8>],
    ) -> Vec<VoiceAction> {
        match limb.active_slice() {
            Some(slice) if gate_open => self.play(slice, limb.expression(), palette),
            _ => self.release().into_iter().collect(),
        }
    }

    /// Trigger the palette entry for `slice`.
    ///
    /// A slice beyond the palette (e.g. the scale just shrank) is ignored and
    /// whatever is sounding keeps sounding.
    pub fn play(&mut self, slice: usize, expression: f32, palette: &[Vec<u8>]) -> Vec<VoiceAction> {
        let Some(notes) = palette.get(slice) else {
            debug!(voice = self.role.name(), slice, len = palette.len(), "slice outside palette");
            return Vec::new();
        };
        let level_db = self.role.level_db(expression);

        if self.sounding.as_ref() == Some(notes) {
            return vec![VoiceAction::Level { level_db }];
        }

        let mut actions = Vec::with_capacity(2);
        if let Some(old) = self.sounding.take() {
            actions.push(VoiceAction::Release { notes: old });
        }
        debug!(voice = self.role.name(), slice, ?notes, level_db, "attack");
        actions.push(VoiceAction::Attack { notes: notes.clone(), level_db });
        self.sounding = Some(notes.clone());
        actions
    }

    /// Release held notes.  Returns `None` when already silent.
    pub fn release(&mut self) -> Option<VoiceAction> {
        let notes = self.sounding.take()?;
        debug!(voice = self.role.name(), ?notes, "release");
        Some(VoiceAction::Release { notes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn limb(slice: i32, distance: f32, is_active: bool) -> LimbControlState {
        LimbControlState { slice, x: 0.0, y: 0.0, distance, is_active, center: (0.5, 0.5) }
    }

    fn palette() -> Vec<Vec<u8>> {
        vec![vec![60], vec![62], vec![64]]
    }

    // ── levels ────────────────────────────────────────────────────────────
    #[test]
    fn level_range_per_role() {
        assert_abs_diff_eq!(VoiceRole::Melody.level_db(0.0), -20.0);
        assert_abs_diff_eq!(VoiceRole::Melody.level_db(1.0), -5.0);
        assert_abs_diff_eq!(VoiceRole::Harmony.level_db(0.0), -25.0);
        assert_abs_diff_eq!(VoiceRole::Harmony.level_db(0.5), -17.5);
        assert_abs_diff_eq!(VoiceRole::Harmony.level_db(3.0), -10.0);
    }

    #[test]
    fn db_curve() {
        assert_eq!(db_to_cc(0.0), 127);
        assert_eq!(db_to_cc(-20.0), 40);
        assert_eq!(db_to_cc(-5.0), 95);
        assert_eq!(db_to_cc(-200.0), 0);
        assert!(db_to_cc(-25.0) < db_to_cc(-20.0));
    }

    // ── state machine ─────────────────────────────────────────────────────
    #[test]
    fn same_slice_twice_attacks_once_then_updates_level() {
        let mut v = Voice::new(VoiceRole::Melody);
        let first = v.drive(&limb(1, 150.0, true), true, &palette());
        assert_eq!(first, vec![VoiceAction::Attack { notes: vec![62], level_db: -12.5 }]);

        let second = v.drive(&limb(1, 300.0, true), true, &palette());
        assert_eq!(second, vec![VoiceAction::Level { level_db: -5.0 }]);
        assert_eq!(v.sounding(), Some(&[62u8][..]));
    }

    #[test]
    fn new_slice_releases_then_attacks() {
        let mut v = Voice::new(VoiceRole::Melody);
        v.drive(&limb(0, 0.0, true), true, &palette());
        let acts = v.drive(&limb(2, 0.0, true), true, &palette());
        assert_eq!(acts, vec![
            VoiceAction::Release { notes: vec![60] },
            VoiceAction::Attack  { notes: vec![64], level_db: -20.0 },
        ]);
    }

    #[test]
    fn going_inactive_releases_exactly_once() {
        let mut v = Voice::new(VoiceRole::Harmony);
        let chords = vec![vec![60, 64, 67]];
        v.drive(&limb(0, 100.0, true), true, &chords);

        let off = limb(0, 10.0, false);
        assert_eq!(v.drive(&off, true, &chords), vec![VoiceAction::Release { notes: vec![60, 64, 67] }]);
        assert!(v.drive(&off, true, &chords).is_empty());
        assert_eq!(v.sounding(), None);
    }

    #[test]
    fn closed_gate_never_plays() {
        let mut v = Voice::new(VoiceRole::Melody);
        assert!(v.drive(&limb(1, 200.0, true), false, &palette()).is_empty());
        assert_eq!(v.sounding(), None);
    }

    #[test]
    fn closing_gate_releases() {
        let mut v = Voice::new(VoiceRole::Melody);
        v.drive(&limb(1, 200.0, true), true, &palette());
        let acts = v.drive(&limb(1, 200.0, true), false, &palette());
        assert_eq!(acts, vec![VoiceAction::Release { notes: vec![62] }]);
    }

    #[test]
    fn out_of_range_slice_is_ignored() {
        let mut v = Voice::new(VoiceRole::Melody);
        v.drive(&limb(2, 100.0, true), true, &palette());
        assert!(v.drive(&limb(7, 100.0, true), true, &palette()).is_empty());
        assert_eq!(v.sounding(), Some(&[64u8][..]));
    }

    #[test]
    fn never_seen_limb_is_silent() {
        let mut v = Voice::new(VoiceRole::Melody);
        assert!(v.drive(&LimbControlState::NO_SIGNAL, true, &palette()).is_empty());
    }
}
