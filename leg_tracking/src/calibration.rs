//! One-shot calibration: re-centre the body frame on the performer.
//!
//! ```text
//!            request()               deadline reached
//!   Idle ───────────────► Sampling ────────────────────► Calibrated
//!                           ▲  │ abandon()                   │
//!                           │  └──► (previous phase)         │
//!                           └──────── request() ─────────────┘
//! ```
//!
//! Sampling is a deadline, not a sleep: the frame loop keeps running and
//! publishing limb state during the settle window, and [`Calibrator::tick`]
//! samples whatever is current once the deadline passes.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;

use tracing::{debug, info};

use crate::control::LegPair;
use crate::geometry::CalibrationOffset;

/// Default settle window before the sample is taken.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1000);

// ════════════════════════════════════════════════════════════════════════════
// Outcome / ticket
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalibrationOutcome {
    pub offset: CalibrationOffset,
    /// Number of active limbs that contributed to the new centre.
    pub contributors: usize,
    /// True when no limb was active and the frame centre was used.
    pub fell_back: bool,
}

/// The calibration was cancelled or superseded before it completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalibrationAbandoned;

impl fmt::Display for CalibrationAbandoned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "calibration abandoned before completion")
    }
}

impl std::error::Error for CalibrationAbandoned {}

/// Handle to a pending calibration.  Resolves exactly once.
///
/// Poll it from the frame loop with [`try_outcome`](Self::try_outcome), or
/// block on it from another thread with [`wait`](Self::wait).
#[derive(Debug)]
pub struct CalibrationTicket {
    rx: Receiver<CalibrationOutcome>,
}

impl CalibrationTicket {
    /// `None` while sampling is still in progress.
    pub fn try_outcome(&self) -> Option<Result<CalibrationOutcome, CalibrationAbandoned>> {
        match self.rx.try_recv() {
            Ok(outcome)                     => Some(Ok(outcome)),
            Err(TryRecvError::Empty)        => None,
            Err(TryRecvError::Disconnected) => Some(Err(CalibrationAbandoned)),
        }
    }

    pub fn wait(self) -> Result<CalibrationOutcome, CalibrationAbandoned> {
        self.rx.recv().map_err(|_| CalibrationAbandoned)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Calibrator
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    /// Waiting for the settle window to end at `deadline` (loop clock).
    Sampling { deadline: Duration },
    Calibrated,
}

/// Owner of the calibration offset.
#[derive(Debug)]
pub struct Calibrator {
    offset:  CalibrationOffset,
    phase:   CalibrationPhase,
    /// Phase restored by [`abandon`](Self::abandon).
    resume:  CalibrationPhase,
    settle:  Duration,
    waiter:  Option<Sender<CalibrationOutcome>>,
}

impl Calibrator {
    pub fn new(settle: Duration) -> Self {
        Calibrator {
            offset: CalibrationOffset::UNSET,
            phase:  CalibrationPhase::Idle,
            resume: CalibrationPhase::Idle,
            settle,
            waiter: None,
        }
    }

    pub fn offset(&self) -> &CalibrationOffset { &self.offset }
    pub fn phase(&self)  -> CalibrationPhase   { self.phase }
    pub fn settle(&self) -> Duration           { self.settle }

    pub fn is_sampling(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Sampling { .. })
    }

    /// Start (or restart) sampling.  A ticket from an earlier, still
    /// pending request resolves as abandoned.
    pub fn request(&mut self, now: Duration) -> CalibrationTicket {
        if !self.is_sampling() {
            self.resume = self.phase;
        }
        let deadline = now + self.settle;
        self.phase = CalibrationPhase::Sampling { deadline };

        let (tx, rx) = mpsc::channel();
        self.waiter = Some(tx);
        info!(settle_ms = self.settle.as_millis() as u64, "calibration sampling started");
        CalibrationTicket { rx }
    }

    /// Advance the state machine.  Returns the outcome on the tick that
    /// completes the calibration.
    pub fn tick(&mut self, now: Duration, legs: &LegPair) -> Option<CalibrationOutcome> {
        let CalibrationPhase::Sampling { deadline } = self.phase else {
            return None;
        };
        if now < deadline {
            return None;
        }

        let outcome = derive_offset(legs);
        self.offset = outcome.offset;
        self.phase  = CalibrationPhase::Calibrated;

        if outcome.fell_back {
            info!("no active limb at calibration time; centring on the frame");
        } else {
            info!(
                center_x = outcome.offset.center_x,
                center_y = outcome.offset.center_y,
                contributors = outcome.contributors,
                "calibration complete"
            );
        }

        if let Some(tx) = self.waiter.take() {
            if tx.send(outcome).is_err() {
                debug!("calibration ticket dropped before completion");
            }
        }
        Some(outcome)
    }

    /// Cancel sampling.  The offset keeps its prior value.
    pub fn abandon(&mut self) {
        if self.is_sampling() {
            self.phase  = self.resume;
            self.waiter = None;
            info!("calibration abandoned; offset unchanged");
        }
    }
}

/// Mean absolute position of the active limbs, or the frame centre when
/// none is active.  Never blends with an earlier offset.
pub fn derive_offset(legs: &LegPair) -> CalibrationOutcome {
    let mut sum_x = 0.0f32;
    let mut sum_y = 0.0f32;
    let mut count = 0usize;

    for state in [&legs.left, &legs.right] {
        if state.is_active {
            let (x, y) = state.absolute_position();
            sum_x += x;
            sum_y += y;
            count += 1;
        }
    }

    if count == 0 {
        let (cx, cy) = CalibrationOffset::FRAME_CENTER;
        return CalibrationOutcome {
            offset: CalibrationOffset::at(cx, cy),
            contributors: 0,
            fell_back: true,
        };
    }

    CalibrationOutcome {
        offset: CalibrationOffset::at(sum_x / count as f32, sum_y / count as f32),
        contributors: count,
        fell_back: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::LimbControlState;
    use approx::assert_abs_diff_eq;

    fn at(x: f32, y: f32, active: bool) -> LimbControlState {
        LimbControlState {
            slice: 0,
            x,
            y,
            distance: (x * x + y * y).sqrt() * 1000.0,
            is_active: active,
            center: (0.0, 0.0),
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn two_active_limbs_average() {
        let legs = LegPair { left: at(0.4, 0.5, true), right: at(0.6, 0.5, true) };
        let out = derive_offset(&legs);
        assert_abs_diff_eq!(out.offset.center_x, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out.offset.center_y, 0.5, epsilon = 1e-6);
        assert!(out.offset.is_set);
        assert_eq!(out.contributors, 2);
        assert!(!out.fell_back);
    }

    #[test]
    fn no_active_limbs_falls_back_to_frame_center() {
        let legs = LegPair { left: at(0.1, 0.9, false), right: at(0.8, 0.2, false) };
        let out = derive_offset(&legs);
        assert_eq!((out.offset.center_x, out.offset.center_y), (0.5, 0.5));
        assert!(out.offset.is_set);
        assert!(out.fell_back);
    }

    #[test]
    fn single_active_limb_is_the_center() {
        let legs = LegPair { left: at(0.3, 0.7, true), right: at(0.9, 0.9, false) };
        let out = derive_offset(&legs);
        assert_abs_diff_eq!(out.offset.center_x, 0.3);
        assert_abs_diff_eq!(out.offset.center_y, 0.7);
        assert_eq!(out.contributors, 1);
    }

    #[test]
    fn recalibration_uses_absolute_positions() {
        // States computed relative to an earlier centre at (0.5, 0.5).
        let mut left = at(-0.1, 0.0, true);
        left.center = (0.5, 0.5);
        let mut right = at(0.1, 0.2, true);
        right.center = (0.5, 0.5);
        let out = derive_offset(&LegPair { left, right });
        assert_abs_diff_eq!(out.offset.center_x, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out.offset.center_y, 0.6, epsilon = 1e-6);
    }

    #[test]
    fn waits_for_settle_window() {
        let mut cal = Calibrator::new(DEFAULT_SETTLE);
        let legs = LegPair { left: at(0.4, 0.5, true), right: at(0.6, 0.5, true) };
        let ticket = cal.request(ms(100));
        assert_eq!(cal.phase(), CalibrationPhase::Sampling { deadline: ms(1100) });

        assert!(cal.tick(ms(600), &legs).is_none());
        assert!(ticket.try_outcome().is_none());
        assert!(!cal.offset().is_set);

        let out = cal.tick(ms(1100), &legs).unwrap();
        assert_eq!(cal.phase(), CalibrationPhase::Calibrated);
        assert_eq!(ticket.try_outcome(), Some(Ok(out)));
        assert!(cal.offset().is_set);
    }

    #[test]
    fn samples_state_current_at_deadline() {
        let mut cal = Calibrator::new(ms(500));
        let _ticket = cal.request(ms(0));
        let early = LegPair { left: at(0.1, 0.1, true), right: at(0.1, 0.1, true) };
        cal.tick(ms(200), &early);
        let late = LegPair { left: at(0.4, 0.8, true), right: at(0.6, 0.8, true) };
        let out = cal.tick(ms(500), &late).unwrap();
        assert_abs_diff_eq!(out.offset.center_y, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn rerequest_supersedes_pending_ticket() {
        let mut cal = Calibrator::new(ms(1000));
        let first = cal.request(ms(0));
        let second = cal.request(ms(500));
        assert_eq!(first.try_outcome(), Some(Err(CalibrationAbandoned)));
        assert!(cal.tick(ms(1000), &LegPair::default()).is_none());
        assert!(cal.tick(ms(1500), &LegPair::default()).is_some());
        assert!(second.try_outcome().unwrap().is_ok());
    }

    #[test]
    fn recalibration_replaces_offset() {
        let mut cal = Calibrator::new(ms(10));
        cal.request(ms(0));
        cal.tick(ms(10), &LegPair { left: at(0.2, 0.2, true), right: at(0.2, 0.2, false) });
        assert_abs_diff_eq!(cal.offset().center_x, 0.2);

        cal.request(ms(20));
        cal.tick(ms(30), &LegPair::default());
        assert_eq!(cal.offset().center_x, 0.5);
        assert_eq!(cal.phase(), CalibrationPhase::Calibrated);
    }

    #[test]
    fn abandon_keeps_prior_offset_and_phase() {
        let mut cal = Calibrator::new(ms(10));
        cal.request(ms(0));
        cal.tick(ms(10), &LegPair { left: at(0.3, 0.3, true), right: at(0.3, 0.3, true) });
        let before = *cal.offset();

        let ticket = cal.request(ms(20));
        cal.abandon();
        assert_eq!(cal.phase(), CalibrationPhase::Calibrated);
        assert_eq!(*cal.offset(), before);
        assert_eq!(ticket.try_outcome(), Some(Err(CalibrationAbandoned)));
        assert!(cal.tick(ms(100), &LegPair::default()).is_none());
    }

    #[test]
    fn abandon_from_first_request_returns_to_idle() {
        let mut cal = Calibrator::new(ms(10));
        cal.request(ms(0));
        cal.abandon();
        assert_eq!(cal.phase(), CalibrationPhase::Idle);
        assert!(!cal.offset().is_set);
    }

    #[test]
    fn ticket_wait_resolves_across_threads() {
        let mut cal = Calibrator::new(ms(0));
        let ticket = cal.request(ms(0));
        let handle = std::thread::spawn(move || ticket.wait());
        cal.tick(ms(0), &LegPair::default());
        let out = handle.join().unwrap().unwrap();
        assert!(out.fell_back);
    }

    #[test]
    fn dropping_calibrator_abandons_ticket() {
        let mut cal = Calibrator::new(ms(10));
        let ticket = cal.request(ms(0));
        drop(cal);
        assert_eq!(ticket.wait(), Err(CalibrationAbandoned));
    }
}
