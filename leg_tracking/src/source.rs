//! Landmark sources: the pose detector boundary.
//!
//! The tracker never knows whether landmarks come from a camera model, a
//! recording or a simulator.  It only calls [`LandmarkSource::detect`], at
//! most once per distinct video timestamp.

use std::collections::VecDeque;

use crate::error::DetectError;
use crate::landmark::PoseLandmarks;

/// Anything that can turn a video frame into body landmarks.
pub trait LandmarkSource {
    /// Whatever the source needs to look at: pixels, a recorded frame, ...
    type Frame;

    /// Detect at most one pose in `frame`.
    ///
    /// `timestamp_ms` strictly increases between calls.  `Ok(None)` means
    /// nobody is in view; `Err` means this frame could not be processed and
    /// the caller should simply try the next one.
    fn detect(
        &mut self,
        frame: &Self::Frame,
        timestamp_ms: u64,
    ) -> Result<Option<PoseLandmarks>, DetectError>;
}

// ════════════════════════════════════════════════════════════════════════════
// ScriptedSource — canned responses, for tests and demos
// ════════════════════════════════════════════════════════════════════════════

/// Replays a fixed list of detector responses, ignoring the frame.
///
/// Once the script runs out the last response repeats.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script:     VecDeque<Result<Option<PoseLandmarks>, DetectError>>,
    last:       Result<Option<PoseLandmarks>, DetectError>,
    /// Timestamps of every `detect` call, oldest first.
    pub calls:  Vec<u64>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<Option<PoseLandmarks>, DetectError>>) -> Self {
        ScriptedSource { script: script.into(), last: Ok(None), calls: Vec::new() }
    }

    /// Answer every call with the same pose (or with "nobody in view").
    pub fn repeating(pose: Option<PoseLandmarks>) -> Self {
        ScriptedSource { script: VecDeque::new(), last: Ok(pose), calls: Vec::new() }
    }

    /// Queue another response.
    pub fn push(&mut self, response: Result<Option<PoseLandmarks>, DetectError>) {
        self.script.push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }
}

impl LandmarkSource for ScriptedSource {
    type Frame = ();

    fn detect(&mut self, _frame: &(), timestamp_ms: u64) -> Result<Option<PoseLandmarks>, DetectError> {
        self.calls.push(timestamp_ms);
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{Joint, Landmark};

    #[test]
    fn scripted_source_repeats_last_response() {
        let mut pose = PoseLandmarks::empty();
        pose.set(Joint::LeftAnkle, Landmark::new(0.1, 0.2, 0.9));
        let mut src = ScriptedSource::new(vec![Ok(None), Ok(Some(pose.clone()))]);
        assert_eq!(src.detect(&(), 1), Ok(None));
        assert_eq!(src.detect(&(), 2), Ok(Some(pose.clone())));
        assert_eq!(src.detect(&(), 3), Ok(Some(pose)));
        assert_eq!(src.calls, vec![1, 2, 3]);
    }

    #[test]
    fn scripted_source_can_fail() {
        let mut src = ScriptedSource::new(vec![Err(DetectError::new("blur")), Ok(None)]);
        assert!(src.detect(&(), 1).is_err());
        assert_eq!(src.detect(&(), 2), Ok(None));
    }
}
