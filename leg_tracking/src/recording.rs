//! Session recordings: landmark streams stored as JSON lines.
//!
//! One frame per line:
//!
//! ```text
//! {"video_ms":33.3,"pose":[{"x":0.5,"y":0.9,"visibility":0.98}, ...]}
//! {"video_ms":66.6,"pose":null}
//! {"video_ms":99.9,"pose":null,"error":"model timeout"}
//! ```
//!
//! `pose: null` is a frame with nobody in view; `error` replays a detector
//! failure for that frame.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DetectError, TrackingError};
use crate::landmark::PoseLandmarks;
use crate::source::LandmarkSource;

/// One recorded detector frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Video timestamp in milliseconds.
    pub video_ms: f64,
    pub pose: Option<PoseLandmarks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordedFrame {
    /// Video time as a `Duration`, or `None` when `video_ms` is negative,
    /// not finite or too large to represent.
    pub fn try_video_time(&self) -> Option<Duration> {
        Duration::try_from_secs_f64(self.video_ms / 1000.0).ok()
    }

    /// Video time, saturating at the representable range.  Frames that went
    /// through [`parse_recording`] always convert exactly.
    pub fn video_time(&self) -> Duration {
        match self.try_video_time() {
            Some(t) => t,
            None if self.video_ms > 0.0 => Duration::MAX,
            None => Duration::ZERO,
        }
    }
}

/// Parse a recording from any line reader.  Blank lines are skipped.
pub fn parse_recording<R: BufRead>(reader: R) -> Result<Vec<RecordedFrame>, TrackingError> {
    let mut frames = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| TrackingError::Recording { line: i + 1, message: e.to_string() })?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: RecordedFrame = serde_json::from_str(&line)
            .map_err(|e| TrackingError::Recording { line: i + 1, message: e.to_string() })?;
        if frame.try_video_time().is_none() {
            return Err(TrackingError::Recording {
                line:    i + 1,
                message: format!("video_ms out of range: {}", frame.video_ms),
            });
        }
        frames.push(frame);
    }
    Ok(frames)
}

/// Load a recording file.  A file that cannot be opened means there is no
/// landmark source at all.
pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<RecordedFrame>, TrackingError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        TrackingError::DetectorUnavailable(format!("cannot open {}: {}", path.display(), e))
    })?;
    let frames = parse_recording(BufReader::new(file))?;
    info!(path = %path.display(), frames = frames.len(), "loaded landmark recording");
    Ok(frames)
}

// ════════════════════════════════════════════════════════════════════════════
// RecordingWriter
// ════════════════════════════════════════════════════════════════════════════

/// Appends frames to a JSON-lines file.
pub struct RecordingWriter {
    out:   BufWriter<File>,
    lines: usize,
}

impl RecordingWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, TrackingError> {
        let file = File::create(path.as_ref())
            .map_err(|e| TrackingError::Recording { line: 0, message: e.to_string() })?;
        Ok(RecordingWriter { out: BufWriter::new(file), lines: 0 })
    }

    pub fn write_frame(&mut self, frame: &RecordedFrame) -> Result<(), TrackingError> {
        self.lines += 1;
        let line = self.lines;
        let err = |e: String| TrackingError::Recording { line, message: e };
        serde_json::to_writer(&mut self.out, frame).map_err(|e| err(e.to_string()))?;
        self.out.write_all(b"\n").map_err(|e| err(e.to_string()))
    }

    pub fn finish(mut self) -> Result<usize, TrackingError> {
        self.out
            .flush()
            .map_err(|e| TrackingError::Recording { line: self.lines, message: e.to_string() })?;
        Ok(self.lines)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplayDetector
// ════════════════════════════════════════════════════════════════════════════

/// Landmark source that answers with whatever the recorded frame holds.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayDetector;

impl LandmarkSource for ReplayDetector {
    type Frame = RecordedFrame;

    fn detect(
        &mut self,
        frame: &RecordedFrame,
        _timestamp_ms: u64,
    ) -> Result<Option<PoseLandmarks>, DetectError> {
        match &frame.error {
            Some(msg) => Err(DetectError::new(msg.clone())),
            None      => Ok(frame.pose.clone()),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RecordingSource — tee a live source into a session file
// ════════════════════════════════════════════════════════════════════════════

/// Wraps another source and appends every detector answer to a recording.
///
/// The detector timestamp is stored as the frame's video time, which keeps
/// replayed frames distinct and in order.  A write failure stops recording
/// but never disturbs detection.
pub struct RecordingSource<S> {
    inner:  S,
    writer: Option<RecordingWriter>,
}

impl<S> RecordingSource<S> {
    pub fn new(inner: S, writer: Option<RecordingWriter>) -> Self {
        RecordingSource { inner, writer }
    }

    /// No file attached; detection passes straight through.
    pub fn passthrough(inner: S) -> Self {
        RecordingSource { inner, writer: None }
    }

    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }

    pub fn inner(&self) -> &S         { &self.inner }
    pub fn inner_mut(&mut self) -> &mut S { &mut self.inner }

    /// Flush the file and hand back the wrapped source with the number of
    /// frames written.
    pub fn finish(self) -> Result<(S, usize), TrackingError> {
        let lines = match self.writer {
            Some(w) => w.finish()?,
            None    => 0,
        };
        Ok((self.inner, lines))
    }
}

impl<S: LandmarkSource> LandmarkSource for RecordingSource<S> {
    type Frame = S::Frame;

    fn detect(
        &mut self,
        frame: &S::Frame,
        timestamp_ms: u64,
    ) -> Result<Option<PoseLandmarks>, DetectError> {
        let result = self.inner.detect(frame, timestamp_ms);
        if let Some(writer) = self.writer.as_mut() {
            let record = RecordedFrame {
                video_ms: timestamp_ms as f64,
                pose:     result.as_ref().ok().cloned().flatten(),
                error:    result.as_ref().err().map(|e| e.message.clone()),
            };
            if let Err(e) = writer.write_frame(&record) {
                warn!(error = %e, "recording stopped");
                self.writer = None;
            }
        }
        result
    }
}
