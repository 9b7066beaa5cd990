//! Top-level application state machine.
//!
//! `AppState` owns the `Tracker`, the two `Voice`s, the current key and
//! preset, and the `AudioEngine`.  Each pass of the frame loop calls
//! [`AppState::step`]; commands from the window arrive through
//! [`AppState::handle_command`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use tracing::{debug, info, warn};

use leg_music::{note_name, MusicalKey, SoundPreset, Voice, VoiceRole};
use leg_tracking::recording::read_recording;
use leg_tracking::{
    CalibrationOffset, CalibrationPhase, CalibrationTicket, FrameOutcome, LandmarkSource,
    LegPair, RecordedFrame, RecordingSource, RecordingWriter, ReplayDetector, Tracker,
    TrackingError,
};

use crate::config::AppConfig;
use crate::input::{spawn_command_source, SimCamera, SimCommandSource, SimPerformer, UiCommand};
use crate::player::{open_midi_output, AudioEngine, Channels};
use crate::visualizer::{Scene, Visualizer};

pub const STATUS_READY:       &str = "Ready! Press C to calibrate.";
pub const STATUS_CALIBRATING: &str = "Calibrating... Please stand in view with legs centered.";
pub const STATUS_CALIBRATED:  &str = "Calibration complete! Move your legs to play music.";
const STATUS_CANCELLED:       &str = "Calibration cancelled. Press C to try again.";

/// Frame rate of the simulated camera.
const SIM_CAMERA_FPS: u32 = 30;

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState<S: LandmarkSource> {
    // ── tracking ─────────────────────────────────────────────────────────
    tracker:         Tracker<S>,
    pending:         Option<CalibrationTicket>,

    // ── music ────────────────────────────────────────────────────────────
    key:             MusicalKey,
    preset:          SoundPreset,
    melody:          Voice,
    harmony:         Voice,
    melody_palette:  Vec<Vec<u8>>,
    harmony_palette: Vec<Vec<u8>>,

    // ── output ───────────────────────────────────────────────────────────
    engine:          AudioEngine,

    // ── status message ───────────────────────────────────────────────────
    pub status:      String,
}

impl<S: LandmarkSource> AppState<S> {
    pub fn new(source: S, cfg: &AppConfig, engine: AudioEngine) -> Result<Self, TrackingError> {
        let tracker = Tracker::new(source, cfg.tracking.clone())?;
        let key = cfg.music.key();
        engine.set_preset(cfg.music.preset);
        info!(key = %key.label(), preset = cfg.music.preset.name(), "ready");

        Ok(AppState {
            tracker,
            pending:         None,
            melody_palette:  key.palette(VoiceRole::Melody),
            harmony_palette: key.palette(VoiceRole::Harmony),
            key,
            preset:          cfg.music.preset,
            melody:          Voice::new(VoiceRole::Melody),
            harmony:         Voice::new(VoiceRole::Harmony),
            engine,
            status:          STATUS_READY.to_string(),
        })
    }

    // ── commands ─────────────────────────────────────────────────────────

    /// Apply a music or tracking command.  Returns false for `Quit`;
    /// performer commands are the caller's business and are ignored here.
    pub fn handle_command(&mut self, cmd: &UiCommand, now: Duration) -> bool {
        match cmd {
            UiCommand::Calibrate  => self.request_calibration(now),
            UiCommand::NextRoot   => self.set_key(self.key.with_next_root()),
            UiCommand::NextScale  => self.set_key(self.key.with_next_scale()),
            UiCommand::NextPreset => self.set_preset(self.preset.next()),
            UiCommand::Quit       => return false,
            UiCommand::TogglePerformer
            | UiCommand::MoveAnkle { .. }
            | UiCommand::RestAnkle(_) => {}
        }
        true
    }

    pub fn request_calibration(&mut self, now: Duration) {
        self.pending = Some(self.tracker.request_calibration(now));
        self.status = STATUS_CALIBRATING.to_string();
    }

    /// Takes effect on the next fresh frame; a sounding voice keeps its
    /// notes until its limb moves.
    pub fn set_key(&mut self, key: MusicalKey) {
        self.key = key;
        self.melody_palette = key.palette(VoiceRole::Melody);
        self.harmony_palette = key.palette(VoiceRole::Harmony);
        self.status = format!("Changed to {}", key.label());
        info!(key = %key.label(), "key changed");
    }

    pub fn set_preset(&mut self, preset: SoundPreset) {
        self.preset = preset;
        self.engine.set_preset(preset);
        self.status = format!("Sound preset: {}", preset.name());
    }

    // ── per-frame ────────────────────────────────────────────────────────

    /// Run one pass: track, settle calibration, then drive both voices.
    ///
    /// The gate is sampled before tracking, so the pass that completes
    /// calibration (whose limbs were mapped with the old offset) stays
    /// silent.
    pub fn step(&mut self, frame: &S::Frame, video_time: Duration, now: Duration) -> FrameOutcome {
        let gate_open = self.tracker.is_calibrated();
        let outcome = self.tracker.process(frame, video_time, now);
        self.poll_calibration();

        if outcome.is_fresh() {
            let legs = *self.tracker.legs();
            for action in self.melody.drive(&legs.left, gate_open, &self.melody_palette) {
                self.engine.voice(VoiceRole::Melody, action);
            }
            for action in self.harmony.drive(&legs.right, gate_open, &self.harmony_palette) {
                self.engine.voice(VoiceRole::Harmony, action);
            }
        }
        outcome
    }

    fn poll_calibration(&mut self) {
        let Some(ticket) = &self.pending else { return };
        match ticket.try_outcome() {
            None => {}
            Some(Ok(outcome)) => {
                debug!(?outcome, "calibration settled");
                self.status = STATUS_CALIBRATED.to_string();
                self.pending = None;
            }
            Some(Err(e)) => {
                warn!(error = %e, "calibration");
                self.status = STATUS_CANCELLED.to_string();
                self.pending = None;
            }
        }
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn legs(&self)            -> &LegPair            { self.tracker.legs() }
    pub fn offset(&self)          -> &CalibrationOffset  { self.tracker.offset() }
    pub fn key(&self)             -> MusicalKey          { self.key }
    pub fn preset(&self)          -> SoundPreset         { self.preset }
    pub fn is_calibrated(&self)   -> bool                { self.tracker.is_calibrated() }
    pub fn melody(&self)          -> &Voice              { &self.melody }
    pub fn harmony(&self)         -> &Voice              { &self.harmony }
    pub fn source_mut(&mut self)  -> &mut S              { self.tracker.source_mut() }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.tracker.calibration_phase(), CalibrationPhase::Sampling { .. })
    }

    pub fn scene(&self) -> Scene<'_> {
        let n = self.tracker.config().slice_count;
        Scene {
            legs:           *self.tracker.legs(),
            slice_count:    n,
            offset:         *self.tracker.offset(),
            calibrating:    self.is_calibrating(),
            melody_labels:  slice_labels(&self.melody_palette, n),
            harmony_labels: slice_labels(&self.harmony_palette, n),
            status:         &self.status,
            key_label:      self.key.label(),
            preset:         self.preset.name(),
        }
    }

    /// Release both voices, join the MIDI thread and hand back the source.
    pub fn shutdown(mut self) -> S {
        for (role, voice) in [(VoiceRole::Melody, &mut self.melody), (VoiceRole::Harmony, &mut self.harmony)] {
            if let Some(action) = voice.release() {
                self.engine.voice(role, action);
            }
        }
        let sent = self.engine.shutdown();
        info!(midi_messages = sent, frames = self.tracker.frames_processed(), "shut down");
        self.tracker.shutdown()
    }
}

/// Root note of each palette entry, one label per slice.
fn slice_labels(palette: &[Vec<u8>], slice_count: usize) -> Vec<String> {
    (0..slice_count)
        .map(|k| match palette.get(k).and_then(|notes| notes.first()) {
            Some(&root) => note_name(root),
            None        => "-".to_string(),
        })
        .collect()
}

fn channels(cfg: &AppConfig) -> Channels {
    Channels { melody: cfg.midi.melody_channel, harmony: cfg.midi.harmony_channel }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the interactive simulation loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the windowed simulation until the window closes, `Q` is pressed or
/// `stop` is raised.  With `record` every detector answer is saved there.
pub fn run(cfg: &AppConfig, record: Option<&Path>, stop: &AtomicBool) -> anyhow::Result<()> {
    // ── Sim input channel ─────────────────────────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel();
    let cmd_rx = spawn_command_source(SimCommandSource { rx: sim_rx });

    // ── Visualizer (owns the window and the sim input sender) ────────────
    let mut vis = Visualizer::new(sim_tx).map_err(|e| anyhow!("cannot open window: {}", e))?;

    // ── Tracking and output ───────────────────────────────────────────────
    let writer = match record {
        Some(path) => Some(
            RecordingWriter::create(path)
                .with_context(|| format!("creating recording {}", path.display()))?,
        ),
        None => None,
    };
    let source = RecordingSource::new(SimPerformer::new(), writer);
    let engine = AudioEngine::spawn(open_midi_output(cfg.midi.port.as_deref()), channels(cfg));
    let mut app = AppState::new(source, cfg, engine).context("starting tracker")?;

    let camera = SimCamera::new(SIM_CAMERA_FPS);
    let clock = Instant::now();

    // ── Main loop ─────────────────────────────────────────────────────────
    'frames: while vis.is_open() && !stop.load(Ordering::SeqCst) {
        if !vis.poll_input() { break; }
        let now = clock.elapsed();

        loop {
            match cmd_rx.try_recv() {
                Ok(UiCommand::Quit) => break 'frames,
                Ok(UiCommand::MoveAnkle { limb, x, y }) => {
                    app.source_mut().inner_mut().move_ankle(limb, x, y);
                }
                Ok(UiCommand::RestAnkle(limb)) => app.source_mut().inner_mut().rest_ankle(limb),
                Ok(UiCommand::TogglePerformer) => {
                    let visible = app.source_mut().inner_mut().toggle_visible();
                    app.status = if visible { "Performer in view." } else { "Performer out of view." }
                        .to_string();
                }
                Ok(cmd) => { app.handle_command(&cmd, now); }
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => break 'frames,
            }
        }

        app.step(&(), camera.video_time(now), now);
        vis.render(&app.scene());
    }

    let source = app.shutdown();
    let (_, frames) = source.finish().context("finishing recording")?;
    if let Some(path) = record {
        info!(path = %path.display(), frames, "recording saved");
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Replay — headless, at the recorded pace
// ════════════════════════════════════════════════════════════════════════════

/// How the frames of a replayed session were handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub tracked: usize,
    pub no_pose: usize,
    pub skipped: usize,
    pub stale:   usize,
}

impl ReplayStats {
    fn count(&mut self, outcome: &FrameOutcome) {
        match outcome {
            FrameOutcome::Tracked     => self.tracked += 1,
            FrameOutcome::NoPose      => self.no_pose += 1,
            FrameOutcome::Skipped(_)  => self.skipped += 1,
            FrameOutcome::Stale       => self.stale += 1,
        }
    }
}

/// Feed `frames` through `app`, using each frame's video time as the loop
/// clock.  With `paced` the call sleeps so frames play at recorded speed.
pub fn replay_frames(
    app:    &mut AppState<ReplayDetector>,
    frames: &[RecordedFrame],
    paced:  bool,
    stop:   &AtomicBool,
) -> ReplayStats {
    let mut stats = ReplayStats::default();
    let started = Instant::now();
    let origin = frames.first().map(RecordedFrame::video_time).unwrap_or_default();

    for frame in frames {
        if stop.load(Ordering::SeqCst) {
            info!("replay stopped");
            break;
        }
        let t = frame.video_time();
        if paced {
            if let Some(wait) = t.saturating_sub(origin).checked_sub(started.elapsed()) {
                thread::sleep(wait);
            }
        }
        stats.count(&app.step(frame, t, t));
    }
    stats
}

/// Replay a recorded session, sending MIDI as it goes.
pub fn run_replay(
    cfg:                &AppConfig,
    path:               &Path,
    calibrate_on_start: bool,
    stop:               &AtomicBool,
) -> anyhow::Result<ReplayStats> {
    let frames = read_recording(path)
        .with_context(|| format!("loading recording {}", path.display()))?;

    let engine = AudioEngine::spawn(open_midi_output(cfg.midi.port.as_deref()), channels(cfg));
    let mut app = AppState::new(ReplayDetector, cfg, engine).context("starting tracker")?;
    if calibrate_on_start {
        let start = frames.first().map(RecordedFrame::video_time).unwrap_or_default();
        app.request_calibration(start);
    }

    let stats = replay_frames(&mut app, &frames, true, stop);
    app.shutdown();
    info!(
        tracked = stats.tracked,
        no_pose = stats.no_pose,
        skipped = stats.skipped,
        stale = stats.stale,
        "replay finished"
    );
    Ok(stats)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::tests::CaptureOut;
    use leg_music::MidiMessage;
    use leg_tracking::source::ScriptedSource;
    use leg_tracking::{Joint, Landmark, Limb, PoseLandmarks};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn pose(left: (f32, f32), right: (f32, f32)) -> PoseLandmarks {
        let mut p = PoseLandmarks::empty();
        p.set(Joint::LeftAnkle, Landmark::new(left.0, left.1, 0.9));
        p.set(Joint::RightAnkle, Landmark::new(right.0, right.1, 0.9));
        p
    }

    /// First answer calibrates the center to (0.5, 0.5).
    fn make_app(rest: Vec<Option<PoseLandmarks>>) -> (AppState<ScriptedSource>, CaptureOut) {
        let mut script = vec![Ok(Some(pose((0.4, 0.5), (0.6, 0.5))))];
        script.extend(rest.into_iter().map(Ok));
        let cap = CaptureOut::default();
        let engine = AudioEngine::spawn(Box::new(cap.clone()), Channels::default());
        let app = AppState::new(ScriptedSource::new(script), &AppConfig::default(), engine).unwrap();
        (app, cap)
    }

    fn notes(msgs: &[MidiMessage]) -> Vec<MidiMessage> {
        msgs.iter()
            .filter(|m| matches!(m, MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. }))
            .copied()
            .collect()
    }

    #[test]
    fn starts_ready_and_sends_preset() {
        let (app, cap) = make_app(vec![]);
        assert_eq!(app.status, STATUS_READY);
        app.shutdown();
        assert!(matches!(cap.messages()[0], MidiMessage::ProgramChange { channel: 0, program: 80 }));
    }

    #[test]
    fn silent_until_calibrated() {
        let (mut app, cap) = make_app(vec![]);
        // Uncalibrated, the raw ankle positions are far from the origin.
        assert_eq!(app.step(&(), ms(1000), ms(1000)), FrameOutcome::Tracked);
        assert!(app.legs().left.is_active);
        app.shutdown();
        assert!(notes(&cap.messages()).is_empty());
    }

    #[test]
    fn calibrated_left_ankle_plays_melody() {
        let moved = pose((0.58, 0.5), (0.5, 0.5));
        let (mut app, cap) = make_app(vec![Some(moved.clone()), Some(moved), None]);

        app.request_calibration(ms(0));
        assert_eq!(app.status, STATUS_CALIBRATING);
        app.step(&(), ms(1000), ms(1000));
        assert_eq!(app.status, STATUS_CALIBRATED);
        assert!(app.is_calibrated());

        app.step(&(), ms(1033), ms(1033));
        assert_eq!(app.melody().sounding(), Some(&[60u8][..]));
        assert_eq!(app.step(&(), ms(1033), ms(1050)), FrameOutcome::Stale);
        app.step(&(), ms(1066), ms(1066));
        assert_eq!(app.step(&(), ms(1100), ms(1100)), FrameOutcome::NoPose);
        assert!(app.melody().sounding().is_none());
        app.shutdown();

        let msgs = cap.messages();
        assert_eq!(
            notes(&msgs),
            vec![
                MidiMessage::NoteOn { channel: 0, note: 60, velocity: 100 },
                MidiMessage::NoteOff { channel: 0, note: 60 },
            ]
        );
        let expression = msgs
            .iter()
            .filter(|m| matches!(m, MidiMessage::ControlChange { channel: 0, controller: 11, .. }))
            .count();
        assert_eq!(expression, 2);
    }

    #[test]
    fn right_ankle_plays_chord_on_harmony_channel() {
        let (mut app, cap) = make_app(vec![Some(pose((0.5, 0.5), (0.5, 0.62)))]);
        app.request_calibration(ms(0));
        app.step(&(), ms(1000), ms(1000));
        app.step(&(), ms(1033), ms(1033));
        assert_eq!(app.harmony().sounding(), Some(&[64u8, 67, 71][..]));
        app.shutdown();

        let on: Vec<u8> = cap
            .messages()
            .iter()
            .filter_map(|m| match m {
                MidiMessage::NoteOn { channel: 1, note, .. } => Some(*note),
                _ => None,
            })
            .collect();
        assert_eq!(on, vec![64, 67, 71]);
    }

    #[test]
    fn shutdown_releases_held_notes() {
        let (mut app, cap) = make_app(vec![Some(pose((0.58, 0.5), (0.5, 0.5)))]);
        app.request_calibration(ms(0));
        app.step(&(), ms(1000), ms(1000));
        app.step(&(), ms(1033), ms(1033));
        app.shutdown();
        let msgs = cap.messages();
        assert!(msgs.contains(&MidiMessage::NoteOff { channel: 0, note: 60 }));
        assert!(matches!(msgs.last(), Some(MidiMessage::ControlChange { controller: 123, .. })));
    }

    #[test]
    fn music_commands_update_status() {
        let (mut app, _cap) = make_app(vec![]);
        assert!(app.handle_command(&UiCommand::NextScale, ms(0)));
        assert_eq!(app.status, "Changed to C minor");
        app.handle_command(&UiCommand::NextRoot, ms(0));
        assert_eq!(app.status, "Changed to C# minor");
        app.handle_command(&UiCommand::NextPreset, ms(0));
        assert_eq!(app.status, "Sound preset: piano");
        assert_eq!(app.preset(), SoundPreset::Piano);
        assert!(!app.handle_command(&UiCommand::Quit, ms(0)));
        app.shutdown();
    }

    #[test]
    fn scene_labels_follow_palette() {
        let (app, _cap) = make_app(vec![]);
        let scene = app.scene();
        assert_eq!(scene.slice_count, 8);
        assert_eq!(scene.melody_labels[..3], ["C4", "D4", "E4"]);
        // Seven scale degrees over eight slices.
        assert_eq!(scene.melody_labels[7], "-");
        assert_eq!(scene.status, STATUS_READY);
        drop(scene);
        app.shutdown();
    }

    #[test]
    fn replay_counts_outcomes() {
        let cap = CaptureOut::default();
        let engine = AudioEngine::spawn(Box::new(cap.clone()), Channels::default());
        let mut app = AppState::new(ReplayDetector, &AppConfig::default(), engine).unwrap();

        let frames = vec![
            RecordedFrame { video_ms: 0.0,  pose: None, error: None },
            RecordedFrame { video_ms: 33.0, pose: None, error: Some("timeout".into()) },
            RecordedFrame { video_ms: 33.0, pose: None, error: None },
            RecordedFrame { video_ms: 66.0, pose: Some(pose((0.4, 0.5), (0.6, 0.5))), error: None },
        ];
        let stop = AtomicBool::new(false);
        let stats = replay_frames(&mut app, &frames, false, &stop);
        assert_eq!(stats, ReplayStats { tracked: 1, no_pose: 1, skipped: 1, stale: 1 });
        app.shutdown();
    }

    #[test]
    fn performer_standing_at_rest_stays_silent() {
        let cap = CaptureOut::default();
        let engine = AudioEngine::spawn(Box::new(cap.clone()), Channels::default());
        let mut app = AppState::new(SimPerformer::new(), &AppConfig::default(), engine).unwrap();

        app.request_calibration(ms(0));
        app.step(&(), ms(1000), ms(1000));
        assert!(app.is_calibrated());
        assert!((app.offset().center_x - 0.5).abs() < 1e-6);
        assert!((app.offset().center_y - 0.85).abs() < 1e-6);

        assert_eq!(app.step(&(), ms(1033), ms(1033)), FrameOutcome::Tracked);
        assert!(!app.legs().left.is_active);
        assert!(!app.legs().right.is_active);
        assert!(app.melody().sounding().is_none());
        assert!(app.harmony().sounding().is_none());

        // Dragging away plays; letting go returns to rest and releases.
        app.source_mut().move_ankle(Limb::Left, 0.3, 0.85);
        app.step(&(), ms(1066), ms(1066));
        assert!(app.melody().sounding().is_some());
        app.source_mut().rest_ankle(Limb::Left);
        app.step(&(), ms(1100), ms(1100));
        assert!(app.melody().sounding().is_none());
        assert!(!app.legs().left.is_active);
        app.shutdown();

        let on = notes(&cap.messages())
            .into_iter()
            .filter(|m| matches!(m, MidiMessage::NoteOn { .. }))
            .count();
        assert_eq!(on, 1);
    }

    #[test]
    fn replay_honours_stop_flag() {
        let engine = AudioEngine::spawn(Box::new(CaptureOut::default()), Channels::default());
        let mut app = AppState::new(ReplayDetector, &AppConfig::default(), engine).unwrap();
        let frames = vec![RecordedFrame { video_ms: 0.0, pose: None, error: None }];
        let stop = AtomicBool::new(true);
        assert_eq!(replay_frames(&mut app, &frames, true, &stop), ReplayStats::default());
        app.shutdown();
    }
}
