//! Window input and the simulated performer.
//!
//! The visualizer turns raw key and mouse state into [`SimInput`]s; a
//! translator thread turns those into [`UiCommand`]s for the frame loop.
//! Pointer commands move the ankles of a [`SimPerformer`], which stands in
//! for the camera and the pose model.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use leg_tracking::{DetectError, Joint, Landmark, LandmarkSource, Limb, PoseLandmarks};

// ════════════════════════════════════════════════════════════════════════════
// UiCommand
// ════════════════════════════════════════════════════════════════════════════

/// A high-level request from the performer.
#[derive(Clone, Debug, PartialEq)]
pub enum UiCommand {
    Calibrate,
    NextRoot,
    NextScale,
    NextPreset,
    /// Step the simulated performer in or out of view.
    TogglePerformer,
    /// Place an ankle at a normalized frame position.
    MoveAnkle { limb: Limb, x: f32, y: f32 },
    /// Let an ankle fall back to its resting spot.
    RestAnkle(Limb),
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// CommandSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`UiCommand`]s over a channel.
pub trait CommandSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<UiCommand>);
}

/// Spawn a command source on its own thread and return the receiving end.
pub fn spawn_command_source<C: CommandSource>(source: C) -> Receiver<UiCommand> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimInput — raw window events
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    KeyDown(SimKey),
    /// Mouse button for `limb` held at a normalized stage position.
    Drag { limb: Limb, x: f32, y: f32 },
    /// Mouse button for `limb` let go.
    Release(Limb),
}

/// Simulated key codes (mapped from minifb Key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    Calibrate,  // C
    Root,       // R
    Scale,      // S
    Preset,     // P
    Hide,       // H
    Quit,       // Q / Escape
}

/// Translates window events into commands.
pub struct SimCommandSource {
    pub rx: Receiver<SimInput>,
}

impl CommandSource for SimCommandSource {
    fn run(self: Box<Self>, tx: Sender<UiCommand>) {
        for input in self.rx {
            let cmd = match input {
                SimInput::KeyDown(SimKey::Calibrate) => UiCommand::Calibrate,
                SimInput::KeyDown(SimKey::Root)      => UiCommand::NextRoot,
                SimInput::KeyDown(SimKey::Scale)     => UiCommand::NextScale,
                SimInput::KeyDown(SimKey::Preset)    => UiCommand::NextPreset,
                SimInput::KeyDown(SimKey::Hide)      => UiCommand::TogglePerformer,
                SimInput::Drag { limb, x, y }        => UiCommand::MoveAnkle { limb, x, y },
                SimInput::Release(limb)              => UiCommand::RestAnkle(limb),
                SimInput::KeyDown(SimKey::Quit)      => {
                    let _ = tx.send(UiCommand::Quit);
                    return;
                }
            };
            if tx.send(cmd).is_err() { return; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimPerformer — a landmark source you steer with the mouse
// ════════════════════════════════════════════════════════════════════════════

/// Where the ankles sit when nobody drags them: feet together, bottom of
/// the frame.  Calibrating at rest centres the dials between them, and
/// each rest ankle stays well inside the default deadzone.
pub const REST_LEFT:  (f32, f32) = (0.47, 0.85);
pub const REST_RIGHT: (f32, f32) = (0.53, 0.85);
const HIP_Y:          f32        = 0.55;
const SIM_VISIBILITY: f32        = 0.95;

#[derive(Clone, Debug)]
pub struct SimPerformer {
    left:    (f32, f32),
    right:   (f32, f32),
    visible: bool,
}

impl Default for SimPerformer {
    fn default() -> Self {
        SimPerformer { left: REST_LEFT, right: REST_RIGHT, visible: true }
    }
}

impl SimPerformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ankle(&self, limb: Limb) -> (f32, f32) {
        match limb {
            Limb::Left  => self.left,
            Limb::Right => self.right,
        }
    }

    pub fn move_ankle(&mut self, limb: Limb, x: f32, y: f32) {
        let p = (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
        match limb {
            Limb::Left  => self.left = p,
            Limb::Right => self.right = p,
        }
    }

    pub fn rest_ankle(&mut self, limb: Limb) {
        match limb {
            Limb::Left  => self.left = REST_LEFT,
            Limb::Right => self.right = REST_RIGHT,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns the new visibility.
    pub fn toggle_visible(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    /// Full 33-point pose with only hips and ankles populated.
    pub fn pose(&self) -> PoseLandmarks {
        let mut pose = PoseLandmarks::empty();
        pose.set(Joint::LeftHip,    Landmark::new(REST_LEFT.0,  HIP_Y, SIM_VISIBILITY));
        pose.set(Joint::RightHip,   Landmark::new(REST_RIGHT.0, HIP_Y, SIM_VISIBILITY));
        pose.set(Joint::LeftAnkle,  Landmark::new(self.left.0,  self.left.1,  SIM_VISIBILITY));
        pose.set(Joint::RightAnkle, Landmark::new(self.right.0, self.right.1, SIM_VISIBILITY));
        pose
    }
}

impl LandmarkSource for SimPerformer {
    type Frame = ();

    fn detect(&mut self, _frame: &(), _timestamp_ms: u64) -> Result<Option<PoseLandmarks>, DetectError> {
        Ok(self.visible.then(|| self.pose()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimCamera — video clock slower than the render loop
// ════════════════════════════════════════════════════════════════════════════

/// A camera delivering frames at a fixed rate.  The render loop runs
/// faster, so several passes see the same video time.
#[derive(Clone, Copy, Debug)]
pub struct SimCamera {
    period: Duration,
}

impl SimCamera {
    pub fn new(fps: u32) -> Self {
        SimCamera { period: Duration::from_secs(1) / fps.max(1) }
    }

    /// Timestamp of the latest frame captured by `now`.
    pub fn video_time(&self, now: Duration) -> Duration {
        let n = now.as_nanos() / self.period.as_nanos();
        self.period * n as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translate(inputs: Vec<SimInput>) -> Vec<UiCommand> {
        let (sim_tx, sim_rx) = mpsc::channel();
        for i in inputs {
            sim_tx.send(i).unwrap();
        }
        drop(sim_tx);
        let (tx, rx) = mpsc::channel();
        Box::new(SimCommandSource { rx: sim_rx }).run(tx);
        rx.iter().collect()
    }

    #[test]
    fn keys_become_commands() {
        let cmds = translate(vec![
            SimInput::KeyDown(SimKey::Calibrate),
            SimInput::KeyDown(SimKey::Scale),
            SimInput::Drag { limb: Limb::Left, x: 0.2, y: 0.7 },
            SimInput::Release(Limb::Left),
        ]);
        assert_eq!(cmds, vec![
            UiCommand::Calibrate,
            UiCommand::NextScale,
            UiCommand::MoveAnkle { limb: Limb::Left, x: 0.2, y: 0.7 },
            UiCommand::RestAnkle(Limb::Left),
        ]);
    }

    #[test]
    fn quit_ends_translation() {
        let cmds = translate(vec![
            SimInput::KeyDown(SimKey::Quit),
            SimInput::KeyDown(SimKey::Root),
        ]);
        assert_eq!(cmds, vec![UiCommand::Quit]);
    }

    #[test]
    fn spawned_source_delivers() {
        let (sim_tx, sim_rx) = mpsc::channel();
        let rx = spawn_command_source(SimCommandSource { rx: sim_rx });
        sim_tx.send(SimInput::KeyDown(SimKey::Preset)).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(UiCommand::NextPreset));
    }

    #[test]
    fn performer_pose_tracks_ankles() {
        let mut p = SimPerformer::new();
        p.move_ankle(Limb::Right, 0.9, 1.4);
        let pose = p.detect(&(), 0).unwrap().unwrap();
        let right = pose.get(Joint::RightAnkle).unwrap();
        assert_eq!((right.x, right.y), (0.9, 1.0));
        assert_eq!(pose.get(Joint::LeftAnkle).unwrap().x, REST_LEFT.0);

        p.rest_ankle(Limb::Right);
        assert_eq!(p.ankle(Limb::Right), REST_RIGHT);
    }

    #[test]
    fn hidden_performer_is_not_detected() {
        let mut p = SimPerformer::new();
        assert!(!p.toggle_visible());
        assert_eq!(p.detect(&(), 0), Ok(None));
        assert!(p.toggle_visible());
    }

    #[test]
    fn camera_repeats_video_time_between_frames() {
        let cam = SimCamera::new(30);
        let a = cam.video_time(Duration::from_millis(40));
        let b = cam.video_time(Duration::from_millis(50));
        let c = cam.video_time(Duration::from_millis(70));
        assert_eq!(a, b);
        assert!(c > b);
        assert_eq!(cam.video_time(Duration::ZERO), Duration::ZERO);
    }
}
