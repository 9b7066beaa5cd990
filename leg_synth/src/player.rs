//! Real-time MIDI output thread.
//!
//! The frame loop never touches the port.  It sends whole voice actions over
//! a channel; the engine thread encodes them for the melody and harmony
//! channels and writes them out in order.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use leg_music::message::{action_messages, all_notes_off, patch_messages};
use leg_music::{MidiMessage, PresetPatch, SoundPreset, VoiceAction, VoiceRole};

// ════════════════════════════════════════════════════════════════════════════
// EngineCommand — sent to the output thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    /// Realise one voice transition.
    Voice { role: VoiceRole, action: VoiceAction },
    /// Select programs and reverb for both voices.
    Patch(PresetPatch),
    /// Silence and terminate the thread.
    Quit,
}

/// MIDI channels (0-based) the two voices play on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Channels {
    pub melody:  u8,
    pub harmony: u8,
}

impl Default for Channels {
    fn default() -> Self {
        Channels { melody: 0, harmony: 1 }
    }
}

impl Channels {
    pub fn of(self, role: VoiceRole) -> u8 {
        match role {
            VoiceRole::Melody  => self.melody,
            VoiceRole::Harmony => self.harmony,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiOut: Send {
    fn send(&mut self, msg: MidiMessage);
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidiOut for MidirOut {
    fn send(&mut self, msg: MidiMessage) {
        if let Err(e) = self.conn.send(&msg.to_bytes()) {
            warn!(error = %e, ?msg, "MIDI send failed");
        }
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

pub struct NullOut;

impl MidiOut for NullOut {
    fn send(&mut self, _msg: MidiMessage) {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick one
// ════════════════════════════════════════════════════════════════════════════

/// Index of the port to open.
///
/// A `hint` matching a port name (case-insensitive substring) wins; then a
/// visible softsynth; then the first port.
fn pick_port(names: &[String], hint: Option<&str>) -> Option<usize> {
    if names.is_empty() {
        return None;
    }
    let lower: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    if let Some(h) = hint.map(str::to_lowercase) {
        if let Some(i) = lower.iter().position(|n| n.contains(&h)) {
            return Some(i);
        }
        warn!(hint = %h, "no MIDI port matches, falling back");
    }
    let softsynth = lower.iter().position(|n| {
        n.contains("fluid") || n.contains("timidity") ||
        n.contains("microsoft") || n.contains("gm") ||
        n.contains("synth")
    });
    Some(softsynth.unwrap_or(0))
}

/// Open a MIDI output port.
/// Falls back to [`NullOut`] with a warning if none can be opened.
pub fn open_midi_output(hint: Option<&str>) -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new("leg_synth") {
        Ok(m)  => m,
        Err(e) => {
            warn!(error = %e, "MIDI init failed, using null output");
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| midi_out.port_name(p).unwrap_or_else(|_| "Unknown".to_string()))
        .collect();

    let Some(idx) = pick_port(&names, hint) else {
        warn!("no MIDI output ports found, using null output");
        warn!("install a synthesiser, e.g. `fluidsynth` or `timidity -iA` on Linux");
        return Box::new(NullOut);
    };

    info!(port = %names[idx], "opening MIDI port");
    match midi_out.connect(&ports[idx], "leg-synth-out") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            warn!(error = %e, "MIDI connect failed, using null output");
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AudioEngine — handle to the output thread
// ════════════════════════════════════════════════════════════════════════════

pub struct AudioEngine {
    cmd_tx: Sender<EngineCommand>,
    handle: Option<JoinHandle<usize>>,
}

impl AudioEngine {
    /// Spawn the output thread writing to `out`.
    pub fn spawn(out: Box<dyn MidiOut>, channels: Channels) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<EngineCommand>();
        let handle = thread::spawn(move || engine_thread(out, channels, cmd_rx));
        AudioEngine { cmd_tx, handle: Some(handle) }
    }

    pub fn voice(&self, role: VoiceRole, action: VoiceAction) {
        let _ = self.cmd_tx.send(EngineCommand::Voice { role, action });
    }

    pub fn set_preset(&self, preset: SoundPreset) {
        let _ = self.cmd_tx.send(EngineCommand::Patch(preset.patch()));
    }

    /// Silence, stop the thread and wait for it.  Returns the number of
    /// messages written over the engine's lifetime.
    pub fn shutdown(mut self) -> usize {
        self.stop()
    }

    fn stop(&mut self) -> usize {
        let Some(handle) = self.handle.take() else {
            return 0;
        };
        let _ = self.cmd_tx.send(EngineCommand::Quit);
        match handle.join() {
            Ok(sent) => sent,
            Err(_) => {
                warn!("MIDI thread panicked");
                0
            }
        }
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// engine_thread — the actual loop
// ════════════════════════════════════════════════════════════════════════════

fn engine_thread(mut out: Box<dyn MidiOut>, channels: Channels, cmd_rx: Receiver<EngineCommand>) -> usize {
    let mut sent = 0usize;
    let mut emit = |out: &mut Box<dyn MidiOut>, msgs: Vec<MidiMessage>| {
        sent += msgs.len();
        for m in msgs {
            out.send(m);
        }
    };
    let silence = vec![all_notes_off(channels.melody), all_notes_off(channels.harmony)];

    // Blocks until a command arrives; a dropped sender ends the loop too.
    for cmd in cmd_rx.iter() {
        match cmd {
            EngineCommand::Voice { role, action } => {
                debug!(voice = role.name(), ?action, "voice");
                emit(&mut out, action_messages(&action, channels.of(role)));
            }
            EngineCommand::Patch(patch) => {
                info!(
                    melody = patch.melody.name(),
                    harmony = patch.harmony.name(),
                    reverb = patch.reverb_send,
                    "patch"
                );
                emit(&mut out, patch_messages(&patch, channels.melody, channels.harmony));
            }
            EngineCommand::Quit => break,
        }
    }
    emit(&mut out, silence);
    sent
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
