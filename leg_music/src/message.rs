//! Raw channel-voice messages and the encoding of voice actions into them.

use crate::preset::PresetPatch;
use crate::voice::{db_to_cc, VoiceAction};

/// Expression controller, carries the voice level.
pub const CC_EXPRESSION: u8 = 11;
/// Effects 1 depth, reverb send on GM synthesisers.
pub const CC_REVERB_SEND: u8 = 91;
/// Channel mode message: silence everything on the channel.
pub const CC_ALL_NOTES_OFF: u8 = 123;

/// Note-on velocity for attacks.  Loudness is carried by CC 11 instead.
pub const ATTACK_VELOCITY: u8 = 100;

/// One MIDI channel-voice message.  Channels are 0-based (0–15).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn        { channel: u8, note: u8, velocity: u8 },
    NoteOff       { channel: u8, note: u8 },
    ProgramChange { channel: u8, program: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    /// Wire bytes, status byte first.
    pub fn to_bytes(self) -> Vec<u8> {
        match self {
            MidiMessage::NoteOn { channel, note, velocity } =>
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            MidiMessage::NoteOff { channel, note } =>
                vec![0x80 | (channel & 0x0F), note & 0x7F, 0],
            MidiMessage::ProgramChange { channel, program } =>
                vec![0xC0 | (channel & 0x0F), program & 0x7F],
            MidiMessage::ControlChange { channel, controller, value } =>
                vec![0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
        }
    }
}

/// Messages realising `action` on `channel`.
///
/// An attack sets the expression level before the notes start, so the first
/// sample of the note is already at the right volume.
pub fn action_messages(action: &VoiceAction, channel: u8) -> Vec<MidiMessage> {
    let expression = |db: f32| MidiMessage::ControlChange {
        channel,
        controller: CC_EXPRESSION,
        value: db_to_cc(db),
    };
    match action {
        VoiceAction::Attack { notes, level_db } => {
            let mut out = vec![expression(*level_db)];
            out.extend(notes.iter().map(|&note| MidiMessage::NoteOn {
                channel,
                note,
                velocity: ATTACK_VELOCITY,
            }));
            out
        }
        VoiceAction::Release { notes } => notes
            .iter()
            .map(|&note| MidiMessage::NoteOff { channel, note })
            .collect(),
        VoiceAction::Level { level_db } => vec![expression(*level_db)],
    }
}

/// Program changes and reverb sends selecting `patch` on both voices.
pub fn patch_messages(patch: &PresetPatch, melody_channel: u8, harmony_channel: u8) -> Vec<MidiMessage> {
    let reverb = patch.reverb_cc();
    vec![
        MidiMessage::ProgramChange { channel: melody_channel,  program: patch.melody.program() },
        MidiMessage::ControlChange { channel: melody_channel,  controller: CC_REVERB_SEND, value: reverb },
        MidiMessage::ProgramChange { channel: harmony_channel, program: patch.harmony.program() },
        MidiMessage::ControlChange { channel: harmony_channel, controller: CC_REVERB_SEND, value: reverb },
    ]
}

/// Silence a channel regardless of what the voice thinks is held.
pub fn all_notes_off(channel: u8) -> MidiMessage {
    MidiMessage::ControlChange { channel, controller: CC_ALL_NOTES_OFF, value: 0 }
}
