//! # leg_music
//!
//! Turns limb control records into note events:
//!
//! * **Left leg**  → one melody note per slice, taken from the current scale
//! * **Right leg** → one triad per slice, built on the same scale degree
//!
//! No audio is produced here.  A [`Voice`] emits [`VoiceAction`]s which are
//! encoded into raw [`MidiMessage`]s for whatever output the host opens.
//!
//! ## Quick start
//!
//! ```rust
//! use leg_music::{MusicalKey, NoteName, ScaleKind, Voice, VoiceRole, VoiceAction};
//! use leg_tracking::LimbControlState;
//!
//! let key    = MusicalKey::new(NoteName::C, ScaleKind::Major);
//! let melody = key.palette(VoiceRole::Melody);
//! let mut voice = Voice::new(VoiceRole::Melody);
//!
//! let limb = LimbControlState {
//!     slice: 2, x: 0.0, y: 0.1, distance: 150.0, is_active: true, center: (0.5, 0.5),
//! };
//! let actions = voice.drive(&limb, true, &melody);
//! assert_eq!(actions.len(), 1);
//! assert!(matches!(&actions[0], VoiceAction::Attack { notes, .. } if notes[..] == [64u8]));
//! ```

pub mod gm;
pub mod message;
pub mod preset;
pub mod scale;
pub mod voice;

pub use gm::GeneralMidi;
pub use message::{action_messages, all_notes_off, patch_messages, MidiMessage};
pub use preset::{PresetPatch, SoundPreset};
pub use scale::{note_name, MusicalKey, NoteName, ScaleKind, MIDDLE_C};
pub use voice::{db_to_cc, Voice, VoiceAction, VoiceRole};
