//! General MIDI program numbers used by the sound presets.

/// General MIDI instrument numbers (0-indexed, as sent in Program Change).
///
/// Only the families the presets draw from are listed.  Use
/// [`GeneralMidi::program`] for the raw `u8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum GeneralMidi {
    // Piano
    AcousticGrandPiano   = 0,
    ElectricPiano1       = 4,
    // Strings
    PizzicatoStrings     = 45,
    OrchestralHarp       = 46,
    // Synth Lead
    Lead1Square          = 80,
    // Synth Pad
    Pad1NewAge           = 88,
    Pad2Warm             = 89,
    Pad4Choir            = 91,
}

impl GeneralMidi {
    /// Raw MIDI program number (0–127).
    pub fn program(self) -> u8 { self as u8 }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            GeneralMidi::AcousticGrandPiano  => "Acoustic Grand Piano",
            GeneralMidi::ElectricPiano1      => "Electric Piano 1",
            GeneralMidi::PizzicatoStrings    => "Pizzicato Strings",
            GeneralMidi::OrchestralHarp      => "Orchestral Harp",
            GeneralMidi::Lead1Square         => "Lead 1 (Square)",
            GeneralMidi::Pad1NewAge          => "Pad 1 (New Age)",
            GeneralMidi::Pad2Warm            => "Pad 2 (Warm)",
            GeneralMidi::Pad4Choir           => "Pad 4 (Choir)",
        }
    }
}
