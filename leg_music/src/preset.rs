//! Sound presets: which GM programs the two voices use, and how wet.

use serde::{Deserialize, Serialize};

use crate::gm::GeneralMidi;

/// Reverb send used unless a preset asks for more or less.
pub const DEFAULT_REVERB: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundPreset {
    #[default]
    Synth,
    Piano,
    Pad,
    Pluck,
}

/// Concrete settings a preset resolves to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresetPatch {
    pub melody:      GeneralMidi,
    pub harmony:     GeneralMidi,
    /// Reverb wet level in `[0, 1]`, sent as CC 91.
    pub reverb_send: f32,
}

impl PresetPatch {
    /// Reverb send scaled to a 7-bit controller value.
    pub fn reverb_cc(&self) -> u8 {
        (self.reverb_send.clamp(0.0, 1.0) * 127.0).round() as u8
    }
}

impl SoundPreset {
    pub const ALL: [SoundPreset; 4] =
        [SoundPreset::Synth, SoundPreset::Piano, SoundPreset::Pad, SoundPreset::Pluck];

    pub fn name(self) -> &'static str {
        match self {
            SoundPreset::Synth => "synth",
            SoundPreset::Piano => "piano",
            SoundPreset::Pad   => "pad",
            SoundPreset::Pluck => "pluck",
        }
    }

    pub fn next(self) -> Self {
        let i = SoundPreset::ALL.iter().position(|p| *p == self).unwrap_or(0);
        SoundPreset::ALL[(i + 1) % SoundPreset::ALL.len()]
    }

    pub fn patch(self) -> PresetPatch {
        match self {
            SoundPreset::Synth => PresetPatch {
                melody:      GeneralMidi::Lead1Square,
                harmony:     GeneralMidi::Pad2Warm,
                reverb_send: DEFAULT_REVERB,
            },
            SoundPreset::Piano => PresetPatch {
                melody:      GeneralMidi::AcousticGrandPiano,
                harmony:     GeneralMidi::ElectricPiano1,
                reverb_send: DEFAULT_REVERB,
            },
            SoundPreset::Pad => PresetPatch {
                melody:      GeneralMidi::Pad1NewAge,
                harmony:     GeneralMidi::Pad4Choir,
                reverb_send: 0.5,
            },
            SoundPreset::Pluck => PresetPatch {
                melody:      GeneralMidi::PizzicatoStrings,
                harmony:     GeneralMidi::OrchestralHarp,
                reverb_send: 0.2,
            },
        }
    }
}
