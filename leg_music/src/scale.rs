//! Keys, scales and the chord table derived from them.

use serde::{Deserialize, Serialize};

use crate::voice::VoiceRole;

/// MIDI note number of C4.  Scales are laid out from this octave.
pub const MIDDLE_C: u8 = 60;

const SHARP_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

/// Spell a MIDI note number, e.g. `60` → `"C4"`.
pub fn note_name(midi: u8) -> String {
    let octave = (midi / 12) as i32 - 1;
    format!("{}{}", SHARP_NAMES[(midi % 12) as usize], octave)
}

// ════════════════════════════════════════════════════════════════════════════
// NoteName — key roots
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteName {
    #[default]
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C, NoteName::CSharp, NoteName::D, NoteName::DSharp,
        NoteName::E, NoteName::F, NoteName::FSharp, NoteName::G,
        NoteName::GSharp, NoteName::A, NoteName::ASharp, NoteName::B,
    ];

    /// Semitones above C.
    pub fn semitone(self) -> u8 { self as u8 }

    pub fn name(self) -> &'static str { SHARP_NAMES[self.semitone() as usize] }

    /// Next root up the chromatic circle, wrapping B → C.
    pub fn next(self) -> Self {
        NoteName::ALL[(self.semitone() as usize + 1) % 12]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ScaleKind
// ════════════════════════════════════════════════════════════════════════════

/// The scale families the performer can switch between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    #[default]
    Major,
    Minor,
    Pentatonic,
    Blues,
    Dorian,
    Mixolydian,
}

impl ScaleKind {
    pub const ALL: [ScaleKind; 6] = [
        ScaleKind::Major, ScaleKind::Minor, ScaleKind::Pentatonic,
        ScaleKind::Blues, ScaleKind::Dorian, ScaleKind::Mixolydian,
    ];

    /// Semitone offsets from the root.
    pub fn intervals(self) -> &'static [u8] {
        match self {
            ScaleKind::Major      => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Minor      => &[0, 2, 3, 5, 7, 8, 10],
            ScaleKind::Pentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::Blues      => &[0, 3, 5, 6, 7, 10],
            ScaleKind::Dorian     => &[0, 2, 3, 5, 7, 9, 10],
            ScaleKind::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleKind::Major      => "major",
            ScaleKind::Minor      => "minor",
            ScaleKind::Pentatonic => "pentatonic",
            ScaleKind::Blues      => "blues",
            ScaleKind::Dorian     => "dorian",
            ScaleKind::Mixolydian => "mixolydian",
        }
    }

    pub fn next(self) -> Self {
        let i = ScaleKind::ALL.iter().position(|k| *k == self).unwrap_or(0);
        ScaleKind::ALL[(i + 1) % ScaleKind::ALL.len()]
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MusicalKey — root + scale → notes and chords
// ════════════════════════════════════════════════════════════════════════════

/// A root and a scale family.
///
/// # Example
/// ```rust
/// use leg_music::{MusicalKey, NoteName, ScaleKind};
///
/// let key = MusicalKey::new(NoteName::C, ScaleKind::Major);
/// assert_eq!(key.scale_notes(), vec![60, 62, 64, 65, 67, 69, 71]);
/// assert_eq!(key.chords()[5], vec![69, 72, 76]);  // A minor, stacked up
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MusicalKey {
    #[serde(default)]
    pub root:  NoteName,
    #[serde(default)]
    pub scale: ScaleKind,
}

impl MusicalKey {
    pub fn new(root: NoteName, scale: ScaleKind) -> Self {
        MusicalKey { root, scale }
    }

    /// One note per scale degree, all inside octave 4.
    ///
    /// Degrees that pass B fold back to C4, so for roots above C the list is
    /// not sorted.
    pub fn scale_notes(&self) -> Vec<u8> {
        self.scale
            .intervals()
            .iter()
            .map(|iv| MIDDLE_C + (self.root.semitone() + iv) % 12)
            .collect()
    }

    /// One triad per scale degree: degrees `i`, `i+2`, `i+4` (wrapping).
    ///
    /// Each tone is raised by octaves until it sits above the one below it.
    pub fn chords(&self) -> Vec<Vec<u8>> {
        let notes = self.scale_notes();
        let n = notes.len();
        (0..n)
            .map(|i| {
                let mut chord: Vec<u8> = Vec::with_capacity(3);
                for step in [0, 2, 4] {
                    let mut tone = notes[(i + step) % n];
                    if let Some(&below) = chord.last() {
                        while tone <= below {
                            tone += 12;
                        }
                    }
                    chord.push(tone);
                }
                chord
            })
            .collect()
    }

    /// What each slice plays for `role`: single notes for the melody,
    /// triads for the harmony.
    pub fn palette(&self, role: VoiceRole) -> Vec<Vec<u8>> {
        match role {
            VoiceRole::Melody  => self.scale_notes().into_iter().map(|n| vec![n]).collect(),
            VoiceRole::Harmony => self.chords(),
        }
    }

    /// Same scale, next root.
    pub fn with_next_root(self) -> Self {
        MusicalKey { root: self.root.next(), ..self }
    }

    /// Same root, next scale family.
    pub fn with_next_scale(self) -> Self {
        MusicalKey { scale: self.scale.next(), ..self }
    }

    /// e.g. `"D# dorian"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.root.name(), self.scale.name())
    }
}
