//! `config.toml`: every field optional, missing file means defaults.
//!
//! ```toml
//! [tracking]
//! slice_count = 8
//! visibility_threshold = 0.5
//! activation_deadzone = 40.0
//! calibration_settle_ms = 1000
//!
//! [music]
//! root = "D#"
//! scale = "dorian"
//! preset = "pad"
//!
//! [midi]
//! port = "fluid"
//! melody_channel = 0
//! harmony_channel = 1
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use leg_music::{MusicalKey, NoteName, ScaleKind, SoundPreset};
use leg_tracking::{TrackerConfig, TrackingError};

// ════════════════════════════════════════════════════════════════════════════
// ConfigError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub enum ConfigError {
    Read(io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read(e)    => write!(f, "cannot read config: {}", e),
            ConfigError::Parse(e)   => write!(f, "malformed config: {}", e),
            ConfigError::Invalid(m) => write!(f, "invalid config: {}", m),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read(e)    => Some(e),
            ConfigError::Parse(e)   => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<TrackingError> for ConfigError {
    fn from(e: TrackingError) -> Self {
        ConfigError::Invalid(e.to_string())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tables
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicConfig {
    #[serde(default)]
    pub root:   NoteName,
    #[serde(default)]
    pub scale:  ScaleKind,
    #[serde(default)]
    pub preset: SoundPreset,
}

impl MusicConfig {
    pub fn key(&self) -> MusicalKey {
        MusicalKey::new(self.root, self.scale)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiConfig {
    /// Case-insensitive substring of the output port to open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default = "MidiConfig::default_melody_channel")]
    pub melody_channel: u8,
    #[serde(default = "MidiConfig::default_harmony_channel")]
    pub harmony_channel: u8,
}

impl MidiConfig {
    fn default_melody_channel() -> u8 {
        0
    }
    fn default_harmony_channel() -> u8 {
        1
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            port: None,
            melody_channel: Self::default_melody_channel(),
            harmony_channel: Self::default_harmony_channel(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tracking: TrackerConfig,
    #[serde(default)]
    pub music: MusicConfig,
    #[serde(default)]
    pub midi: MidiConfig,
}

impl AppConfig {
    /// Read `path`.  A file that does not exist yields the defaults; a file
    /// that exists but does not parse or validate is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Read(e)),
        };
        let cfg = Self::parse(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let cfg: AppConfig = toml::from_str(text).map_err(ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracking.validate()?;
        let (m, h) = (self.midi.melody_channel, self.midi.harmony_channel);
        if m > 15 || h > 15 {
            return Err(ConfigError::Invalid(format!("MIDI channels must be 0–15, got {} and {}", m, h)));
        }
        if m == h {
            return Err(ConfigError::Invalid(format!("melody and harmony share MIDI channel {}", m)));
        }
        Ok(())
    }
}
