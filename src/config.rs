// Configuration - Detector, tuner and backing-track settings
// Serde-loadable settings validated into the types the engine runs on

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::arranger::Genre;
use crate::detector::PitchConfig;
use crate::groove::grid::{TimeSignature, MAX_BPM, MIN_BPM};
use crate::music::{parse_progression, transpose_progression, PitchClass, PresetProgression};
use crate::render::mixer::ChannelVolumes;
use crate::transport::{PlaybackMode, TransportConfig, DEFAULT_LOOKAHEAD_MS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),

    #[error("Invalid chord in progression: {0}")]
    Chord(#[from] crate::music::ChordParseError),

    #[error("Unknown key: {0}")]
    UnknownKey(String),
}

/// Chord-recognition detector settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Autocorrelation settings
    pub pitch: PitchConfig,

    /// Frame RMS must exceed this before pitch detection runs
    pub sensitivity: f32,

    /// Lowest frequency accepted as a guitar note (Hz, exclusive)
    pub min_frequency_hz: f32,

    /// Highest frequency accepted as a guitar note (Hz, exclusive)
    pub max_frequency_hz: f32,

    /// How long detected notes stay in the history
    pub history_window_ms: u64,

    /// How often the idle sweep evicts stale notes
    pub sweep_interval_ms: u64,

    /// Consecutive frames a note must hold before it is recorded
    pub stable_frames: u32,

    /// Samples per analysis frame
    pub frame_size: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            pitch: PitchConfig::default(),
            sensitivity: 0.02,
            min_frequency_hz: 60.0,
            max_frequency_hz: 1200.0,
            history_window_ms: 1500,
            sweep_interval_ms: 500,
            stable_frames: 2,
            frame_size: 4096,
        }
    }
}

/// Tuner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Autocorrelation settings; `silence_threshold` is the tuner sensitivity
    pub pitch: PitchConfig,

    pub min_frequency_hz: f32,
    pub max_frequency_hz: f32,

    /// Within this many cents of the nearest note counts as in tune
    pub in_tune_cents: f32,

    /// Length of the reference tone played for a string
    pub reference_tone_ms: f64,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            pitch: PitchConfig::default(),
            min_frequency_hz: 60.0,
            max_frequency_hz: 1000.0,
            in_tune_cents: 5.0,
            reference_tone_ms: 3000.0,
        }
    }
}

impl TunerConfig {
    /// Default tuner with a custom sensitivity threshold
    pub fn with_sensitivity(threshold: f32) -> Self {
        let mut config = Self::default();
        config.pitch.silence_threshold = threshold.max(0.0);
        config
    }
}

/// Backing-track settings as sent by the UI.
///
/// Chords are written in C and transposed to `root_key`. When
/// `chord_progression` is empty the preset is used instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    pub root_key: String,
    pub bpm: f64,
    pub genre: Genre,
    pub chord_progression: Vec<String>,
    pub preset: Option<PresetProgression>,

    /// Measures in a one-shot run; one pass of the progression when unset
    pub measures: Option<u32>,

    pub playback: PlaybackMode,
    pub time_signature: TimeSignature,

    /// 0-100 per channel; 0 mutes
    pub volumes: ChannelVolumes,
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            root_key: "C".to_string(),
            bpm: 100.0,
            genre: Genre::Rock,
            chord_progression: Vec::new(),
            preset: Some(PresetProgression::Pop),
            measures: None,
            playback: PlaybackMode::Loop,
            time_signature: TimeSignature::FourFour,
            volumes: ChannelVolumes::default(),
        }
    }
}

impl TrackSettings {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn key(&self) -> Result<PitchClass, ConfigError> {
        self.root_key
            .parse()
            .map_err(|_| ConfigError::UnknownKey(self.root_key.clone()))
    }

    /// Validate and resolve into a transport configuration
    pub fn into_transport_config(self) -> Result<TransportConfig, ConfigError> {
        if !self.bpm.is_finite() || !(MIN_BPM..=MAX_BPM).contains(&self.bpm) {
            return Err(ConfigError::Invalid(format!(
                "bpm {} outside {}-{}",
                self.bpm, MIN_BPM, MAX_BPM
            )));
        }
        if self.measures == Some(0) {
            return Err(ConfigError::Invalid("measures must be at least 1".to_string()));
        }

        let key = self.key()?;
        let in_c = if !self.chord_progression.is_empty() {
            parse_progression(&self.chord_progression)?
        } else if let Some(preset) = self.preset {
            preset.chords_in_c()
        } else {
            return Err(ConfigError::Invalid("chord progression is empty".to_string()));
        };
        let progression = transpose_progression(&in_c, key);

        log::debug!(
            "Track settings: {} in {} at {} BPM, {} chords",
            self.genre,
            key,
            self.bpm,
            progression.len()
        );

        let mut config = TransportConfig::backing_track(self.genre, progression, self.bpm);
        config.time_signature = self.time_signature;
        config.playback = self.playback;
        config.measures = self.measures;
        config.volumes = self.volumes;
        config.lookahead_ms = DEFAULT_LOOKAHEAD_MS;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::ChordSymbol;
    use crate::transport::TransportMode;

    fn progression_of(config: &TransportConfig) -> Vec<String> {
        match &config.mode {
            TransportMode::BackingTrack { progression, .. } => {
                progression.iter().map(|c| c.to_string()).collect()
            }
            TransportMode::Metronome => Vec::new(),
        }
    }

    #[test]
    fn test_defaults_use_pop_preset() {
        let config = TrackSettings::default().into_transport_config().unwrap();
        assert_eq!(progression_of(&config), vec!["C", "G", "Am", "F"]);
        assert_eq!(config.bpm, 100.0);
        assert_eq!(config.playback, PlaybackMode::Loop);
    }

    #[test]
    fn test_json_settings_transposed() {
        let json = r#"{
            "root_key": "G",
            "bpm": 90,
            "genre": "blues",
            "chord_progression": ["C", "F", "G7"],
            "playback": "one_shot",
            "measures": 6,
            "volumes": { "drums": 60 }
        }"#;

        let settings = TrackSettings::from_json(json).unwrap();
        assert_eq!(settings.volumes.bass, 70);

        let config = settings.into_transport_config().unwrap();
        assert_eq!(progression_of(&config), vec!["G", "C", "D7"]);
        assert_eq!(config.playback, PlaybackMode::OneShot);
        assert_eq!(config.measure_count(), 6);
        assert_eq!(config.volumes.drums, 60);
        assert!(matches!(
            config.mode,
            TransportMode::BackingTrack { genre: Genre::Blues, .. }
        ));
    }

    #[test]
    fn test_flat_key() {
        let settings = TrackSettings {
            root_key: "Bb".to_string(),
            preset: Some(PresetProgression::Minor),
            ..TrackSettings::default()
        };
        let config = settings.into_transport_config().unwrap();
        match config.mode {
            TransportMode::BackingTrack { progression, .. } => {
                assert_eq!(progression[0], ChordSymbol::minor(PitchClass::G));
            }
            TransportMode::Metronome => panic!("expected a backing track"),
        }
    }

    #[test]
    fn test_validation_errors() {
        let bad_bpm = TrackSettings {
            bpm: 400.0,
            ..TrackSettings::default()
        };
        assert!(matches!(bad_bpm.into_transport_config(), Err(ConfigError::Invalid(_))));

        let bad_key = TrackSettings {
            root_key: "H".to_string(),
            ..TrackSettings::default()
        };
        assert!(matches!(bad_key.into_transport_config(), Err(ConfigError::UnknownKey(_))));

        let bad_chord = TrackSettings {
            chord_progression: vec!["C".to_string(), "Gxyz".to_string()],
            ..TrackSettings::default()
        };
        assert!(matches!(bad_chord.into_transport_config(), Err(ConfigError::Chord(_))));

        let empty = TrackSettings {
            preset: None,
            ..TrackSettings::default()
        };
        assert!(matches!(empty.into_transport_config(), Err(ConfigError::Invalid(_))));

        let zero_measures = TrackSettings {
            measures: Some(0),
            ..TrackSettings::default()
        };
        assert!(zero_measures.into_transport_config().is_err());

        assert!(matches!(
            TrackSettings::from_json("{ \"bpm\": \"fast\" }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_detector_config_partial_json() {
        let config: DetectorConfig = serde_json::from_str(r#"{ "sensitivity": 0.05 }"#).unwrap();
        assert_eq!(config.sensitivity, 0.05);
        assert_eq!(config.history_window_ms, 1500);
        assert_eq!(config.pitch.silence_threshold, 0.01);
    }

    #[test]
    fn test_partial_pitch_section() {
        let config: TunerConfig =
            serde_json::from_str(r#"{ "pitch": { "silence_threshold": 0.03 } }"#).unwrap();
        assert_eq!(config.pitch.silence_threshold, 0.03);
        assert_eq!(config.pitch.acceptance_threshold, 0.9);
        assert_eq!(config.pitch.min_buffer_len, 1024);
        assert_eq!(config.in_tune_cents, 5.0);

        let config: DetectorConfig =
            serde_json::from_str(r#"{ "pitch": { "min_buffer_len": 2048 } }"#).unwrap();
        assert_eq!(config.pitch.min_buffer_len, 2048);
        assert_eq!(config.pitch.silence_threshold, 0.01);
    }
}
