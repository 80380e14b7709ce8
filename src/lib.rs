// Fretlab - Guitar practice audio core
// Pitch and chord detection, tuner, backing tracks and metronome

pub mod arranger;
pub mod audio;
pub mod config;
pub mod detector;
pub mod engine;
pub mod groove;
pub mod music;
pub mod practice;
pub mod render;
pub mod transport;

pub use audio::{AudioFrame, AudioOutput, FrameSource, RodioOutput};
pub use config::{ConfigError, DetectorConfig, TrackSettings, TunerConfig};
pub use detector::{detect_pitch, match_chord, ChordDetector, ChordMatch, Tuner, TunerReading};
pub use engine::{AudioEngine, EngineError};
pub use groove::{BeatPosition, TapTempo, TimeSignature};
pub use music::{frequency_to_note, ChordSymbol, NoteReading, PitchClass};
pub use transport::{
    spawn_transport, BeatScheduler, PlaybackMode, SchedulerError, TransportConfig, TransportHandle,
};
