// Pitch and Chord Detector
// Autocorrelation pitch, note history, chord matching and the tuner

pub mod chords;
pub mod history;
pub mod pitch;
pub mod session;
pub mod tuner;

pub use chords::{
    curated_templates, generic_templates, match_chord, ChordMatch, ChordTemplate, MATCH_THRESHOLD,
};
pub use history::{
    evict_expired, unique_pitch_classes, update_note_history, NoteEvent, NoteStabilizer,
};
pub use pitch::{detect_pitch, detect_pitch_with_config, rms, PitchConfig, PitchEstimate};
pub use session::{ChordDetector, FrameAnalysis, PitchReading};
pub use tuner::{closest_string, GuitarString, Tuner, TunerReading, TuningStatus, STANDARD_TUNING};
