// Arranger - Genre pattern tables and per-measure trigger builders
// Turns a genre and a chord into the triggers of one measure

pub mod patterns;
pub mod templates;

pub use patterns::{
    build_bass_line, build_drum_pattern, build_measure, build_metronome_measure,
    build_rhythm_strum, TriggerEvent, TriggerKind, BASS_BASE_MIDI, RHYTHM_BASE_MIDI,
};
pub use templates::{BassStep, Genre, PatternSpec, STEPS_PER_MEASURE};
