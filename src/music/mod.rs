// Music theory primitives
// Pitch classes, note/frequency conversion and chord symbols

pub mod chord;
pub mod note;

pub use chord::{
    parse_progression, transpose_progression, ChordParseError, ChordQuality, ChordSymbol,
    PresetProgression,
};
pub use note::{
    cents_between, frequency_to_note, midi_to_frequency, NoteParseError, NoteReading, PitchClass,
};
