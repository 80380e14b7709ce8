// Notes and Frequencies - Pitch classes, MIDI numbers and equal temperament
// Shared by the detector, the tuner and the backing-track arranger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Concert pitch reference (A4)
pub const A4_FREQUENCY_HZ: f64 = 440.0;

/// MIDI note number of A4
pub const A4_MIDI: i32 = 69;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NoteParseError {
    #[error("Empty note name")]
    Empty,

    #[error("Unknown note name: {0}")]
    Unknown(String),
}

/// One of the twelve equal-tempered pitch classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PitchClass {
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

impl PitchClass {
    /// All pitch classes in ascending order from C
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::CSharp,
        PitchClass::D,
        PitchClass::DSharp,
        PitchClass::E,
        PitchClass::F,
        PitchClass::FSharp,
        PitchClass::G,
        PitchClass::GSharp,
        PitchClass::A,
        PitchClass::ASharp,
        PitchClass::B,
    ];

    /// Semitones above C (0-11)
    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// Pitch class for any semitone count, wrapping in both directions
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Shift by a number of semitones
    pub fn transpose(&self, semitones: i32) -> Self {
        Self::from_index(self.index() as i32 + semitones)
    }

    /// Sharp spelling ("C#", never "Db")
    pub fn name(&self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::CSharp => "C#",
            PitchClass::D => "D",
            PitchClass::DSharp => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::FSharp => "F#",
            PitchClass::G => "G",
            PitchClass::GSharp => "G#",
            PitchClass::A => "A",
            PitchClass::ASharp => "A#",
            PitchClass::B => "B",
        }
    }

    /// Split a leading note name ("C", "F#", "Bb") off a longer symbol.
    /// Returns the pitch class and the remaining text.
    pub fn parse_prefix(text: &str) -> Result<(Self, &str), NoteParseError> {
        let mut chars = text.chars();
        let letter = chars.next().ok_or(NoteParseError::Empty)?;
        let natural = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return Err(NoteParseError::Unknown(text.to_string())),
        };

        let rest = &text[letter.len_utf8()..];
        let (offset, consumed) = match rest.chars().next() {
            Some(c @ ('#' | '♯')) => (1, c.len_utf8()),
            Some(c @ ('b' | '♭')) => (-1, c.len_utf8()),
            _ => (0, 0),
        };

        Ok((Self::from_index(natural + offset), &rest[consumed..]))
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PitchClass {
    type Err = NoteParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (pitch_class, rest) = Self::parse_prefix(trimmed)?;
        if rest.is_empty() {
            Ok(pitch_class)
        } else {
            Err(NoteParseError::Unknown(trimmed.to_string()))
        }
    }
}

/// A frequency resolved to the nearest equal-tempered note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteReading {
    /// Nearest pitch class
    pub pitch_class: PitchClass,

    /// Scientific octave (A4 = 440 Hz is octave 4)
    pub octave: i32,

    /// MIDI note number of the nearest note
    pub midi: i32,

    /// Deviation from the nearest note in cents [-50, 50]
    pub cents: f32,
}

impl NoteReading {
    /// Note name with octave, e.g. "A2"
    pub fn label(&self) -> String {
        format!("{}{}", self.pitch_class, self.octave)
    }

    /// Cents rounded to the nearest integer
    pub fn cents_rounded(&self) -> i32 {
        self.cents.round() as i32
    }
}

/// Resolve a frequency to its nearest note and cents offset.
/// Returns None for non-finite or non-positive input.
pub fn frequency_to_note(frequency_hz: f32) -> Option<NoteReading> {
    if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
        return None;
    }

    let semitones = 12.0 * (frequency_hz as f64 / A4_FREQUENCY_HZ).log2();
    let nearest = semitones.round();
    let midi = A4_MIDI + nearest as i32;

    Some(NoteReading {
        pitch_class: PitchClass::from_index(midi),
        octave: midi.div_euclid(12) - 1,
        midi,
        cents: ((semitones - nearest) * 100.0) as f32,
    })
}

/// Convert MIDI note number to frequency in Hz
pub fn midi_to_frequency(midi: i32) -> f32 {
    (A4_FREQUENCY_HZ * 2.0_f64.powf((midi - A4_MIDI) as f64 / 12.0)) as f32
}

/// Cents between a frequency and a reference frequency
pub fn cents_between(frequency_hz: f32, reference_hz: f32) -> f32 {
    1200.0 * (frequency_hz / reference_hz).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a4_is_octave_four() {
        let reading = frequency_to_note(440.0).unwrap();
        assert_eq!(reading.pitch_class, PitchClass::A);
        assert_eq!(reading.octave, 4);
        assert_eq!(reading.midi, 69);
        assert!(reading.cents.abs() < 0.01);
    }

    #[test]
    fn test_low_e_and_middle_c() {
        let low_e = frequency_to_note(82.41).unwrap();
        assert_eq!(low_e.label(), "E2");

        let middle_c = frequency_to_note(261.63).unwrap();
        assert_eq!(middle_c.label(), "C4");
        assert_eq!(middle_c.midi, 60);
    }

    #[test]
    fn test_cents_offset_sign() {
        // 10 cents flat of A4
        let flat = frequency_to_note(440.0 * 2.0_f32.powf(-10.0 / 1200.0)).unwrap();
        assert_eq!(flat.pitch_class, PitchClass::A);
        assert!((flat.cents + 10.0).abs() < 0.1);

        // 30 cents sharp of C#5
        let sharp = frequency_to_note(midi_to_frequency(73) * 2.0_f32.powf(30.0 / 1200.0)).unwrap();
        assert_eq!(sharp.label(), "C#5");
        assert_eq!(sharp.cents_rounded(), 30);
    }

    #[test]
    fn test_invalid_frequency() {
        assert!(frequency_to_note(0.0).is_none());
        assert!(frequency_to_note(-20.0).is_none());
        assert!(frequency_to_note(f32::NAN).is_none());
    }

    #[test]
    fn test_midi_to_frequency() {
        assert!((midi_to_frequency(69) - 440.0).abs() < 0.001);
        assert!((midi_to_frequency(57) - 220.0).abs() < 0.001);
        assert!((midi_to_frequency(84) - 1046.5).abs() < 0.1);
    }

    #[test]
    fn test_pitch_class_parse() {
        assert_eq!("C".parse::<PitchClass>().unwrap(), PitchClass::C);
        assert_eq!("F#".parse::<PitchClass>().unwrap(), PitchClass::FSharp);
        assert_eq!("Bb".parse::<PitchClass>().unwrap(), PitchClass::ASharp);
        assert_eq!("Eb".parse::<PitchClass>().unwrap(), PitchClass::DSharp);
        assert_eq!("Cb".parse::<PitchClass>().unwrap(), PitchClass::B);
        assert!("H".parse::<PitchClass>().is_err());
        assert!("".parse::<PitchClass>().is_err());
        assert!("C#m".parse::<PitchClass>().is_err());
    }

    #[test]
    fn test_transpose_wraps() {
        assert_eq!(PitchClass::A.transpose(3), PitchClass::C);
        assert_eq!(PitchClass::C.transpose(-2), PitchClass::ASharp);
        assert_eq!(PitchClass::G.transpose(12), PitchClass::G);
    }
}
