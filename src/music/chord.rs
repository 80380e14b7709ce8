// Chord Symbols - Quality formulas, typed chord symbols and progressions
// A chord is a (root, quality) pair; every quality owns its interval formula

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::note::{NoteParseError, PitchClass};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChordParseError {
    #[error("Invalid chord root: {0}")]
    InvalidRoot(#[from] NoteParseError),

    #[error("Unknown chord quality '{suffix}' in '{symbol}'")]
    UnknownQuality { symbol: String, suffix: String },
}

/// Chord quality with a fixed interval formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
    Dominant7,
    Major7,
    Minor7,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Add9,
    Major6,
    Minor6,
    Dominant9,
    Minor9,
    Power,
}

impl ChordQuality {
    /// Every quality, in the order generic chord matching tries them
    pub const ALL: [ChordQuality; 15] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dominant7,
        ChordQuality::Major7,
        ChordQuality::Minor7,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::Sus2,
        ChordQuality::Sus4,
        ChordQuality::Add9,
        ChordQuality::Major6,
        ChordQuality::Minor6,
        ChordQuality::Dominant9,
        ChordQuality::Minor9,
        ChordQuality::Power,
    ];

    /// Semitone offsets from the root. Ninths are stacked above the octave.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Add9 => &[0, 4, 7, 14],
            ChordQuality::Major6 => &[0, 4, 7, 9],
            ChordQuality::Minor6 => &[0, 3, 7, 9],
            ChordQuality::Dominant9 => &[0, 4, 7, 10, 14],
            ChordQuality::Minor9 => &[0, 3, 7, 10, 14],
            ChordQuality::Power => &[0, 7],
        }
    }

    /// Symbol suffix written after the root ("" for major)
    pub fn suffix(&self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Add9 => "add9",
            ChordQuality::Major6 => "6",
            ChordQuality::Minor6 => "m6",
            ChordQuality::Dominant9 => "9",
            ChordQuality::Minor9 => "m9",
            ChordQuality::Power => "5",
        }
    }

    /// Parse a suffix, accepting a few common alternate spellings
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let quality = match suffix {
            "" | "maj" | "M" => ChordQuality::Major,
            "m" | "min" | "-" => ChordQuality::Minor,
            "7" | "dom7" => ChordQuality::Dominant7,
            "maj7" | "M7" => ChordQuality::Major7,
            "m7" | "min7" | "-7" => ChordQuality::Minor7,
            "dim" | "°" => ChordQuality::Diminished,
            "aug" | "+" => ChordQuality::Augmented,
            "sus2" => ChordQuality::Sus2,
            "sus4" | "sus" => ChordQuality::Sus4,
            "add9" => ChordQuality::Add9,
            "6" => ChordQuality::Major6,
            "m6" => ChordQuality::Minor6,
            "9" => ChordQuality::Dominant9,
            "m9" => ChordQuality::Minor9,
            "5" => ChordQuality::Power,
            _ => return None,
        };
        Some(quality)
    }
}

/// Strongly-typed chord symbol such as "Am" or "G7"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChordSymbol {
    pub root: PitchClass,
    pub quality: ChordQuality,
}

impl ChordSymbol {
    pub fn new(root: PitchClass, quality: ChordQuality) -> Self {
        Self { root, quality }
    }

    pub fn major(root: PitchClass) -> Self {
        Self::new(root, ChordQuality::Major)
    }

    pub fn minor(root: PitchClass) -> Self {
        Self::new(root, ChordQuality::Minor)
    }

    /// Pitch classes of the chord, root first, in formula order
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        self.quality
            .intervals()
            .iter()
            .map(|&interval| self.root.transpose(interval as i32))
            .collect()
    }

    /// Root-position MIDI voicing built up from `base_midi`
    /// (the MIDI number of C in the target register)
    pub fn voicing(&self, base_midi: i32) -> Vec<i32> {
        let root = base_midi + self.root.index() as i32;
        self.quality
            .intervals()
            .iter()
            .map(|&interval| root + interval as i32)
            .collect()
    }

    /// Same quality, root shifted by `semitones`
    pub fn transpose(&self, semitones: i32) -> Self {
        Self::new(self.root.transpose(semitones), self.quality)
    }
}

impl fmt::Display for ChordSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.quality.suffix())
    }
}

impl FromStr for ChordSymbol {
    type Err = ChordParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbol = s.trim();
        let (root, suffix) = PitchClass::parse_prefix(symbol)?;
        let quality = ChordQuality::from_suffix(suffix).ok_or_else(|| {
            ChordParseError::UnknownQuality {
                symbol: symbol.to_string(),
                suffix: suffix.to_string(),
            }
        })?;
        Ok(Self::new(root, quality))
    }
}

impl Serialize for ChordSymbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChordSymbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a list of chord symbols into a progression
pub fn parse_progression<S: AsRef<str>>(
    symbols: &[S],
) -> Result<Vec<ChordSymbol>, ChordParseError> {
    symbols.iter().map(|s| s.as_ref().parse()).collect()
}

/// Built-in progressions, written in C and transposed to the chosen key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetProgression {
    /// I - V - vi - IV
    Pop,

    /// I - IV - V - V
    Rock,

    /// ii - V - I - I
    Jazz,

    /// I - vi - IV - V
    Fifties,

    /// vi - IV - I - V
    Sad,

    /// I - IV - I - IV
    TwoChord,

    /// Twelve-bar blues
    Blues,

    /// i - VII - VI - VII
    Minor,
}

impl PresetProgression {
    pub const ALL: [PresetProgression; 8] = [
        PresetProgression::Pop,
        PresetProgression::Rock,
        PresetProgression::Jazz,
        PresetProgression::Fifties,
        PresetProgression::Sad,
        PresetProgression::TwoChord,
        PresetProgression::Blues,
        PresetProgression::Minor,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            PresetProgression::Pop => "Pop (I-V-vi-IV)",
            PresetProgression::Rock => "Rock (I-IV-V)",
            PresetProgression::Jazz => "Jazz (ii-V-I)",
            PresetProgression::Fifties => "50s (I-vi-IV-V)",
            PresetProgression::Sad => "Sad (vi-IV-I-V)",
            PresetProgression::TwoChord => "Two Chord (I-IV)",
            PresetProgression::Blues => "12-Bar Blues",
            PresetProgression::Minor => "Minor (i-VII-VI-VII)",
        }
    }

    /// Chords in the key of C
    pub fn chords_in_c(&self) -> Vec<ChordSymbol> {
        use PitchClass::{A, C, D, F, G};
        let maj = ChordSymbol::major;
        let min = ChordSymbol::minor;
        match self {
            PresetProgression::Pop => vec![maj(C), maj(G), min(A), maj(F)],
            PresetProgression::Rock => vec![maj(C), maj(F), maj(G), maj(G)],
            PresetProgression::Jazz => vec![min(D), maj(G), maj(C), maj(C)],
            PresetProgression::Fifties => vec![maj(C), min(A), maj(F), maj(G)],
            PresetProgression::Sad => vec![min(A), maj(F), maj(C), maj(G)],
            PresetProgression::TwoChord => vec![maj(C), maj(F), maj(C), maj(F)],
            PresetProgression::Blues => vec![
                maj(C),
                maj(C),
                maj(C),
                maj(C),
                maj(F),
                maj(F),
                maj(C),
                maj(C),
                maj(G),
                maj(F),
                maj(C),
                maj(G),
            ],
            PresetProgression::Minor => vec![min(A), maj(G), maj(F), maj(G)],
        }
    }

    /// Chords transposed from C into `key`
    pub fn in_key(&self, key: PitchClass) -> Vec<ChordSymbol> {
        transpose_progression(&self.chords_in_c(), key)
    }
}

/// Transpose a progression written in C into another key
pub fn transpose_progression(chords: &[ChordSymbol], key: PitchClass) -> Vec<ChordSymbol> {
    let shift = key.index() as i32;
    chords.iter().map(|chord| chord.transpose(shift)).collect()
}
