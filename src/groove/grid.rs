// Musical Grid - Time signatures, step resolution and the tempo clock
// The clock is the transport's single source of musical position

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Slowest tempo the transport will run at
pub const MIN_BPM: f64 = 20.0;

/// Fastest tempo the transport will run at
pub const MAX_BPM: f64 = 300.0;

/// Clamp a tempo into the playable range
pub fn clamp_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() {
        bpm.clamp(MIN_BPM, MAX_BPM)
    } else {
        MIN_BPM
    }
}

/// Length of one beat in milliseconds
pub fn beat_duration_ms(bpm: f64) -> f64 {
    60_000.0 / clamp_bpm(bpm)
}

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeSignature {
    /// 2/4 - march
    #[serde(rename = "2/4")]
    TwoFour,

    /// 3/4 - waltz feel
    #[serde(rename = "3/4")]
    ThreeFour,

    /// 4/4 - most common
    #[serde(rename = "4/4")]
    FourFour,

    /// 6/8 - counted as six clicks per bar
    #[serde(rename = "6/8")]
    SixEight,
}

impl TimeSignature {
    pub const ALL: [TimeSignature; 4] = [
        TimeSignature::FourFour,
        TimeSignature::ThreeFour,
        TimeSignature::SixEight,
        TimeSignature::TwoFour,
    ];

    /// Clicks per bar
    pub fn beats_per_measure(&self) -> u32 {
        match self {
            TimeSignature::TwoFour => 2,
            TimeSignature::ThreeFour => 3,
            TimeSignature::FourFour => 4,
            TimeSignature::SixEight => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeSignature::TwoFour => "2/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::FourFour => "4/4",
            TimeSignature::SixEight => "6/8",
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature::FourFour
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeSignature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sig| sig.label() == s.trim())
            .ok_or_else(|| format!("Unknown time signature: {}", s))
    }
}

/// How finely the transport steps through a beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResolution {
    /// One step per beat (metronome)
    Quarter,

    /// Four steps per beat (drum grid)
    Sixteenth,
}

impl StepResolution {
    pub fn steps_per_beat(&self) -> u32 {
        match self {
            StepResolution::Quarter => 1,
            StepResolution::Sixteenth => 4,
        }
    }

    /// Step length in milliseconds at a tempo
    pub fn step_duration_ms(&self, bpm: f64) -> f64 {
        beat_duration_ms(bpm) / self.steps_per_beat() as f64
    }
}

/// Where the transport is, as reported to position callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatPosition {
    /// Index into the progression for the current measure
    pub chord_index: usize,

    /// Beat within the measure (0-indexed)
    pub beat_in_measure: u32,

    /// Measures since start (0-indexed)
    pub measure: u64,

    /// Completed passes through the progression
    pub loop_count: u64,

    /// Beats since start
    pub total_beats: u64,
}

/// Beat counter for a running transport
#[derive(Debug, Clone, PartialEq)]
pub struct TempoClock {
    bpm: f64,
    beats_per_measure: u32,
    progression_len: usize,
    total_beats: u64,
}

impl TempoClock {
    pub fn new(bpm: f64, beats_per_measure: u32, progression_len: usize) -> Self {
        Self {
            bpm: clamp_bpm(bpm),
            beats_per_measure: beats_per_measure.max(1),
            progression_len: progression_len.max(1),
            total_beats: 0,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Change tempo without touching position; returns the clamped value
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        self.bpm = clamp_bpm(bpm);
        self.bpm
    }

    pub fn beats_per_measure(&self) -> u32 {
        self.beats_per_measure
    }

    pub fn progression_len(&self) -> usize {
        self.progression_len
    }

    pub fn total_beats(&self) -> u64 {
        self.total_beats
    }

    /// Beat within the measure, always in [0, beats_per_measure)
    pub fn current_beat(&self) -> u32 {
        (self.total_beats % self.beats_per_measure as u64) as u32
    }

    pub fn measure(&self) -> u64 {
        self.total_beats / self.beats_per_measure as u64
    }

    pub fn chord_index(&self) -> usize {
        (self.measure() % self.progression_len as u64) as usize
    }

    pub fn loop_count(&self) -> u64 {
        self.measure() / self.progression_len as u64
    }

    pub fn position(&self) -> BeatPosition {
        BeatPosition {
            chord_index: self.chord_index(),
            beat_in_measure: self.current_beat(),
            measure: self.measure(),
            loop_count: self.loop_count(),
            total_beats: self.total_beats,
        }
    }

    /// Move to the next beat and report it
    pub fn advance(&mut self) -> BeatPosition {
        self.total_beats += 1;
        self.position()
    }

    /// Back to beat 0 of measure 0
    pub fn reset(&mut self) {
        self.total_beats = 0;
    }

    pub fn beat_duration_ms(&self) -> f64 {
        beat_duration_ms(self.bpm)
    }
}
