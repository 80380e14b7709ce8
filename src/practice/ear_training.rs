// Ear Training - Interval, chord and scale quizzes
// The difficulty tier picks which options a question is drawn from

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::audio::output::ToneTrigger;
use crate::music::{midi_to_frequency, ChordQuality};

/// Lowest root note of a question (C3)
pub const ROOT_MIDI_MIN: i32 = 48;

/// Roots span one octave above `ROOT_MIDI_MIN`
pub const ROOT_MIDI_SPAN: i32 = 12;

/// Interval notes and chords ring for a half note at 120 BPM
const LONG_NOTE_MS: f64 = 1000.0;

/// Scale notes last an eighth note at 120 BPM
const SHORT_NOTE_MS: f64 = 250.0;

/// Gap before the second note of an interval
const INTERVAL_GAP_MS: f64 = 800.0;

/// Strum spread when a chord question is played
const CHORD_SPREAD_MS: f64 = 50.0;

/// Spacing of ascending scale notes
const SCALE_STEP_MS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IntervalKind {
    pub name: &'static str,
    pub short: &'static str,
    pub semitones: i32,
}

const fn interval(name: &'static str, short: &'static str, semitones: i32) -> IntervalKind {
    IntervalKind {
        name,
        short,
        semitones,
    }
}

pub const INTERVALS: [IntervalKind; 12] = [
    interval("Minor 2nd", "m2", 1),
    interval("Major 2nd", "M2", 2),
    interval("Minor 3rd", "m3", 3),
    interval("Major 3rd", "M3", 4),
    interval("Perfect 4th", "P4", 5),
    interval("Tritone", "TT", 6),
    interval("Perfect 5th", "P5", 7),
    interval("Minor 6th", "m6", 8),
    interval("Major 6th", "M6", 9),
    interval("Minor 7th", "m7", 10),
    interval("Major 7th", "M7", 11),
    interval("Octave", "P8", 12),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChordKind {
    pub name: &'static str,
    pub quality: ChordQuality,
}

const fn chord_kind(name: &'static str, quality: ChordQuality) -> ChordKind {
    ChordKind { name, quality }
}

pub const CHORD_KINDS: [ChordKind; 7] = [
    chord_kind("Major", ChordQuality::Major),
    chord_kind("Minor", ChordQuality::Minor),
    chord_kind("Diminished", ChordQuality::Diminished),
    chord_kind("Augmented", ChordQuality::Augmented),
    chord_kind("Major 7th", ChordQuality::Major7),
    chord_kind("Minor 7th", ChordQuality::Minor7),
    chord_kind("Dominant 7th", ChordQuality::Dominant7),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleKind {
    pub name: &'static str,
    pub short: &'static str,
    pub mood: &'static str,

    /// Ascending steps from the root, octave included
    pub intervals: &'static [i32],
}

pub const SCALE_KINDS: [ScaleKind; 8] = [
    ScaleKind {
        name: "Major",
        short: "Maj",
        mood: "Happy, bright",
        intervals: &[0, 2, 4, 5, 7, 9, 11, 12],
    },
    ScaleKind {
        name: "Natural Minor",
        short: "Min",
        mood: "Sad, dark",
        intervals: &[0, 2, 3, 5, 7, 8, 10, 12],
    },
    ScaleKind {
        name: "Minor Pentatonic",
        short: "m Pent",
        mood: "Bluesy, rock",
        intervals: &[0, 3, 5, 7, 10, 12],
    },
    ScaleKind {
        name: "Major Pentatonic",
        short: "M Pent",
        mood: "Country, folk",
        intervals: &[0, 2, 4, 7, 9, 12],
    },
    ScaleKind {
        name: "Blues",
        short: "Blues",
        mood: "Soulful, gritty",
        intervals: &[0, 3, 5, 6, 7, 10, 12],
    },
    ScaleKind {
        name: "Dorian",
        short: "Dor",
        mood: "Jazzy minor",
        intervals: &[0, 2, 3, 5, 7, 9, 10, 12],
    },
    ScaleKind {
        name: "Mixolydian",
        short: "Mix",
        mood: "Bluesy major",
        intervals: &[0, 2, 4, 5, 7, 9, 10, 12],
    },
    ScaleKind {
        name: "Harmonic Minor",
        short: "H Min",
        mood: "Exotic, tense",
        intervals: &[0, 2, 3, 5, 7, 8, 11, 12],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingMode {
    Intervals,
    Chords,
    Scales,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Beginner,
    Intermediate,
    Advanced,
}

impl Default for DifficultyTier {
    fn default() -> Self {
        DifficultyTier::Beginner
    }
}

impl DifficultyTier {
    /// Intervals asked at this tier
    pub fn intervals(&self) -> Vec<IntervalKind> {
        let semitones: &[i32] = match self {
            DifficultyTier::Beginner => &[2, 4, 5, 7],
            DifficultyTier::Intermediate => &[1, 2, 3, 4, 5, 7, 12],
            DifficultyTier::Advanced => &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        };
        INTERVALS
            .iter()
            .filter(|interval| semitones.contains(&interval.semitones))
            .copied()
            .collect()
    }

    pub fn chords(&self) -> &'static [ChordKind] {
        match self {
            DifficultyTier::Beginner => &CHORD_KINDS[..2],
            DifficultyTier::Intermediate => &CHORD_KINDS[..4],
            DifficultyTier::Advanced => &CHORD_KINDS,
        }
    }

    pub fn scales(&self) -> &'static [ScaleKind] {
        match self {
            DifficultyTier::Beginner => &SCALE_KINDS[..2],
            DifficultyTier::Intermediate => &SCALE_KINDS[..5],
            DifficultyTier::Advanced => &SCALE_KINDS,
        }
    }

    /// Answer choices shown for a mode
    pub fn option_names(&self, mode: TrainingMode) -> Vec<&'static str> {
        match mode {
            TrainingMode::Intervals => self.intervals().iter().map(|i| i.name).collect(),
            TrainingMode::Chords => self.chords().iter().map(|c| c.name).collect(),
            TrainingMode::Scales => self.scales().iter().map(|s| s.name).collect(),
        }
    }
}

/// One quiz question: a root and the index of the right option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarTrainingQuestion {
    pub mode: TrainingMode,
    pub tier: DifficultyTier,
    pub root_midi: i32,
    pub answer: usize,
}

impl EarTrainingQuestion {
    /// Draw a root and an answer from the tier's pool
    pub fn random<R: Rng>(tier: DifficultyTier, mode: TrainingMode, rng: &mut R) -> Self {
        let root_midi = ROOT_MIDI_MIN + rng.random_range(0..ROOT_MIDI_SPAN);
        let options = tier.option_names(mode).len();
        Self {
            mode,
            tier,
            root_midi,
            answer: rng.random_range(0..options),
        }
    }

    pub fn options(&self) -> Vec<&'static str> {
        self.tier.option_names(self.mode)
    }

    pub fn answer_name(&self) -> &'static str {
        self.options().get(self.answer).copied().unwrap_or_default()
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer
    }

    /// Offsets from the root for the right answer
    fn offsets(&self) -> Vec<i32> {
        match self.mode {
            TrainingMode::Intervals => self
                .tier
                .intervals()
                .get(self.answer)
                .map(|interval| vec![0, interval.semitones])
                .unwrap_or_default(),
            TrainingMode::Chords => self
                .tier
                .chords()
                .get(self.answer)
                .map(|chord| chord.quality.intervals().iter().map(|&i| i as i32).collect())
                .unwrap_or_default(),
            TrainingMode::Scales => self
                .tier
                .scales()
                .get(self.answer)
                .map(|scale| scale.intervals.to_vec())
                .unwrap_or_default(),
        }
    }

    /// MIDI notes to play, in order
    pub fn notes(&self) -> Vec<i32> {
        self.offsets()
            .into_iter()
            .map(|offset| self.root_midi + offset)
            .collect()
    }

    /// Tones that play the question starting at `now_ms`
    pub fn playback(&self, now_ms: f64) -> Vec<ToneTrigger> {
        let (spacing_ms, duration_ms) = match self.mode {
            TrainingMode::Intervals => (INTERVAL_GAP_MS, LONG_NOTE_MS),
            TrainingMode::Chords => (CHORD_SPREAD_MS, LONG_NOTE_MS),
            TrainingMode::Scales => (SCALE_STEP_MS, SHORT_NOTE_MS),
        };

        self.notes()
            .into_iter()
            .enumerate()
            .map(|(i, midi)| {
                let delay_ms = i as f64 * spacing_ms;
                ToneTrigger {
                    frequency_hz: midi_to_frequency(midi),
                    midi: Some(midi),
                    duration_ms,
                    at_ms: now_ms + delay_ms,
                    delay_ms,
                    gain: 0.8,
                }
            })
            .collect()
    }
}

/// Running score for a training session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub correct: u32,
    pub total: u32,
    pub streak: u32,
    pub best_streak: u32,
}

impl ScoreBoard {
    pub fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
    }

    /// Percentage of correct answers, 0 before the first answer
    pub fn accuracy(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            (self.correct as f64 / self.total as f64 * 100.0).round() as u32
        }
    }
}
