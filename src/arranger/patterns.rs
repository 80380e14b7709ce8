// Pattern Builders - One measure of triggers from a genre row and a chord
// Pure functions; the transport decides when each step is due

use serde::Serialize;

use super::templates::{Genre, STEPS_PER_MEASURE};
use crate::audio::output::DrumKind;
use crate::groove::grid::StepResolution;
use crate::music::{ChordSymbol, PitchClass};
use crate::render::mixer::Channel;

/// MIDI number of C in the bass register (C2)
pub const BASS_BASE_MIDI: i32 = 36;

/// MIDI number of C in the rhythm-guitar register (C4)
pub const RHYTHM_BASE_MIDI: i32 = 60;

/// Bass notes last an eighth note
pub const BASS_NOTE_BEATS: f64 = 0.5;

/// Strummed chords ring for a half note
pub const STRUM_NOTE_BEATS: f64 = 2.0;

/// Gap between successive strings of a strum
pub const STRUM_SPREAD_MS: f64 = 20.0;

/// Accented metronome click (C6)
pub const ACCENT_CLICK_HZ: f32 = 1046.5;

/// Regular metronome click (G5)
pub const CLICK_HZ: f32 = 783.99;

/// Metronome clicks last a thirty-second note
pub const CLICK_BEATS: f64 = 0.125;

/// What a trigger plays
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Drum(DrumKind),

    Bass {
        midi: i32,
        duration_beats: f64,
    },

    /// One string of a strummed chord
    Strum {
        midi: i32,
        offset_ms: f64,
        duration_beats: f64,
    },

    Click {
        accent: bool,
        frequency_hz: f32,
        duration_beats: f64,
    },
}

/// A trigger at a step of its measure
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TriggerEvent {
    /// Step within the measure, in the measure's step resolution
    pub step: u32,
    pub kind: TriggerKind,
}

impl TriggerEvent {
    /// Mixer channel the trigger plays through
    pub fn channel(&self) -> Channel {
        match self.kind {
            TriggerKind::Drum(_) | TriggerKind::Click { .. } => Channel::Drums,
            TriggerKind::Bass { .. } => Channel::Bass,
            TriggerKind::Strum { .. } => Channel::Rhythm,
        }
    }
}

fn beat_to_step(beat: f64) -> u32 {
    (beat * StepResolution::Sixteenth.steps_per_beat() as f64).round() as u32
}

/// Beats of a one-bar figure repeated to fill `beats_per_measure`
fn tiled_beats(beats: &[f64], beats_per_measure: u32) -> Vec<f64> {
    let bar_beats = (STEPS_PER_MEASURE as u32 / StepResolution::Sixteenth.steps_per_beat()) as f64;
    let tiles = (beats_per_measure as f64 / bar_beats).ceil() as u32;
    (0..tiles)
        .flat_map(|tile| beats.iter().map(move |beat| beat + tile as f64 * bar_beats))
        .filter(|beat| *beat < beats_per_measure as f64)
        .collect()
}

/// Drum hits for one 4/4 bar, kick lane first, then snare, then hi-hat
pub fn build_drum_pattern(genre: Genre) -> Vec<TriggerEvent> {
    build_drum_steps(genre, StepResolution::Sixteenth.steps_per_beat() * 4)
}

fn build_drum_steps(genre: Genre, steps: u32) -> Vec<TriggerEvent> {
    let row = genre.pattern();
    let lanes = [
        (DrumKind::Kick, row.kick_steps()),
        (DrumKind::Snare, row.snare_steps()),
        (DrumKind::Hihat, row.hihat_steps()),
    ];

    lanes
        .iter()
        .flat_map(|(kind, lane)| {
            (0..steps)
                .filter(move |step| lane[*step as usize % STEPS_PER_MEASURE])
                .map(move |step| TriggerEvent {
                    step,
                    kind: TriggerKind::Drum(*kind),
                })
        })
        .collect()
}

/// Bass figure for one bar, transposed to the measure's chord root
pub fn build_bass_line(genre: Genre, root: PitchClass) -> Vec<TriggerEvent> {
    build_bass_steps(genre, root, 4)
}

fn build_bass_steps(
    genre: Genre,
    root: PitchClass,
    beats_per_measure: u32,
) -> Vec<TriggerEvent> {
    let root_midi = BASS_BASE_MIDI + root.index() as i32;

    genre
        .pattern()
        .bass
        .iter()
        .flat_map(|note| {
            tiled_beats(&[note.beat], beats_per_measure)
                .into_iter()
                .map(move |beat| (note.semitones, beat))
        })
        .map(|(semitones, beat)| TriggerEvent {
            step: beat_to_step(beat),
            kind: TriggerKind::Bass {
                midi: root_midi + semitones,
                duration_beats: BASS_NOTE_BEATS,
            },
        })
        .collect()
}

/// Strummed chord hits for one bar; strings are staggered low to high
pub fn build_rhythm_strum(genre: Genre, chord: &ChordSymbol) -> Vec<TriggerEvent> {
    build_strum_steps(genre, chord, 4)
}

fn build_strum_steps(
    genre: Genre,
    chord: &ChordSymbol,
    beats_per_measure: u32,
) -> Vec<TriggerEvent> {
    let voicing = chord.voicing(RHYTHM_BASE_MIDI);

    tiled_beats(genre.pattern().strum_beats, beats_per_measure)
        .into_iter()
        .flat_map(|beat| {
            voicing.iter().enumerate().map(move |(string, &midi)| TriggerEvent {
                step: beat_to_step(beat),
                kind: TriggerKind::Strum {
                    midi,
                    offset_ms: string as f64 * STRUM_SPREAD_MS,
                    duration_beats: STRUM_NOTE_BEATS,
                },
            })
        })
        .collect()
}

/// Every trigger of one backing-track measure in sixteenth steps.
///
/// Ordered by step; within a step drums (kick, snare, hi-hat) come before
/// bass, and bass before rhythm. Meters longer than one bar repeat the
/// genre row.
pub fn build_measure(
    genre: Genre,
    chord: &ChordSymbol,
    beats_per_measure: u32,
) -> Vec<TriggerEvent> {
    let beats = beats_per_measure.max(1);
    let steps = beats * StepResolution::Sixteenth.steps_per_beat();

    let mut events = build_drum_steps(genre, steps);
    events.extend(build_bass_steps(genre, chord.root, beats));
    events.extend(build_strum_steps(genre, chord, beats));

    // Stable: keeps the channel order inside each step
    events.sort_by_key(|event| event.step);
    events
}

/// One click per beat in quarter steps, accent on the downbeat
pub fn build_metronome_measure(beats_per_measure: u32) -> Vec<TriggerEvent> {
    (0..beats_per_measure.max(1))
        .map(|beat| {
            let accent = beat == 0;
            TriggerEvent {
                step: beat,
                kind: TriggerKind::Click {
                    accent,
                    frequency_hz: if accent { ACCENT_CLICK_HZ } else { CLICK_HZ },
                    duration_beats: CLICK_BEATS,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps_of(events: &[TriggerEvent], kind: DrumKind) -> Vec<u32> {
        events
            .iter()
            .filter(|e| e.kind == TriggerKind::Drum(kind))
            .map(|e| e.step)
            .collect()
    }

    #[test]
    fn test_rock_drums() {
        let drums = build_drum_pattern(Genre::Rock);
        assert_eq!(steps_of(&drums, DrumKind::Kick), vec![0, 4, 8, 12]);
        assert_eq!(steps_of(&drums, DrumKind::Snare), vec![4, 12]);
        assert_eq!(steps_of(&drums, DrumKind::Hihat), vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_bass_follows_root() {
        let line = build_bass_line(Genre::Country, PitchClass::G);
        let notes: Vec<(u32, i32)> = line
            .iter()
            .map(|e| match e.kind {
                TriggerKind::Bass { midi, .. } => (e.step, midi),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        // G2 = 43, D3 = 50 on beats 1-4
        assert_eq!(notes, vec![(0, 43), (4, 50), (8, 43), (12, 50)]);
    }

    #[test]
    fn test_funk_bass_sixteenths() {
        let line = build_bass_line(Genre::Funk, PitchClass::E);
        let steps: Vec<u32> = line.iter().map(|e| e.step).collect();
        assert_eq!(steps, vec![0, 1, 2, 3, 4, 6, 8, 10, 12, 14]);
        // Octave drop on the third sixteenth
        assert_eq!(
            line[2].kind,
            TriggerKind::Bass {
                midi: BASS_BASE_MIDI + 4 - 12,
                duration_beats: BASS_NOTE_BEATS
            }
        );
    }

    #[test]
    fn test_strum_spread() {
        let am = ChordSymbol::minor(PitchClass::A);
        let strum = build_rhythm_strum(Genre::Reggae, &am);
        assert_eq!(strum.len(), 6);

        let first: Vec<(u32, i32, f64)> = strum[..3]
            .iter()
            .map(|e| match e.kind {
                TriggerKind::Strum { midi, offset_ms, .. } => (e.step, midi, offset_ms),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(first, vec![(2, 69, 0.0), (2, 72, 20.0), (2, 76, 40.0)]);
        assert_eq!(strum[3].step, 10);
    }

    #[test]
    fn test_measure_order_within_step() {
        let c = ChordSymbol::major(PitchClass::C);
        let measure = build_measure(Genre::Rock, &c, 4);

        let mut last_step = 0;
        for event in &measure {
            assert!(event.step >= last_step);
            last_step = event.step;
        }

        // Step 0: kick, hi-hat, bass, then the strum
        let step_zero: Vec<Channel> = measure
            .iter()
            .filter(|e| e.step == 0)
            .map(|e| e.channel())
            .collect();
        assert_eq!(
            step_zero,
            vec![
                Channel::Drums,
                Channel::Drums,
                Channel::Bass,
                Channel::Rhythm,
                Channel::Rhythm,
                Channel::Rhythm
            ]
        );
        assert_eq!(measure[0].kind, TriggerKind::Drum(DrumKind::Kick));
        assert_eq!(measure[1].kind, TriggerKind::Drum(DrumKind::Hihat));
    }

    #[test]
    fn test_short_meter_truncates() {
        let c = ChordSymbol::major(PitchClass::C);
        let measure = build_measure(Genre::Rock, &c, 3);
        assert!(measure.iter().all(|e| e.step < 12));
        assert_eq!(steps_of(&measure, DrumKind::Kick), vec![0, 4, 8]);
    }

    #[test]
    fn test_long_meter_repeats_row() {
        let c = ChordSymbol::major(PitchClass::C);
        let measure = build_measure(Genre::Rock, &c, 6);
        assert_eq!(steps_of(&measure, DrumKind::Kick), vec![0, 4, 8, 12, 16, 20]);
        let strum_steps: Vec<u32> = measure
            .iter()
            .filter(|e| e.channel() == Channel::Rhythm)
            .map(|e| e.step)
            .collect();
        assert_eq!(strum_steps, vec![0, 0, 0, 8, 8, 8, 16, 16, 16]);
    }

    #[test]
    fn test_metronome_accent() {
        let clicks = build_metronome_measure(3);
        assert_eq!(clicks.len(), 3);
        assert!(matches!(
            clicks[0].kind,
            TriggerKind::Click { accent: true, frequency_hz, .. } if frequency_hz == ACCENT_CLICK_HZ
        ));
        assert!(matches!(clicks[2].kind, TriggerKind::Click { accent: false, .. }));
        assert!(clicks.iter().all(|c| c.channel() == Channel::Drums));
    }
}
