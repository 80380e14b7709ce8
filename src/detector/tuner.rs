// Tuner - Standard-tuning guitar tuner on top of the pitch detector
// Reports nearest note, cents offset and the closest open string

use serde::{Deserialize, Serialize};

use super::pitch::detect_pitch_with_config;
use crate::audio::{AudioFrame, ToneTrigger};
use crate::config::TunerConfig;
use crate::music::{cents_between, frequency_to_note, NoteReading};

/// An open guitar string
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuitarString {
    /// String number, 6 = low E
    pub number: u8,

    /// Note label, e.g. "E2"
    pub note: &'static str,

    pub midi: i32,
    pub frequency_hz: f32,
}

const fn guitar_string(
    number: u8,
    note: &'static str,
    midi: i32,
    frequency_hz: f32,
) -> GuitarString {
    GuitarString {
        number,
        note,
        midi,
        frequency_hz,
    }
}

/// Standard tuning, low to high
pub const STANDARD_TUNING: [GuitarString; 6] = [
    guitar_string(6, "E2", 40, 82.41),
    guitar_string(5, "A2", 45, 110.0),
    guitar_string(4, "D3", 50, 146.83),
    guitar_string(3, "G3", 55, 196.0),
    guitar_string(2, "B3", 59, 246.94),
    guitar_string(1, "E4", 64, 329.63),
];

/// Where the detected pitch sits relative to the nearest note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningStatus {
    Flat,
    InTune,
    Sharp,
}

impl TuningStatus {
    pub fn from_cents(cents: f32, tolerance: f32) -> Self {
        if cents.abs() <= tolerance {
            TuningStatus::InTune
        } else if cents < 0.0 {
            TuningStatus::Flat
        } else {
            TuningStatus::Sharp
        }
    }
}

/// One tuner update
#[derive(Debug, Clone, Serialize)]
pub struct TunerReading {
    pub frequency_hz: f32,

    /// Nearest equal-tempered note
    pub note: NoteReading,

    /// Cents from the nearest note, rounded
    pub cents: i32,

    pub closest_string: GuitarString,

    /// Cents from the closest open string's target pitch
    pub string_cents: f32,

    pub status: TuningStatus,
}

/// Open string whose target frequency is nearest in Hz
pub fn closest_string(frequency_hz: f32) -> &'static GuitarString {
    let mut closest = &STANDARD_TUNING[0];
    for string in &STANDARD_TUNING[1..] {
        if (frequency_hz - string.frequency_hz).abs() < (frequency_hz - closest.frequency_hz).abs()
        {
            closest = string;
        }
    }
    closest
}

/// Guitar tuner
#[derive(Debug, Clone, Default)]
pub struct Tuner {
    config: TunerConfig,
}

impl Tuner {
    pub fn new(config: TunerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Change the silence threshold while running
    pub fn set_sensitivity(&mut self, threshold: f32) {
        self.config.pitch.silence_threshold = threshold.max(0.0);
    }

    /// Analyze one frame. None when silent, aperiodic or out of range.
    pub fn read(&self, frame: &AudioFrame) -> Option<TunerReading> {
        let estimate =
            detect_pitch_with_config(&frame.samples, frame.sample_rate, &self.config.pitch)?;
        self.reading_for_frequency(estimate.frequency_hz)
    }

    /// Build a reading for an already detected frequency
    pub fn reading_for_frequency(&self, frequency_hz: f32) -> Option<TunerReading> {
        if frequency_hz <= self.config.min_frequency_hz
            || frequency_hz >= self.config.max_frequency_hz
        {
            return None;
        }

        let note = frequency_to_note(frequency_hz)?;
        let string = *closest_string(frequency_hz);
        let cents = note.cents_rounded();

        Some(TunerReading {
            frequency_hz,
            note,
            cents,
            closest_string: string,
            string_cents: cents_between(frequency_hz, string.frequency_hz),
            status: TuningStatus::from_cents(cents as f32, self.config.in_tune_cents),
        })
    }

    /// Reference pitch for an open string, due immediately
    pub fn reference_tone(&self, string: &GuitarString, now_ms: f64) -> ToneTrigger {
        ToneTrigger {
            frequency_hz: string.frequency_hz,
            midi: Some(string.midi),
            duration_ms: self.config.reference_tone_ms,
            at_ms: now_ms,
            delay_ms: 0.0,
            gain: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::{midi_to_frequency, PitchClass};
    use std::f32::consts::PI;

    fn sine_frame(frequency_hz: f32) -> AudioFrame {
        let samples = (0..4096)
            .map(|i| 0.4 * (2.0 * PI * frequency_hz * i as f32 / 44100.0).sin())
            .collect();
        AudioFrame::new(samples, 44100)
    }

    #[test]
    fn test_standard_tuning_matches_midi() {
        for string in &STANDARD_TUNING {
            assert!((midi_to_frequency(string.midi) - string.frequency_hz).abs() < 0.05);
        }
    }

    #[test]
    fn test_closest_string() {
        assert_eq!(closest_string(84.0).number, 6);
        assert_eq!(closest_string(112.0).number, 5);
        assert_eq!(closest_string(240.0).number, 2);
        assert_eq!(closest_string(900.0).number, 1);
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(TuningStatus::from_cents(0.0, 5.0), TuningStatus::InTune);
        assert_eq!(TuningStatus::from_cents(-5.0, 5.0), TuningStatus::InTune);
        assert_eq!(TuningStatus::from_cents(-12.0, 5.0), TuningStatus::Flat);
        assert_eq!(TuningStatus::from_cents(6.0, 5.0), TuningStatus::Sharp);
    }

    #[test]
    fn test_reading_for_sharp_a() {
        let tuner = Tuner::default();
        let reading = tuner.reading_for_frequency(110.0 * 2.0_f32.powf(20.0 / 1200.0)).unwrap();
        assert_eq!(reading.note.pitch_class, PitchClass::A);
        assert_eq!(reading.cents, 20);
        assert_eq!(reading.status, TuningStatus::Sharp);
        assert_eq!(reading.closest_string.note, "A2");
        assert!((reading.string_cents - 20.0).abs() < 0.1);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let tuner = Tuner::default();
        assert!(tuner.reading_for_frequency(55.0).is_none());
        assert!(tuner.reading_for_frequency(1200.0).is_none());
    }

    #[test]
    fn test_read_sine_frame() {
        let tuner = Tuner::default();
        let reading = tuner.read(&sine_frame(110.0)).unwrap();
        assert_eq!(reading.note.label(), "A2");
        assert_eq!(reading.status, TuningStatus::InTune);

        let silent = AudioFrame::new(vec![0.0; 4096], 44100);
        assert!(tuner.read(&silent).is_none());
    }

    #[test]
    fn test_reference_tone() {
        let tuner = Tuner::default();
        let tone = tuner.reference_tone(&STANDARD_TUNING[0], 10.0);
        assert_eq!(tone.midi, Some(40));
        assert_eq!(tone.duration_ms, 3000.0);
        assert_eq!(tone.at_ms, 10.0);
    }
}
