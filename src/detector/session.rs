// Chord Detection Session - Per-frame polling loop state
// Level gate -> pitch -> range filter -> debounce -> history -> chord match

use serde::Serialize;

use super::chords::{match_chord, ChordMatch};
use super::history::{
    evict_expired, unique_pitch_classes, update_note_history, NoteEvent, NoteStabilizer,
};
use super::pitch::detect_pitch_with_config;
use crate::audio::{AudioFrame, FrameSource};
use crate::config::DetectorConfig;
use crate::music::{frequency_to_note, NoteReading};

/// Pitch shown to the user for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchReading {
    /// Note with octave, e.g. "A2"
    pub note: String,

    /// Cents from the nearest note, rounded
    pub cents: i32,

    pub frequency_hz: f32,
    pub reading: NoteReading,
}

/// Result of one detection tick
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameAnalysis {
    /// Meter level (0.0 - 1.0)
    pub level: f32,

    /// Pitch for this frame, if one was found in range
    pub pitch: Option<PitchReading>,

    /// Current chord guesses, best first
    pub matches: Vec<ChordMatch>,
}

type PitchCallback = Box<dyn FnMut(&PitchReading) + Send>;
type ChordCallback = Box<dyn FnMut(&[ChordMatch]) + Send>;

/// Live chord recognizer fed one frame at a time
pub struct ChordDetector {
    config: DetectorConfig,
    history: Vec<NoteEvent>,
    stabilizer: NoteStabilizer,
    matches: Vec<ChordMatch>,
    on_pitch: Option<PitchCallback>,
    on_chord: Option<ChordCallback>,
}

impl ChordDetector {
    pub fn new(config: DetectorConfig) -> Self {
        log::debug!(
            "Chord detector: sensitivity {}, range {}-{} Hz, window {} ms, {} stable frames",
            config.sensitivity,
            config.min_frequency_hz,
            config.max_frequency_hz,
            config.history_window_ms,
            config.stable_frames
        );

        Self {
            stabilizer: NoteStabilizer::new(config.stable_frames),
            config,
            history: Vec::new(),
            matches: Vec::new(),
            on_pitch: None,
            on_chord: None,
        }
    }

    /// Called for every frame with an in-range pitch
    pub fn on_pitch_detected<F>(&mut self, callback: F)
    where
        F: FnMut(&PitchReading) + Send + 'static,
    {
        self.on_pitch = Some(Box::new(callback));
    }

    /// Called whenever the chord guesses are recomputed
    pub fn on_chord_detected<F>(&mut self, callback: F)
    where
        F: FnMut(&[ChordMatch]) + Send + 'static,
    {
        self.on_chord = Some(Box::new(callback));
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Level gate, 0.0 - 1.0 of RMS
    pub fn set_sensitivity(&mut self, threshold: f32) {
        self.config.sensitivity = threshold.max(0.0);
    }

    pub fn history(&self) -> &[NoteEvent] {
        &self.history
    }

    pub fn matches(&self) -> &[ChordMatch] {
        &self.matches
    }

    /// Run one detection pass over a frame captured at `now_ms`.
    ///
    /// Expired notes are dropped first, so silent frames also age the
    /// history out.
    pub fn process_frame(&mut self, frame: &AudioFrame, now_ms: u64) -> FrameAnalysis {
        if self.evict(now_ms) {
            self.rematch();
        }

        let level = frame.rms();

        let pitch = if level > self.config.sensitivity {
            self.detect_in_range(frame)
        } else {
            None
        };

        let Some(pitch) = pitch else {
            self.stabilizer.observe(None);
            return FrameAnalysis {
                level: frame.meter_level(),
                pitch: None,
                matches: self.matches.clone(),
            };
        };

        if let Some(callback) = self.on_pitch.as_mut() {
            callback(&pitch);
        }

        if self.stabilizer.observe(Some(pitch.reading.midi)).is_some() {
            let event = NoteEvent::from_reading(&pitch.reading, now_ms, level);
            let history = std::mem::take(&mut self.history);
            self.history =
                update_note_history(history, event, now_ms, self.config.history_window_ms);
            self.rematch();
        }

        FrameAnalysis {
            level: frame.meter_level(),
            pitch: Some(pitch),
            matches: self.matches.clone(),
        }
    }

    /// Periodic eviction between detections; rematches what is left
    pub fn sweep(&mut self, now_ms: u64) -> &[ChordMatch] {
        self.evict(now_ms);
        self.rematch();
        &self.matches
    }

    /// Feed every frame of a source, timestamping by frame duration and
    /// sweeping on the configured interval
    pub fn analyze_source<S: FrameSource>(
        &mut self,
        source: &mut S,
        start_ms: u64,
    ) -> Vec<FrameAnalysis> {
        let mut results = Vec::new();
        let mut elapsed_ms = 0.0f64;
        let mut last_sweep_ms = start_ms;

        while let Some(frame) = source.read_frame() {
            let now_ms = start_ms + elapsed_ms as u64;
            if now_ms.saturating_sub(last_sweep_ms) >= self.config.sweep_interval_ms {
                self.sweep(now_ms);
                last_sweep_ms = now_ms;
            }
            results.push(self.process_frame(&frame, now_ms));
            elapsed_ms += frame.duration_ms();
        }

        results
    }

    /// Forget history, debounce state and matches
    pub fn reset(&mut self) {
        self.history.clear();
        self.stabilizer.reset();
        self.matches.clear();
    }

    /// Drop expired notes; true if anything went
    fn evict(&mut self, now_ms: u64) -> bool {
        let before = self.history.len();
        let history = std::mem::take(&mut self.history);
        self.history = evict_expired(history, now_ms, self.config.history_window_ms);
        self.history.len() != before
    }

    fn detect_in_range(&self, frame: &AudioFrame) -> Option<PitchReading> {
        let estimate =
            detect_pitch_with_config(&frame.samples, frame.sample_rate, &self.config.pitch)?;
        let frequency_hz = estimate.frequency_hz;
        if frequency_hz <= self.config.min_frequency_hz
            || frequency_hz >= self.config.max_frequency_hz
        {
            return None;
        }

        let reading = frequency_to_note(frequency_hz)?;
        Some(PitchReading {
            note: reading.label(),
            cents: reading.cents_rounded(),
            frequency_hz,
            reading,
        })
    }

    fn rematch(&mut self) {
        self.matches = if self.history.len() >= 2 {
            match_chord(&unique_pitch_classes(&self.history))
        } else {
            Vec::new()
        };

        if let Some(callback) = self.on_chord.as_mut() {
            callback(&self.matches);
        }
    }
}

impl Default for ChordDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::PitchClass;
    use std::f32::consts::PI;
    use std::sync::{Arc, Mutex};

    // Exact integer periods at 44.1 kHz
    const A2_PERIOD: usize = 401;
    const CS3_PERIOD: usize = 318;
    const E3_PERIOD: usize = 268;

    fn periodic_frame(period: usize, amplitude: f32) -> AudioFrame {
        let samples = (0..4096)
            .map(|i| amplitude * (2.0 * PI * (i % period) as f32 / period as f32).sin())
            .collect();
        AudioFrame::new(samples, 44100)
    }

    /// A2 then E3, two frames each, 90 ms apart
    fn feed_a_and_e(detector: &mut ChordDetector) {
        for (i, period) in [A2_PERIOD, A2_PERIOD, E3_PERIOD, E3_PERIOD]
            .into_iter()
            .enumerate()
        {
            detector.process_frame(&periodic_frame(period, 0.5), i as u64 * 90);
        }
    }

    #[test]
    fn test_single_frame_is_debounced() {
        let mut detector = ChordDetector::default();
        let analysis = detector.process_frame(&periodic_frame(A2_PERIOD, 0.5), 0);

        assert_eq!(analysis.pitch.as_ref().unwrap().note, "A2");
        assert!(detector.history().is_empty());

        detector.process_frame(&periodic_frame(A2_PERIOD, 0.5), 90);
        assert_eq!(detector.history().len(), 1);
        assert_eq!(detector.history()[0].pitch_class, PitchClass::A);
    }

    #[test]
    fn test_quiet_frame_below_sensitivity() {
        let mut detector = ChordDetector::default();
        // RMS ~0.011: above the autocorrelation gate, below the 0.02 level gate
        let analysis = detector.process_frame(&periodic_frame(A2_PERIOD, 0.016), 0);
        assert!(analysis.pitch.is_none());

        detector.set_sensitivity(0.005);
        let analysis = detector.process_frame(&periodic_frame(A2_PERIOD, 0.016), 10);
        assert!(analysis.pitch.is_some());
    }

    #[test]
    fn test_notes_build_a_chord() {
        let mut detector = ChordDetector::default();
        let chords = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&chords);
        detector.on_chord_detected(move |matches| {
            sink.lock().unwrap().push(matches.to_vec());
        });

        // A2, C#3, E3 for two frames each so every note is stable
        let mut now = 0;
        for period in [A2_PERIOD, CS3_PERIOD, E3_PERIOD] {
            for _ in 0..2 {
                detector.process_frame(&periodic_frame(period, 0.5), now);
                now += 90;
            }
        }

        assert_eq!(detector.matches()[0].label, "A");
        assert_eq!(detector.matches()[0].confidence, 1.0);
        assert!(!chords.lock().unwrap().is_empty());
    }

    #[test]
    fn test_sweep_clears_stale_history() {
        let mut detector = ChordDetector::default();
        feed_a_and_e(&mut detector);
        assert_eq!(detector.history().len(), 2);
        assert!(!detector.matches().is_empty());

        let matches = detector.sweep(5000);
        assert!(matches.is_empty());
        assert!(detector.history().is_empty());
    }

    #[test]
    fn test_silent_frame_ages_out_history() {
        let mut detector = ChordDetector::default();
        let chords = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&chords);
        detector.on_chord_detected(move |matches| {
            sink.lock().unwrap().push(matches.len());
        });

        feed_a_and_e(&mut detector);
        assert!(!detector.matches().is_empty());

        let analysis = detector.process_frame(&AudioFrame::new(vec![0.0; 4096], 44100), 5000);
        assert!(analysis.matches.is_empty());
        assert!(detector.matches().is_empty());
        assert!(detector.history().is_empty());
        assert_eq!(chords.lock().unwrap().last(), Some(&0));
    }

    #[test]
    fn test_unstable_frame_drops_only_expired_notes() {
        let mut detector = ChordDetector::default();
        feed_a_and_e(&mut detector);

        // A2 at 90 ms is past the 1500 ms window, E3 at 270 ms is not
        let analysis = detector.process_frame(&periodic_frame(CS3_PERIOD, 0.5), 1650);
        assert!(analysis.pitch.is_some());
        assert_eq!(detector.history().len(), 1);
        assert_eq!(detector.history()[0].pitch_class, PitchClass::E);
        assert!(analysis.matches.is_empty());
    }

    #[test]
    fn test_pitch_callback() {
        let mut detector = ChordDetector::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        detector.on_pitch_detected(move |pitch| {
            sink.lock().unwrap().push((pitch.note.clone(), pitch.cents));
        });

        detector.process_frame(&periodic_frame(A2_PERIOD, 0.5), 0);
        detector.process_frame(&AudioFrame::new(vec![0.0; 4096], 44100), 50);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "A2");
        assert!(seen[0].1.abs() <= 5);
    }
}
