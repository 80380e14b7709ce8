// Note History - Time-boxed window of recently detected notes
// Includes a frame debouncer so one stray frame never enters the window

use serde::{Deserialize, Serialize};

use crate::music::{NoteReading, PitchClass};

/// A stable note detection, kept in the rolling history window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch_class: PitchClass,
    pub octave: i32,
    pub midi: i32,

    /// Detection time in milliseconds (caller's clock)
    pub timestamp_ms: u64,

    /// Signal level (RMS) of the frame the note was detected in
    pub strength: f32,
}

impl NoteEvent {
    pub fn from_reading(reading: &NoteReading, timestamp_ms: u64, strength: f32) -> Self {
        Self {
            pitch_class: reading.pitch_class,
            octave: reading.octave,
            midi: reading.midi,
            timestamp_ms,
            strength,
        }
    }
}

fn is_live(event: &NoteEvent, now_ms: u64, window_ms: u64) -> bool {
    now_ms.saturating_sub(event.timestamp_ms) < window_ms
}

/// Append a note and drop everything older than the window
pub fn update_note_history(
    history: Vec<NoteEvent>,
    new_note: NoteEvent,
    now_ms: u64,
    window_ms: u64,
) -> Vec<NoteEvent> {
    let mut history = history;
    history.push(new_note);
    evict_expired(history, now_ms, window_ms)
}

/// Drop entries older than the window without adding anything
pub fn evict_expired(history: Vec<NoteEvent>, now_ms: u64, window_ms: u64) -> Vec<NoteEvent> {
    history
        .into_iter()
        .filter(|event| is_live(event, now_ms, window_ms))
        .collect()
}

/// Distinct pitch classes in first-seen order
pub fn unique_pitch_classes(history: &[NoteEvent]) -> Vec<PitchClass> {
    let mut unique = Vec::new();
    for event in history {
        if !unique.contains(&event.pitch_class) {
            unique.push(event.pitch_class);
        }
    }
    unique
}

/// Requires the same note on several consecutive frames before accepting it
#[derive(Debug, Clone)]
pub struct NoteStabilizer {
    required_frames: u32,
    candidate: Option<i32>,
    count: u32,
}

impl NoteStabilizer {
    pub fn new(required_frames: u32) -> Self {
        Self {
            required_frames: required_frames.max(1),
            candidate: None,
            count: 0,
        }
    }

    /// Feed one frame's MIDI note (None for silence).
    /// Returns the note once it has been held for enough frames.
    pub fn observe(&mut self, midi: Option<i32>) -> Option<i32> {
        match midi {
            None => self.reset(),
            Some(note) if self.candidate == Some(note) => {
                self.count = self.count.saturating_add(1);
            }
            Some(note) => {
                self.candidate = Some(note);
                self.count = 1;
            }
        }
        self.stable_note()
    }

    /// The note currently held long enough, if any
    pub fn stable_note(&self) -> Option<i32> {
        self.candidate.filter(|_| self.count >= self.required_frames)
    }

    pub fn reset(&mut self) {
        self.candidate = None;
        self.count = 0;
    }
}

impl Default for NoteStabilizer {
    fn default() -> Self {
        Self::new(2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(pitch_class: PitchClass, timestamp_ms: u64) -> NoteEvent {
        NoteEvent {
            pitch_class,
            octave: 3,
            midi: 48 + pitch_class.index() as i32,
            timestamp_ms,
            strength: 0.95,
        }
    }

    #[test]
    fn test_old_entries_evicted() {
        let history = vec![event(PitchClass::C, 0)];
        let history = update_note_history(history, event(PitchClass::E, 2000), 2000, 1500);

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].pitch_class, PitchClass::E);
        assert!(history.iter().all(|e| 2000 - e.timestamp_ms < 1500));
    }

    #[test]
    fn test_window_boundary_is_exclusive() {
        let history = vec![event(PitchClass::C, 500), event(PitchClass::E, 501)];
        let history = evict_expired(history, 2000, 1500);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].timestamp_ms, 501);
    }

    #[test]
    fn test_unique_pitch_classes_first_seen_order() {
        let history = vec![
            event(PitchClass::G, 0),
            event(PitchClass::C, 10),
            event(PitchClass::G, 20),
            event(PitchClass::E, 30),
        ];
        assert_eq!(
            unique_pitch_classes(&history),
            vec![PitchClass::G, PitchClass::C, PitchClass::E]
        );
    }

    #[test]
    fn test_stabilizer_needs_consecutive_frames() {
        let mut stabilizer = NoteStabilizer::new(2);
        assert_eq!(stabilizer.observe(Some(45)), None);
        assert_eq!(stabilizer.observe(Some(45)), Some(45));
        assert_eq!(stabilizer.observe(Some(45)), Some(45));

        // A different note restarts the count
        assert_eq!(stabilizer.observe(Some(47)), None);
        assert_eq!(stabilizer.stable_note(), None);

        // Silence resets
        assert_eq!(stabilizer.observe(None), None);
        assert_eq!(stabilizer.observe(Some(47)), None);
        assert_eq!(stabilizer.observe(Some(47)), Some(47));
    }

    #[test]
    fn test_stabilizer_single_frame() {
        let mut stabilizer = NoteStabilizer::new(1);
        assert_eq!(stabilizer.observe(Some(60)), Some(60));
        assert_eq!(stabilizer.observe(Some(62)), Some(62));
    }
}
