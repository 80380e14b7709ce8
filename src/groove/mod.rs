// Groove - Tempo clock, time signatures and tap tempo
// Musical position for the transport

pub mod grid;
pub mod tempo;

pub use grid::{
    beat_duration_ms, clamp_bpm, BeatPosition, StepResolution, TempoClock, TimeSignature,
    MAX_BPM, MIN_BPM,
};
pub use tempo::{TapTempo, TapTempoConfig};
