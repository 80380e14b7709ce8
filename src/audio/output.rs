// Audio Output Capability - What the transport and tuner call to make sound
// Synthesis stays behind this trait; callers only say what to play and when

use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Audio output not ready: {0}")]
    NotReady(String),

    #[error("Audio output closed")]
    Closed,

    #[error("Failed to trigger sound: {0}")]
    TriggerFailed(String),
}

/// Percussion voices available to the drum channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrumKind {
    Kick,
    Snare,
    Hihat,
}

impl DrumKind {
    /// Kick, snare, hihat: the order hits on one step are triggered in
    pub const ALL: [DrumKind; 3] = [DrumKind::Kick, DrumKind::Snare, DrumKind::Hihat];
}

/// A pitched note to play
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneTrigger {
    pub frequency_hz: f32,

    /// MIDI note when the tone came from a note rather than a raw frequency
    pub midi: Option<i32>,

    pub duration_ms: f64,

    /// Due time on the caller's clock
    pub at_ms: f64,

    /// Time from dispatch until the tone is due
    pub delay_ms: f64,

    /// Linear gain (0.0 - 1.0), channel volume already applied
    pub gain: f32,
}

/// A percussion hit to play
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrumHit {
    pub kind: DrumKind,

    /// Due time on the caller's clock
    pub at_ms: f64,

    /// Time from dispatch until the hit is due
    pub delay_ms: f64,

    /// Linear gain (0.0 - 1.0), channel volume already applied
    pub gain: f32,
}

/// Sound output used by the transport and the tuner.
///
/// Triggers arrive ahead of their due time; implementations must hold them
/// until `delay_ms` elapses. Each clone of an output is its own source:
/// `cancel_pending` drops only what was triggered through that handle, so
/// transports sharing a device can stop independently.
pub trait AudioOutput: Send {
    /// Resolves once the output can accept triggers
    fn wait_ready(&mut self) -> impl Future<Output = Result<(), OutputError>> + Send;

    fn trigger_tone(&mut self, tone: ToneTrigger) -> Result<(), OutputError>;

    fn trigger_drum_hit(&mut self, hit: DrumHit) -> Result<(), OutputError>;

    /// Drop everything this handle triggered that is still queued or ringing
    fn cancel_pending(&mut self);

    /// Release the device. Further triggers may fail with `Closed`.
    fn close(&mut self) {}
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    /// Everything a test output was asked to do, in call order
    #[derive(Debug, Clone, PartialEq)]
    pub enum OutputCall {
        Tone(ToneTrigger),
        Drum(DrumHit),
        Cancel,
        Close,
    }

    /// Output that records calls instead of playing them.
    ///
    /// Clones share the call log and the queue of held triggers but are
    /// separate sources, like clones of a device output.
    #[derive(Debug, Default)]
    pub struct RecordingOutput {
        pub calls: Arc<Mutex<Vec<OutputCall>>>,
        pub unavailable: bool,
        pub fail_triggers: bool,
        source: u64,
        queued: Arc<Mutex<Vec<(u64, OutputCall)>>>,
        next_source: Arc<AtomicU64>,
    }

    impl Clone for RecordingOutput {
        fn clone(&self) -> Self {
            Self {
                calls: Arc::clone(&self.calls),
                unavailable: self.unavailable,
                fail_triggers: self.fail_triggers,
                source: self.next_source.fetch_add(1, Ordering::Relaxed) + 1,
                queued: Arc::clone(&self.queued),
                next_source: Arc::clone(&self.next_source),
            }
        }
    }

    impl RecordingOutput {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        pub fn source(&self) -> u64 {
            self.source
        }

        pub fn calls(&self) -> Vec<OutputCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Triggers not yet dropped by a cancel, tagged with their source
        pub fn queued(&self) -> Vec<(u64, OutputCall)> {
            self.queued.lock().unwrap().clone()
        }

        pub fn drum_hits(&self) -> Vec<DrumHit> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    OutputCall::Drum(hit) => Some(hit),
                    _ => None,
                })
                .collect()
        }

        pub fn tones(&self) -> Vec<ToneTrigger> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    OutputCall::Tone(tone) => Some(tone),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.calls.lock().unwrap().clear();
        }

        fn record(&self, call: OutputCall) {
            self.calls.lock().unwrap().push(call.clone());
            self.queued.lock().unwrap().push((self.source, call));
        }
    }

    impl AudioOutput for RecordingOutput {
        fn wait_ready(&mut self) -> impl Future<Output = Result<(), OutputError>> + Send {
            let result = if self.unavailable {
                Err(OutputError::NotReady("playback not unlocked".to_string()))
            } else {
                Ok(())
            };
            async move { result }
        }

        fn trigger_tone(&mut self, tone: ToneTrigger) -> Result<(), OutputError> {
            if self.fail_triggers {
                return Err(OutputError::TriggerFailed("tone".to_string()));
            }
            self.record(OutputCall::Tone(tone));
            Ok(())
        }

        fn trigger_drum_hit(&mut self, hit: DrumHit) -> Result<(), OutputError> {
            if self.fail_triggers {
                return Err(OutputError::TriggerFailed("drum".to_string()));
            }
            self.record(OutputCall::Drum(hit));
            Ok(())
        }

        fn cancel_pending(&mut self) {
            self.calls.lock().unwrap().push(OutputCall::Cancel);
            let source = self.source;
            self.queued.lock().unwrap().retain(|(from, _)| *from != source);
        }

        fn close(&mut self) {
            self.calls.lock().unwrap().push(OutputCall::Close);
            self.queued.lock().unwrap().clear();
        }
    }
}
