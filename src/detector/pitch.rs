// Pitch Detection - Time-domain autocorrelation
// Finds the lag at which a buffer best matches a shifted copy of itself

use serde::{Deserialize, Serialize};

/// Pitch detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// RMS below this is treated as silence (tuner sensitivity)
    pub silence_threshold: f32,

    /// Similarity a lag must exceed to be considered
    pub acceptance_threshold: f32,

    /// Best similarity must exceed this to report a pitch
    pub correlation_floor: f32,

    /// Shorter buffers are rejected
    pub min_buffer_len: usize,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            acceptance_threshold: 0.9,
            correlation_floor: 0.01,
            min_buffer_len: 1024,
        }
    }
}

/// Estimated fundamental frequency for one buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Fundamental frequency in Hz
    pub frequency_hz: f32,

    /// Similarity score of the winning lag (0.0 - 1.0)
    pub confidence: f32,
}

/// Root-mean-square amplitude of a buffer
pub fn rms(buffer: &[f32]) -> f32 {
    if buffer.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = buffer.iter().map(|s| s * s).sum();
    (sum_squares / buffer.len() as f32).sqrt()
}

/// Detect pitch with default configuration
pub fn detect_pitch(buffer: &[f32], sample_rate: u32) -> Option<PitchEstimate> {
    detect_pitch_with_config(buffer, sample_rate, &PitchConfig::default())
}

/// Detect pitch with custom configuration
///
/// Returns None for silence, short buffers, or when no lag is periodic enough.
/// The result is not range-filtered; callers decide what is plausible for
/// their instrument.
pub fn detect_pitch_with_config(
    buffer: &[f32],
    sample_rate: u32,
    config: &PitchConfig,
) -> Option<PitchEstimate> {
    if buffer.len() < config.min_buffer_len.max(2) || sample_rate == 0 {
        return None;
    }

    if rms(buffer) < config.silence_threshold {
        return None;
    }

    let max_lag = buffer.len() / 2;
    let mut best_lag = 0usize;
    let mut best_correlation = 0.0f32;
    let mut last_correlation = 1.0f32;

    for lag in 0..max_lag {
        let sum_diff: f32 = buffer[..max_lag]
            .iter()
            .zip(&buffer[lag..lag + max_lag])
            .map(|(a, b)| (a - b).abs())
            .sum();
        let correlation = 1.0 - sum_diff / max_lag as f32;

        // Only rising scores count, so the search climbs onto the true
        // period peak instead of the shoulder of a harmonic
        if correlation > config.acceptance_threshold
            && correlation > last_correlation
            && correlation > best_correlation
        {
            best_correlation = correlation;
            best_lag = lag;
        }

        last_correlation = correlation;
    }

    if best_correlation > config.correlation_floor && best_lag > 0 {
        Some(PitchEstimate {
            frequency_hz: sample_rate as f32 / best_lag as f32,
            confidence: best_correlation.clamp(0.0, 1.0),
        })
    } else {
        None
    }
}
