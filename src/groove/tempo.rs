// Tap Tempo - BPM from the spacing of recent taps
// Averages the intervals between taps inside a short sliding window

use serde::{Deserialize, Serialize};

/// Configuration for tap tempo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapTempoConfig {
    /// Taps older than this are forgotten
    pub window_ms: u64,

    /// Minimum taps before a tempo is reported
    pub min_taps: usize,

    /// Slowest tempo accepted from taps
    pub min_bpm: u32,

    /// Fastest tempo accepted from taps
    pub max_bpm: u32,
}

impl Default for TapTempoConfig {
    fn default() -> Self {
        TapTempoConfig {
            window_ms: 3000,
            min_taps: 2,
            min_bpm: 40,
            max_bpm: 240,
        }
    }
}

/// Tap tempo tracker
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    config: TapTempoConfig,
    taps: Vec<u64>,
}

impl TapTempo {
    pub fn new(config: TapTempoConfig) -> Self {
        Self {
            config,
            taps: Vec::new(),
        }
    }

    /// Register a tap at `now_ms`.
    /// Returns the tempo once enough taps fall in the window and the result
    /// is within the accepted range.
    pub fn tap(&mut self, now_ms: u64) -> Option<u32> {
        self.taps.push(now_ms);
        let window_ms = self.config.window_ms;
        self.taps.retain(|&t| now_ms.saturating_sub(t) < window_ms);

        if self.taps.len() < self.config.min_taps.max(2) {
            return None;
        }

        let intervals = compute_intervals(&self.taps);
        let average = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if average <= 0.0 {
            return None;
        }

        let bpm = (60_000.0 / average).round() as u32;
        (self.config.min_bpm..=self.config.max_bpm)
            .contains(&bpm)
            .then_some(bpm)
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }
}

/// Intervals between consecutive taps in milliseconds
fn compute_intervals(taps: &[u64]) -> Vec<f64> {
    taps.windows(2)
        .map(|pair| pair[1].saturating_sub(pair[0]) as f64)
        .collect()
}
