// Audio Frames - Fixed-size sample buffers handed to the detector
// Any live or recorded source yields frames through FrameSource

use serde::{Deserialize, Serialize};

use crate::detector::rms;

/// One analysis buffer of mono samples in [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// RMS level of the frame
    pub fn rms(&self) -> f32 {
        rms(&self.samples)
    }

    /// Level scaled for a meter (0.0 - 1.0)
    pub fn meter_level(&self) -> f32 {
        (self.rms() * 10.0).min(1.0)
    }

    /// Duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }
}

/// Something frames can be read from
pub trait FrameSource {
    /// Next complete frame, or None when no full frame is available yet
    fn read_frame(&mut self) -> Option<AudioFrame>;

    fn sample_rate(&self) -> u32;
}

/// Average interleaved channels down to mono
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let mono = downmix(&[0.5, 0.3, 0.4, 0.2], 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.4).abs() < 0.01);
        assert!((mono[1] - 0.3).abs() < 0.01);
    }

    #[test]
    fn test_frame_duration_and_level() {
        let frame = AudioFrame::new(vec![0.5; 4410], 44100);
        assert!((frame.duration_ms() - 100.0).abs() < 1e-9);
        assert!((frame.rms() - 0.5).abs() < 1e-6);
        assert_eq!(frame.meter_level(), 1.0);
    }
}
