// WAV Ingestion - Offline input for the detector
// Decodes WAV with hound, downmixes to mono and slices analysis frames

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;

use super::frame::{downmix, AudioFrame, FrameSource};

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Failed to read WAV file: {0}")]
    WavReadError(#[from] hound::Error),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid audio data")]
    InvalidData,
}

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    pub sample_rate: u32,

    /// Channel count of the source before downmixing
    pub source_channels: u16,
}

impl AudioData {
    pub fn duration_ms(&self) -> f64 {
        self.samples.len() as f64 * 1000.0 / self.sample_rate as f64
    }

    /// Non-overlapping frames of `frame_size` samples; a trailing partial
    /// frame is dropped
    pub fn frames(&self, frame_size: usize) -> WavFrameSource {
        WavFrameSource {
            samples: self.samples.clone(),
            sample_rate: self.sample_rate,
            frame_size: frame_size.max(1),
            position: 0,
        }
    }

    /// Encode as 16-bit mono WAV
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, AudioError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec)?;
            for &sample in &self.samples {
                writer.write_sample((sample * 32767.0).clamp(-32768.0, 32767.0) as i16)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }
}

fn read_normalized<R: Read>(reader: &mut WavReader<R>) -> Result<Vec<f32>, AudioError> {
    let spec = reader.spec();
    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, 32) => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<Result<Vec<_>, _>>()?,
        (SampleFormat::Int, bits @ (8 | 24 | 32)) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<Vec<_>, _>>()?
        }
        (format, bits) => {
            return Err(AudioError::UnsupportedFormat(format!("{:?} {}-bit audio", format, bits)));
        }
    };
    Ok(samples)
}

fn decode<R: Read>(mut reader: WavReader<R>) -> Result<AudioData, AudioError> {
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(AudioError::InvalidData);
    }

    let interleaved = read_normalized(&mut reader)?;
    log::debug!(
        "Ingested WAV: {} Hz, {} channel(s), {} samples",
        spec.sample_rate,
        spec.channels,
        interleaved.len()
    );

    Ok(AudioData {
        samples: downmix(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
    })
}

/// Decode WAV from any reader
pub fn ingest_wav_reader<R: Read>(source: R) -> Result<AudioData, AudioError> {
    decode(WavReader::new(source)?)
}

/// Decode WAV from raw bytes
pub fn ingest_wav(data: &[u8]) -> Result<AudioData, AudioError> {
    ingest_wav_reader(Cursor::new(data))
}

/// Decode a WAV file on disk
pub fn ingest_wav_file<P: AsRef<Path>>(path: P) -> Result<AudioData, AudioError> {
    decode(WavReader::open(path)?)
}

/// Frames sliced from decoded audio
#[derive(Debug, Clone)]
pub struct WavFrameSource {
    samples: Vec<f32>,
    sample_rate: u32,
    frame_size: usize,
    position: usize,
}

impl FrameSource for WavFrameSource {
    fn read_frame(&mut self) -> Option<AudioFrame> {
        let end = self.position + self.frame_size;
        if end > self.samples.len() {
            return None;
        }
        let frame = AudioFrame::new(self.samples[self.position..end].to_vec(), self.sample_rate);
        self.position = end;
        Some(frame)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
