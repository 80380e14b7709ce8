// Microphone Capture - Live frames from the default input device via cpal
// The stream lives on its own thread; frames come back over a channel

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

use super::frame::{AudioFrame, FrameSource};

/// Frames queued for the reader; newer frames are dropped while full
const FRAME_QUEUE_DEPTH: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("No input device available")]
    NoInputDevice,

    #[error("Failed to get default input config: {0}")]
    ConfigError(String),

    #[error("Failed to build input stream: {0}")]
    StreamError(String),

    #[error("Capture thread stopped before the stream started")]
    Disconnected,
}

/// Collects interleaved device buffers into fixed-size mono frames
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    frame_size: usize,
    channels: usize,
    pending: Vec<f32>,
}

impl FrameAccumulator {
    pub fn new(frame_size: usize, channels: u16) -> Self {
        Self {
            frame_size: frame_size.max(1),
            channels: channels.max(1) as usize,
            pending: Vec::with_capacity(frame_size),
        }
    }

    /// Add interleaved samples; returns every frame completed by them
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<Vec<f32>> {
        let mut complete = Vec::new();
        for chunk in interleaved.chunks(self.channels) {
            self.pending.push(chunk.iter().sum::<f32>() / chunk.len() as f32);
            if self.pending.len() == self.frame_size {
                complete.push(std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.frame_size),
                ));
            }
        }
        complete
    }
}

/// Permission-granted microphone producing analysis frames
pub struct MicrophoneStream {
    frames: Receiver<AudioFrame>,
    sample_rate: u32,
    stop_signal: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MicrophoneStream {
    /// Block until the next frame arrives or the timeout passes
    pub fn wait_frame(&mut self, timeout: Duration) -> Option<AudioFrame> {
        match self.frames.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stop_signal.load(Ordering::SeqCst)
    }

    /// Stop the device stream and join the capture thread
    pub fn stop(&mut self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Capture thread panicked");
            }
        }
    }
}

impl FrameSource for MicrophoneStream {
    /// Most recent complete frame; older queued frames are skipped
    fn read_frame(&mut self) -> Option<AudioFrame> {
        self.frames.try_iter().last()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the default input device and start producing `frame_size` frames
pub fn acquire_microphone_stream(frame_size: usize) -> Result<MicrophoneStream, CaptureError> {
    let (frame_tx, frame_rx) = bounded(FRAME_QUEUE_DEPTH);
    let (ready_tx, ready_rx) = bounded(1);
    let stop_signal = Arc::new(AtomicBool::new(false));
    let thread_stop = Arc::clone(&stop_signal);

    let worker = thread::spawn(move || {
        if let Err(e) = run_capture(frame_size, frame_tx, &ready_tx, thread_stop) {
            log::error!("Capture error: {}", e);
            let _ = ready_tx.send(Err(e));
        }
    });

    let sample_rate = match ready_rx.recv() {
        Ok(result) => result?,
        Err(_) => return Err(CaptureError::Disconnected),
    };

    log::info!("Microphone capture started at {} Hz, {} sample frames", sample_rate, frame_size);

    Ok(MicrophoneStream {
        frames: frame_rx,
        sample_rate,
        stop_signal,
        worker: Some(worker),
    })
}

fn run_capture(
    frame_size: usize,
    frames: Sender<AudioFrame>,
    ready: &Sender<Result<u32, CaptureError>>,
    stop_signal: Arc<AtomicBool>,
) -> Result<(), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoInputDevice)?;
    let supported = device
        .default_input_config()
        .map_err(|e| CaptureError::ConfigError(e.to_string()))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: cpal::StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => {
            build_stream::<f32>(&device, &config, frame_size, channels, sample_rate, frames)
        }
        SampleFormat::I16 => {
            build_stream::<i16>(&device, &config, frame_size, channels, sample_rate, frames)
        }
        SampleFormat::U16 => {
            build_stream::<u16>(&device, &config, frame_size, channels, sample_rate, frames)
        }
        other => {
            return Err(CaptureError::ConfigError(format!(
                "Unsupported sample format {:?}",
                other
            )))
        }
    }?;

    stream
        .play()
        .map_err(|e| CaptureError::StreamError(e.to_string()))?;
    let _ = ready.send(Ok(sample_rate));

    while !stop_signal.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(20));
    }

    // Dropping the stream stops the device
    drop(stream);
    log::info!("Microphone capture stopped");
    Ok(())
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    frame_size: usize,
    channels: u16,
    sample_rate: u32,
    frames: Sender<AudioFrame>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let mut accumulator = FrameAccumulator::new(frame_size, channels);
    let mut converted: Vec<f32> = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                converted.clear();
                converted.extend(data.iter().map(|&s| s.to_sample::<f32>()));
                for samples in accumulator.push(&converted) {
                    match frames.try_send(AudioFrame::new(samples, sample_rate)) {
                        Ok(()) | Err(TrySendError::Full(_)) => {}
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
            },
            |err| log::error!("Input stream error: {}", err),
            None,
        )
        .map_err(|e| CaptureError::StreamError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_emits_full_frames() {
        let mut accumulator = FrameAccumulator::new(4, 1);
        assert!(accumulator.push(&[0.1, 0.2, 0.3]).is_empty());

        let frames = accumulator.push(&[0.4, 0.5, 0.6, 0.7, 0.8, 0.9]);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(frames[1], vec![0.5, 0.6, 0.7, 0.8]);
    }

    #[test]
    fn test_accumulator_downmixes() {
        let mut accumulator = FrameAccumulator::new(2, 2);
        let frames = accumulator.push(&[0.5, 0.3, 0.4, 0.2]);
        assert_eq!(frames.len(), 1);
        assert!((frames[0][0] - 0.4).abs() < 1e-6);
        assert!((frames[0][1] - 0.3).abs() < 1e-6);
    }
}
