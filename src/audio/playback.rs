// Rodio Playback - Default-device AudioOutput implementation
// A dedicated thread owns the output stream; triggers arrive over a channel

use crossbeam_channel::{unbounded, Receiver, Sender};
use rand::Rng;
use rodio::buffer::SamplesBuffer;
use rodio::source::SineWave;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::f32::consts::PI;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::watch;

use super::output::{AudioOutput, DrumHit, DrumKind, OutputError, ToneTrigger};

/// Sample rate used for synthesized drum buffers
pub const DRUM_SAMPLE_RATE: u32 = 44100;

/// Identifies the output handle a trigger came through
type SourceId = u64;

enum PlaybackCommand {
    Tone(SourceId, ToneTrigger),
    Drum(SourceId, DrumHit),
    Cancel(SourceId),
    Close,
}

#[derive(Debug, Clone)]
enum ReadyState {
    Pending,
    Ready,
    Failed(OutputError),
}

/// Plays tones and drum hits on the default output device.
///
/// Clones share one device thread but each is a separate source, so
/// `cancel_pending` on one clone leaves the others playing. `close` on any
/// clone shuts the device for all of them.
pub struct RodioOutput {
    commands: Sender<PlaybackCommand>,
    ready: watch::Receiver<ReadyState>,
    source: SourceId,
    next_source: Arc<AtomicU64>,
}

impl Clone for RodioOutput {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            ready: self.ready.clone(),
            source: self.next_source.fetch_add(1, Ordering::Relaxed) + 1,
            next_source: Arc::clone(&self.next_source),
        }
    }
}

impl RodioOutput {
    /// Spawn the playback thread. Device errors surface from `wait_ready`.
    pub fn open() -> Self {
        let (commands, receiver) = unbounded();
        let (ready_tx, ready) = watch::channel(ReadyState::Pending);

        thread::spawn(move || run_playback(receiver, ready_tx));

        Self {
            commands,
            ready,
            source: 0,
            next_source: Arc::new(AtomicU64::new(0)),
        }
    }

    fn send(&self, command: PlaybackCommand) -> Result<(), OutputError> {
        self.commands.send(command).map_err(|_| OutputError::Closed)
    }
}

impl AudioOutput for RodioOutput {
    fn wait_ready(&mut self) -> impl Future<Output = Result<(), OutputError>> + Send {
        let mut ready = self.ready.clone();
        async move {
            let state = ready
                .wait_for(|state| !matches!(state, ReadyState::Pending))
                .await
                .map_err(|_| OutputError::Closed)?
                .clone();
            match state {
                ReadyState::Ready => Ok(()),
                ReadyState::Failed(e) => Err(e),
                ReadyState::Pending => Err(OutputError::NotReady("still starting".to_string())),
            }
        }
    }

    fn trigger_tone(&mut self, tone: ToneTrigger) -> Result<(), OutputError> {
        self.send(PlaybackCommand::Tone(self.source, tone))
    }

    fn trigger_drum_hit(&mut self, hit: DrumHit) -> Result<(), OutputError> {
        self.send(PlaybackCommand::Drum(self.source, hit))
    }

    fn cancel_pending(&mut self) {
        if self.send(PlaybackCommand::Cancel(self.source)).is_err() {
            log::warn!("Playback thread gone; nothing to cancel");
        }
    }

    fn close(&mut self) {
        let _ = self.send(PlaybackCommand::Close);
    }
}

fn run_playback(commands: Receiver<PlaybackCommand>, ready: watch::Sender<ReadyState>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("Failed to open output device: {}", e);
            ready.send_replace(ReadyState::Failed(OutputError::NoOutputDevice));
            return;
        }
    };
    ready.send_replace(ReadyState::Ready);
    log::info!("Audio output ready");

    let mut sinks: Vec<(SourceId, Sink)> = Vec::new();

    for command in commands.iter() {
        sinks.retain(|(_, sink)| !sink.empty());

        let (source, result) = match command {
            PlaybackCommand::Tone(source, tone) => (source, play_tone(&handle, &tone)),
            PlaybackCommand::Drum(source, hit) => (source, play_drum(&handle, &hit)),
            PlaybackCommand::Cancel(source) => {
                stop_source(&mut sinks, source);
                continue;
            }
            PlaybackCommand::Close => break,
        };

        match result {
            Ok(sink) => sinks.push((source, sink)),
            Err(e) => log::warn!("Dropped trigger: {}", e),
        }
    }

    for (_, sink) in sinks {
        sink.stop();
    }
    log::info!("Audio output closed");
}

/// Stop and forget every sink started by `source`
fn stop_source<S: Stoppable>(sinks: &mut Vec<(SourceId, S)>, source: SourceId) {
    sinks.retain(|(from, sink)| {
        if *from == source {
            sink.stop();
            false
        } else {
            true
        }
    });
}

trait Stoppable {
    fn stop(&self);
}

impl Stoppable for Sink {
    fn stop(&self) {
        Sink::stop(self);
    }
}

fn delay_of(delay_ms: f64) -> Duration {
    Duration::from_secs_f64(delay_ms.max(0.0) / 1000.0)
}

fn play_tone(handle: &OutputStreamHandle, tone: &ToneTrigger) -> Result<Sink, OutputError> {
    let sink = Sink::try_new(handle).map_err(|e| OutputError::TriggerFailed(e.to_string()))?;
    let source = SineWave::new(tone.frequency_hz)
        .take_duration(Duration::from_secs_f64(tone.duration_ms.max(0.0) / 1000.0))
        .fade_in(Duration::from_millis(5))
        .amplify(tone.gain * 0.3)
        .delay(delay_of(tone.delay_ms));
    sink.append(source);
    Ok(sink)
}

fn play_drum(handle: &OutputStreamHandle, hit: &DrumHit) -> Result<Sink, OutputError> {
    let sink = Sink::try_new(handle).map_err(|e| OutputError::TriggerFailed(e.to_string()))?;
    let buffer = SamplesBuffer::new(1, DRUM_SAMPLE_RATE, drum_samples(hit.kind, DRUM_SAMPLE_RATE));
    sink.append(buffer.amplify(hit.gain).delay(delay_of(hit.delay_ms)));
    Ok(sink)
}

/// One-shot drum voice: pitched sweep for the kick, noise plus body for
/// the snare, short filtered noise for the hi-hat
pub fn drum_samples(kind: DrumKind, sample_rate: u32) -> Vec<f32> {
    let rate = sample_rate as f32;
    let samples_for = |ms: usize| sample_rate as usize * ms / 1000;
    let mut rng = rand::rng();

    match kind {
        DrumKind::Kick => {
            let len = samples_for(250);
            let mut phase = 0.0f32;
            (0..len)
                .map(|i| {
                    let t = i as f32 / rate;
                    let frequency = 45.0 + 75.0 * (-t * 30.0).exp();
                    phase += 2.0 * PI * frequency / rate;
                    phase.sin() * (-t * 12.0).exp() * 0.9
                })
                .collect()
        }
        DrumKind::Snare => {
            let len = samples_for(180);
            (0..len)
                .map(|i| {
                    let t = i as f32 / rate;
                    let body = (2.0 * PI * 180.0 * t).sin() * (-t * 30.0).exp() * 0.5;
                    let noise = rng.random_range(-1.0f32..1.0) * (-t * 20.0).exp() * 0.5;
                    body + noise
                })
                .collect()
        }
        DrumKind::Hihat => {
            let len = samples_for(50);
            let mut previous = 0.0f32;
            (0..len)
                .map(|i| {
                    let t = i as f32 / rate;
                    let noise = rng.random_range(-1.0f32..1.0);
                    // First difference keeps the top end
                    let bright = (noise - previous) * 0.5;
                    previous = noise;
                    bright * (-t * 80.0).exp() * 0.4
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeSink {
        stops: Rc<Cell<u32>>,
    }

    impl Stoppable for FakeSink {
        fn stop(&self) {
            self.stops.set(self.stops.get() + 1);
        }
    }

    #[test]
    fn test_cancel_only_stops_own_source() {
        let stops = Rc::new(Cell::new(0));
        let mut sinks: Vec<(SourceId, FakeSink)> = (0..4)
            .map(|i| {
                let sink = FakeSink {
                    stops: Rc::clone(&stops),
                };
                (i % 2, sink)
            })
            .collect();

        stop_source(&mut sinks, 1);

        assert_eq!(stops.get(), 2);
        assert_eq!(sinks.len(), 2);
        assert!(sinks.iter().all(|(source, _)| *source == 0));
    }

    #[test]
    fn test_clones_are_separate_sources() {
        let output = RodioOutput::open();
        let first = output.clone();
        let second = output.clone();

        assert_ne!(output.source, first.source);
        assert_ne!(first.source, second.source);
        assert_ne!(output.source, second.source);
    }

    #[test]
    fn test_drum_lengths() {
        assert_eq!(drum_samples(DrumKind::Kick, 44100).len(), 11025);
        assert_eq!(drum_samples(DrumKind::Snare, 44100).len(), 7938);
        assert_eq!(drum_samples(DrumKind::Hihat, 44100).len(), 2205);
    }

    #[test]
    fn test_drums_stay_in_range_and_decay() {
        for kind in DrumKind::ALL {
            let samples = drum_samples(kind, 44100);
            assert!(samples.iter().all(|s| s.abs() <= 1.0));

            let tail = &samples[samples.len() * 9 / 10..];
            let peak_tail = tail.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(peak_tail < 0.2, "{:?} tail too loud: {}", kind, peak_tail);
        }
    }
}
