// Beat Scheduler - Lookahead transport for backing tracks and the metronome
// Triggers are sent ahead of their due time; beat positions fire when due

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::arranger::{build_measure, build_metronome_measure, Genre, TriggerEvent, TriggerKind};
use crate::audio::output::{AudioOutput, DrumHit, OutputError, ToneTrigger};
use crate::groove::grid::{BeatPosition, StepResolution, TempoClock, TimeSignature};
use crate::music::{midi_to_frequency, ChordSymbol};
use crate::render::mixer::{Channel, ChannelMixer, ChannelVolumes};

/// How far ahead of the clock triggers are handed to the output
pub const DEFAULT_LOOKAHEAD_MS: f64 = 100.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(OutputError),

    #[error("Chord progression is empty")]
    EmptyProgression,

    #[error("Transport task failed: {0}")]
    TaskFailed(String),
}

/// Whether a run stops after its measures or repeats until stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Jam along until stopped
    Loop,

    /// Play the measures once, then stop
    OneShot,
}

impl Default for PlaybackMode {
    fn default() -> Self {
        PlaybackMode::Loop
    }
}

/// What the transport plays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TransportMode {
    /// Drums, bass and strummed chords over a progression
    BackingTrack {
        genre: Genre,
        progression: Vec<ChordSymbol>,
    },

    /// Accented clicks only
    Metronome,
}

impl TransportMode {
    pub fn resolution(&self) -> StepResolution {
        match self {
            TransportMode::BackingTrack { .. } => StepResolution::Sixteenth,
            TransportMode::Metronome => StepResolution::Quarter,
        }
    }

    fn progression_len(&self) -> usize {
        match self {
            TransportMode::BackingTrack { progression, .. } => progression.len(),
            TransportMode::Metronome => 1,
        }
    }
}

/// Everything needed to run a transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub bpm: f64,
    pub time_signature: TimeSignature,
    pub playback: PlaybackMode,

    /// Measures in a one-shot run; one pass of the progression when unset
    pub measures: Option<u32>,

    pub volumes: ChannelVolumes,
    pub lookahead_ms: f64,
}

impl TransportConfig {
    /// Looping 4/4 backing track with default volumes
    pub fn backing_track(genre: Genre, progression: Vec<ChordSymbol>, bpm: f64) -> Self {
        Self {
            mode: TransportMode::BackingTrack { genre, progression },
            bpm,
            time_signature: TimeSignature::FourFour,
            playback: PlaybackMode::Loop,
            measures: None,
            volumes: ChannelVolumes::default(),
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
        }
    }

    pub fn metronome(bpm: f64, time_signature: TimeSignature) -> Self {
        Self {
            mode: TransportMode::Metronome,
            bpm,
            time_signature,
            playback: PlaybackMode::Loop,
            measures: None,
            volumes: ChannelVolumes::default(),
            lookahead_ms: DEFAULT_LOOKAHEAD_MS,
        }
    }

    pub fn with_playback(mut self, playback: PlaybackMode) -> Self {
        self.playback = playback;
        self
    }

    /// Measures played before a one-shot run stops
    pub fn measure_count(&self) -> u64 {
        self.measures
            .map(u64::from)
            .unwrap_or(self.mode.progression_len() as u64)
            .max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportState {
    Idle,
    Running,
}

type BeatCallback = Box<dyn FnMut(BeatPosition) + Send>;
type StoppedCallback = Box<dyn FnMut() + Send>;

/// Tempo-locked trigger scheduler.
///
/// Drive it with `tick(now_ms)` from any clock: a tokio interval, an
/// animation loop, or a test's manual time. Every step due before
/// `now_ms + lookahead_ms` is sent to the output with its delay; beat
/// positions are reported only once their time has actually come.
pub struct BeatScheduler<O: AudioOutput> {
    output: O,
    config: TransportConfig,
    clock: TempoClock,
    mixer: ChannelMixer,
    state: TransportState,

    /// Next step to send, counted from start
    next_step: u64,
    next_step_at_ms: f64,
    last_step_at_ms: f64,

    /// Due times of beats sent but not yet reported
    pending_beats: VecDeque<f64>,

    /// Triggers of the measure currently being sent
    measure: Option<(u64, Vec<TriggerEvent>)>,

    on_beat: Option<BeatCallback>,
    on_stopped: Option<StoppedCallback>,
}

impl<O: AudioOutput> BeatScheduler<O> {
    pub fn new(config: TransportConfig, output: O) -> Result<Self, SchedulerError> {
        if config.mode.progression_len() == 0 {
            return Err(SchedulerError::EmptyProgression);
        }

        let clock = TempoClock::new(
            config.bpm,
            config.time_signature.beats_per_measure(),
            config.mode.progression_len(),
        );
        let mut config = config;
        config.bpm = clock.bpm();

        Ok(Self {
            output,
            mixer: ChannelMixer::new(config.volumes),
            config,
            clock,
            state: TransportState::Idle,
            next_step: 0,
            next_step_at_ms: 0.0,
            last_step_at_ms: 0.0,
            pending_beats: VecDeque::new(),
            measure: None,
            on_beat: None,
            on_stopped: None,
        })
    }

    /// Called on start with beat 0, then on every beat as it comes due
    pub fn on_beat_tick<F>(&mut self, callback: F)
    where
        F: FnMut(BeatPosition) + Send + 'static,
    {
        self.on_beat = Some(Box::new(callback));
    }

    /// Called whenever a running transport returns to idle
    pub fn on_stopped<F>(&mut self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.on_stopped = Some(Box::new(callback));
    }

    /// Wait for the output, then start from beat 0.
    ///
    /// `now` is read after the output is ready and becomes the time of the
    /// first downbeat. Starting a running transport does nothing.
    pub async fn start<F>(&mut self, now: F) -> Result<(), SchedulerError>
    where
        F: FnOnce() -> f64 + Send,
    {
        if self.state == TransportState::Running {
            return Ok(());
        }

        if let Err(e) = self.output.wait_ready().await {
            log::error!("Transport not started: {}", e);
            return Err(SchedulerError::OutputUnavailable(e));
        }

        let now_ms = now();
        self.reset_position(now_ms);
        self.state = TransportState::Running;
        log::info!(
            "Transport started: {} BPM, {}, {:?}",
            self.clock.bpm(),
            self.config.time_signature,
            self.config.playback
        );

        let position = self.clock.position();
        self.emit_beat(position);
        self.schedule_ahead(now_ms);
        Ok(())
    }

    /// Advance the transport to `now_ms`. Returns false once idle.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if self.state == TransportState::Idle {
            return false;
        }

        self.schedule_ahead(now_ms);

        while let Some(&due_ms) = self.pending_beats.front() {
            if due_ms > now_ms {
                break;
            }
            self.pending_beats.pop_front();
            let position = self.clock.advance();
            self.emit_beat(position);
        }

        if self.one_shot_finished(now_ms) {
            log::info!(
                "One-shot run finished after {} measures",
                self.config.measure_count()
            );
            self.stop();
            return false;
        }

        true
    }

    /// Cancel everything pending and return to beat 0. Safe to repeat.
    pub fn stop(&mut self) {
        if self.state == TransportState::Idle {
            return;
        }

        self.output.cancel_pending();
        self.state = TransportState::Idle;
        self.reset_position(0.0);
        log::info!("Transport stopped");

        if let Some(callback) = self.on_stopped.as_mut() {
            callback();
        }
    }

    /// Change tempo live; returns the clamped value.
    ///
    /// Steps already sent keep their times. The next unsent step lands one
    /// new step length after the last sent one.
    pub fn set_bpm(&mut self, bpm: f64) -> f64 {
        let previous = self.clock.bpm();
        let bpm = self.clock.set_bpm(bpm);
        self.config.bpm = bpm;

        if self.state == TransportState::Running && self.next_step > 0 {
            self.next_step_at_ms = self.last_step_at_ms + self.step_duration_ms();
        }

        log::info!("Tempo changed: {} -> {} BPM", previous, bpm);
        bpm
    }

    pub fn set_volume(&mut self, channel: Channel, volume: u8) {
        self.mixer.set_volume(channel, volume);
        self.config.volumes = self.mixer.volumes();
    }

    pub fn set_muted(&mut self, channel: Channel, muted: bool) {
        self.mixer.set_muted(channel, muted);
    }

    pub fn toggle_mute(&mut self, channel: Channel) -> bool {
        self.mixer.toggle_mute(channel)
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    /// Last reported position
    pub fn position(&self) -> BeatPosition {
        self.clock.position()
    }

    pub fn bpm(&self) -> f64 {
        self.clock.bpm()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn mixer(&self) -> &ChannelMixer {
        &self.mixer
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn into_output(self) -> O {
        self.output
    }

    fn resolution(&self) -> StepResolution {
        self.config.mode.resolution()
    }

    fn step_duration_ms(&self) -> f64 {
        self.resolution().step_duration_ms(self.clock.bpm())
    }

    fn steps_per_measure(&self) -> u64 {
        (self.clock.beats_per_measure() * self.resolution().steps_per_beat()) as u64
    }

    /// Steps in a one-shot run; None when looping
    fn total_steps(&self) -> Option<u64> {
        match self.config.playback {
            PlaybackMode::Loop => None,
            PlaybackMode::OneShot => Some(self.config.measure_count() * self.steps_per_measure()),
        }
    }

    fn one_shot_finished(&self, now_ms: f64) -> bool {
        self.total_steps().is_some_and(|total| self.next_step >= total)
            && self.pending_beats.is_empty()
            && now_ms >= self.next_step_at_ms
    }

    fn reset_position(&mut self, origin_ms: f64) {
        self.clock.reset();
        self.next_step = 0;
        self.next_step_at_ms = origin_ms;
        self.last_step_at_ms = origin_ms;
        self.pending_beats.clear();
        self.measure = None;
    }

    fn emit_beat(&mut self, position: BeatPosition) {
        if let Some(callback) = self.on_beat.as_mut() {
            callback(position);
        }
    }

    fn schedule_ahead(&mut self, now_ms: f64) {
        let horizon_ms = now_ms + self.config.lookahead_ms.max(0.0);
        let steps_per_beat = self.resolution().steps_per_beat() as u64;

        while self.next_step_at_ms <= horizon_ms {
            if self.total_steps().is_some_and(|total| self.next_step >= total) {
                break;
            }

            let step = self.next_step;
            let at_ms = self.next_step_at_ms;

            // Beat 0 is reported by start()
            if step > 0 && step % steps_per_beat == 0 {
                self.pending_beats.push_back(at_ms);
            }
            self.dispatch_step(step, at_ms, now_ms);

            self.last_step_at_ms = at_ms;
            self.next_step += 1;
            self.next_step_at_ms = at_ms + self.step_duration_ms();
        }
    }

    fn dispatch_step(&mut self, step: u64, at_ms: f64, now_ms: f64) {
        let steps_per_measure = self.steps_per_measure();
        let measure = step / steps_per_measure;
        let step_in_measure = (step % steps_per_measure) as u32;

        let due: Vec<TriggerEvent> = self
            .measure_events(measure)
            .iter()
            .filter(|event| event.step == step_in_measure)
            .copied()
            .collect();

        for event in due {
            self.trigger(event, at_ms, now_ms);
        }
    }

    fn measure_events(&mut self, measure: u64) -> &[TriggerEvent] {
        let cached = matches!(&self.measure, Some((index, _)) if *index == measure);
        if !cached {
            let beats = self.clock.beats_per_measure();
            let events = match &self.config.mode {
                TransportMode::BackingTrack { genre, progression } => {
                    let index = (measure % progression.len() as u64) as usize;
                    progression
                        .get(index)
                        .map(|chord| build_measure(*genre, chord, beats))
                        .unwrap_or_default()
                }
                TransportMode::Metronome => build_metronome_measure(beats),
            };
            self.measure = Some((measure, events));
        }

        self.measure
            .as_ref()
            .map(|(_, events)| events.as_slice())
            .unwrap_or(&[])
    }

    fn trigger(&mut self, event: TriggerEvent, step_at_ms: f64, now_ms: f64) {
        let channel = event.channel();
        let gain = self.mixer.gain(channel);
        if gain <= 0.0 {
            return;
        }

        let beat_ms = self.clock.beat_duration_ms();
        let tone = |frequency_hz: f32, midi: Option<i32>, duration_beats: f64, at_ms: f64| {
            ToneTrigger {
                frequency_hz,
                midi,
                duration_ms: duration_beats * beat_ms,
                at_ms,
                delay_ms: (at_ms - now_ms).max(0.0),
                gain,
            }
        };

        let result = match event.kind {
            TriggerKind::Drum(kind) => self.output.trigger_drum_hit(DrumHit {
                kind,
                at_ms: step_at_ms,
                delay_ms: (step_at_ms - now_ms).max(0.0),
                gain,
            }),
            TriggerKind::Bass { midi, duration_beats } => self.output.trigger_tone(tone(
                midi_to_frequency(midi),
                Some(midi),
                duration_beats,
                step_at_ms,
            )),
            TriggerKind::Strum {
                midi,
                offset_ms,
                duration_beats,
            } => self.output.trigger_tone(tone(
                midi_to_frequency(midi),
                Some(midi),
                duration_beats,
                step_at_ms + offset_ms,
            )),
            TriggerKind::Click {
                frequency_hz,
                duration_beats,
                ..
            } => self
                .output
                .trigger_tone(tone(frequency_hz, None, duration_beats, step_at_ms)),
        };

        if let Err(e) = result {
            log::warn!("Skipped {:?} trigger at {:.1} ms: {}", channel, step_at_ms, e);
        }
    }
}
