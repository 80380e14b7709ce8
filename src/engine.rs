// Audio Engine - Explicit owner of the output and shared settings
// Builds detectors, tuners and transports; disposed with shutdown()

use thiserror::Error;

use crate::audio::output::{AudioOutput, OutputError, ToneTrigger};
use crate::audio::playback::RodioOutput;
use crate::config::{ConfigError, DetectorConfig, TrackSettings, TunerConfig};
use crate::detector::{ChordDetector, GuitarString, Tuner};
use crate::groove::grid::TimeSignature;
use crate::music::midi_to_frequency;
use crate::practice::EarTrainingQuestion;
use crate::transport::{BeatScheduler, SchedulerError, TransportConfig};

/// Length of a fretboard note or chord preview
pub const NOTE_PREVIEW_MS: f64 = 2000.0;

const PREVIEW_GAIN: f32 = 0.8;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Shared audio context.
///
/// Every transport built here plays through its own clone of the output, so
/// stopping one transport leaves the others sounding. `shutdown` closes the
/// device for all of them.
pub struct AudioEngine<O: AudioOutput + Clone> {
    output: O,
    detector_config: DetectorConfig,
    tuner_config: TunerConfig,
}

impl AudioEngine<RodioOutput> {
    /// Engine on the default output device
    pub fn with_default_output() -> Self {
        Self::new(RodioOutput::open())
    }
}

impl<O: AudioOutput + Clone> AudioEngine<O> {
    pub fn new(output: O) -> Self {
        Self::with_config(output, DetectorConfig::default(), TunerConfig::default())
    }

    pub fn with_config(
        output: O,
        detector_config: DetectorConfig,
        tuner_config: TunerConfig,
    ) -> Self {
        log::info!("Audio engine created");
        Self {
            output,
            detector_config,
            tuner_config,
        }
    }

    pub fn detector_config(&self) -> &DetectorConfig {
        &self.detector_config
    }

    pub fn tuner_config(&self) -> &TunerConfig {
        &self.tuner_config
    }

    /// Fresh chord-recognition session
    pub fn detector(&self) -> ChordDetector {
        ChordDetector::new(self.detector_config.clone())
    }

    pub fn tuner(&self) -> Tuner {
        Tuner::new(self.tuner_config.clone())
    }

    /// Backing track from UI settings, idle until started
    pub fn backing_track(
        &self,
        settings: TrackSettings,
    ) -> Result<BeatScheduler<O>, EngineError> {
        let config = settings.into_transport_config()?;
        Ok(self.transport(config)?)
    }

    pub fn metronome(
        &self,
        bpm: f64,
        time_signature: TimeSignature,
    ) -> Result<BeatScheduler<O>, EngineError> {
        Ok(self.transport(TransportConfig::metronome(bpm, time_signature))?)
    }

    pub fn transport(&self, config: TransportConfig) -> Result<BeatScheduler<O>, SchedulerError> {
        BeatScheduler::new(config, self.output.clone())
    }

    /// Play the open-string reference pitch
    pub async fn play_reference_tone(
        &mut self,
        string: &GuitarString,
        now_ms: f64,
    ) -> Result<(), EngineError> {
        self.output.wait_ready().await?;
        let tone = self.tuner().reference_tone(string, now_ms);
        self.output.trigger_tone(tone)?;
        Ok(())
    }

    /// Play an ear-training question
    pub async fn play_question(
        &mut self,
        question: &EarTrainingQuestion,
        now_ms: f64,
    ) -> Result<(), EngineError> {
        self.output.wait_ready().await?;
        for tone in question.playback(now_ms) {
            self.output.trigger_tone(tone)?;
        }
        Ok(())
    }

    /// Sound one fretboard note for two seconds
    pub async fn play_note(&mut self, midi: i32, now_ms: f64) -> Result<(), EngineError> {
        self.play_chord(&[midi], now_ms).await
    }

    /// Sound every note of a chord together for two seconds
    pub async fn play_chord(&mut self, midi_notes: &[i32], now_ms: f64) -> Result<(), EngineError> {
        self.output.wait_ready().await?;
        log::debug!("Previewing notes {:?}", midi_notes);
        for &midi in midi_notes {
            self.output.trigger_tone(ToneTrigger {
                frequency_hz: midi_to_frequency(midi),
                midi: Some(midi),
                duration_ms: NOTE_PREVIEW_MS,
                at_ms: now_ms,
                delay_ms: 0.0,
                gain: PREVIEW_GAIN,
            })?;
        }
        Ok(())
    }

    /// Silence everything and release the output
    pub fn shutdown(mut self) {
        self.output.cancel_pending();
        self.output.close();
        log::info!("Audio engine shut down");
    }
}
