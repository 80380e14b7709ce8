// Transport Driver - Runs a scheduler on a tokio interval
// Live controls reach the running task over a command channel

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};

use super::scheduler::{BeatScheduler, SchedulerError};
use crate::audio::output::AudioOutput;
use crate::render::mixer::Channel;

/// Default spacing between scheduler ticks
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq)]
enum TransportCommand {
    SetBpm(f64),
    SetVolume(Channel, u8),
    SetMuted(Channel, bool),
    ToggleMute(Channel),
    Stop,
}

/// Control handle for a running transport task
pub struct TransportHandle<O: AudioOutput> {
    commands: mpsc::UnboundedSender<TransportCommand>,
    task: JoinHandle<BeatScheduler<O>>,
}

impl<O: AudioOutput + 'static> TransportHandle<O> {
    pub fn set_bpm(&self, bpm: f64) {
        self.send(TransportCommand::SetBpm(bpm));
    }

    pub fn set_volume(&self, channel: Channel, volume: u8) {
        self.send(TransportCommand::SetVolume(channel, volume));
    }

    pub fn set_muted(&self, channel: Channel, muted: bool) {
        self.send(TransportCommand::SetMuted(channel, muted));
    }

    pub fn toggle_mute(&self, channel: Channel) {
        self.send(TransportCommand::ToggleMute(channel));
    }

    /// True once the task has exited, after a one-shot run or a stop
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop playback and hand the scheduler back.
    /// Also fine after the transport stopped on its own.
    pub async fn stop(self) -> Result<BeatScheduler<O>, SchedulerError> {
        // The task may already be gone after an auto-stop
        let _ = self.commands.send(TransportCommand::Stop);
        self.task
            .await
            .map_err(|e| SchedulerError::TaskFailed(e.to_string()))
    }

    fn send(&self, command: TransportCommand) {
        if self.commands.send(command).is_err() {
            log::debug!("Transport already finished; ignoring {:?}", command);
        }
    }
}

/// Start `scheduler` and keep ticking it every `tick_interval`.
///
/// Returns once the output is ready and the first downbeat has been sent.
pub async fn spawn_transport<O>(
    mut scheduler: BeatScheduler<O>,
    tick_interval: Duration,
) -> Result<TransportHandle<O>, SchedulerError>
where
    O: AudioOutput + 'static,
{
    let origin = Instant::now();
    let now_ms = move || origin.elapsed().as_secs_f64() * 1000.0;

    scheduler.start(now_ms).await?;

    let (commands, mut receiver) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        let mut ticker = interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !scheduler.tick(now_ms()) {
                        break;
                    }
                }
                command = receiver.recv() => {
                    match command {
                        Some(TransportCommand::SetBpm(bpm)) => {
                            scheduler.set_bpm(bpm);
                        }
                        Some(TransportCommand::SetVolume(channel, volume)) => {
                            scheduler.set_volume(channel, volume);
                        }
                        Some(TransportCommand::SetMuted(channel, muted)) => {
                            scheduler.set_muted(channel, muted);
                        }
                        Some(TransportCommand::ToggleMute(channel)) => {
                            scheduler.toggle_mute(channel);
                        }
                        Some(TransportCommand::Stop) | None => {
                            scheduler.stop();
                            break;
                        }
                    }
                }
            }
        }

        scheduler
    });

    Ok(TransportHandle { commands, task })
}
