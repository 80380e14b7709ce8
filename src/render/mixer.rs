// Channel Mixer - Per-channel volume and mute for the backing track
// Volumes are 0-100 sliders, turned into linear gain at trigger time

use serde::{Deserialize, Serialize};

/// Mixer channels of the backing track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Drum kit and metronome clicks
    Drums,
    Bass,

    /// Strummed chords
    Rhythm,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Drums, Channel::Bass, Channel::Rhythm];
}

/// Highest slider value
pub const MAX_VOLUME: u8 = 100;

/// Slider value (0-100) to decibels: 100 is 0 dB, each step is half a dB
pub fn volume_to_db(volume: u8) -> f32 {
    (volume.min(MAX_VOLUME) as f32 - MAX_VOLUME as f32) * 0.5
}

/// Slider value to linear gain; 0 is silent
pub fn volume_to_gain(volume: u8) -> f32 {
    if volume == 0 {
        return 0.0;
    }
    10f32.powf(volume_to_db(volume) / 20.0)
}

/// Channel volumes as loaded from track settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelVolumes {
    pub drums: u8,
    pub bass: u8,
    pub rhythm: u8,
}

impl Default for ChannelVolumes {
    fn default() -> Self {
        Self {
            drums: 80,
            bass: 70,
            rhythm: 50,
        }
    }
}

impl ChannelVolumes {
    pub fn get(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Drums => self.drums,
            Channel::Bass => self.bass,
            Channel::Rhythm => self.rhythm,
        }
    }

    fn slot(&mut self, channel: Channel) -> &mut u8 {
        match channel {
            Channel::Drums => &mut self.drums,
            Channel::Bass => &mut self.bass,
            Channel::Rhythm => &mut self.rhythm,
        }
    }
}

/// Live volume and mute state, owned by the transport
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelMixer {
    volumes: ChannelVolumes,
    muted: [bool; 3],
}

impl ChannelMixer {
    pub fn new(volumes: ChannelVolumes) -> Self {
        let mut mixer = Self {
            volumes: ChannelVolumes::default(),
            muted: [false; 3],
        };
        for channel in Channel::ALL {
            mixer.set_volume(channel, volumes.get(channel));
        }
        mixer
    }

    /// Set a channel slider; values above 100 are clamped
    pub fn set_volume(&mut self, channel: Channel, volume: u8) {
        *self.volumes.slot(channel) = volume.min(MAX_VOLUME);
    }

    pub fn volume(&self, channel: Channel) -> u8 {
        self.volumes.get(channel)
    }

    pub fn volumes(&self) -> ChannelVolumes {
        self.volumes
    }

    pub fn set_muted(&mut self, channel: Channel, muted: bool) {
        self.muted[channel as usize] = muted;
    }

    /// Flip mute; returns the new state
    pub fn toggle_mute(&mut self, channel: Channel) -> bool {
        let muted = !self.is_muted(channel);
        self.set_muted(channel, muted);
        muted
    }

    pub fn is_muted(&self, channel: Channel) -> bool {
        self.muted[channel as usize]
    }

    /// Linear gain for the next trigger on `channel`
    pub fn gain(&self, channel: Channel) -> f32 {
        if self.is_muted(channel) {
            0.0
        } else {
            volume_to_gain(self.volume(channel))
        }
    }
}
