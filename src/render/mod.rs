// Render - Channel gain staging for the backing track
// Synthesis itself lives behind the audio output trait

pub mod mixer;

pub use mixer::{volume_to_db, volume_to_gain, Channel, ChannelMixer, ChannelVolumes, MAX_VOLUME};
