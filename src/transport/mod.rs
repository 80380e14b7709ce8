// Transport - Beat-synchronized backing track and metronome
// A pure scheduler driven by any clock, plus a tokio driver for real time

pub mod driver;
pub mod scheduler;

pub use driver::{spawn_transport, TransportHandle, DEFAULT_TICK_INTERVAL};
pub use scheduler::{
    BeatScheduler, PlaybackMode, SchedulerError, TransportConfig, TransportMode, TransportState,
    DEFAULT_LOOKAHEAD_MS,
};
