// Audio boundary
// Frames in (microphone, WAV), triggers out (output capability, rodio)

pub mod capture;
pub mod frame;
pub mod ingest;
pub mod output;
pub mod playback;

pub use capture::{acquire_microphone_stream, CaptureError, FrameAccumulator, MicrophoneStream};
pub use frame::{downmix, AudioFrame, FrameSource};
pub use ingest::{
    ingest_wav, ingest_wav_file, ingest_wav_reader, AudioData, AudioError, WavFrameSource,
};
pub use output::{AudioOutput, DrumHit, DrumKind, OutputError, ToneTrigger};
pub use playback::{drum_samples, RodioOutput};
