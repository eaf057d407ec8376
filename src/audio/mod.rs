//! Audio sources, analysis tap, and output plumbing.

mod decode;
mod livecode;
mod manager;
mod output;
mod sources;
mod tap;

use thiserror::Error;

// Re-export all types
pub use decode::{decode_wav, DecodedAudio};
pub use livecode::{GlicolEngine, LiveCodeEngine, LiveCodeShared, DEFAULT_COMPOSITION};
pub use manager::AudioSourceManager;
pub use output::{start_stream, OutputStream, WavRecorder};
pub use sources::{FileBuffer, Oscillator, SourceGraph, WaveShape};
pub use tap::AnalysisTap;

/// Audio-side failures: device setup, decoding, live-code evaluation
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoOutputDevice,

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to decode audio file: {0}")]
    Decode(#[from] hound::Error),

    #[error("live-coding engine rejected the program: {0}")]
    LiveCode(String),
}
