//! Parameter definitions with physical units and documented semantics.
//!
//! One configuration value type, owned by the application and passed
//! explicitly to the audio and rendering components; derived render state
//! (layer count, continuity caches) lives with those components instead.

mod audio;
mod render;
mod visual;

use thiserror::Error;

// Re-export all types
pub use audio::{audio_constants, AudioParams};
pub use render::{RecordingConfig, RenderConfig};
pub use visual::{InterpolationSpace, VisualParams};

/// Invalid configuration, rejected at the point of use
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("analysis window size must be a power of two >= 2, got {0}")]
    AnalysisWindowSize(usize),

    #[error("base frequency must be a positive finite Hz value, got {0}")]
    BaseFrequency(f32),

    #[error("sample rate must be non-zero")]
    SampleRate,

    #[error("configuration yields zero period layers")]
    NoLayers,
}

/// Runtime settings shared by the audio source manager and the visualizer
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub audio: AudioParams,
    pub visual: VisualParams,
    pub render: RenderConfig,
}

impl Config {
    /// Validate all parameter groups
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.audio.validate()
    }
}
