//! Audio timing configuration: sample rate, analysis window, base frequency.

use std::time::Duration;

use super::ConfigError;

/// Base frequency above which the analysis window steps down (Hz)
const WINDOW_STEP_FREQUENCY_HZ: f32 = 110.0;

/// Smallest analysis window the adaptive stepping will shrink to (samples)
const ADAPTIVE_WINDOW_MIN: usize = 1024;

/// Largest analysis window the adaptive stepping will grow to (samples)
const ADAPTIVE_WINDOW_MAX: usize = 2048;

/// Timing parameters shared by the audio graph and the renderer.
///
/// `sample_rate` and `base_frequency` together define the period: the repeat
/// unit in samples that splits the analysis window into concentric layers.
#[derive(Debug, Clone)]
pub struct AudioParams {
    /// Sample rate of the signal feeding the analysis tap (Hz).
    /// Updated to a decoded file's native rate when one is loaded.
    pub sample_rate: u32,

    /// Time-domain analysis window (samples, power of two >= 2)
    pub analysis_window_size: usize,

    /// Base frequency defining the period layer split (Hz)
    pub base_frequency: f32,

    /// Analyser smoothing time constant (0..=1, carried for tap parity;
    /// time-domain reads are unsmoothed)
    pub smoothing_time_constant: f32,

    /// Grace period before drawing from a freshly evaluated live-code
    /// engine, whose analysis taps appear asynchronously
    pub analyzer_wait_delay: Duration,
}

impl Default for AudioParams {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            analysis_window_size: 2048,
            base_frequency: 110.0,
            smoothing_time_constant: 1.0,
            analyzer_wait_delay: Duration::from_millis(300),
        }
    }
}

impl AudioParams {
    /// Samples per repetition of the base frequency
    pub fn samples_per_period(&self) -> f32 {
        self.sample_rate as f32 / self.base_frequency
    }

    /// Number of period layers covering the analysis window (always >= 1
    /// for a valid configuration)
    pub fn layer_count(&self) -> usize {
        (self.analysis_window_size as f32 / self.samples_per_period()).ceil() as usize
    }

    /// Set the base frequency, adapting the analysis window to keep the
    /// layer count in a drawable range: high base frequencies halve the
    /// window, low ones grow it back.
    pub fn set_base_frequency(&mut self, hz: f32) {
        self.base_frequency = hz;
        if hz > WINDOW_STEP_FREQUENCY_HZ && self.analysis_window_size > ADAPTIVE_WINDOW_MIN {
            self.analysis_window_size /= 2;
        }
        if hz <= WINDOW_STEP_FREQUENCY_HZ && self.analysis_window_size < ADAPTIVE_WINDOW_MAX {
            self.analysis_window_size *= 2;
        }
    }

    /// Validate timing parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis_window_size < 2 || !self.analysis_window_size.is_power_of_two() {
            return Err(ConfigError::AnalysisWindowSize(self.analysis_window_size));
        }
        if !(self.base_frequency.is_finite() && self.base_frequency > 0.0) {
            return Err(ConfigError::BaseFrequency(self.base_frequency));
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::SampleRate);
        }
        if self.layer_count() == 0 {
            return Err(ConfigError::NoLayers);
        }
        Ok(())
    }
}

/// Audio constants (compile-time, match the live-code engine setup)
pub mod audio_constants {
    /// Audio block size (samples per generated block)
    pub const BLOCK_SIZE: usize = 128;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn layer_count_from_defaults() {
        let params = AudioParams::default();

        // 44100 Hz / 110 Hz = 400.9 samples per period;
        // 2048-sample window => ceil(2048 / 400.9) = 6 layers
        assert_relative_eq!(params.samples_per_period(), 400.909, epsilon = 1e-3);
        assert_eq!(params.layer_count(), 6);
    }

    #[test]
    fn layer_count_follows_sample_rate() {
        let mut params = AudioParams::default();
        let before = params.layer_count();

        params.sample_rate = 48000;
        assert_eq!(params.layer_count(), 5);
        assert_ne!(params.layer_count(), before);
    }

    #[test]
    fn layer_count_is_at_least_one() {
        let params = AudioParams {
            base_frequency: 1.0, // period far longer than the window
            ..AudioParams::default()
        };
        assert_eq!(params.layer_count(), 1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two_window() {
        let params = AudioParams {
            analysis_window_size: 1000,
            ..AudioParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::AnalysisWindowSize(1000))
        ));
    }

    #[test]
    fn rejects_non_positive_base_frequency() {
        for bad in [0.0, -440.0, f32::NAN] {
            let params = AudioParams {
                base_frequency: bad,
                ..AudioParams::default()
            };
            assert!(params.validate().is_err());
        }
    }

    #[test]
    fn adaptive_window_steps_down_and_back_up() {
        let mut params = AudioParams::default();

        params.set_base_frequency(220.0);
        assert_eq!(params.analysis_window_size, 1024);

        // floor: a further increase must not shrink below the minimum
        params.set_base_frequency(440.0);
        assert_eq!(params.analysis_window_size, 1024);

        params.set_base_frequency(55.0);
        assert_eq!(params.analysis_window_size, 2048);

        // cap: a further decrease must not grow past the maximum
        params.set_base_frequency(27.5);
        assert_eq!(params.analysis_window_size, 2048);
    }
}
