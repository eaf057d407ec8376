//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use palette::Oklch;

use crate::audio::WaveShape;
use crate::params::{Config, RecordingConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Spirascope")]
#[command(about = "Phase-continuous polar oscilloscope", long_about = None)]
pub struct Args {
    /// WAV file to play and visualize
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Glicol program file for the live-coding engine
    #[arg(long, value_name = "PATH")]
    pub code: Option<PathBuf>,

    /// Start the live-coding engine with the bundled demo program
    #[arg(long)]
    pub live: bool,

    /// Oscillator wave shape: sine, square, sawtooth, triangle
    #[arg(long, value_name = "SHAPE", default_value = "sine")]
    pub wave: String,

    /// Oscillator frequency (Hz); defaults to the base frequency
    #[arg(long, value_name = "HZ")]
    pub frequency: Option<f32>,

    /// Base frequency defining the period layer split (Hz)
    #[arg(long, value_name = "HZ")]
    pub base_frequency: Option<f32>,

    /// Gradient start as Oklch "L,C,H" components
    #[arg(long, value_name = "L,C,H")]
    pub gradient_start: Option<String>,

    /// Gradient end as Oklch "L,C,H" components
    #[arg(long, value_name = "L,C,H")]
    pub gradient_end: Option<String>,

    /// Record the session to PNG frames and WAV (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,
}

impl Args {
    /// Parse the oscillator wave shape from command-line arguments
    pub fn parse_wave_shape(&self) -> WaveShape {
        match WaveShape::parse(&self.wave) {
            Some(shape) => shape,
            None => {
                eprintln!("Warning: unknown wave shape '{}', using sine", self.wave);
                WaveShape::Sine
            }
        }
    }

    /// Fold argument overrides into the configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(hz) = self.base_frequency {
            config.audio.base_frequency = hz;
        }
        if let Some(text) = self.gradient_start.as_deref() {
            match parse_oklch(text) {
                Some(color) => config.visual.gradient_start = color,
                None => eprintln!("Warning: could not parse --gradient-start, keeping default"),
            }
        }
        if let Some(text) = self.gradient_end.as_deref() {
            match parse_oklch(text) {
                Some(color) => config.visual.gradient_end = color,
                None => eprintln!("Warning: could not parse --gradient-end, keeping default"),
            }
        }
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> Option<RecordingConfig> {
        self.record.map(|duration| {
            let config = RecordingConfig::new(duration);

            // Create output directories
            std::fs::create_dir_all(config.frames_dir())
                .expect("Failed to create frames directory");
            std::fs::create_dir_all(&config.output_dir).expect("Failed to create output directory");

            config
        })
    }
}

fn parse_oklch(text: &str) -> Option<Oklch> {
    let parts: Vec<f32> = text
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    if parts.len() != 3 {
        return None;
    }
    Some(Oklch::new(parts[0], parts[1], parts[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_oklch_triples() {
        let color = parse_oklch("0.5, 0.3, 290").unwrap();
        assert_eq!(color.l, 0.5);
        assert_eq!(color.chroma, 0.3);
    }

    #[test]
    fn rejects_malformed_oklch() {
        assert!(parse_oklch("0.5, 0.3").is_none());
        assert!(parse_oklch("a, b, c").is_none());
        assert!(parse_oklch("0.5, 0.3, 290, 1.0").is_none());
    }

    #[test]
    fn overrides_land_in_config() {
        let args = Args::parse_from([
            "spirascope",
            "--base-frequency",
            "220",
            "--gradient-start",
            "0.6,0.2,120",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.audio.base_frequency, 220.0);
        assert_eq!(config.visual.gradient_start.l, 0.6);
    }

    #[test]
    fn unknown_wave_shape_falls_back_to_sine() {
        let args = Args::parse_from(["spirascope", "--wave", "noise"]);
        assert_eq!(args.parse_wave_shape(), WaveShape::Sine);
    }
}
