//! Tone and file-buffer generators plus the graph that mixes them.

use std::f32::consts::TAU;

use super::decode::DecodedAudio;

/// Oscillator wave shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveShape {
    #[default]
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

impl WaveShape {
    /// Amplitude at `phase`, the cycle position in [0, 1)
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            WaveShape::Sine => (TAU * phase).sin(),
            WaveShape::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            WaveShape::Sawtooth => 2.0 * phase - 1.0,
            WaveShape::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sine" => Some(Self::Sine),
            "square" => Some(Self::Square),
            "sawtooth" | "saw" => Some(Self::Sawtooth),
            "triangle" => Some(Self::Triangle),
            _ => None,
        }
    }
}

/// One-shot tone generator.
///
/// Frequency and shape changes land on the next rendered block without a
/// restart; stopping discards the node, so a replacement starts from a
/// fresh phase.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub shape: WaveShape,
    frequency_hz: f32,
    phase: f32,
    pub active: bool,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(WaveShape::Sine, 110.0)
    }
}

impl Oscillator {
    pub fn new(shape: WaveShape, frequency_hz: f32) -> Self {
        Self {
            shape,
            frequency_hz,
            phase: 0.0,
            active: false,
        }
    }

    /// Scheduled parameter change: takes effect mid-stream, phase untouched
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency_hz = hz;
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let value = self.shape.sample(self.phase);
        self.phase = (self.phase + self.frequency_hz / sample_rate).fract();
        value
    }
}

/// One-shot playback cursor over a decoded audio buffer; silent past the
/// end (buffer sources do not loop)
#[derive(Debug, Clone, Default)]
pub struct FileBuffer {
    audio: Option<DecodedAudio>,
    cursor: usize,
    pub active: bool,
}

impl FileBuffer {
    /// Re-point the source at a freshly decoded buffer, rewinding playback
    pub fn set_audio(&mut self, audio: DecodedAudio) {
        self.audio = Some(audio);
        self.cursor = 0;
    }

    pub fn audio_sample_rate(&self) -> Option<u32> {
        self.audio.as_ref().map(|audio| audio.sample_rate)
    }

    fn next_sample(&mut self) -> f32 {
        let Some(audio) = &self.audio else {
            return 0.0;
        };
        let value = audio.samples.get(self.cursor).copied().unwrap_or(0.0);
        if self.cursor < audio.samples.len() {
            self.cursor += 1;
        }
        value
    }
}

/// The mixing point every owned generator connects into.
///
/// Mutated by the manager on the control thread, rendered by the output
/// callback; the lock is held only for the duration of one block.
#[derive(Debug)]
pub struct SourceGraph {
    pub oscillator: Oscillator,
    pub file: FileBuffer,
    sample_rate: u32,
}

impl SourceGraph {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            oscillator: Oscillator::default(),
            file: FileBuffer::default(),
            sample_rate,
        }
    }

    /// Fill a mono block from whichever sources are active
    pub fn render(&mut self, out: &mut [f32]) {
        let sample_rate = self.sample_rate as f32;
        for slot in out.iter_mut() {
            let mut mix = 0.0;
            if self.oscillator.active {
                mix += self.oscillator.next_sample(sample_rate);
            }
            if self.file.active {
                mix += self.file.next_sample();
            }
            *slot = mix.clamp(-1.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inactive_graph_renders_silence() {
        let mut graph = SourceGraph::new(44100);
        let mut block = [1.0f32; 64];
        graph.render(&mut block);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn active_oscillator_produces_signal() {
        let mut graph = SourceGraph::new(44100);
        graph.oscillator.active = true;
        graph.oscillator.set_frequency(441.0);

        let mut block = [0.0f32; 256];
        graph.render(&mut block);
        assert!(block.iter().any(|&s| s.abs() > 0.1));
        assert!(block.iter().all(|&s| (-1.0..=1.0).contains(&s)));
    }

    #[test]
    fn frequency_change_keeps_phase() {
        let mut oscillator = Oscillator::new(WaveShape::Sine, 440.0);
        let mut block = [0.0f32; 100];
        for slot in block.iter_mut() {
            *slot = oscillator.next_sample(44100.0);
        }
        let phase_before = oscillator.phase;

        oscillator.set_frequency(880.0);
        assert_relative_eq!(oscillator.phase, phase_before);
    }

    #[test]
    fn wave_shapes_stay_in_range() {
        for shape in [
            WaveShape::Sine,
            WaveShape::Square,
            WaveShape::Sawtooth,
            WaveShape::Triangle,
        ] {
            for step in 0..100 {
                let value = shape.sample(step as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&value), "{shape:?} at {step}");
            }
        }
    }

    #[test]
    fn triangle_hits_its_extremes() {
        assert_relative_eq!(WaveShape::Triangle.sample(0.0), -1.0);
        assert_relative_eq!(WaveShape::Triangle.sample(0.5), 1.0);
        assert_relative_eq!(WaveShape::Triangle.sample(0.25), 0.0);
    }

    #[test]
    fn file_buffer_runs_silent_past_the_end() {
        let mut file = FileBuffer::default();
        file.set_audio(DecodedAudio {
            sample_rate: 48000,
            samples: vec![0.25, -0.25],
        });
        file.active = true;

        assert_relative_eq!(file.next_sample(), 0.25);
        assert_relative_eq!(file.next_sample(), -0.25);
        assert_relative_eq!(file.next_sample(), 0.0);
        assert_relative_eq!(file.next_sample(), 0.0);
    }

    #[test]
    fn parses_shape_names() {
        assert_eq!(WaveShape::parse("Sawtooth"), Some(WaveShape::Sawtooth));
        assert_eq!(WaveShape::parse("saw"), Some(WaveShape::Sawtooth));
        assert_eq!(WaveShape::parse("noise"), None);
    }
}
