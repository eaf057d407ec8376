//! Decoding audio files into sample buffers for the file-buffer source.

use std::path::Path;

use hound::SampleFormat;

use super::AudioError;

/// Decoded audio: native sample rate plus mono samples in [-1, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// Read a WAV file and mix it down to mono
pub fn decode_wav(path: &Path) -> Result<DecodedAudio, AudioError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();

    Ok(DecodedAudio {
        sample_rate: spec.sample_rate,
        samples,
    })
}
