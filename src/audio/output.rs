//! Output stream: renders the source graph and live-code engine into the
//! device buffer and the analysis taps.

use std::fs::File;
use std::io::BufWriter;
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};

use super::livecode::LiveCodeShared;
use super::sources::SourceGraph;
use super::tap::AnalysisTap;
use super::AudioError;
use crate::params::audio_constants::BLOCK_SIZE;

/// Shared WAV writer the callback tees the session mix into
pub type WavRecorder = Arc<Mutex<hound::WavWriter<BufWriter<File>>>>;

/// Running output stream; dropping it stops audio
pub struct OutputStream {
    _stream: cpal::Stream,
}

/// Build and start the stereo output stream.
///
/// The callback renders one mono block from the source graph into both
/// channels and the primary tap, then mixes in live-code blocks (feeding
/// the engine's own per-channel taps) while the engine runs.
pub fn start_stream(
    graph: Arc<Mutex<SourceGraph>>,
    tap: Arc<AnalysisTap>,
    live: LiveCodeShared,
    sample_rate: u32,
    recorder: Option<WavRecorder>,
) -> Result<OutputStream, AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let config = cpal::StreamConfig {
        channels: 2,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    info!(
        "audio output: {} at {} Hz",
        device.name().unwrap_or_else(|_| "unknown device".to_string()),
        sample_rate
    );

    let mut mono = Vec::new();
    let mut live_block = [[0.0f32; BLOCK_SIZE]; 2];
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            let frames = data.len() / 2;
            mono.resize(frames, 0.0);
            graph.lock().unwrap().render(&mut mono);
            for (frame, &sample) in data.chunks_mut(2).zip(mono.iter()) {
                frame[0] = sample;
                frame[1] = sample;
            }
            tap.push(&mono);

            if live.is_running() {
                let mut engine = live.engine.lock().unwrap();
                let mut offset = 0;
                while offset < frames {
                    let (buffers, _) = engine.next_block(vec![]);
                    let count = (frames - offset).min(BLOCK_SIZE);
                    for i in 0..count {
                        let left = buffers[0][i].clamp(-1.0, 1.0);
                        let right = buffers[1][i].clamp(-1.0, 1.0);
                        let out = (offset + i) * 2;
                        data[out] = (data[out] + left).clamp(-1.0, 1.0);
                        data[out + 1] = (data[out + 1] + right).clamp(-1.0, 1.0);
                        live_block[0][i] = left;
                        live_block[1][i] = right;
                    }
                    live.taps()[0].push(&live_block[0][..count]);
                    live.taps()[1].push(&live_block[1][..count]);
                    offset += count;
                }
                drop(engine);
                live.mark_produced();
            }

            if let Some(writer) = &recorder {
                if let Ok(mut writer) = writer.lock() {
                    for &sample in data.iter() {
                        let _ = writer.write_sample(sample);
                    }
                }
            }
        },
        |err| error!("audio stream error: {err}"),
        None,
    )?;
    stream.play()?;

    Ok(OutputStream { _stream: stream })
}
