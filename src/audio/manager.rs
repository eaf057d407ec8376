//! Audio source state machine: one analysis tap, three mutually exclusive
//! sources.

use std::sync::{Arc, Mutex};

use log::info;

use super::decode::DecodedAudio;
use super::livecode::LiveCodeEngine;
use super::sources::{FileBuffer, Oscillator, SourceGraph, WaveShape};
use super::tap::AnalysisTap;
use super::AudioError;

/// Owns the audio graph and tracks which source is audible.
///
/// Mutual exclusivity between sources is enforced by the caller's play
/// path, not here; this component keeps the per-source flags honest and
/// turns redundant actions into logged no-ops.
pub struct AudioSourceManager {
    graph: Arc<Mutex<SourceGraph>>,
    tap: Arc<AnalysisTap>,
    live_code: Option<Box<dyn LiveCodeEngine>>,
    oscillator_playing: bool,
    file_playing: bool,
    live_code_playing: bool,
}

impl AudioSourceManager {
    pub fn new(sample_rate: u32, analysis_window_size: usize) -> Self {
        Self {
            graph: Arc::new(Mutex::new(SourceGraph::new(sample_rate))),
            tap: Arc::new(AnalysisTap::new(analysis_window_size, sample_rate)),
            live_code: None,
            oscillator_playing: false,
            file_playing: false,
            live_code_playing: false,
        }
    }

    /// Handle for the output-stream callback
    pub fn graph(&self) -> Arc<Mutex<SourceGraph>> {
        Arc::clone(&self.graph)
    }

    /// The single analysis tap all owned sources feed
    pub fn tap(&self) -> Arc<AnalysisTap> {
        Arc::clone(&self.tap)
    }

    pub fn play_oscillator(&mut self, shape: WaveShape, frequency_hz: f32) {
        if self.oscillator_playing {
            info!("oscillator already playing");
            return;
        }
        {
            let mut graph = self.graph.lock().unwrap();
            graph.oscillator.shape = shape;
            graph.oscillator.set_frequency(frequency_hz);
            graph.oscillator.active = true;
        }
        self.oscillator_playing = true;
        info!("oscillator start: {shape:?} at {frequency_hz} Hz");
    }

    /// Scheduled parameter change on the running node; no restart
    pub fn set_oscillator_frequency(&mut self, hz: f32) {
        self.graph.lock().unwrap().oscillator.set_frequency(hz);
    }

    pub fn set_oscillator_shape(&mut self, shape: WaveShape) {
        self.graph.lock().unwrap().oscillator.shape = shape;
    }

    /// Stop and discard the oscillator. Tone generators are one-shot: a
    /// fresh node replaces the stopped one for the next play.
    pub fn stop_oscillator(&mut self) {
        if !self.oscillator_playing {
            info!("oscillator already stopped");
            return;
        }
        self.graph.lock().unwrap().oscillator = Oscillator::default();
        self.oscillator_playing = false;
        info!("oscillator stop");
    }

    /// Load decoded audio and start it. A file already playing is left
    /// alone.
    pub fn play_file_buffer(&mut self, decoded: DecodedAudio, sample_rate: &mut u32) {
        if self.file_playing {
            info!("file buffer already playing");
            return;
        }
        self.update_buffer(decoded, sample_rate);
        self.graph.lock().unwrap().file.active = true;
        self.file_playing = true;
        info!("file buffer start");
    }

    /// Re-point the file-buffer source and adopt the buffer's native rate
    pub fn update_buffer(&mut self, decoded: DecodedAudio, sample_rate: &mut u32) {
        *sample_rate = decoded.sample_rate;
        self.tap.set_sample_rate(decoded.sample_rate);
        self.graph.lock().unwrap().file.set_audio(decoded);
    }

    /// Stop and discard the file-buffer source
    pub fn stop_file_buffer(&mut self) {
        if !self.file_playing {
            info!("file buffer already stopped");
            return;
        }
        self.graph.lock().unwrap().file = FileBuffer::default();
        self.file_playing = false;
        info!("file buffer stop");
    }

    /// Register the external live-coding engine as a potential source
    pub fn set_live_code_engine(&mut self, engine: Box<dyn LiveCodeEngine>) {
        self.live_code = Some(engine);
    }

    /// Whether a registered engine has code staged to run
    pub fn has_live_code(&self) -> bool {
        self.live_code
            .as_ref()
            .is_some_and(|engine| engine.has_pending_code())
    }

    /// Run the caller's preparation hook against the engine, then trigger
    /// its evaluation.
    ///
    /// The engine's generators come up asynchronously and are not owned
    /// here; the frame-loop owner is responsible for deferring drawing
    /// until the engine's taps appear.
    pub fn play_live_code<F>(&mut self, prepare: F) -> Result<(), AudioError>
    where
        F: FnOnce(&mut dyn LiveCodeEngine),
    {
        let Some(engine) = self.live_code.as_mut() else {
            info!("no live-code engine registered");
            return Ok(());
        };
        prepare(engine.as_mut());
        engine.evaluate()?;
        self.live_code_playing = true;
        info!("live code start");
        Ok(())
    }

    pub fn stop_live_code(&mut self) {
        if !self.live_code_playing {
            return;
        }
        if let Some(engine) = self.live_code.as_mut() {
            engine.stop();
        }
        self.live_code_playing = false;
        info!("live code stop");
    }

    /// Taps the live engine currently exposes (empty until it produces)
    pub fn live_code_taps(&self) -> Vec<(String, Arc<AnalysisTap>)> {
        self.live_code
            .as_ref()
            .map(|engine| engine.analysis_taps())
            .unwrap_or_default()
    }

    pub fn is_oscillator_playing(&self) -> bool {
        self.oscillator_playing
    }

    pub fn is_file_playing(&self) -> bool {
        self.file_playing
    }

    pub fn is_live_code_playing(&self) -> bool {
        self.live_code_playing
    }

    /// Whether any source reports active: the frame loop's continue
    /// predicate
    pub fn is_any_playing(&self) -> bool {
        self.oscillator_playing || self.file_playing || self.live_code_playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn manager() -> AudioSourceManager {
        AudioSourceManager::new(44100, 2048)
    }

    #[test]
    fn double_play_keeps_the_first_oscillator() {
        let mut manager = manager();
        manager.play_oscillator(WaveShape::Sine, 220.0);
        manager.play_oscillator(WaveShape::Square, 440.0);

        let graph = manager.graph();
        let graph = graph.lock().unwrap();
        assert!(graph.oscillator.active);
        assert_eq!(graph.oscillator.shape, WaveShape::Sine);
        assert_relative_eq!(graph.oscillator.frequency_hz(), 220.0);
        assert!(manager.is_oscillator_playing());
    }

    #[test]
    fn stop_without_play_changes_nothing() {
        let mut manager = manager();
        manager.stop_oscillator();
        manager.stop_file_buffer();
        manager.stop_live_code();

        assert!(!manager.is_any_playing());
        assert!(!manager.graph().lock().unwrap().oscillator.active);
    }

    #[test]
    fn stop_replaces_the_oscillator_node() {
        let mut manager = manager();
        manager.play_oscillator(WaveShape::Triangle, 330.0);
        manager.stop_oscillator();

        let graph = manager.graph();
        let graph = graph.lock().unwrap();
        assert!(!graph.oscillator.active);
        // one-shot semantics: the replacement is a fresh default node
        assert_eq!(graph.oscillator.shape, WaveShape::Sine);
        assert!(!manager.is_oscillator_playing());
    }

    #[test]
    fn file_play_adopts_the_buffer_rate() {
        let mut manager = manager();
        let mut sample_rate = 44100;
        let decoded = DecodedAudio {
            sample_rate: 48000,
            samples: vec![0.0; 128],
        };

        manager.play_file_buffer(decoded, &mut sample_rate);
        assert_eq!(sample_rate, 48000);
        assert_eq!(manager.tap().sample_rate(), 48000);
        assert!(manager.is_file_playing());
    }

    #[test]
    fn frequency_change_does_not_restart() {
        let mut manager = manager();
        manager.play_oscillator(WaveShape::Sine, 220.0);
        manager.set_oscillator_frequency(330.0);

        let graph = manager.graph();
        let graph = graph.lock().unwrap();
        assert!(graph.oscillator.active);
        assert_relative_eq!(graph.oscillator.frequency_hz(), 330.0);
    }

    struct FakeEngine {
        pending: bool,
    }

    impl LiveCodeEngine for FakeEngine {
        fn has_pending_code(&self) -> bool {
            self.pending
        }
        fn evaluate(&mut self) -> Result<(), AudioError> {
            Ok(())
        }
        fn stop(&mut self) {}
        fn analysis_taps(&self) -> Vec<(String, Arc<AnalysisTap>)> {
            Vec::new()
        }
    }

    #[test]
    fn live_code_play_runs_the_prepare_hook_first() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let prepared = Arc::new(AtomicBool::new(false));
        let mut manager = manager();
        manager.set_live_code_engine(Box::new(FakeEngine { pending: true }));

        assert!(manager.has_live_code());
        let hook_flag = Arc::clone(&prepared);
        manager
            .play_live_code(move |_| hook_flag.store(true, Ordering::Relaxed))
            .unwrap();

        assert!(prepared.load(Ordering::Relaxed));
        assert!(manager.is_live_code_playing());

        manager.stop_live_code();
        assert!(!manager.is_live_code_playing());
    }

    #[test]
    fn live_code_without_engine_is_a_noop() {
        let mut manager = manager();
        assert!(!manager.has_live_code());
        manager.play_live_code(|_| {}).unwrap();
        assert!(!manager.is_live_code_playing());
        assert!(manager.live_code_taps().is_empty());
    }
}
