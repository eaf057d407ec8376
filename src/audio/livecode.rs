//! Live-coding engine collaborator: the trait seam plus the glicol-backed
//! implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use glicol::Engine;

use super::tap::AnalysisTap;
use super::AudioError;
use crate::params::audio_constants::BLOCK_SIZE;

/// Bundled program used when the live engine starts without user code
pub const DEFAULT_COMPOSITION: &str = r#"
~mod: sin 0.2 >> mul 800.0 >> add 1000.0
o: saw 55.0 >> lpf ~mod 1.0 >> mul 0.3
"#;

/// External engine that may begin producing sound (and analysis taps) after
/// an evaluation, with an unspecified but bounded startup delay.
///
/// The engine is polled for its taps rather than reached for through any
/// ambient state; the tap list stays empty until audio has actually been
/// produced.
pub trait LiveCodeEngine: Send {
    /// Whether any code is staged for evaluation
    fn has_pending_code(&self) -> bool;

    /// Compile and start the staged program
    fn evaluate(&mut self) -> Result<(), AudioError>;

    /// Signal the engine to stop producing audio
    fn stop(&mut self);

    /// Named analysis taps currently exposed
    fn analysis_taps(&self) -> Vec<(String, Arc<AnalysisTap>)>;
}

/// Handles the output callback renders the engine through
#[derive(Clone)]
pub struct LiveCodeShared {
    pub engine: Arc<Mutex<Engine<BLOCK_SIZE>>>,
    running: Arc<AtomicBool>,
    produced: Arc<AtomicBool>,
    taps: [Arc<AnalysisTap>; 2],
}

impl LiveCodeShared {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Record that at least one block has been rendered; the engine's taps
    /// become visible to the frame loop from here on
    pub fn mark_produced(&self) {
        self.produced.store(true, Ordering::Relaxed);
    }

    pub fn taps(&self) -> &[Arc<AnalysisTap>; 2] {
        &self.taps
    }
}

/// Glicol-backed live-coding engine exposing one tap per output channel
pub struct GlicolEngine {
    code: String,
    shared: LiveCodeShared,
}

impl GlicolEngine {
    pub fn new(sample_rate: u32, window_size: usize) -> Self {
        let mut engine = Engine::<BLOCK_SIZE>::new();
        engine.set_sr(sample_rate as usize);
        Self {
            code: String::new(),
            shared: LiveCodeShared {
                engine: Arc::new(Mutex::new(engine)),
                running: Arc::new(AtomicBool::new(false)),
                produced: Arc::new(AtomicBool::new(false)),
                taps: [
                    Arc::new(AnalysisTap::new(window_size, sample_rate)),
                    Arc::new(AnalysisTap::new(window_size, sample_rate)),
                ],
            },
        }
    }

    /// Stage a program for the next evaluation
    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    pub fn shared(&self) -> LiveCodeShared {
        self.shared.clone()
    }
}

impl LiveCodeEngine for GlicolEngine {
    fn has_pending_code(&self) -> bool {
        !self.code.trim().is_empty()
    }

    fn evaluate(&mut self) -> Result<(), AudioError> {
        {
            let mut engine = self.shared.engine.lock().unwrap();
            engine.update_with_code(&self.code);
            engine
                .update()
                .map_err(|e| AudioError::LiveCode(format!("{e:?}")))?;
        }
        self.shared.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        self.shared.running.store(false, Ordering::Relaxed);
        self.shared.produced.store(false, Ordering::Relaxed);
    }

    fn analysis_taps(&self) -> Vec<(String, Arc<AnalysisTap>)> {
        if !self.shared.produced.load(Ordering::Relaxed) {
            return Vec::new();
        }
        vec![
            ("left".to_string(), Arc::clone(&self.shared.taps[0])),
            ("right".to_string(), Arc::clone(&self.shared.taps[1])),
        ]
    }
}
