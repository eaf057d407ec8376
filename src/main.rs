//! Spirascope - a spiral oscilloscope.
//!
//! An audio signal unwinds into concentric per-period arcs: a tone, a
//! decoded file, or a live-coded engine feeds one analysis tap whose
//! time-domain snapshot is redrawn every animation frame without losing
//! angular phase between frames.

use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use spirascope::audio::{
    self, decode_wav, AudioSourceManager, GlicolEngine, OutputStream, WavRecorder,
    DEFAULT_COMPOSITION,
};
use spirascope::cli::Args;
use spirascope::params::{Config, RecordingConfig};
use spirascope::rendering::RenderSystem;
use spirascope::spiral::{LayerSurface, Visualizer};

/// Semitone step used by the base-frequency nudge keys
const BASE_NUDGE_FACTOR: f32 = 1.059_463_1;

/// Main application state
struct App {
    args: Args,
    config: Config,

    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio graph and sources
    manager: AudioSourceManager,
    _output: Option<OutputStream>,
    recorder: Option<WavRecorder>,
    recording: Option<RecordingConfig>,

    // Primary and live-code companion visualizers
    visualizer: Option<Visualizer>,
    companions: Vec<(String, Visualizer)>,
    live_code_started: Option<Instant>,

    frame_num: usize,
}

impl App {
    fn new(args: Args, config: Config) -> Self {
        let manager = AudioSourceManager::new(
            config.audio.sample_rate,
            config.audio.analysis_window_size,
        );
        let recording = args.create_recording_config();

        Self {
            args,
            config,
            window: None,
            render_system: None,
            manager,
            _output: None,
            recorder: None,
            recording,
            visualizer: None,
            companions: Vec::new(),
            live_code_started: None,
            frame_num: 0,
        }
    }

    /// The live-code program staged at startup, if any
    fn live_code_program(&self) -> Option<String> {
        if let Some(path) = &self.args.code {
            match fs::read_to_string(path) {
                Ok(code) => return Some(code),
                Err(e) => error!("could not read {}: {e}", path.display()),
            }
        }
        self.args.live.then(|| DEFAULT_COMPOSITION.to_string())
    }

    /// Start exactly one source: staged live code wins, then a file
    /// argument, then the oscillator
    fn play(&mut self) {
        // gradient endpoints are externally mutable; recompute the steps on
        // every play action
        if let Some(visualizer) = self.visualizer.as_mut() {
            visualizer.calculate_color_steps(&self.config);
        }

        if self.manager.has_live_code() {
            if let Err(e) = self.manager.play_live_code(|_| {}) {
                error!("live code evaluation failed: {e}");
                return;
            }
            self.live_code_started = Some(Instant::now());
            self.companions.clear();
        } else if let Some(path) = self.args.file.clone() {
            match decode_wav(&path) {
                Ok(decoded) => {
                    let mut sample_rate = self.config.audio.sample_rate;
                    self.manager.play_file_buffer(decoded, &mut sample_rate);
                    self.config.audio.sample_rate = sample_rate;
                    // the buffer's native rate may have changed the layer
                    // count; the visualizer is replaced, not patched
                    self.rebuild_visualizers();
                }
                Err(e) => {
                    // decode failure leaves all prior state untouched
                    error!("could not decode {}: {e}", path.display());
                    return;
                }
            }
        } else {
            let shape = self.args.parse_wave_shape();
            let frequency = self
                .args
                .frequency
                .unwrap_or(self.config.audio.base_frequency);
            self.manager.play_oscillator(shape, frequency);
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn stop(&mut self) {
        if self.manager.is_live_code_playing() {
            self.manager.stop_live_code();
        }
        if self.manager.is_oscillator_playing() {
            self.manager.stop_oscillator();
        }
        if self.manager.is_file_playing() {
            self.manager.stop_file_buffer();
        }
        self.companions.clear();
        self.live_code_started = None;
        info!("stop");
    }

    /// Retune the period split; the analysis window adapts and the layer
    /// stacks are rebuilt from scratch
    fn nudge_base_frequency(&mut self, factor: f32) {
        let hz = (self.config.audio.base_frequency * factor).clamp(20.0, 2000.0);
        self.config.audio.set_base_frequency(hz);
        info!("base period set to 1/{hz:.1}s");
        self.rebuild_visualizers();
    }

    fn rebuild_visualizers(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let dimension = view_dimension(window);
        self.manager
            .tap()
            .set_window_size(self.config.audio.analysis_window_size);
        match Visualizer::new(&self.config, self.manager.tap(), dimension) {
            Ok(visualizer) => self.visualizer = Some(visualizer),
            Err(e) => error!("visualizer rebuild failed: {e}"),
        }
        self.companions.clear();
    }

    /// Poll the engine for newly exposed taps and lazily build one
    /// companion visualizer per tap, each with its own layers and
    /// continuity cache
    fn poll_live_code_taps(&mut self) {
        let Some(window) = &self.window else {
            return;
        };
        let dimension = view_dimension(window);
        for (name, tap) in self.manager.live_code_taps() {
            tap.set_window_size(self.config.audio.analysis_window_size);
            tap.set_sample_rate(self.config.audio.sample_rate);
            if self.companions.iter().any(|(existing, _)| existing == &name) {
                continue;
            }
            match Visualizer::new(&self.config, tap, dimension) {
                Ok(companion) => {
                    info!("live-code tap '{name}' online");
                    self.companions.push((name, companion));
                }
                Err(e) => warn!("skipping live-code tap '{name}': {e}"),
            }
        }
    }

    /// Clear + draw + composite one frame
    fn render_frame(&mut self) {
        if !self.manager.is_any_playing() {
            return;
        }

        if self.manager.is_live_code_playing() {
            // the engine's analysis nodes appear after a bounded startup
            // delay; drawing waits it out
            let warmed = self
                .live_code_started
                .map_or(true, |at| at.elapsed() >= self.config.audio.analyzer_wait_delay);
            if !warmed {
                return;
            }
            self.poll_live_code_taps();
            for (_, companion) in self.companions.iter_mut() {
                companion.clear();
                companion.draw(&self.config);
            }
        } else if let Some(visualizer) = self.visualizer.as_mut() {
            visualizer.clear();
            visualizer.draw(&self.config);
        }

        let Some(render_system) = self.render_system.as_mut() else {
            return;
        };
        let surfaces: Vec<&LayerSurface> = if self.manager.is_live_code_playing() {
            self.companions
                .iter()
                .flat_map(|(_, companion)| companion.layers())
                .collect()
        } else {
            self.visualizer
                .iter()
                .flat_map(|visualizer| visualizer.layers())
                .collect()
        };
        if surfaces.is_empty() {
            return;
        }
        if let Err(e) = render_system.render(&surfaces, self.frame_num) {
            error!("render error: {e}");
            return;
        }
        self.frame_num += 1;
    }

    fn handle_key(&mut self, code: KeyCode, event_loop: &winit::event_loop::ActiveEventLoop) {
        match code {
            KeyCode::Escape => event_loop.exit(),
            KeyCode::Space => {
                if self.manager.is_any_playing() {
                    self.stop();
                } else {
                    self.play();
                }
            }
            KeyCode::ArrowUp => self.nudge_base_frequency(BASE_NUDGE_FACTOR),
            KeyCode::ArrowDown => self.nudge_base_frequency(1.0 / BASE_NUDGE_FACTOR),
            _ => {}
        }
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        // re-arm the frame loop only while a source is active; stopping
        // every source stops the redraw requests
        if self.manager.is_any_playing() {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
        }
    }

    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        let window_attributes = Window::default_attributes()
            .with_title("Spirascope")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.config.render.window_width,
                self.config.render.window_height,
            ));
        let window = Arc::new(event_loop.create_window(window_attributes).unwrap());
        self.config.visual.device_pixel_ratio = window.scale_factor() as f32;

        let render_system = pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            self.recording.clone(),
        ))
        .unwrap();

        // Register the live-coding engine as a potential source
        let mut engine = GlicolEngine::new(
            self.config.audio.sample_rate,
            self.config.audio.analysis_window_size,
        );
        if let Some(code) = self.live_code_program() {
            engine.set_code(code);
        }
        let live_shared = engine.shared();
        self.manager.set_live_code_engine(Box::new(engine));

        // Session recording tee
        self.recorder = self.recording.as_ref().map(|recording| {
            let spec = hound::WavSpec {
                channels: 2,
                sample_rate: self.config.audio.sample_rate,
                bits_per_sample: 32,
                sample_format: hound::SampleFormat::Float,
            };
            let writer = hound::WavWriter::create(recording.audio_path(), spec)
                .expect("Failed to create WAV writer");
            Arc::new(Mutex::new(writer))
        });

        match audio::start_stream(
            self.manager.graph(),
            self.manager.tap(),
            live_shared,
            self.config.audio.sample_rate,
            self.recorder.clone(),
        ) {
            Ok(stream) => self._output = Some(stream),
            Err(e) => error!("audio output unavailable: {e}"),
        }

        let dimension = view_dimension(&window);
        match Visualizer::new(&self.config, self.manager.tap(), dimension) {
            Ok(visualizer) => self.visualizer = Some(visualizer),
            Err(e) => error!("visualizer init failed: {e}"),
        }

        self.window = Some(window);
        self.render_system = Some(render_system);
        self.play();
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = self.render_system.as_mut() {
                    render_system.resize(size.width, size.height);
                }
                if let Some(window) = &self.window {
                    let dimension = view_dimension(window);
                    if let Some(visualizer) = self.visualizer.as_mut() {
                        if let Err(e) = visualizer.resize(&self.config, dimension) {
                            error!("resize failed: {e}");
                        }
                    }
                    for (_, companion) in self.companions.iter_mut() {
                        if let Err(e) = companion.resize(&self.config, dimension) {
                            error!("companion resize failed: {e}");
                        }
                    }
                }
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.config.visual.device_pixel_ratio = scale_factor as f32;
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        repeat: false,
                        physical_key: PhysicalKey::Code(code),
                        ..
                    },
                ..
            } => self.handle_key(code, event_loop),
            WindowEvent::RedrawRequested => {
                self.render_frame();
                if let Some(recording) = &self.recording {
                    if self.frame_num >= recording.total_frames() {
                        info!("recording complete");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }
}

/// Smaller side of the viewport in logical pixels
fn view_dimension(window: &Window) -> u32 {
    let size = window.inner_size();
    (size.width.min(size.height) as f64 / window.scale_factor()).round() as u32
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let mut config = Config::default();
    args.apply(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration: {e}");
        std::process::exit(1);
    }

    let mut app = App::new(args, config);
    let event_loop = EventLoop::new().unwrap();
    let _ = event_loop.run_app(&mut app);
}
