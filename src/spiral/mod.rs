//! Polar waveform rendering: concentric per-period layers with
//! phase-continuous frame-to-frame alignment.
//!
//! Each frame snapshots the analysis tap, maps adjacent sample pairs to
//! polar segments (amplitude scales the radius, sample index sweeps the
//! angle), and strokes them onto the layer owning that index's period. A
//! continuity cache carries the previous frame's drawn angles so a fresh
//! snapshot can pick up where the last one left off instead of popping back
//! to angle zero.

pub mod gradient;
mod layer;

pub use layer::LayerSurface;

use std::collections::HashMap;
use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use log::warn;
use thiserror::Error;

use crate::audio::AnalysisTap;
use crate::params::Config;

#[derive(Debug, Error)]
pub enum VisualizerError {
    #[error("configuration yields zero period layers")]
    NoLayers,

    #[error("drawing surfaces require a non-zero backing size")]
    ZeroSurface,
}

/// One polar segment between adjacent samples
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    /// Radii in backing-store pixels, always non-negative
    pub r: [f32; 2],
    /// Angles with the fold and phase offset applied (radians)
    pub theta: [f32; 2],
    /// Whether each original radius was <= 0; the fold must be undone
    /// before an angle is cached as a future phase offset
    pub folded: [bool; 2],
}

/// Map the sample pair `(i-1, i)` to a polar segment.
///
/// A negative amplitude folds onto the opposite ray: the magnitude is kept
/// and the angle rotates by pi, so a sign flip sweeps through the origin
/// instead of jumping across it. Indices wrap past the end of the buffer,
/// closing the trace back onto its first sample.
pub fn compute_points(
    samples: &[f32],
    i: usize,
    phase_offset: f32,
    samples_per_period: f32,
    draw_radius: f32,
) -> Segment {
    let radians_per_sample = TAU / samples_per_period;
    let r0 = samples[(i - 1) % samples.len()] * draw_radius;
    let r1 = samples[i % samples.len()] * draw_radius;
    let mut th0 = ((i - 1) as f32 * radians_per_sample) % TAU;
    let mut th1 = (i as f32 * radians_per_sample) % TAU;

    if r0 < 0.0 {
        th0 += PI;
    }
    if r1 < 0.0 {
        th1 += PI;
    }
    Segment {
        r: [r0.abs(), r1.abs()],
        theta: [th0 + phase_offset, th1 + phase_offset],
        folded: [r0 <= 0.0, r1 <= 0.0],
    }
}

/// The previous frame's drawn state, rebuilt at the end of every draw and
/// read once at the start of the next
#[derive(Debug, Default)]
struct ContinuityCache {
    /// Sample value (bit pattern) -> the index it occupied last frame
    value_to_index: HashMap<u32, usize>,
    /// Fold-corrected angle drawn at each index last frame
    drawn_angles: Vec<f32>,
}

impl ContinuityCache {
    /// Angle at which the previous frame drew a sample of this value.
    /// A lookup miss is an accepted approximation, not an error: fall back
    /// to index 0, and to offset 0 before any frame has been drawn.
    fn phase_offset(&self, first_sample: f32) -> f32 {
        let index = self
            .value_to_index
            .get(&first_sample.to_bits())
            .copied()
            .unwrap_or(0);
        self.drawn_angles.get(index).copied().unwrap_or(0.0) % TAU
    }

    fn rebuild(&mut self, samples: &[f32], drawn_angles: Vec<f32>) {
        self.value_to_index.clear();
        for (index, value) in samples.iter().enumerate() {
            self.value_to_index.insert(value.to_bits(), index);
        }
        self.drawn_angles = drawn_angles;
    }
}

/// Polar waveform renderer over a stack of period layers.
///
/// An instance survives resizes and redraws; a configuration change that
/// alters the layer count replaces the whole instance instead of mutating
/// it in place.
pub struct Visualizer {
    layers: Vec<LayerSurface>,
    color_steps: Vec<tiny_skia::Color>,
    draw_radius: f32,
    dimension: u32,
    tap: Arc<AnalysisTap>,
    cache: ContinuityCache,
    samples: Vec<f32>,
}

impl Visualizer {
    /// Allocate layers for the current configuration, sized to `dimension`
    /// (logical pixels, the smaller viewport side).
    pub fn new(
        config: &Config,
        tap: Arc<AnalysisTap>,
        dimension: u32,
    ) -> Result<Self, VisualizerError> {
        let mut visualizer = Self {
            layers: Vec::new(),
            color_steps: Vec::new(),
            draw_radius: 0.0,
            dimension: 0,
            tap,
            cache: ContinuityCache::default(),
            samples: Vec::new(),
        };
        visualizer.reset_layers(config, dimension)?;
        visualizer.calculate_color_steps(config);
        Ok(visualizer)
    }

    /// Dispose of any existing surfaces and allocate one per period layer.
    /// Also drops the continuity cache: cached angles from a different
    /// layout cannot carry over.
    pub fn reset_layers(&mut self, config: &Config, dimension: u32) -> Result<(), VisualizerError> {
        let layer_count = config.audio.layer_count();
        if layer_count == 0 {
            return Err(VisualizerError::NoLayers);
        }
        let side = backing_side(dimension, config.visual.device_pixel_ratio)
            .ok_or(VisualizerError::ZeroSurface)?;
        self.layers = (0..layer_count)
            .map(|_| LayerSurface::new(side))
            .collect::<Result<_, _>>()?;
        self.dimension = dimension;
        self.draw_radius = side as f32 / 2.0;
        self.cache = ContinuityCache::default();
        Ok(())
    }

    /// Scale every backing store to `dimension` x the device pixel ratio
    /// and recenter the drawing origins. A zero dimension is rejected as a
    /// no-op rather than an error.
    pub fn resize(&mut self, config: &Config, dimension: u32) -> Result<(), VisualizerError> {
        let Some(side) = backing_side(dimension, config.visual.device_pixel_ratio) else {
            warn!("ignoring resize to zero dimension");
            return Ok(());
        };
        for surface in &mut self.layers {
            surface.resize(side)?;
        }
        self.dimension = dimension;
        self.draw_radius = side as f32 / 2.0;
        Ok(())
    }

    /// Recompute the gradient steps from the configured endpoints. Invoked
    /// on every play action; the endpoints are externally mutable, so steps
    /// are never cached past that.
    pub fn calculate_color_steps(&mut self, config: &Config) {
        self.color_steps = gradient::color_steps(
            config.visual.gradient_start,
            config.visual.gradient_end,
            config.visual.interpolation_space,
            config.visual.min_color_steps,
        );
    }

    /// Erase the full drawable box on every layer
    pub fn clear(&mut self) {
        for surface in &mut self.layers {
            surface.clear();
        }
    }

    /// Snapshot the tap and stroke one frame across all layers
    pub fn draw(&mut self, config: &Config) {
        let window = config.audio.analysis_window_size;
        let samples_per_period = config.audio.samples_per_period();
        let layer_count = self.layers.len();
        if layer_count == 0 || window == 0 {
            return;
        }

        self.samples.resize(window, 0.0);
        self.tap.get_time_domain(&mut self.samples);
        self.apply_layer_styles(config);
        for surface in &mut self.layers {
            surface.begin_path();
        }

        let phase_offset = self.cache.phase_offset(self.samples[0]);
        let mut drawn_angles = vec![0.0f32; window];

        // One segment past the last sample pair deliberately closes the
        // trace back onto the start of the buffer.
        for i in 1..=window {
            let segment = compute_points(
                &self.samples,
                i,
                phase_offset,
                samples_per_period,
                self.draw_radius,
            );
            let layer_index =
                ((i as f32 / samples_per_period).floor() as usize).min(layer_count - 1);
            let surface = &mut self.layers[layer_index];
            surface.move_to(
                segment.r[0] * segment.theta[0].cos(),
                segment.r[0] * segment.theta[0].sin(),
            );
            surface.line_to(
                segment.r[1] * segment.theta[1].cos(),
                segment.r[1] * segment.theta[1].sin(),
            );
            if i < window {
                drawn_angles[i] = if segment.folded[1] {
                    segment.theta[1] - PI
                } else {
                    segment.theta[1]
                };
            }
        }

        self.cache.rebuild(&self.samples, drawn_angles);
        for surface in &mut self.layers {
            surface.stroke();
        }
    }

    fn apply_layer_styles(&mut self, config: &Config) {
        let layer_count = self.layers.len();
        for (index, surface) in self.layers.iter_mut().enumerate() {
            let mut color = gradient::stroke_color(&self.color_steps, index, layer_count);
            let alpha =
                ((index + 1) as f32 / layer_count as f32).powf(config.visual.alpha_exponent);
            color.apply_opacity(alpha);
            let width = config.visual.line_width_start
                + index as f32 * (config.visual.line_width_end - config.visual.line_width_start)
                    / layer_count as f32;
            let blur = config.visual.blur_factor * (layer_count - 1 - index) as f32;
            surface.set_style(color, width, blur);
        }
    }

    pub fn layers(&self) -> &[LayerSurface] {
        &self.layers
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn draw_radius(&self) -> f32 {
        self.draw_radius
    }

    pub fn dimension(&self) -> u32 {
        self.dimension
    }
}

fn backing_side(dimension: u32, device_pixel_ratio: f32) -> Option<u32> {
    if dimension == 0 {
        return None;
    }
    let side = (dimension as f32 * device_pixel_ratio).round() as u32;
    (side > 0).then_some(side)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.audio.analysis_window_size = 16;
        config.visual.device_pixel_ratio = 1.0;
        config
    }

    fn test_tap(config: &Config, samples: &[f32]) -> Arc<AnalysisTap> {
        let tap = Arc::new(AnalysisTap::new(
            config.audio.analysis_window_size,
            config.audio.sample_rate,
        ));
        tap.push(samples);
        tap
    }

    /// 16 distinct sample values (distinct so the value->index cache maps
    /// the first sample back to index 0)
    fn ramp16() -> Vec<f32> {
        (0..16).map(|i| -0.75 + i as f32 * 0.1).collect()
    }

    #[test]
    fn radii_are_scaled_magnitudes() {
        let samples = [0.5, -0.25, 0.0, 1.0];
        let segment = compute_points(&samples, 1, 0.0, 4.0, 100.0);

        assert_relative_eq!(segment.r[0], 50.0);
        assert_relative_eq!(segment.r[1], 25.0);
        assert!(segment.r.iter().all(|&r| r >= 0.0));
    }

    #[test]
    fn negative_amplitude_folds_by_pi() {
        let samples = [0.5, -0.25];
        let samples_per_period = 8.0;
        let segment = compute_points(&samples, 1, 0.0, samples_per_period, 100.0);

        let base = TAU / samples_per_period;
        assert_relative_eq!(segment.theta[1], base + PI, epsilon = 1e-6);
        assert!(segment.folded[1]);
        assert!(!segment.folded[0]);
    }

    #[test]
    fn zero_amplitude_is_flagged_but_not_rotated() {
        let samples = [0.0, 0.5];
        let segment = compute_points(&samples, 1, 0.0, 8.0, 100.0);

        assert!(segment.folded[0]);
        assert_relative_eq!(segment.theta[0], 0.0);
    }

    #[test]
    fn phase_offset_shifts_both_angles() {
        let samples = [0.5, 0.25];
        let plain = compute_points(&samples, 1, 0.0, 8.0, 100.0);
        let shifted = compute_points(&samples, 1, 1.5, 8.0, 100.0);

        assert_relative_eq!(shifted.theta[0], plain.theta[0] + 1.5, epsilon = 1e-6);
        assert_relative_eq!(shifted.theta[1], plain.theta[1] + 1.5, epsilon = 1e-6);
    }

    #[test]
    fn closing_segment_wraps_to_first_sample() {
        let samples = [0.5, 0.25, -0.5, 0.75];
        let segment = compute_points(&samples, samples.len(), 0.0, 4.0, 100.0);

        // one past the end pairs the last sample with the first
        assert_relative_eq!(segment.r[0], 75.0);
        assert_relative_eq!(segment.r[1], 50.0);
    }

    #[test]
    fn cache_miss_defaults_to_zero_offset() {
        let cache = ContinuityCache::default();
        assert_relative_eq!(cache.phase_offset(0.42), 0.0);
    }

    #[test]
    fn cache_hit_returns_drawn_angle_mod_tau() {
        let mut cache = ContinuityCache::default();
        let samples = [0.1, 0.2, 0.3];
        cache.rebuild(&samples, vec![0.0, 2.0, TAU + 1.0]);

        assert_relative_eq!(cache.phase_offset(0.2), 2.0);
        assert_relative_eq!(cache.phase_offset(0.3), 1.0, epsilon = 1e-6);
        // unknown value falls back to index 0
        assert_relative_eq!(cache.phase_offset(0.9), 0.0);
    }

    #[test]
    fn drawing_same_buffer_twice_is_deterministic() {
        let config = test_config();
        let samples = ramp16();
        let tap = test_tap(&config, &samples);
        let mut visualizer = Visualizer::new(&config, tap, 64).unwrap();

        visualizer.draw(&config);
        let first = visualizer.cache.drawn_angles.clone();

        visualizer.clear();
        visualizer.draw(&config);
        let second = visualizer.cache.drawn_angles.clone();

        assert_eq!(first, second);
    }

    #[test]
    fn next_frame_resumes_at_cached_angle() {
        let config = test_config();
        let samples = ramp16();
        let tap = test_tap(&config, &samples);
        let mut visualizer = Visualizer::new(&config, tap, 64).unwrap();

        visualizer.draw(&config);
        let expected = visualizer.cache.drawn_angles[5] % TAU;

        // a new snapshot starting with the value previously at index 5
        // picks up that index's drawn angle as its offset
        assert_relative_eq!(visualizer.cache.phase_offset(samples[5]), expected);
    }

    #[test]
    fn layer_allocation_matches_layer_count() {
        let mut config = test_config();
        config.audio.analysis_window_size = 2048;
        let tap = test_tap(&config, &[]);
        let visualizer = Visualizer::new(&config, tap, 64).unwrap();

        assert_eq!(visualizer.layer_count(), 6);
    }

    #[test]
    fn resize_is_idempotent() {
        let config = test_config();
        let tap = test_tap(&config, &[]);
        let mut visualizer = Visualizer::new(&config, tap, 64).unwrap();

        visualizer.resize(&config, 200).unwrap();
        let once = (visualizer.draw_radius(), visualizer.layers[0].side_px());
        visualizer.resize(&config, 200).unwrap();
        let twice = (visualizer.draw_radius(), visualizer.layers[0].side_px());

        assert_eq!(once, twice);
        assert_relative_eq!(visualizer.draw_radius(), 100.0);
    }

    #[test]
    fn zero_resize_is_rejected_without_state_change() {
        let config = test_config();
        let tap = test_tap(&config, &[]);
        let mut visualizer = Visualizer::new(&config, tap, 64).unwrap();
        let before = (visualizer.draw_radius(), visualizer.dimension());

        visualizer.resize(&config, 0).unwrap();
        assert_eq!((visualizer.draw_radius(), visualizer.dimension()), before);
    }

    #[test]
    fn zero_dimension_allocation_fails() {
        let config = test_config();
        let tap = test_tap(&config, &[]);
        assert!(matches!(
            Visualizer::new(&config, tap, 0),
            Err(VisualizerError::ZeroSurface)
        ));
    }

    #[test]
    fn backing_store_scales_with_device_pixel_ratio() {
        let mut config = test_config();
        config.visual.device_pixel_ratio = 2.0;
        let tap = test_tap(&config, &[]);
        let visualizer = Visualizer::new(&config, tap, 100).unwrap();

        assert_eq!(visualizer.layers[0].side_px(), 200);
        assert_relative_eq!(visualizer.draw_radius(), 100.0);
    }
}
