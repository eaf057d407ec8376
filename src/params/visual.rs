//! Visual styling configuration: gradient endpoints, stroke widths, depth cues.

use palette::Oklch;

/// Color space used when stepping the gradient between its endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationSpace {
    /// Cylindrical perceptual space; hue travels an arc between endpoints
    Oklch,
    /// Rectangular perceptual space; straight-line interpolation
    Oklab,
}

/// Styling parameters for the spiral trace.
///
/// Layer index 0 is the tail (innermost period), the last layer is the head;
/// width, color, blur, and alpha are interpolated across that range.
#[derive(Debug, Clone)]
pub struct VisualParams {
    /// Gradient endpoint at the tail of the spiral
    pub gradient_start: Oklch,

    /// Gradient endpoint at the head of the spiral
    pub gradient_end: Oklch,

    /// Space the gradient steps are computed in
    pub interpolation_space: InterpolationSpace,

    /// Minimum number of discrete gradient steps
    pub min_color_steps: usize,

    /// Stroke width at the tail (backing-store pixels)
    pub line_width_start: f32,

    /// Stroke width at the head (backing-store pixels)
    pub line_width_end: f32,

    /// Blur per layer step away from the head (pixels); farther layers
    /// blur more
    pub blur_factor: f32,

    /// Exponent shaping per-layer alpha: `((layer+1)/layers)^exponent`.
    /// 0 disables the alpha ramp.
    pub alpha_exponent: f32,

    /// Backing-store resolution scale relative to the displayed size
    pub device_pixel_ratio: f32,
}

impl Default for VisualParams {
    fn default() -> Self {
        Self {
            gradient_start: Oklch::new(0.5, 0.3, 290.0),
            gradient_end: Oklch::new(0.8, 0.24, 220.0),
            interpolation_space: InterpolationSpace::Oklch,
            min_color_steps: 16,
            line_width_start: 3.3,
            line_width_end: 1.0,
            blur_factor: 1.0,
            alpha_exponent: 0.0,
            device_pixel_ratio: 1.0,
        }
    }
}
