//! Perceptual gradient stepping for per-layer stroke colors.

use palette::{Clamp, FromColor, Mix, Oklab, Oklch, Srgb};
use tiny_skia::Color;

use crate::params::InterpolationSpace;

/// Discretize the gradient between two endpoints into an ordered sequence
/// of stroke colors.
///
/// Produces exactly `min_steps` colors (at least two); the first equals the
/// start endpoint and the last equals the end endpoint.
pub fn color_steps(
    start: Oklch,
    end: Oklch,
    space: InterpolationSpace,
    min_steps: usize,
) -> Vec<Color> {
    let count = min_steps.max(2);
    (0..count)
        .map(|step| {
            let t = step as f32 / (count - 1) as f32;
            let mixed = match space {
                InterpolationSpace::Oklch => start.mix(end, t),
                InterpolationSpace::Oklab => {
                    Oklch::from_color(Oklab::from_color(start).mix(Oklab::from_color(end), t))
                }
            };
            to_stroke_color(mixed)
        })
        .collect()
}

/// Pick the gradient step for a layer: position `layer / layer_count`
/// scaled across the step sequence.
pub fn stroke_color(steps: &[Color], layer: usize, layer_count: usize) -> Color {
    if steps.is_empty() || layer_count == 0 {
        return Color::WHITE;
    }
    let position = (layer as f32 / layer_count as f32) * steps.len() as f32;
    steps[(position as usize).min(steps.len() - 1)]
}

fn to_stroke_color(color: Oklch) -> Color {
    // gamut-clamp before leaving the perceptual space
    let rgb: Srgb = Srgb::from_color(color).clamp();
    Color::from_rgba(rgb.red, rgb.green, rgb.blue, 1.0).unwrap_or(Color::WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> (Oklch, Oklch) {
        (Oklch::new(0.5, 0.3, 290.0), Oklch::new(0.8, 0.24, 220.0))
    }

    #[test]
    fn produces_min_steps_with_endpoints_preserved() {
        let (start, end) = endpoints();
        let steps = color_steps(start, end, InterpolationSpace::Oklch, 16);

        assert_eq!(steps.len(), 16);
        assert_eq!(steps[0], to_stroke_color(start));
        assert_eq!(steps[15], to_stroke_color(end));
    }

    #[test]
    fn endpoints_preserved_in_oklab_space() {
        let (start, end) = endpoints();
        let steps = color_steps(start, end, InterpolationSpace::Oklab, 16);

        assert_eq!(steps.len(), 16);
        assert_eq!(steps[0], to_stroke_color(start));
        assert_eq!(steps[15], to_stroke_color(end));
    }

    #[test]
    fn never_fewer_than_two_steps() {
        let (start, end) = endpoints();
        let steps = color_steps(start, end, InterpolationSpace::Oklch, 0);
        assert_eq!(steps.len(), 2);
    }

    #[test]
    fn stroke_color_spans_layers() {
        let (start, end) = endpoints();
        let steps = color_steps(start, end, InterpolationSpace::Oklch, 16);

        assert_eq!(stroke_color(&steps, 0, 6), steps[0]);
        // layer 5 of 6 -> position 5/6 * 16 = 13.33 -> step 13
        assert_eq!(stroke_color(&steps, 5, 6), steps[13]);
    }

    #[test]
    fn stroke_color_on_empty_steps_is_white() {
        assert_eq!(stroke_color(&[], 0, 6), Color::WHITE);
    }
}
