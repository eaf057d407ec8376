//! A single period layer: square backing pixmap with a centered origin and
//! its own stroke style.

use tiny_skia::{Color, Paint, PathBuilder, Pixmap, Stroke, Transform};

use super::VisualizerError;

/// One independently styled drawing surface in the layer stack.
///
/// Polar math addresses the surface relative to (0, 0) at its center; the
/// origin transform re-bases that onto the pixmap at stroke time. The blur
/// radius is carried as style and applied by the compositor.
pub struct LayerSurface {
    pixmap: Pixmap,
    path: PathBuilder,
    origin: Transform,
    stroke_color: Color,
    line_width: f32,
    blur_px: f32,
}

impl LayerSurface {
    pub fn new(side_px: u32) -> Result<Self, VisualizerError> {
        let pixmap = Pixmap::new(side_px, side_px).ok_or(VisualizerError::ZeroSurface)?;
        Ok(Self {
            pixmap,
            path: PathBuilder::new(),
            origin: center_origin(side_px),
            stroke_color: Color::WHITE,
            line_width: 1.0,
            blur_px: 0.0,
        })
    }

    /// Reallocate the backing store for a new side length and recenter the
    /// origin. Idempotent: the same side yields the same dimensions and
    /// origin transform.
    pub fn resize(&mut self, side_px: u32) -> Result<(), VisualizerError> {
        self.pixmap = Pixmap::new(side_px, side_px).ok_or(VisualizerError::ZeroSurface)?;
        self.origin = center_origin(side_px);
        self.path = PathBuilder::new();
        Ok(())
    }

    pub fn set_style(&mut self, stroke_color: Color, line_width: f32, blur_px: f32) {
        self.stroke_color = stroke_color;
        self.line_width = line_width;
        self.blur_px = blur_px;
    }

    /// Begin accumulating a fresh path for this frame
    pub fn begin_path(&mut self) {
        self.path = PathBuilder::new();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(x, y);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(x, y);
    }

    /// Stroke the accumulated path once and close it out
    pub fn stroke(&mut self) {
        let builder = std::mem::replace(&mut self.path, PathBuilder::new());
        let Some(path) = builder.finish() else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(self.stroke_color);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: self.line_width,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, self.origin, None);
    }

    /// Erase the full drawable box
    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn side_px(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn blur_px(&self) -> f32 {
        self.blur_px
    }
}

fn center_origin(side_px: u32) -> Transform {
    let center = side_px as f32 / 2.0;
    Transform::from_translate(center, center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_side_is_rejected() {
        assert!(matches!(
            LayerSurface::new(0),
            Err(VisualizerError::ZeroSurface)
        ));
    }

    #[test]
    fn resize_is_idempotent() {
        let mut layer = LayerSurface::new(64).unwrap();
        layer.resize(128).unwrap();
        let (side_once, origin_once) = (layer.side_px(), layer.origin);

        layer.resize(128).unwrap();
        assert_eq!(layer.side_px(), side_once);
        assert_eq!(layer.origin, origin_once);
        assert_eq!(layer.pixmap.height(), 128);
    }

    #[test]
    fn stroke_marks_pixels_relative_to_center() {
        let mut layer = LayerSurface::new(64).unwrap();
        layer.set_style(Color::WHITE, 2.0, 0.0);
        layer.begin_path();
        layer.move_to(-10.0, 0.0);
        layer.line_to(10.0, 0.0);
        layer.stroke();

        let center = layer.pixmap.pixel(32, 32).unwrap();
        assert!(center.alpha() > 0);
    }

    #[test]
    fn clear_erases_everything() {
        let mut layer = LayerSurface::new(64).unwrap();
        layer.begin_path();
        layer.move_to(-10.0, 0.0);
        layer.line_to(10.0, 0.0);
        layer.stroke();
        layer.clear();

        let center = layer.pixmap.pixel(32, 32).unwrap();
        assert_eq!(center.alpha(), 0);
    }
}
