//! Shared zoom/offset geometry of the layer group.
//!
//! Display coordinates are `index * scale + offset`, where `scale` is the
//! fitted base scale multiplied by the user zoom.

use super::{Point, Scale};

/// Zoom and offset applied uniformly to every layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTransform {
    /// Scale that fits the image into the container.
    pub base_scale: Scale,
    /// User zoom on top of the base scale (1.0 = fitted).
    pub zoom: f64,
    /// Display position of the image origin.
    pub offset: Point,
}

impl LayerTransform {
    pub fn new(base_scale: Scale, offset: Point) -> Self {
        Self {
            base_scale,
            zoom: 1.0,
            offset,
        }
    }

    pub fn identity() -> Self {
        Self::new(Scale::new(1.0, 1.0), Point::new(0.0, 0.0))
    }

    /// Total scale (base times zoom).
    pub fn scale(&self) -> Scale {
        Scale::new(self.base_scale.x * self.zoom, self.base_scale.y * self.zoom)
    }

    /// Zoom to `new_zoom` keeping the image point under `center` fixed.
    pub fn zoom_to_point(&self, new_zoom: f64, center: Point) -> LayerTransform {
        let ratio = new_zoom / self.zoom;
        LayerTransform {
            base_scale: self.base_scale,
            zoom: new_zoom,
            offset: Point::new(
                center.x - (center.x - self.offset.x) * ratio,
                center.y - (center.y - self.offset.y) * ratio,
            ),
        }
    }

    pub fn pan_by(&self, dx: f64, dy: f64) -> LayerTransform {
        LayerTransform {
            offset: Point::new(self.offset.x + dx, self.offset.y + dy),
            ..*self
        }
    }

    pub fn display_to_index(&self, point: Point) -> Point {
        let scale = self.scale();
        Point::new(
            (point.x - self.offset.x) / scale.x,
            (point.y - self.offset.y) / scale.y,
        )
    }

    pub fn index_to_display(&self, point: Point) -> Point {
        let scale = self.scale();
        Point::new(
            point.x * scale.x + self.offset.x,
            point.y * scale.y + self.offset.y,
        )
    }

    /// Transform that fits `image` (columns, rows) centred into `container`.
    ///
    /// `spacing` is the physical (column, row) pixel spacing; the image keeps
    /// its physical aspect ratio.
    pub fn fit(container: (f64, f64), image: (usize, usize), spacing: (f64, f64)) -> LayerTransform {
        let width = image.0 as f64 * spacing.0;
        let height = image.1 as f64 * spacing.1;
        if width <= 0.0 || height <= 0.0 {
            return LayerTransform::identity();
        }
        let fit = (container.0 / width).min(container.1 / height);
        let base_scale = Scale::new(fit * spacing.0, fit * spacing.1);
        let offset = Point::new(
            (container.0 - width * fit) / 2.0,
            (container.1 - height * fit) / 2.0,
        );
        LayerTransform::new(base_scale, offset)
    }
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self::identity()
    }
}
