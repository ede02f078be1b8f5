//! Layer group: creation, activation, shared geometry and event binding.

use super::{DrawLayer, LayerId, LayerTransform, Point, Scale, ViewLayer};
use crate::data::{MetaData, Volume};
use crate::events::{Event, EventBus};

/// Metadata keys holding the physical pixel spacing.
const COLUMN_SPACING_KEY: &str = "ColumnSpacing";
const ROW_SPACING_KEY: &str = "RowSpacing";

/// A layer owned by the [`LayerManager`].
#[derive(Debug)]
pub enum Layer {
    View(ViewLayer),
    Draw(DrawLayer),
}

impl Layer {
    pub fn id(&self) -> LayerId {
        match self {
            Layer::View(layer) => layer.id(),
            Layer::Draw(layer) => layer.id(),
        }
    }

    pub fn data_index(&self) -> usize {
        match self {
            Layer::View(layer) => layer.data_index(),
            Layer::Draw(layer) => layer.data_index(),
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Layer::View(layer) => layer.is_active(),
            Layer::Draw(layer) => layer.is_active(),
        }
    }

    fn set_transform(&mut self, transform: LayerTransform) {
        match self {
            Layer::View(layer) => layer.set_transform(transform),
            Layer::Draw(layer) => layer.set_transform(transform),
        }
    }
}

/// Owns every layer and the geometry they share.
///
/// At most one view layer and one draw layer are active at a time; the layer
/// added last of each kind becomes the active one. Zoom and offset apply to all
/// layers at once and are published as `zoomchange`/`offsetchange` once the
/// group is bound with [`propagate_events`](Self::propagate_events).
#[derive(Debug)]
pub struct LayerManager {
    layers: Vec<Layer>,
    active_view: Option<LayerId>,
    active_draw: Option<LayerId>,
    next_id: u64,
    transform: LayerTransform,
    fitted: LayerTransform,
    container_size: (f64, f64),
    image_size: Option<(usize, usize)>,
    spacing: (f64, f64),
    max_zoom_factor: f64,
    propagation: Option<EventBus>,
}

impl LayerManager {
    pub fn new(container_size: (f64, f64), max_zoom_factor: f64) -> Self {
        Self {
            layers: Vec::new(),
            active_view: None,
            active_draw: None,
            next_id: 0,
            transform: LayerTransform::identity(),
            fitted: LayerTransform::identity(),
            container_size,
            image_size: None,
            spacing: (1.0, 1.0),
            max_zoom_factor,
            propagation: None,
        }
    }

    fn allocate_id(&mut self) -> LayerId {
        let id = LayerId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Add a view layer for a data slot. It becomes the active view layer.
    pub fn add_view_layer(&mut self, data_index: usize) -> LayerId {
        let id = self.allocate_id();
        let mut layer = ViewLayer::new(id, data_index);
        layer.set_transform(self.transform);
        layer.set_active(true);
        for existing in &mut self.layers {
            if let Layer::View(view) = existing {
                view.set_active(false);
            }
        }
        self.layers.push(Layer::View(layer));
        self.active_view = Some(id);
        log::debug!("LayerManager: added view {} for data {}", id, data_index);
        id
    }

    /// Add a draw layer for a data slot. It becomes the active draw layer.
    pub fn add_draw_layer(&mut self, data_index: usize) -> LayerId {
        let id = self.allocate_id();
        let mut layer = DrawLayer::new(id, data_index);
        layer.set_transform(self.transform);
        layer.set_active(true);
        for existing in &mut self.layers {
            if let Layer::Draw(draw) = existing {
                draw.set_active(false);
            }
        }
        self.layers.push(Layer::Draw(layer));
        self.active_draw = Some(id);
        log::debug!("LayerManager: added draw {} for data {}", id, data_index);
        id
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn view_layer(&self, id: LayerId) -> Option<&ViewLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::View(view) if view.id() == id => Some(view),
            _ => None,
        })
    }

    pub fn view_layer_mut(&mut self, id: LayerId) -> Option<&mut ViewLayer> {
        self.layers.iter_mut().find_map(|l| match l {
            Layer::View(view) if view.id() == id => Some(view),
            _ => None,
        })
    }

    pub fn draw_layer(&self, id: LayerId) -> Option<&DrawLayer> {
        self.layers.iter().find_map(|l| match l {
            Layer::Draw(draw) if draw.id() == id => Some(draw),
            _ => None,
        })
    }

    pub fn draw_layer_mut(&mut self, id: LayerId) -> Option<&mut DrawLayer> {
        self.layers.iter_mut().find_map(|l| match l {
            Layer::Draw(draw) if draw.id() == id => Some(draw),
            _ => None,
        })
    }

    pub fn active_view_id(&self) -> Option<LayerId> {
        self.active_view
    }

    pub fn active_draw_id(&self) -> Option<LayerId> {
        self.active_draw
    }

    pub fn active_view_layer(&self) -> Option<&ViewLayer> {
        self.active_view.and_then(|id| self.view_layer(id))
    }

    pub fn active_view_layer_mut(&mut self) -> Option<&mut ViewLayer> {
        let id = self.active_view?;
        self.view_layer_mut(id)
    }

    pub fn active_draw_layer(&self) -> Option<&DrawLayer> {
        self.active_draw.and_then(|id| self.draw_layer(id))
    }

    pub fn active_draw_layer_mut(&mut self) -> Option<&mut DrawLayer> {
        let id = self.active_draw?;
        self.draw_layer_mut(id)
    }

    pub fn number_of_layers(&self) -> usize {
        self.layers.len()
    }

    /// Drop every layer and forget the image geometry and group binding.
    pub fn empty(&mut self) {
        log::debug!("LayerManager: empty ({} layer(s))", self.layers.len());
        for layer in &mut self.layers {
            if let Layer::View(view) = layer {
                view.unbind();
            }
        }
        self.layers.clear();
        self.active_view = None;
        self.active_draw = None;
        self.image_size = None;
        self.spacing = (1.0, 1.0);
        self.transform = LayerTransform::identity();
        self.fitted = LayerTransform::identity();
        self.propagation = None;
    }

    /// Set up the layers of `data_index` for an image and fit the group.
    pub fn initialise(&mut self, image: &Volume, meta: &MetaData, data_index: usize) {
        self.image_size = Some((image.columns(), image.rows()));
        self.spacing = (
            meta.get_f64(COLUMN_SPACING_KEY).unwrap_or(1.0),
            meta.get_f64(ROW_SPACING_KEY).unwrap_or(1.0),
        );
        for layer in &mut self.layers {
            if let Layer::View(view) = layer
                && view.data_index() == data_index
            {
                view.initialise(image);
            }
        }
        self.fit_to_container();
    }

    /// Initialise a single view layer without touching the group geometry.
    pub fn initialise_view_layer(&mut self, id: LayerId, image: &Volume) -> bool {
        match self.view_layer_mut(id) {
            Some(view) => {
                view.initialise(image);
                true
            }
            None => false,
        }
    }

    pub fn set_container_size(&mut self, size: (f64, f64)) {
        self.container_size = size;
        self.fit_to_container();
    }

    pub fn container_size(&self) -> (f64, f64) {
        self.container_size
    }

    /// Fit the image into the container at zoom 1.
    pub fn fit_to_container(&mut self) {
        let Some(image_size) = self.image_size else {
            return;
        };
        self.fitted = LayerTransform::fit(self.container_size, image_size, self.spacing);
        self.set_transform(self.fitted);
        self.fire_zoom();
        self.fire_offset();
    }

    /// Back to the fitted layout.
    pub fn reset(&mut self) {
        self.set_transform(self.fitted);
        self.fire_zoom();
        self.fire_offset();
    }

    /// Zoom by `step` (relative, 0.1 = +10%) around a display point.
    ///
    /// Zooming in past `max_zoom_factor` times the base scale is refused.
    pub fn add_scale(&mut self, step: f64, center: Point) -> bool {
        let new_zoom = self.transform.zoom * (1.0 + step);
        if new_zoom <= 0.0 {
            return false;
        }
        if step > 0.0 && new_zoom > self.max_zoom_factor {
            log::trace!("LayerManager: zoom {:.3} above limit", new_zoom);
            return false;
        }
        let transform = self.transform.zoom_to_point(new_zoom, center);
        self.set_transform(transform);
        self.fire_zoom();
        self.fire_offset();
        true
    }

    /// Pan by a display-space delta.
    pub fn add_translation(&mut self, delta: Point) {
        let transform = self.transform.pan_by(delta.x, delta.y);
        self.set_transform(transform);
        self.fire_offset();
    }

    /// Restore a zoom and offset, e.g. from a saved state.
    pub fn set_zoom_and_offset(&mut self, zoom: f64, offset: Point) {
        let transform = LayerTransform {
            zoom,
            offset,
            ..self.transform
        };
        self.set_transform(transform);
        self.fire_zoom();
        self.fire_offset();
    }

    pub fn base_scale(&self) -> Scale {
        self.transform.base_scale
    }

    pub fn added_scale(&self) -> f64 {
        self.transform.zoom
    }

    /// Largest zoom relative to the fitted scale.
    pub fn max_zoom_factor(&self) -> f64 {
        self.max_zoom_factor
    }

    pub fn scale(&self) -> Scale {
        self.transform.scale()
    }

    pub fn offset(&self) -> Point {
        self.transform.offset
    }

    pub fn transform(&self) -> &LayerTransform {
        &self.transform
    }

    pub fn display_to_index(&self, point: Point) -> Point {
        self.transform.display_to_index(point)
    }

    fn set_transform(&mut self, transform: LayerTransform) {
        self.transform = transform;
        for layer in &mut self.layers {
            layer.set_transform(transform);
        }
    }

    /// Give one layer the current group geometry.
    pub fn apply_group_transform(&mut self, id: LayerId) -> bool {
        let transform = self.transform;
        match self.layers.iter_mut().find(|l| l.id() == id) {
            Some(layer) => {
                layer.set_transform(transform);
                true
            }
            None => false,
        }
    }

    /// Render pass over every view layer. Returns the number of layers drawn.
    pub fn draw(&mut self) -> usize {
        let mut drawn = 0;
        for layer in &mut self.layers {
            if let Layer::View(view) = layer {
                view.render();
                drawn += 1;
            }
        }
        drawn
    }

    /// Bind a view layer's navigation events. Binding twice is a no-op.
    pub fn bind_view_layer(&mut self, id: LayerId, bus: &EventBus) -> bool {
        match self.view_layer_mut(id) {
            Some(view) => view.bind(bus),
            None => false,
        }
    }

    /// Unbind a view layer. Unbinding an unbound layer is a no-op.
    pub fn unbind_view_layer(&mut self, id: LayerId) -> bool {
        match self.view_layer_mut(id) {
            Some(view) => view.unbind(),
            None => false,
        }
    }

    /// Publish group geometry changes on `bus`. Returns false if already bound to it.
    pub fn propagate_events(&mut self, bus: &EventBus) -> bool {
        if self.propagation.as_ref().is_some_and(|b| b.same_bus(bus)) {
            return false;
        }
        self.propagation = Some(bus.clone());
        true
    }

    /// Image of a layer's data slot changed.
    pub fn on_image_change(&mut self, id: LayerId, image: &Volume) -> bool {
        match self.view_layer_mut(id) {
            Some(view) => {
                view.on_image_change(image);
                true
            }
            None => false,
        }
    }

    fn fire_zoom(&self) {
        if let Some(bus) = &self.propagation {
            bus.fire(&Event::ZoomChange {
                scale: self.transform.scale(),
            });
        }
    }

    fn fire_offset(&self) {
        if let Some(bus) = &self.propagation {
            bus.fire(&Event::OffsetChange {
                offset: self.transform.offset,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Slice;
    use crate::events::EventType;
    use ndarray::Array2;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn image() -> Volume {
        Volume::from_slice(Slice::single_frame(0.0, Array2::zeros((50, 100))))
    }

    fn manager_with_view() -> (LayerManager, LayerId) {
        let mut manager = LayerManager::new((400.0, 400.0), 3.0);
        let id = manager.add_view_layer(0);
        manager.initialise(&image(), &MetaData::new(), 0);
        (manager, id)
    }

    #[test]
    fn test_last_added_view_layer_is_active() {
        let mut manager = LayerManager::new((100.0, 100.0), 3.0);
        let first = manager.add_view_layer(0);
        let second = manager.add_view_layer(1);
        let draw = manager.add_draw_layer(0);

        assert_eq!(manager.active_view_id(), Some(second));
        assert_eq!(manager.active_draw_id(), Some(draw));
        assert!(!manager.view_layer(first).unwrap().is_active());
        assert_eq!(manager.number_of_layers(), 3);
    }

    #[test]
    fn test_empty_drops_layers_and_geometry() {
        let (mut manager, _) = manager_with_view();
        manager.add_scale(0.5, Point::new(0.0, 0.0));
        manager.empty();

        assert_eq!(manager.number_of_layers(), 0);
        assert!(manager.active_view_layer().is_none());
        assert_eq!(manager.added_scale(), 1.0);
        assert_eq!(manager.offset(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_zoom_is_bounded_for_positive_steps() {
        let (mut manager, _) = manager_with_view();
        assert!(manager.add_scale(1.0, Point::new(200.0, 200.0)));
        assert!(!manager.add_scale(1.0, Point::new(200.0, 200.0)));
        assert_eq!(manager.added_scale(), 2.0);
        assert!(manager.add_scale(-0.5, Point::new(200.0, 200.0)));
        assert_eq!(manager.added_scale(), 1.0);
    }

    #[test]
    fn test_geometry_applies_to_every_layer() {
        let (mut manager, view) = manager_with_view();
        let draw = manager.add_draw_layer(0);
        manager.add_translation(Point::new(10.0, 5.0));

        let view_offset = manager.view_layer(view).unwrap().transform().offset;
        let draw_offset = manager.draw_layer(draw).unwrap().transform().offset;
        assert_eq!(view_offset, manager.offset());
        assert_eq!(draw_offset, manager.offset());
    }

    #[test]
    fn test_reset_restores_fitted_layout() {
        let (mut manager, _) = manager_with_view();
        let fitted = manager.offset();
        manager.add_scale(0.5, Point::new(10.0, 10.0));
        manager.add_translation(Point::new(3.0, 3.0));
        manager.reset();
        assert_eq!(manager.offset(), fitted);
        assert_eq!(manager.added_scale(), 1.0);
    }

    #[test]
    fn test_group_events_only_when_propagating() {
        let bus = EventBus::new();
        let zooms = Rc::new(RefCell::new(0));
        let z = Rc::clone(&zooms);
        bus.add(EventType::ZoomChange, move |_| *z.borrow_mut() += 1);

        let (mut manager, _) = manager_with_view();
        manager.add_scale(0.1, Point::new(0.0, 0.0));
        assert_eq!(*zooms.borrow(), 0);

        assert!(manager.propagate_events(&bus));
        assert!(!manager.propagate_events(&bus));
        manager.add_scale(0.1, Point::new(0.0, 0.0));
        assert_eq!(*zooms.borrow(), 1);
    }

    #[test]
    fn test_bind_is_idempotent() {
        let bus = EventBus::new();
        let (mut manager, view) = manager_with_view();
        assert!(manager.bind_view_layer(view, &bus));
        assert!(!manager.bind_view_layer(view, &bus));
        assert!(manager.unbind_view_layer(view));
        assert!(!manager.unbind_view_layer(view));
        assert!(!manager.bind_view_layer(LayerId::new(99), &bus));
    }

    #[test]
    fn test_display_to_index_uses_fit() {
        let (manager, _) = manager_with_view();
        // 100x50 in 400x400: scale 4, vertical offset 100.
        let index = manager.display_to_index(Point::new(200.0, 200.0));
        assert_eq!(index, Point::new(50.0, 25.0));
    }

    #[test]
    fn test_draw_renders_view_layers() {
        let (mut manager, view) = manager_with_view();
        manager.add_draw_layer(0);
        assert_eq!(manager.draw(), 1);
        assert_eq!(manager.view_layer(view).unwrap().draw_count(), 1);
    }
}
