//! Image view layer: navigation state of one dataset.

use super::{LayerId, LayerTransform, Position};
use crate::data::Volume;
use crate::events::{Event, EventBus};

/// Navigation state of a view: current position, frame and play mode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewController {
    position: Position,
    frame: usize,
    number_of_slices: usize,
    number_of_frames: usize,
    playing: bool,
}

impl ViewController {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    pub fn number_of_slices(&self) -> usize {
        self.number_of_slices
    }

    pub fn number_of_frames(&self) -> usize {
        self.number_of_frames
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

/// Layer showing the image of one data slot.
///
/// Navigation events (`positionchange`, `framechange`, `renderstart`,
/// `renderend`) are only published while the layer is bound to a bus.
#[derive(Debug)]
pub struct ViewLayer {
    id: LayerId,
    data_index: usize,
    active: bool,
    opacity: f64,
    view: ViewController,
    propagation: Option<EventBus>,
    transform: LayerTransform,
    draw_count: usize,
}

impl ViewLayer {
    pub fn new(id: LayerId, data_index: usize) -> Self {
        Self {
            id,
            data_index,
            active: false,
            opacity: 1.0,
            view: ViewController::default(),
            propagation: None,
            transform: LayerTransform::identity(),
            draw_count: 0,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn data_index(&self) -> usize {
        self.data_index
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub(super) fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Set the opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn view(&self) -> &ViewController {
        &self.view
    }

    pub fn transform(&self) -> &LayerTransform {
        &self.transform
    }

    pub(super) fn set_transform(&mut self, transform: LayerTransform) {
        self.transform = transform;
    }

    /// Number of completed render passes.
    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Set up the view for an image: counts from the volume, position at the
    /// centre of the first slice.
    pub fn initialise(&mut self, image: &Volume) {
        self.view = ViewController {
            position: Position::new(image.columns() / 2, image.rows() / 2, 0),
            frame: 0,
            number_of_slices: image.number_of_slices(),
            number_of_frames: image.number_of_frames(),
            playing: false,
        };
        log::debug!(
            "ViewLayer {}: initialised on data {} ({} slice(s), {} frame(s))",
            self.id,
            self.data_index,
            self.view.number_of_slices,
            self.view.number_of_frames
        );
    }

    /// Refresh slice and frame counts after the image of the slot changed.
    pub fn on_image_change(&mut self, image: &Volume) {
        self.view.number_of_slices = image.number_of_slices();
        self.view.number_of_frames = image.number_of_frames();
        let last_slice = self.view.number_of_slices.saturating_sub(1);
        if self.view.position.k > last_slice {
            self.view.position.k = last_slice;
        }
        let last_frame = self.view.number_of_frames.saturating_sub(1);
        if self.view.frame > last_frame {
            self.view.frame = last_frame;
        }
    }

    /// Start publishing on `bus`. Returns false if already bound to it.
    pub fn bind(&mut self, bus: &EventBus) -> bool {
        if self.propagation.as_ref().is_some_and(|b| b.same_bus(bus)) {
            return false;
        }
        self.propagation = Some(bus.clone());
        true
    }

    /// Stop publishing. Returns false if the layer was not bound.
    pub fn unbind(&mut self) -> bool {
        self.propagation.take().is_some()
    }

    pub fn is_bound(&self) -> bool {
        self.propagation.is_some()
    }

    fn fire(&self, event: Event) {
        if let Some(bus) = &self.propagation {
            bus.fire(&event);
        }
    }

    /// Move to a position. Out of range slices are refused.
    ///
    /// A `silent` change does not publish `positionchange`.
    pub fn set_current_position(&mut self, position: Position, silent: bool) -> bool {
        if position.k >= self.view.number_of_slices.max(1) {
            log::debug!(
                "ViewLayer {}: slice {} out of range ({})",
                self.id,
                position.k,
                self.view.number_of_slices
            );
            return false;
        }
        if position == self.view.position {
            return true;
        }
        self.view.position = position;
        if !silent {
            self.fire(Event::PositionChange {
                data_index: self.data_index,
                position,
            });
        }
        true
    }

    pub fn set_current_frame(&mut self, frame: usize) -> bool {
        if frame >= self.view.number_of_frames.max(1) {
            return false;
        }
        if frame == self.view.frame {
            return true;
        }
        self.view.frame = frame;
        self.fire(Event::FrameChange {
            data_index: self.data_index,
            frame,
        });
        true
    }

    pub fn increment_slice(&mut self) -> bool {
        let position = self.view.position;
        self.set_current_position(position.with_k(position.k + 1), false)
    }

    pub fn decrement_slice(&mut self) -> bool {
        let position = self.view.position;
        match position.k.checked_sub(1) {
            Some(k) => self.set_current_position(position.with_k(k), false),
            None => false,
        }
    }

    pub fn increment_frame(&mut self) -> bool {
        self.set_current_frame(self.view.frame + 1)
    }

    pub fn decrement_frame(&mut self) -> bool {
        match self.view.frame.checked_sub(1) {
            Some(frame) => self.set_current_frame(frame),
            None => false,
        }
    }

    /// Start looping through frames (or slices for single-frame data).
    pub fn play(&mut self) {
        self.view.playing = true;
    }

    pub fn stop(&mut self) {
        self.view.playing = false;
    }

    /// Advance playback by one step, wrapping at the end. No-op when stopped.
    pub fn tick(&mut self) {
        if !self.view.playing {
            return;
        }
        if self.view.number_of_frames > 1 {
            let next = (self.view.frame + 1) % self.view.number_of_frames;
            self.set_current_frame(next);
        } else if self.view.number_of_slices > 1 {
            let position = self.view.position;
            let next = (position.k + 1) % self.view.number_of_slices;
            self.set_current_position(position.with_k(next), false);
        }
    }

    /// One render pass.
    pub fn render(&mut self) {
        self.fire(Event::RenderStart {
            data_index: self.data_index,
        });
        self.draw_count += 1;
        self.fire(Event::RenderEnd {
            data_index: self.data_index,
        });
    }
}
