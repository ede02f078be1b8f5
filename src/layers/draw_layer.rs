//! Drawing layer: annotations placed on slices of one dataset.

use serde::{Deserialize, Serialize};

use super::{LayerId, LayerTransform, Point};

/// One annotation shape on a given slice and frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: u64,
    pub slice: usize,
    pub frame: usize,
    /// Shape name, e.g. "Rectangle" or "Ruler".
    pub shape: String,
    /// Control points in index space.
    pub points: Vec<Point>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Summary of a drawing for display lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawingDetails {
    pub id: u64,
    pub shape: String,
    pub slice: usize,
    pub frame: usize,
    pub number_of_points: usize,
    pub visible: bool,
}

/// Layer holding the drawings of one data slot.
#[derive(Debug)]
pub struct DrawLayer {
    id: LayerId,
    data_index: usize,
    active: bool,
    visible: bool,
    drawings: Vec<Drawing>,
    next_drawing_id: u64,
    transform: LayerTransform,
}

impl DrawLayer {
    pub fn new(id: LayerId, data_index: usize) -> Self {
        Self {
            id,
            data_index,
            active: false,
            visible: true,
            drawings: Vec::new(),
            next_drawing_id: 0,
            transform: LayerTransform::identity(),
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

    pub fn transform(&self) -> &LayerTransform {
        &self.transform
    }

    pub(super) fn set_transform(&mut self, transform: LayerTransform) {
        self.transform = transform;
    }

    /// Reserve an id for a drawing about to be created.
    pub fn next_drawing_id(&mut self) -> u64 {
        let id = self.next_drawing_id;
        self.next_drawing_id += 1;
        id
    }

    /// Add a drawing. Ids are kept unique by replacing any drawing with the same id.
    pub fn add(&mut self, drawing: Drawing) {
        self.next_drawing_id = self.next_drawing_id.max(drawing.id + 1);
        self.drawings.retain(|d| d.id != drawing.id);
        self.drawings.push(drawing);
    }

    /// Put back a previously removed drawing at its original place in the list.
    pub fn restore(&mut self, index: usize, drawing: Drawing) {
        self.next_drawing_id = self.next_drawing_id.max(drawing.id + 1);
        self.drawings.retain(|d| d.id != drawing.id);
        let index = index.min(self.drawings.len());
        self.drawings.insert(index, drawing);
    }

    /// Remove a drawing, returning it with its list index.
    pub fn remove(&mut self, id: u64) -> Option<(usize, Drawing)> {
        let index = self.drawings.iter().position(|d| d.id == id)?;
        Some((index, self.drawings.remove(index)))
    }

    /// Remove every drawing and return them in list order.
    pub fn delete_all(&mut self) -> Vec<Drawing> {
        std::mem::take(&mut self.drawings)
    }

    pub fn get(&self, id: u64) -> Option<&Drawing> {
        self.drawings.iter().find(|d| d.id == id)
    }

    pub fn drawings(&self) -> &[Drawing] {
        &self.drawings
    }

    /// Drawings shown at a slice and frame.
    pub fn drawings_at(&self, slice: usize, frame: usize) -> impl Iterator<Item = &Drawing> {
        self.drawings
            .iter()
            .filter(move |d| d.visible && d.slice == slice && d.frame == frame)
    }

    pub fn number_of_drawings(&self) -> usize {
        self.drawings.len()
    }

    pub fn display_details(&self) -> Vec<DrawingDetails> {
        self.drawings
            .iter()
            .map(|d| DrawingDetails {
                id: d.id,
                shape: d.shape.clone(),
                slice: d.slice,
                frame: d.frame,
                number_of_points: d.points.len(),
                visible: d.visible,
            })
            .collect()
    }

    /// Toggle one drawing. Returns the new visibility, or `None` for an unknown id.
    pub fn toggle_visibility(&mut self, id: u64) -> Option<bool> {
        let drawing = self.drawings.iter_mut().find(|d| d.id == id)?;
        drawing.visible = !drawing.visible;
        Some(drawing.visible)
    }

    /// Group visibility of the whole layer.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle_layer_visibility(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drawing(layer: &mut DrawLayer, slice: usize) -> Drawing {
        Drawing {
            id: layer.next_drawing_id(),
            slice,
            frame: 0,
            shape: "Rectangle".to_string(),
            points: vec![Point::new(0.0, 0.0), Point::new(4.0, 4.0)],
            visible: true,
        }
    }

    #[test]
    fn test_add_remove_restore_keeps_order() {
        let mut layer = DrawLayer::new(LayerId::new(1), 0);
        for k in 0..3 {
            let d = drawing(&mut layer, k);
            layer.add(d);
        }

        let (index, removed) = layer.remove(1).unwrap();
        assert_eq!(index, 1);
        assert_eq!(layer.number_of_drawings(), 2);

        layer.restore(index, removed);
        let ids: Vec<u64> = layer.drawings().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(layer.remove(9).is_none());
    }

    #[test]
    fn test_ids_stay_unique_after_restore() {
        let mut layer = DrawLayer::new(LayerId::new(1), 0);
        let d = Drawing {
            id: 5,
            ..drawing(&mut layer, 0)
        };
        layer.add(d);
        assert_eq!(layer.next_drawing_id(), 6);
    }

    #[test]
    fn test_visibility_and_filtering() {
        let mut layer = DrawLayer::new(LayerId::new(1), 0);
        let a = drawing(&mut layer, 0);
        let b = drawing(&mut layer, 1);
        layer.add(a);
        layer.add(b);

        assert_eq!(layer.drawings_at(0, 0).count(), 1);
        assert_eq!(layer.toggle_visibility(0), Some(false));
        assert_eq!(layer.drawings_at(0, 0).count(), 0);
        assert_eq!(layer.toggle_visibility(42), None);

        let details = layer.display_details();
        assert_eq!(details.len(), 2);
        assert!(!details[0].visible);
        assert_eq!(details[1].number_of_points, 2);
    }

    #[test]
    fn test_delete_all_returns_drawings() {
        let mut layer = DrawLayer::new(LayerId::new(1), 0);
        let a = drawing(&mut layer, 0);
        layer.add(a);
        let removed = layer.delete_all();
        assert_eq!(removed.len(), 1);
        assert_eq!(layer.number_of_drawings(), 0);
    }
}
