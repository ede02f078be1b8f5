//! Concrete undoable edits.

use super::{Command, EditContext};
use crate::data::Volume;
use crate::layers::{Drawing, LayerId};

/// Add one drawing to a draw layer.
#[derive(Debug, Clone)]
pub struct DrawCommand {
    layer: LayerId,
    drawing: Drawing,
    /// List index the drawing had when it was last removed.
    index: Option<usize>,
}

impl DrawCommand {
    pub fn new(layer: LayerId, drawing: Drawing) -> Self {
        Self {
            layer,
            drawing,
            index: None,
        }
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }
}

impl Command for DrawCommand {
    fn name(&self) -> String {
        format!("Draw {}", self.drawing.shape)
    }

    fn execute(&mut self, ctx: &mut EditContext<'_>) {
        let Some(layer) = ctx.layers.draw_layer_mut(self.layer) else {
            log::warn!("DrawCommand: no draw layer {}", self.layer);
            return;
        };
        match self.index {
            Some(index) => layer.restore(index, self.drawing.clone()),
            None => layer.add(self.drawing.clone()),
        }
    }

    fn undo(&mut self, ctx: &mut EditContext<'_>) {
        let Some(layer) = ctx.layers.draw_layer_mut(self.layer) else {
            log::warn!("DrawCommand: no draw layer {}", self.layer);
            return;
        };
        if let Some((index, drawing)) = layer.remove(self.drawing.id) {
            self.index = Some(index);
            self.drawing = drawing;
        }
    }
}

/// Remove every drawing of a draw layer.
#[derive(Debug, Clone)]
pub struct DeleteDrawingsCommand {
    layer: LayerId,
    removed: Vec<Drawing>,
}

impl DeleteDrawingsCommand {
    pub fn new(layer: LayerId) -> Self {
        Self {
            layer,
            removed: Vec::new(),
        }
    }

    pub fn number_of_drawings(&self) -> usize {
        self.removed.len()
    }
}

impl Command for DeleteDrawingsCommand {
    fn name(&self) -> String {
        format!("Delete {} drawing(s)", self.removed.len())
    }

    fn execute(&mut self, ctx: &mut EditContext<'_>) {
        if let Some(layer) = ctx.layers.draw_layer_mut(self.layer) {
            self.removed = layer.delete_all();
        }
    }

    fn undo(&mut self, ctx: &mut EditContext<'_>) {
        if let Some(layer) = ctx.layers.draw_layer_mut(self.layer) {
            for (index, drawing) in self.removed.iter().enumerate() {
                layer.restore(index, drawing.clone());
            }
        }
    }
}

/// Swap the image of a data slot, notifying the layers registered for it.
#[derive(Debug, Clone)]
pub struct ReplaceImageCommand {
    data_index: usize,
    /// The image not currently in the slot.
    other: Volume,
}

impl ReplaceImageCommand {
    pub fn new(data_index: usize, image: Volume) -> Self {
        Self {
            data_index,
            other: image,
        }
    }

    fn swap(&mut self, ctx: &mut EditContext<'_>) {
        let Some(image) = ctx.data.image_mut(self.data_index) else {
            log::warn!("ReplaceImageCommand: no data slot {}", self.data_index);
            return;
        };
        std::mem::swap(image, &mut self.other);
        let Some(slot) = ctx.data.get(self.data_index) else {
            return;
        };
        for id in ctx.data.image_listeners(self.data_index) {
            ctx.layers.on_image_change(*id, &slot.image);
        }
    }
}

impl Command for ReplaceImageCommand {
    fn name(&self) -> String {
        format!("Replace image {}", self.data_index)
    }

    fn execute(&mut self, ctx: &mut EditContext<'_>) {
        self.swap(ctx);
    }

    fn undo(&mut self, ctx: &mut EditContext<'_>) {
        self.swap(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSlotRegistry, MetaData, Slice};
    use crate::layers::{LayerManager, Point};
    use ndarray::Array2;

    fn drawing(id: u64) -> Drawing {
        Drawing {
            id,
            slice: 0,
            frame: 0,
            shape: "Ruler".to_string(),
            points: vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            visible: true,
        }
    }

    fn volume(slices: usize) -> Volume {
        let slices = (0..slices)
            .map(|k| Slice::single_frame(k as f64, Array2::zeros((4, 4))))
            .collect();
        Volume::from_slices(slices).unwrap()
    }

    #[test]
    fn test_draw_command_round_trip() {
        let mut data = DataSlotRegistry::new();
        let mut layers = LayerManager::new((10.0, 10.0), 3.0);
        let draw = layers.add_draw_layer(0);
        let mut ctx = EditContext {
            data: &mut data,
            layers: &mut layers,
        };

        let mut first = DrawCommand::new(draw, drawing(0));
        let mut second = DrawCommand::new(draw, drawing(1));
        first.execute(&mut ctx);
        second.execute(&mut ctx);
        first.undo(&mut ctx);
        assert_eq!(ctx.layers.draw_layer(draw).unwrap().number_of_drawings(), 1);

        first.execute(&mut ctx);
        let ids: Vec<u64> = ctx
            .layers
            .draw_layer(draw)
            .unwrap()
            .drawings()
            .iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(first.name(), "Draw Ruler");
    }

    #[test]
    fn test_delete_drawings_undo_restores_all() {
        let mut data = DataSlotRegistry::new();
        let mut layers = LayerManager::new((10.0, 10.0), 3.0);
        let draw = layers.add_draw_layer(0);
        for id in 0..3 {
            layers.draw_layer_mut(draw).unwrap().add(drawing(id));
        }
        let mut ctx = EditContext {
            data: &mut data,
            layers: &mut layers,
        };

        let mut command = DeleteDrawingsCommand::new(draw);
        command.execute(&mut ctx);
        assert_eq!(command.number_of_drawings(), 3);
        assert_eq!(ctx.layers.draw_layer(draw).unwrap().number_of_drawings(), 0);

        command.undo(&mut ctx);
        assert_eq!(ctx.layers.draw_layer(draw).unwrap().number_of_drawings(), 3);
    }

    #[test]
    fn test_replace_image_notifies_layers() {
        let mut data = DataSlotRegistry::new();
        let mut layers = LayerManager::new((10.0, 10.0), 3.0);
        let index = data.add_new(volume(1), MetaData::new());
        let view = layers.add_view_layer(index);
        layers.initialise(&volume(1), &MetaData::new(), index);
        data.add_image_listener(index, view);
        let mut ctx = EditContext {
            data: &mut data,
            layers: &mut layers,
        };

        let mut command = ReplaceImageCommand::new(index, volume(5));
        command.execute(&mut ctx);
        assert_eq!(ctx.data.get(index).unwrap().image.number_of_slices(), 5);
        assert_eq!(
            ctx.layers.view_layer(view).unwrap().view().number_of_slices(),
            5
        );

        command.undo(&mut ctx);
        assert_eq!(ctx.data.get(index).unwrap().image.number_of_slices(), 1);
        assert_eq!(
            ctx.layers.view_layer(view).unwrap().view().number_of_slices(),
            1
        );
    }

    #[test]
    fn test_replace_image_without_slot_keeps_image() {
        let mut data = DataSlotRegistry::new();
        let mut layers = LayerManager::new((10.0, 10.0), 3.0);
        let mut command = ReplaceImageCommand::new(0, volume(5));
        {
            let mut ctx = EditContext {
                data: &mut data,
                layers: &mut layers,
            };
            command.execute(&mut ctx);
        }
        assert!(data.is_empty());

        let index = data.add_new(volume(1), MetaData::new());
        let mut ctx = EditContext {
            data: &mut data,
            layers: &mut layers,
        };
        command.execute(&mut ctx);
        assert_eq!(ctx.data.get(index).unwrap().image.number_of_slices(), 5);
    }
}
