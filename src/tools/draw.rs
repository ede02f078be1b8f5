//! Create drawings on the active draw layer.

use serde_json::json;

use super::{Interaction, Tool, ToolContext, ToolKind};
use crate::layers::{Drawing, Point};
use crate::undo::{Command, DrawCommand};

/// Shapes whose outline follows the pointer instead of two corner points.
const FREE_HAND_SHAPES: &[&str] = &["FreeHand", "Roi"];

/// Event published when a drawing is created.
pub const DRAW_CREATE_EVENT: &str = "drawcreate";

/// Press to start, drag, release to create a drawing of the selected shape.
///
/// Points are stored in index space. Each created drawing is one undoable
/// [`DrawCommand`].
#[derive(Debug, Default)]
pub struct DrawTool {
    points: Vec<Point>,
    drawing: bool,
}

impl DrawTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn cancel(&mut self) -> bool {
        let was_drawing = self.drawing;
        self.drawing = false;
        self.points.clear();
        was_drawing
    }

    fn is_free_hand(ctx: &ToolContext<'_>) -> bool {
        ctx.shape.is_some_and(|s| FREE_HAND_SHAPES.contains(&s))
    }

    /// Record a pointer position: free-hand shapes append, others move the end point.
    fn track(&mut self, point: Point, ctx: &ToolContext<'_>) {
        let index = ctx.edit.layers.display_to_index(point);
        if Self::is_free_hand(ctx) {
            self.points.push(index);
        } else if let Some(last) = self.points.last_mut() {
            *last = index;
        }
    }

    fn finish(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        self.drawing = false;
        let points = std::mem::take(&mut self.points);
        let Some(shape) = ctx.shape else {
            log::warn!("DrawTool: no shape selected");
            return false;
        };
        if points.len() < 2 || points.iter().all(|p| *p == points[0]) {
            log::trace!("DrawTool: degenerate {} discarded", shape);
            return false;
        }

        let (slice, frame) = match ctx.edit.layers.active_view_layer() {
            Some(view) => (view.view().position().k, view.view().frame()),
            None => (0, 0),
        };
        let layer = ctx.layer;
        let Some(draw_layer) = ctx.edit.layers.draw_layer_mut(layer) else {
            log::warn!("DrawTool: attached to {} which is not a draw layer", layer);
            return false;
        };
        let drawing = Drawing {
            id: draw_layer.next_drawing_id(),
            slice,
            frame,
            shape: shape.to_string(),
            points,
            visible: true,
        };
        let detail = json!({
            "id": drawing.id,
            "shape": drawing.shape,
            "slice": slice,
            "frame": frame,
        });

        let mut command = DrawCommand::new(layer, drawing);
        command.execute(&mut ctx.edit);
        ctx.history.add(Box::new(command));
        ctx.emit(ToolKind::Draw, DRAW_CREATE_EVENT, detail);
        true
    }
}

impl Tool for DrawTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Draw
    }

    fn activate(&mut self, _active: bool) {
        self.cancel();
    }

    fn handle(&mut self, interaction: &Interaction, ctx: &mut ToolContext<'_>) -> bool {
        match interaction {
            Interaction::MouseDown(point) => {
                let index = ctx.edit.layers.display_to_index(*point);
                self.points = if Self::is_free_hand(ctx) {
                    vec![index]
                } else {
                    vec![index, index]
                };
                self.drawing = true;
                true
            }
            Interaction::MouseMove(point) => {
                if !self.drawing {
                    return false;
                }
                self.track(*point, ctx);
                true
            }
            Interaction::MouseUp(point) => {
                if !self.drawing {
                    return false;
                }
                self.track(*point, ctx);
                self.finish(ctx)
            }
            Interaction::MouseOut => self.cancel(),
            Interaction::Wheel { .. } | Interaction::DoubleClick(_) => false,
            Interaction::KeyDown(key) => {
                ctx.forward_key(ToolKind::Draw, key);
                true
            }
        }
    }
}
