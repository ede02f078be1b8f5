//! Interactive tools and the toolbox that attaches them to layers.
//!
//! A tool receives [`Interaction`]s from the layer it is attached to and acts
//! on the layer group through a [`ToolContext`]. Which tools exist is decided
//! by the configuration; [`ToolRegistry`] maps configured names to tools.

mod draw;
mod registry;
mod scroll;
mod toolbox;
mod zoom_pan;

pub use draw::DrawTool;
pub use registry::{ToolFactory, ToolRegistry};
pub use scroll::ScrollTool;
pub use toolbox::Toolbox;
pub use zoom_pan::ZoomAndPanTool;

use serde::Serialize;

use crate::events::{Event, EventBus};
use crate::keyboard::KeyEvent;
use crate::layers::{LayerId, Point};
use crate::undo::{EditContext, UndoStack};

/// The built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ToolKind {
    Scroll,
    ZoomAndPan,
    Draw,
}

impl ToolKind {
    /// Configuration name of the tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Scroll => "Scroll",
            ToolKind::ZoomAndPan => "ZoomAndPan",
            ToolKind::Draw => "Draw",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.name() == name)
    }

    pub fn all() -> &'static [ToolKind] {
        &[ToolKind::Scroll, ToolKind::ZoomAndPan, ToolKind::Draw]
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Pointer and keyboard input arriving on a layer, in display coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    MouseDown(Point),
    MouseMove(Point),
    MouseUp(Point),
    MouseOut,
    Wheel { delta_y: f64, point: Point },
    DoubleClick(Point),
    KeyDown(KeyEvent),
}

/// What a tool may touch while handling an interaction.
pub struct ToolContext<'a> {
    pub edit: EditContext<'a>,
    pub history: &'a mut UndoStack,
    pub bus: &'a EventBus,
    /// Layer the tool is attached to.
    pub layer: LayerId,
    /// Selected draw shape, if any.
    pub shape: Option<&'a str>,
    /// Tool events to publish on the bus.
    pub events: &'a [String],
}

impl ToolContext<'_> {
    /// Publish a tool event if the tool's configuration lists it.
    pub fn emit(&self, tool: ToolKind, name: &str, detail: serde_json::Value) -> bool {
        if !self.events.iter().any(|e| e == name) {
            return false;
        }
        self.bus.fire(&Event::Tool {
            name: name.to_string(),
            tool,
            detail,
        });
        true
    }

    /// Forward a key press to the application listeners.
    pub fn forward_key(&self, tool: ToolKind, key: &KeyEvent) {
        self.bus.fire(&Event::KeyDown {
            key: key.clone(),
            context: Some(tool),
        });
    }
}

/// An interactive tool.
pub trait Tool {
    fn kind(&self) -> ToolKind;

    /// Called when the tool is attached to (`true`) or detached from a layer.
    fn activate(&mut self, active: bool);

    /// React to an interaction. Returns true if the interaction was used.
    fn handle(&mut self, interaction: &Interaction, ctx: &mut ToolContext<'_>) -> bool;
}
