//! Which tool is attached to which layer.

use super::App;
use crate::layers::LayerId;

impl App {
    /// Whether the toolbox holds a tool of the drawing category.
    pub(super) fn has_drawing_tool(&self) -> bool {
        self.toolbox.as_ref().is_some_and(|toolbox| {
            toolbox
                .tool_names()
                .iter()
                .any(|name| self.config.is_drawing_tool(name))
        })
    }

    /// Select a tool and attach it to the layer it works on.
    ///
    /// Drawing tools go to the active draw layer, every other tool to the
    /// active view layer. The previously selected tool is detached first, so
    /// afterwards exactly one tool is attached. Before any data is loaded the
    /// tool is only selected; it is attached when the layers come up.
    pub fn set_tool(&mut self, name: &str) -> bool {
        let Some(toolbox) = &mut self.toolbox else {
            log::warn!("App: set_tool('{}') without a toolbox", name);
            return false;
        };
        if !toolbox.has_tool(name) {
            log::warn!("App: cannot set unknown tool '{}'", name);
            return false;
        }

        let target = if self.config.is_drawing_tool(name) {
            self.layers.active_draw_id()
        } else {
            self.layers.active_view_id()
        };

        if let Some(previous) = toolbox.selected().map(str::to_string) {
            toolbox.detach_tool(&previous);
        }
        match target {
            Some(layer) => {
                toolbox.detach_layer(layer);
                toolbox.attach_layer(name, layer);
            }
            None => log::debug!("App: no layer for tool '{}' yet", name),
        }
        toolbox.set_selected_tool(name)
    }

    pub fn selected_tool(&self) -> Option<&str> {
        self.toolbox.as_ref().and_then(|toolbox| toolbox.selected())
    }

    pub fn set_draw_shape(&mut self, shape: &str) -> bool {
        match &mut self.toolbox {
            Some(toolbox) => {
                toolbox.set_selected_shape(shape);
                true
            }
            None => false,
        }
    }

    /// Attach the selected (or first configured) tool once layers exist.
    pub(super) fn initialise_toolbox(&mut self) {
        let Some(toolbox) = &self.toolbox else {
            return;
        };
        let Some(name) = toolbox.selected().or(toolbox.default_tool()).map(str::to_string) else {
            return;
        };
        self.set_tool(&name);
    }

    /// Move the selected view tool onto a newly added view layer.
    pub(super) fn reattach_view_tool(&mut self, view: LayerId) {
        let Some(toolbox) = &mut self.toolbox else {
            return;
        };
        let Some(name) = toolbox.selected().map(str::to_string) else {
            return;
        };
        if self.config.is_drawing_tool(&name) {
            return;
        }
        toolbox.detach_tool(&name);
        toolbox.detach_layer(view);
        toolbox.attach_layer(&name, view);
    }
}
