//! The configured tools, their layer attachments and the current selection.

use super::{Interaction, Tool, ToolContext, ToolRegistry};
use crate::config::ToolConfig;
use crate::events::EventBus;
use crate::layers::LayerId;
use crate::undo::{EditContext, UndoStack};

struct ToolEntry {
    name: String,
    tool: Box<dyn Tool>,
    events: Vec<String>,
    attached_to: Option<LayerId>,
}

/// Holds one instance per configured tool.
///
/// A tool only receives interactions from the layer it is attached to, and
/// only while it is the selected tool.
pub struct Toolbox {
    entries: Vec<ToolEntry>,
    selected: Option<String>,
    shape: Option<String>,
}

impl Toolbox {
    /// Build the toolbox from the configured tools. Unknown names are skipped.
    pub fn from_config(tools: &[ToolConfig], registry: &ToolRegistry) -> Self {
        let mut entries = Vec::new();
        let mut shape = None;
        for config in tools {
            let Some(tool) = registry.create(&config.name) else {
                log::warn!("Toolbox: could not initialise unknown tool '{}'", config.name);
                continue;
            };
            if entries.iter().any(|e: &ToolEntry| e.name == config.name) {
                log::warn!("Toolbox: duplicate tool '{}' ignored", config.name);
                continue;
            }
            if shape.is_none() && !config.options.is_empty() {
                shape = config.options.first().cloned();
            }
            entries.push(ToolEntry {
                name: config.name.clone(),
                tool,
                events: config.events.clone(),
                attached_to: None,
            });
        }
        log::debug!("Toolbox: {} tool(s)", entries.len());
        Self {
            entries,
            selected: None,
            shape,
        }
    }

    fn entry(&self, name: &str) -> Option<&ToolEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    fn entry_mut(&mut self, name: &str) -> Option<&mut ToolEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First configured tool, selected when the layers come up.
    pub fn default_tool(&self) -> Option<&str> {
        self.entries.first().map(|e| e.name.as_str())
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Select a tool by name. Unknown names leave the selection unchanged.
    pub fn set_selected_tool(&mut self, name: &str) -> bool {
        if !self.has_tool(name) {
            log::warn!("Toolbox: unknown tool '{}'", name);
            return false;
        }
        self.selected = Some(name.to_string());
        true
    }

    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    pub fn set_selected_shape(&mut self, shape: impl Into<String>) {
        self.shape = Some(shape.into());
    }

    /// Layer a tool is attached to.
    pub fn attachment_of(&self, name: &str) -> Option<LayerId> {
        self.entry(name).and_then(|e| e.attached_to)
    }

    /// Tools attached to a layer.
    pub fn attached_to(&self, layer: LayerId) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.attached_to == Some(layer))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Attach a tool to a layer, replacing any previous attachment of that tool.
    pub fn attach_layer(&mut self, name: &str, layer: LayerId) -> bool {
        let Some(entry) = self.entry_mut(name) else {
            return false;
        };
        entry.attached_to = Some(layer);
        entry.tool.activate(true);
        log::debug!("Toolbox: {} attached to {}", name, layer);
        true
    }

    /// Detach a tool from its layer. Returns the layer it was attached to.
    pub fn detach_tool(&mut self, name: &str) -> Option<LayerId> {
        let entry = self.entry_mut(name)?;
        let layer = entry.attached_to.take()?;
        entry.tool.activate(false);
        log::debug!("Toolbox: {} detached from {}", name, layer);
        Some(layer)
    }

    /// Detach every tool attached to a layer. Returns how many were detached.
    pub fn detach_layer(&mut self, layer: LayerId) -> usize {
        let mut detached = 0;
        for entry in &mut self.entries {
            if entry.attached_to == Some(layer) {
                entry.attached_to = None;
                entry.tool.activate(false);
                detached += 1;
            }
        }
        detached
    }

    /// Detach every tool, keeping the selection.
    pub fn detach_all(&mut self) {
        for entry in &mut self.entries {
            if entry.attached_to.take().is_some() {
                entry.tool.activate(false);
            }
        }
    }

    /// Route an interaction from `layer` to the selected tool.
    ///
    /// Returns false if the selected tool is not attached to that layer or did
    /// not use the interaction.
    pub fn dispatch(
        &mut self,
        layer: LayerId,
        interaction: &Interaction,
        edit: EditContext<'_>,
        history: &mut UndoStack,
        bus: &EventBus,
    ) -> bool {
        let Some(selected) = self.selected.as_deref() else {
            return false;
        };
        let shape = self.shape.as_deref();
        let Some(entry) = self.entries.iter_mut().find(|e| e.name == selected) else {
            return false;
        };
        if entry.attached_to != Some(layer) {
            log::trace!("Toolbox: {} not attached to {}", entry.name, layer);
            return false;
        }
        let mut ctx = ToolContext {
            edit,
            history,
            bus,
            layer,
            shape,
            events: &entry.events,
        };
        entry.tool.handle(interaction, &mut ctx)
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolbox")
            .field("tools", &self.tool_names())
            .field("selected", &self.selected)
            .field("shape", &self.shape)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Point;
    use crate::tools::test_support::Fixture;

    fn toolbox() -> Toolbox {
        let config = crate::config::AppConfig::default();
        Toolbox::from_config(&config.tools, &ToolRegistry::new())
    }

    #[test]
    fn test_unknown_tools_are_skipped() {
        let tools = vec![
            ToolConfig::new("Scroll"),
            ToolConfig::new("Livewire"),
            ToolConfig::new("Scroll"),
        ];
        let toolbox = Toolbox::from_config(&tools, &ToolRegistry::new());
        assert_eq!(toolbox.tool_names(), vec!["Scroll"]);
        assert!(!toolbox.has_tool("Livewire"));
    }

    #[test]
    fn test_default_shape_from_options() {
        let toolbox = toolbox();
        assert_eq!(toolbox.shape(), Some("Ruler"));
        assert_eq!(toolbox.default_tool(), Some("Scroll"));
    }

    #[test]
    fn test_attach_and_detach() {
        let mut toolbox = toolbox();
        let layer = LayerId::new(4);
        assert!(toolbox.attach_layer("Scroll", layer));
        assert!(toolbox.attach_layer("ZoomAndPan", layer));
        assert_eq!(toolbox.attached_to(layer), vec!["Scroll", "ZoomAndPan"]);

        assert_eq!(toolbox.detach_tool("Scroll"), Some(layer));
        assert_eq!(toolbox.detach_tool("Scroll"), None);
        assert_eq!(toolbox.detach_layer(layer), 1);
        assert!(toolbox.attached_to(layer).is_empty());
    }

    #[test]
    fn test_dispatch_requires_attachment_to_layer() {
        let mut fixture = Fixture::new(3, 1);
        let mut toolbox = toolbox();
        toolbox.set_selected_tool("Scroll");
        let wheel = Interaction::Wheel {
            delta_y: 1.0,
            point: Point::default(),
        };

        let edit = EditContext {
            data: &mut fixture.data,
            layers: &mut fixture.layers,
        };
        assert!(!toolbox.dispatch(fixture.view, &wheel, edit, &mut fixture.history, &fixture.bus));

        toolbox.attach_layer("Scroll", fixture.view);
        let edit = EditContext {
            data: &mut fixture.data,
            layers: &mut fixture.layers,
        };
        assert!(toolbox.dispatch(fixture.view, &wheel, edit, &mut fixture.history, &fixture.bus));
        let edit = EditContext {
            data: &mut fixture.data,
            layers: &mut fixture.layers,
        };
        assert!(!toolbox.dispatch(fixture.draw, &wheel, edit, &mut fixture.history, &fixture.bus));

        let view = fixture.layers.view_layer(fixture.view).unwrap();
        assert_eq!(view.view().position().k, 1);
    }
}
