//! Name to tool mapping used to build the toolbox from the configuration.

use super::{DrawTool, ScrollTool, Tool, ZoomAndPanTool};

/// Creates a fresh tool instance.
pub type ToolFactory = fn() -> Box<dyn Tool>;

/// Registry of tools that can be named in the configuration.
pub struct ToolRegistry {
    factories: Vec<(String, ToolFactory)>,
}

impl ToolRegistry {
    /// Create a registry with the built-in tools.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("Scroll", || Box::new(ScrollTool::new()));
        registry.register("ZoomAndPan", || Box::new(ZoomAndPanTool::new()));
        registry.register("Draw", || Box::new(DrawTool::new()));
        registry
    }

    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Register a tool under a name. A later registration replaces an earlier one.
    pub fn register(&mut self, name: impl Into<String>, factory: ToolFactory) {
        let name = name.into();
        self.factories.retain(|(n, _)| *n != name);
        self.factories.push((name, factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.iter().any(|(n, _)| n == name)
    }

    /// Instantiate a tool by name.
    pub fn create(&self, name: &str) -> Option<Box<dyn Tool>> {
        self.factories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, factory)| factory())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|(n, _)| n.as_str()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
