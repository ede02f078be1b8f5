//! The viewer application: owns every component and wires them together.
//!
//! [`App`] is the single context object. Loading goes through
//! [`orchestrator`](self) handlers, tool selection through `set_tool`, and
//! everything observable is published on the [`EventBus`].

mod orchestrator;
mod tool_switch;


pub use orchestrator::{LoadSession, LoadState};

use crate::config::AppConfig;
use crate::data::{DataSlotRegistry, Volume};
use crate::events::{Event, EventBus, EventType, ListenerId};
use crate::keyboard::{KeyAction, KeyBindings, KeyEvent};
use crate::layers::{DrawingDetails, LayerId, LayerManager, Point};
use crate::loader::{DefaultLoader, Loader};
use crate::snapshot::{AppState, StateError};
use crate::tools::{Interaction, ToolRegistry, Toolbox};
use crate::undo::{Command, DeleteDrawingsCommand, EditContext, ReplaceImageCommand, UndoConfig, UndoStack};

pub struct App {
    config: AppConfig,
    bus: EventBus,
    data: DataSlotRegistry,
    layers: LayerManager,
    toolbox: Option<Toolbox>,
    history: UndoStack,
    loader: Box<dyn Loader>,
    key_bindings: KeyBindings,
    session: Option<LoadSession>,
    state: LoadState,
}

impl App {
    /// Create an application with the [`DefaultLoader`] and the built-in tools.
    pub fn new(config: AppConfig) -> Self {
        Self::with_loader(config, Box::new(DefaultLoader::new()))
    }

    pub fn with_loader(config: AppConfig, loader: Box<dyn Loader>) -> Self {
        Self::with_parts(config, loader, &ToolRegistry::new())
    }

    /// Create an application with a custom loader and tool registry.
    pub fn with_parts(config: AppConfig, loader: Box<dyn Loader>, registry: &ToolRegistry) -> Self {
        let bus = EventBus::new();
        let toolbox = if config.tools.is_empty() {
            None
        } else {
            Some(Toolbox::from_config(&config.tools, registry))
        };
        let history = UndoStack::with_config(bus.clone(), Self::undo_config(&config));
        let layers = LayerManager::new(config.view.container_size, config.view.max_zoom_factor);
        log::info!(
            "{}: {} tool(s), {} simultaneous data",
            config.app_name,
            toolbox.as_ref().map_or(0, |t| t.tool_names().len()),
            config.view.simultaneous_data
        );
        Self {
            config,
            bus,
            data: DataSlotRegistry::new(),
            layers,
            toolbox,
            history,
            loader,
            key_bindings: KeyBindings::default(),
            session: None,
            state: LoadState::Idle,
        }
    }

    fn undo_config(config: &AppConfig) -> UndoConfig {
        UndoConfig {
            max_history: config.history.max_history,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn data(&self) -> &DataSlotRegistry {
        &self.data
    }

    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut LayerManager {
        &mut self.layers
    }

    pub fn toolbox(&self) -> Option<&Toolbox> {
        self.toolbox.as_ref()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn key_bindings_mut(&mut self) -> &mut KeyBindings {
        &mut self.key_bindings
    }

    /// Subscribe to application events.
    pub fn add_event_listener<F>(&self, event_type: EventType, listener: F) -> ListenerId
    where
        F: Fn(&Event) + 'static,
    {
        self.bus.add(event_type, listener)
    }

    pub fn remove_event_listener(&self, event_type: &EventType, id: ListenerId) -> bool {
        self.bus.remove(event_type, id)
    }

    /// Drop all data, layers and history.
    ///
    /// The new undo stack publishes on the same bus, so listeners stay subscribed.
    pub fn reset(&mut self) {
        log::debug!("App: reset ({} data, {} layer(s))", self.data.len(), self.layers.number_of_layers());
        self.data.reset();
        self.layers.empty();
        if let Some(toolbox) = &mut self.toolbox {
            toolbox.detach_all();
        }
        self.history = UndoStack::with_config(self.bus.clone(), Self::undo_config(&self.config));
    }

    /// Back to the fitted zoom and offset, then render.
    pub fn reset_layout(&mut self) {
        self.layers.reset();
        self.layers.draw();
    }

    pub fn render(&mut self) {
        self.layers.draw();
    }

    pub fn fit_to_container(&mut self) {
        self.layers.fit_to_container();
        self.layers.draw();
    }

    /// Resize the layer container and refit.
    pub fn set_container_size(&mut self, width: f64, height: f64) {
        self.layers.set_container_size((width, height));
        self.layers.draw();
    }

    /// Zoom by a relative step around a display point. Returns false when refused.
    pub fn zoom(&mut self, step: f64, cx: f64, cy: f64) -> bool {
        let zoomed = self.layers.add_scale(step, Point::new(cx, cy));
        if zoomed {
            self.layers.draw();
        }
        zoomed
    }

    pub fn translate(&mut self, tx: f64, ty: f64) {
        self.layers.add_translation(Point::new(tx, ty));
        self.layers.draw();
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        match self.layers.active_view_layer_mut() {
            Some(view) => {
                view.set_opacity(opacity);
                view.render();
            }
            None => log::warn!("App: set_opacity without a view layer"),
        }
    }

    /// Advance playback of the active view layer by one step.
    pub fn tick(&mut self) {
        if let Some(view) = self.layers.active_view_layer_mut() {
            view.tick();
        }
    }

    pub fn undo(&mut self) -> bool {
        let mut ctx = EditContext {
            data: &mut self.data,
            layers: &mut self.layers,
        };
        self.history.undo(&mut ctx)
    }

    pub fn redo(&mut self) -> bool {
        let mut ctx = EditContext {
            data: &mut self.data,
            layers: &mut self.layers,
        };
        self.history.redo(&mut ctx)
    }

    /// Record a command that has already been applied.
    pub fn add_to_undo_stack(&mut self, command: Box<dyn Command>) {
        self.history.add(command);
    }

    /// Apply a command and record it.
    pub fn execute(&mut self, mut command: Box<dyn Command>) {
        let mut ctx = EditContext {
            data: &mut self.data,
            layers: &mut self.layers,
        };
        command.execute(&mut ctx);
        self.history.add(command);
    }

    /// Replace the image of a data slot as an undoable edit.
    pub fn replace_image(&mut self, data_index: usize, image: Volume) -> bool {
        if self.data.get(data_index).is_none() {
            log::warn!("App: replace_image on unknown data {}", data_index);
            return false;
        }
        self.execute(Box::new(ReplaceImageCommand::new(data_index, image)));
        true
    }

    /// Delete every drawing of the active draw layer as one undoable edit.
    pub fn delete_draws(&mut self) -> bool {
        let Some(layer) = self.layers.active_draw_id() else {
            log::warn!("App: delete_draws without a draw layer");
            return false;
        };
        self.execute(Box::new(DeleteDrawingsCommand::new(layer)));
        true
    }

    pub fn draw_display_details(&self) -> Vec<DrawingDetails> {
        self.layers
            .active_draw_layer()
            .map(|draw| draw.display_details())
            .unwrap_or_default()
    }

    pub fn toggle_drawing_visibility(&mut self, id: u64) -> Option<bool> {
        self.layers.active_draw_layer_mut()?.toggle_visibility(id)
    }

    /// Current state as JSON.
    pub fn get_state(&self) -> Result<String, StateError> {
        Ok(AppState::capture(self)?.to_json()?)
    }

    /// Route pointer or keyboard input arriving on a layer to the selected tool.
    pub fn on_layer_interaction(&mut self, layer: LayerId, interaction: &Interaction) -> bool {
        let Some(toolbox) = &mut self.toolbox else {
            return false;
        };
        let edit = EditContext {
            data: &mut self.data,
            layers: &mut self.layers,
        };
        toolbox.dispatch(layer, interaction, edit, &mut self.history, &self.bus)
    }

    /// Publish a key press as a `keydown` event.
    pub fn on_keydown(&self, key: &KeyEvent) {
        self.bus.fire(&Event::KeyDown {
            key: key.clone(),
            context: None,
        });
    }

    /// Run the default shortcut bound to a key press, if any.
    pub fn default_on_keydown(&mut self, key: &KeyEvent) -> Option<KeyAction> {
        let action = self.key_bindings.action_for(key)?;
        match action {
            KeyAction::Undo => {
                self.undo();
            }
            KeyAction::Redo => {
                self.redo();
            }
            _ => {
                let Some(view) = self.layers.active_view_layer_mut() else {
                    return None;
                };
                match action {
                    KeyAction::PreviousFrame => view.decrement_frame(),
                    KeyAction::NextFrame => view.increment_frame(),
                    KeyAction::NextSlice => view.increment_slice(),
                    KeyAction::PreviousSlice => view.decrement_slice(),
                    KeyAction::Undo | KeyAction::Redo => false,
                };
            }
        }
        Some(action)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("data", &self.data.len())
            .field("layers", &self.layers.number_of_layers())
            .field("toolbox", &self.toolbox)
            .field("state", &self.state)
            .finish()
    }
}
