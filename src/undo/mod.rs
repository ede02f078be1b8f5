//! Undo/Redo system for edit operations.
//!
//! Edits are Commands that know how to apply and revert themselves against an
//! [`EditContext`]. The [`UndoStack`] keeps two histories:
//! - applied commands (most recent at the end)
//! - undone commands waiting for redo (most recent at the end)
//!
//! Adding a new command discards the redo history.

mod commands;

pub use commands::{DeleteDrawingsCommand, DrawCommand, ReplaceImageCommand};

use crate::data::DataSlotRegistry;
use crate::events::{Event, EventBus};
use crate::layers::LayerManager;

/// Mutable state a command operates on.
pub struct EditContext<'a> {
    pub data: &'a mut DataSlotRegistry,
    pub layers: &'a mut LayerManager,
}

/// A reversible edit.
pub trait Command {
    /// Human-readable name, reported in undo events.
    fn name(&self) -> String;

    /// Apply (or re-apply) the edit.
    fn execute(&mut self, ctx: &mut EditContext<'_>);

    /// Revert the edit.
    fn undo(&mut self, ctx: &mut EditContext<'_>);
}

/// Configuration for the undo stack
#[derive(Debug, Clone)]
pub struct UndoConfig {
    /// Maximum number of commands to keep in history
    pub max_history: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_history: crate::constants::DEFAULT_MAX_HISTORY,
        }
    }
}

/// The undo/redo history, publishing `undoadd`, `undo` and `redo` on its bus.
pub struct UndoStack {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
    config: UndoConfig,
    bus: EventBus,
}

impl UndoStack {
    pub fn new(bus: EventBus) -> Self {
        Self::with_config(bus, UndoConfig::default())
    }

    pub fn with_config(bus: EventBus, config: UndoConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            config,
            bus,
        }
    }

    /// Record a command that has already been applied.
    ///
    /// Clears the redo history (no branching) and fires `undoadd`.
    pub fn add(&mut self, command: Box<dyn Command>) {
        let name = command.name();
        log::debug!("Undo: added '{}'", name);
        self.undo_stack.push(command);
        self.redo_stack.clear();

        if self.undo_stack.len() > self.config.max_history {
            let excess = self.undo_stack.len() - self.config.max_history;
            self.undo_stack.drain(..excess);
        }

        self.bus.fire(&Event::UndoAdd { command: name });
    }

    /// Revert the most recent command. Returns false if there was nothing to undo.
    pub fn undo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        let Some(mut command) = self.undo_stack.pop() else {
            return false;
        };
        let name = command.name();
        log::debug!("Undo: '{}'", name);
        command.undo(ctx);
        self.redo_stack.push(command);
        self.bus.fire(&Event::Undo { command: name });
        true
    }

    /// Re-apply the most recently undone command. Returns false if there was nothing to redo.
    pub fn redo(&mut self, ctx: &mut EditContext<'_>) -> bool {
        let Some(mut command) = self.redo_stack.pop() else {
            return false;
        };
        let name = command.name();
        log::debug!("Redo: '{}'", name);
        command.execute(ctx);
        self.undo_stack.push(command);
        self.bus.fire(&Event::Redo { command: name });
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Name of the command that would be undone
    pub fn undo_description(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.name())
    }

    /// Name of the command that would be redone
    pub fn redo_description(&self) -> Option<String> {
        self.redo_stack.last().map(|c| c.name())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }
}

impl std::fmt::Debug for UndoStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoStack")
            .field("undo", &self.undo_count())
            .field("redo", &self.redo_count())
            .field("max_history", &self.config.max_history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Adds a fixed amount to a shared counter.
    struct AddCommand {
        amount: i32,
        value: Rc<RefCell<i32>>,
    }

    impl Command for AddCommand {
        fn name(&self) -> String {
            format!("Add {}", self.amount)
        }

        fn execute(&mut self, _ctx: &mut EditContext<'_>) {
            *self.value.borrow_mut() += self.amount;
        }

        fn undo(&mut self, _ctx: &mut EditContext<'_>) {
            *self.value.borrow_mut() -= self.amount;
        }
    }

    struct Fixture {
        data: DataSlotRegistry,
        layers: LayerManager,
        value: Rc<RefCell<i32>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                data: DataSlotRegistry::new(),
                layers: LayerManager::new((100.0, 100.0), 3.0),
                value: Rc::new(RefCell::new(0)),
            }
        }

        fn ctx(&mut self) -> EditContext<'_> {
            EditContext {
                data: &mut self.data,
                layers: &mut self.layers,
            }
        }

        /// Apply and record, as callers do.
        fn apply(&mut self, stack: &mut UndoStack, amount: i32) {
            let mut command = AddCommand {
                amount,
                value: Rc::clone(&self.value),
            };
            command.execute(&mut self.ctx());
            stack.add(Box::new(command));
        }

        fn value(&self) -> i32 {
            *self.value.borrow()
        }
    }

    #[test]
    fn test_undo_redo_restores_state() {
        let mut fx = Fixture::new();
        let mut stack = UndoStack::new(EventBus::new());
        fx.apply(&mut stack, 1);
        fx.apply(&mut stack, 10);
        assert_eq!(fx.value(), 11);

        assert!(stack.undo(&mut fx.ctx()));
        assert_eq!(fx.value(), 1);
        assert!(stack.redo(&mut fx.ctx()));
        assert_eq!(fx.value(), 11);
    }

    #[test]
    fn test_add_clears_redo() {
        let mut fx = Fixture::new();
        let mut stack = UndoStack::new(EventBus::new());
        fx.apply(&mut stack, 1);
        fx.apply(&mut stack, 10);
        stack.undo(&mut fx.ctx());
        assert!(stack.can_redo());

        fx.apply(&mut stack, 100);
        assert!(!stack.can_redo());
        assert!(!stack.redo(&mut fx.ctx()));
        assert_eq!(fx.value(), 101);
    }

    #[test]
    fn test_empty_stack_is_a_no_op() {
        let bus = EventBus::new();
        let fired = Rc::new(RefCell::new(0));
        for ty in [EventType::Undo, EventType::Redo] {
            let f = Rc::clone(&fired);
            bus.add(ty, move |_| *f.borrow_mut() += 1);
        }
        let mut fx = Fixture::new();
        let mut stack = UndoStack::new(bus);

        assert!(!stack.undo(&mut fx.ctx()));
        assert!(!stack.redo(&mut fx.ctx()));
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_events_carry_command_name() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for ty in [EventType::UndoAdd, EventType::Undo, EventType::Redo] {
            let s = Rc::clone(&seen);
            bus.add(ty, move |e| s.borrow_mut().push(e.clone()));
        }
        let mut fx = Fixture::new();
        let mut stack = UndoStack::new(bus);
        fx.apply(&mut stack, 2);
        stack.undo(&mut fx.ctx());
        stack.redo(&mut fx.ctx());

        let command = "Add 2".to_string();
        assert_eq!(
            *seen.borrow(),
            vec![
                Event::UndoAdd {
                    command: command.clone()
                },
                Event::Undo {
                    command: command.clone()
                },
                Event::Redo { command },
            ]
        );
    }

    #[test]
    fn test_max_history() {
        let mut fx = Fixture::new();
        let mut stack = UndoStack::with_config(EventBus::new(), UndoConfig { max_history: 3 });
        for i in 0..5 {
            fx.apply(&mut stack, i);
        }
        assert_eq!(stack.undo_count(), 3);
        assert_eq!(stack.undo_description().as_deref(), Some("Add 4"));
    }
}
