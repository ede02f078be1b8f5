//! Default keyboard shortcuts of the viewer.
//!
//! All shortcuts use the Ctrl modifier: arrows navigate slices and frames,
//! `Z`/`Y` undo and redo.

use serde::{Deserialize, Serialize};

/// A key, named after the DOM `KeyboardEvent.key` values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    ArrowLeft,
    ArrowUp,
    ArrowRight,
    ArrowDown,
    /// A printable character, stored lowercase.
    Char(char),
    /// Any other named key.
    Named(String),
}

impl Key {
    /// Parse a DOM key name ("ArrowUp", "z", "Escape", ...).
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowLeft" => Key::ArrowLeft,
            "ArrowUp" => Key::ArrowUp,
            "ArrowRight" => Key::ArrowRight,
            "ArrowDown" => Key::ArrowDown,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
                    _ => Key::Named(name.to_string()),
                }
            }
        }
    }
}

/// A key press with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub alt: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            shift: false,
            alt: false,
        }
    }

    pub fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::new(key)
        }
    }
}

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    PreviousFrame,
    NextFrame,
    NextSlice,
    PreviousSlice,
    Undo,
    Redo,
}

/// Shortcut table. Every binding requires Ctrl.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub previous_frame: Key,
    pub next_frame: Key,
    pub next_slice: Key,
    pub previous_slice: Key,
    pub undo: Key,
    pub redo: Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            previous_frame: Key::ArrowLeft,
            next_frame: Key::ArrowRight,
            next_slice: Key::ArrowUp,
            previous_slice: Key::ArrowDown,
            undo: Key::Char('z'),
            redo: Key::Char('y'),
        }
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The action bound to a key press, if any.
    pub fn action_for(&self, event: &KeyEvent) -> Option<KeyAction> {
        if !event.ctrl {
            return None;
        }
        let key = &event.key;
        if *key == self.previous_frame {
            Some(KeyAction::PreviousFrame)
        } else if *key == self.next_frame {
            Some(KeyAction::NextFrame)
        } else if *key == self.next_slice {
            Some(KeyAction::NextSlice)
        } else if *key == self.previous_slice {
            Some(KeyAction::PreviousSlice)
        } else if *key == self.undo {
            Some(KeyAction::Undo)
        } else if *key == self.redo {
            Some(KeyAction::Redo)
        } else {
            None
        }
    }

    pub fn key_for(&self, action: KeyAction) -> &Key {
        match action {
            KeyAction::PreviousFrame => &self.previous_frame,
            KeyAction::NextFrame => &self.next_frame,
            KeyAction::NextSlice => &self.next_slice,
            KeyAction::PreviousSlice => &self.previous_slice,
            KeyAction::Undo => &self.undo,
            KeyAction::Redo => &self.redo,
        }
    }

    pub fn set_key(&mut self, action: KeyAction, key: Key) {
        match action {
            KeyAction::PreviousFrame => self.previous_frame = key,
            KeyAction::NextFrame => self.next_frame = key,
            KeyAction::NextSlice => self.next_slice = key,
            KeyAction::PreviousSlice => self.previous_slice = key,
            KeyAction::Undo => self.undo = key,
            KeyAction::Redo => self.redo = key,
        }
    }
}
