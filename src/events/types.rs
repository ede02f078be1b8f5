//! Event definitions published on the application [`EventBus`](super::EventBus).

use serde::Serialize;

use crate::data::MetaData;
use crate::keyboard::KeyEvent;
use crate::layers::{Point, Position, Scale};
use crate::loader::{LoadType, Source};
use crate::tools::ToolKind;

/// Key used to register listeners.
///
/// Every [`Event`] maps to exactly one type through [`Event::event_type`].
/// Tool declared interaction events carry their configured name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    LoadStart,
    LoadProgress,
    LoadItem,
    Load,
    LoadEnd,
    Error,
    Abort,
    UndoAdd,
    Undo,
    Redo,
    ZoomChange,
    OffsetChange,
    PositionChange,
    FrameChange,
    RenderStart,
    RenderEnd,
    KeyDown,
    /// Interaction event declared by a tool in its configuration.
    Tool(String),
}

impl EventType {
    /// Wire name of this event type (the `type` tag of the serialized event).
    pub fn name(&self) -> &str {
        match self {
            EventType::LoadStart => "loadstart",
            EventType::LoadProgress => "loadprogress",
            EventType::LoadItem => "loaditem",
            EventType::Load => "load",
            EventType::LoadEnd => "loadend",
            EventType::Error => "error",
            EventType::Abort => "abort",
            EventType::UndoAdd => "undoadd",
            EventType::Undo => "undo",
            EventType::Redo => "redo",
            EventType::ZoomChange => "zoomchange",
            EventType::OffsetChange => "offsetchange",
            EventType::PositionChange => "positionchange",
            EventType::FrameChange => "framechange",
            EventType::RenderStart => "renderstart",
            EventType::RenderEnd => "renderend",
            EventType::KeyDown => "keydown",
            EventType::Tool(name) => name,
        }
    }

    /// Parse a wire name. Names that are not built in are treated as tool events.
    pub fn from_name(name: &str) -> Self {
        match name {
            "loadstart" => EventType::LoadStart,
            "loadprogress" => EventType::LoadProgress,
            "loaditem" => EventType::LoadItem,
            "load" => EventType::Load,
            "loadend" => EventType::LoadEnd,
            "error" => EventType::Error,
            "abort" => EventType::Abort,
            "undoadd" => EventType::UndoAdd,
            "undo" => EventType::Undo,
            "redo" => EventType::Redo,
            "zoomchange" => EventType::ZoomChange,
            "offsetchange" => EventType::OffsetChange,
            "positionchange" => EventType::PositionChange,
            "framechange" => EventType::FrameChange,
            "renderstart" => EventType::RenderStart,
            "renderend" => EventType::RenderEnd,
            "keydown" => EventType::KeyDown,
            other => EventType::Tool(other.to_string()),
        }
    }

    /// The load lifecycle types, in the order a session fires them.
    pub fn load_lifecycle() -> &'static [EventType] {
        &[
            EventType::LoadStart,
            EventType::LoadProgress,
            EventType::LoadItem,
            EventType::Load,
            EventType::LoadEnd,
            EventType::Error,
            EventType::Abort,
        ]
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a `loaditem` event.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSummary {
    /// Metadata of a decoded image item.
    Meta(MetaData),
    /// A state snapshot was applied; serializes as the string `"state"`.
    State,
    /// The item carried no usable data; serializes as `null`.
    Empty,
}

impl Serialize for ItemSummary {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ItemSummary::Meta(meta) => meta.serialize(serializer),
            ItemSummary::State => serializer.serialize_str("state"),
            ItemSummary::Empty => serializer.serialize_none(),
        }
    }
}

/// An immutable notification handed by reference to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    LoadStart {
        load_type: LoadType,
        sources: Vec<Source>,
    },
    LoadProgress {
        load_type: LoadType,
        source: Source,
        /// Loaded amount, opaque to the controller (percent for the default loader).
        loaded: u32,
        total: u32,
    },
    LoadItem {
        load_type: Option<LoadType>,
        source: Source,
        data: ItemSummary,
    },
    Load {
        load_type: LoadType,
    },
    LoadEnd {
        load_type: LoadType,
        sources: Vec<Source>,
    },
    Error {
        load_type: LoadType,
        sources: Vec<Source>,
        error: String,
        target: Option<Source>,
    },
    Abort {
        load_type: LoadType,
        sources: Vec<Source>,
    },
    UndoAdd {
        command: String,
    },
    Undo {
        command: String,
    },
    Redo {
        command: String,
    },
    ZoomChange {
        scale: Scale,
    },
    OffsetChange {
        offset: Point,
    },
    PositionChange {
        data_index: usize,
        position: Position,
    },
    FrameChange {
        data_index: usize,
        frame: usize,
    },
    RenderStart {
        data_index: usize,
    },
    RenderEnd {
        data_index: usize,
    },
    KeyDown {
        key: KeyEvent,
        /// Tool the key press originated from, if any.
        context: Option<ToolKind>,
    },
    /// Serialized without the variant tag: `type` is the configured name.
    #[serde(untagged)]
    Tool {
        #[serde(rename = "type")]
        name: String,
        tool: ToolKind,
        detail: serde_json::Value,
    },
}

impl Event {
    /// The listener key this event is delivered to.
    pub fn event_type(&self) -> EventType {
        match self {
            Event::LoadStart { .. } => EventType::LoadStart,
            Event::LoadProgress { .. } => EventType::LoadProgress,
            Event::LoadItem { .. } => EventType::LoadItem,
            Event::Load { .. } => EventType::Load,
            Event::LoadEnd { .. } => EventType::LoadEnd,
            Event::Error { .. } => EventType::Error,
            Event::Abort { .. } => EventType::Abort,
            Event::UndoAdd { .. } => EventType::UndoAdd,
            Event::Undo { .. } => EventType::Undo,
            Event::Redo { .. } => EventType::Redo,
            Event::ZoomChange { .. } => EventType::ZoomChange,
            Event::OffsetChange { .. } => EventType::OffsetChange,
            Event::PositionChange { .. } => EventType::PositionChange,
            Event::FrameChange { .. } => EventType::FrameChange,
            Event::RenderStart { .. } => EventType::RenderStart,
            Event::RenderEnd { .. } => EventType::RenderEnd,
            Event::KeyDown { .. } => EventType::KeyDown,
            Event::Tool { name, .. } => EventType::Tool(name.clone()),
        }
    }

    /// Serialize to the JSON shape handed to browser listeners.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for ty in EventType::load_lifecycle() {
            assert_eq!(&EventType::from_name(ty.name()), ty);
        }
        assert_eq!(EventType::from_name("zoomchange"), EventType::ZoomChange);
        assert_eq!(
            EventType::from_name("drawcreate"),
            EventType::Tool("drawcreate".to_string())
        );
    }

    #[test]
    fn test_serialized_tag_matches_event_type() {
        let event = Event::Load {
            load_type: LoadType::Image,
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "load");
        assert_eq!(json["load_type"], "image");

        let event = Event::UndoAdd {
            command: "Draw Rectangle".to_string(),
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], event.event_type().name());

        let event = Event::Tool {
            name: "drawcreate".to_string(),
            tool: ToolKind::Draw,
            detail: serde_json::json!({ "id": 3 }),
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "drawcreate");
        assert_eq!(json["type"], event.event_type().name());
        assert_eq!(json["tool"], "Draw");
        assert_eq!(json["detail"]["id"], 3);
    }

    #[test]
    fn test_state_item_serializes_as_literal() {
        let event = Event::LoadItem {
            load_type: Some(LoadType::State),
            source: Source::Buffer {
                name: "state.json".to_string(),
            },
            data: ItemSummary::State,
        };
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(json["data"], "state");
    }
}
