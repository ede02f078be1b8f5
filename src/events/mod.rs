//! Typed application events and the synchronous bus that carries them.
//!
//! Everything the controller reports to the outside world goes through one
//! [`EventBus`]: load lifecycle transitions, undo history changes, layer group
//! geometry changes, view navigation of the bound view layer and the
//! interaction events tools declare in their configuration.

mod bus;
mod types;

pub use bus::{EventBus, Listener, ListenerId};
pub use types::{Event, EventType, ItemSummary};
