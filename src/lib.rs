//! medview - volumetric medical image viewer controller
//!
//! Loads image data from files, URLs or memory, keeps it in data slots, brings
//! up the rendering layers as data arrives and keeps tools and the undo history
//! in sync with it. Runs natively and in the browser (wasm32).

pub mod app;
pub mod config;
pub mod constants;
pub mod data;
pub mod events;
pub mod keyboard;
pub mod layers;
pub mod loader;
pub mod snapshot;
pub mod tools;
pub mod undo;
pub mod uri;

pub use app::{App, LoadSession, LoadState};
pub use config::{AppConfig, ConfigError, LogLevel};
pub use events::{Event, EventBus, EventType};
pub use loader::{LoadRequest, Loader, NamedBuffer, UrlOptions};
pub use snapshot::{AppState, StateError};

// WASM entry point
#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::*;
