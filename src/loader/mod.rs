//! Data loading: sources, lifecycle messages and the loader that produces them.
//!
//! A [`Loader`] turns a [`LoadRequest`] into a stream of [`LoadEvent`]s:
//!
//! ```text
//! Start -> (Progress | Item | Error)* -> [Load] -> End
//!                                  \-> Abort -> End
//! ```
//!
//! The application pulls events with [`Loader::poll`] and processes each one
//! to completion before asking for the next.

mod decoder;
mod decoders;
mod default_loader;
mod error;
mod fetch;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::data::{MetaData, Volume};

pub use decoder::{DecodedImage, Decoder, DecoderRegistry};
pub use decoders::{ImageDecoder, NpyDecoder};
pub use default_loader::DefaultLoader;
pub use error::{DecodeError, LoadError};
pub use fetch::Fetch;
#[cfg(not(target_arch = "wasm32"))]
pub use fetch::HttpFetcher;

/// Number of sources decoded per `poll` batch.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// What a load session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    /// Image data for the slot registry.
    Image,
    /// A saved application state.
    State,
}

impl std::fmt::Display for LoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadType::Image => f.write_str("image"),
            LoadType::State => f.write_str("state"),
        }
    }
}

/// Where an item comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    File(PathBuf),
    Url(String),
    Buffer { name: String },
}

impl Source {
    /// Short name used for format detection and logs.
    pub fn name(&self) -> String {
        match self {
            Source::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Source::Url(url) => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                path.rsplit('/')
                    .find(|segment| !segment.is_empty())
                    .unwrap_or(path)
                    .to_string()
            }
            Source::Buffer { name } => name.clone(),
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
            Source::Buffer { name } => write!(f, "buffer '{}'", name),
        }
    }
}

/// Decoded payload of an item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    Image { image: Volume, meta: MetaData },
    /// JSON text of a saved state.
    State(String),
}

/// One decoded unit of a load session.
///
/// `load_type` and `data` are optional because external loaders may deliver
/// incomplete items; the application reports those as integrity warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadItem {
    pub source: Source,
    pub load_type: Option<LoadType>,
    pub data: Option<ItemData>,
}

/// Lifecycle message produced by a [`Loader`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Start {
        load_type: LoadType,
        sources: Vec<Source>,
    },
    Progress {
        load_type: LoadType,
        source: Source,
        loaded: u32,
        total: u32,
    },
    Item(LoadItem),
    /// All items were delivered without error or abort.
    Load { load_type: LoadType },
    End {
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
}

/// In-memory data to load, e.g. files picked in a browser.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBuffer {
    pub name: String,
    pub data: Vec<u8>,
    /// Slice position; defaults to the buffer's ordinal in the request.
    pub position: Option<f64>,
}

impl NamedBuffer {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            position: None,
        }
    }

    pub fn at_position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }
}

/// Options of URL loads.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlOptions {
    /// Extra request headers as (name, value).
    pub request_headers: Vec<(String, String)>,
    /// Sources decoded per poll.
    pub batch_size: usize,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            request_headers: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// What to load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadRequest {
    Files(Vec<PathBuf>),
    Urls(Vec<String>, UrlOptions),
    Buffers(Vec<NamedBuffer>),
}

impl LoadRequest {
    pub fn sources(&self) -> Vec<Source> {
        match self {
            LoadRequest::Files(paths) => paths.iter().cloned().map(Source::File).collect(),
            LoadRequest::Urls(urls, _) => urls.iter().cloned().map(Source::Url).collect(),
            LoadRequest::Buffers(buffers) => buffers
                .iter()
                .map(|b| Source::Buffer {
                    name: b.name.clone(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            LoadRequest::Files(paths) => paths.is_empty(),
            LoadRequest::Urls(urls, _) => urls.is_empty(),
            LoadRequest::Buffers(buffers) => buffers.is_empty(),
        }
    }
}

/// Performs I/O and decoding, reporting progress as [`LoadEvent`]s.
pub trait Loader {
    /// Start a session. Events become available through [`poll`](Self::poll).
    fn load(&mut self, request: LoadRequest);

    /// Stop the running session. Events already produced are still delivered,
    /// followed by `Abort` and `End`.
    fn abort(&mut self);

    /// Next event, doing more work if needed. `None` when idle.
    fn poll(&mut self) -> Option<LoadEvent>;

    /// Whether a session is running or events are still queued.
    fn is_loading(&self) -> bool;
}
