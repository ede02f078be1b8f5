//! Error types for data loading.

use std::path::PathBuf;

/// Error raised by a [`Decoder`](super::Decoder).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}{}", .decoder.map(|d| format!("[{}] ", d)).unwrap_or_default(), .message)]
pub struct DecodeError {
    /// Human-readable error message.
    pub message: String,
    /// The decoder that produced this error (if known).
    pub decoder: Option<&'static str>,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            decoder: None,
        }
    }

    /// Attach the id of the decoder that failed.
    pub fn with_decoder(mut self, decoder: &'static str) -> Self {
        self.decoder = Some(decoder);
        self
    }
}

/// Failure to load one source. Reported as an `error` event.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("No transport available to fetch {0}")]
    NoFetcher(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("State data is not valid UTF-8: {0}")]
    InvalidText(#[from] std::string::FromUtf8Error),

    #[error("Nothing to load")]
    NoSources,
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn fetch(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
