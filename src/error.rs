//! Error types for wordlist-refinery

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for refinery operations
pub type Result<T> = std::result::Result<T, RefineryError>;

/// Errors that abort a run
///
/// Per-line decode failures are not represented here: the loader absorbs
/// them and they only show up in the run counters.
#[derive(Debug, Error)]
pub enum RefineryError {
    /// Input could not be opened
    #[error("Cannot open input {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read failure in the middle of the input stream
    #[error("Read error at byte {offset}: {source}")]
    Read {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// Write failure on the output sink
    #[error("Output error on {path:?}: {source}")]
    Sink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("--markdown-table requires --add-metadata")]
    MarkdownWithoutMetadata,

    #[error("Invalid minimum entropy {0}: must be a finite number >= 0")]
    InvalidThreshold(f64),

    #[error("Unsupported input encoding '{0}' (must be an ASCII-compatible label such as utf-8 or latin1)")]
    UnsupportedEncoding(String),

    #[error("Invalid filter pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid size format: '{0}'")]
    InvalidSize(String),

    /// Ctrl-C observed at a batch boundary
    #[error("Interrupted before the input was fully processed")]
    Interrupted,

    /// Analyzed batch shape does not match the writer's output mode
    #[error("Analyzed batch does not carry metadata required by the {0} writer")]
    ModeMismatch(&'static str),
}

impl RefineryError {
    pub(crate) fn sink(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Sink {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was raised before any input was read
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidChunkSize
                | Self::MarkdownWithoutMetadata
                | Self::InvalidThreshold(_)
                | Self::UnsupportedEncoding(_)
                | Self::InvalidSize(_)
                | Self::InvalidPattern(_)
        )
    }
}
