//! Error types for topfew core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type TopfewResult<T> = Result<T, TopfewError>;

/// Fatal errors: configuration problems, whole-input failures and
/// per-segment I/O failures. Any of these aborts the run with no output.
#[derive(Debug, Error)]
pub enum TopfewError {
    /// I/O error while reading a stream.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named input could not be opened or stat'ed.
    #[error("cannot open {}: {source}", path.display())]
    Open {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// Boundary discovery seeked somewhere other than asked.
    #[error("tried to seek to {target}, went to {reached}")]
    SeekMismatch {
        /// The requested offset.
        target: u64,
        /// The offset actually reached.
        reached: u64,
    },

    /// Reading a segment failed.
    #[error("can't read segment [{start}, {end}): {source}")]
    SegmentRead {
        /// Segment start offset.
        start: u64,
        /// Segment end offset.
        end: u64,
        /// The underlying error.
        source: io::Error,
    },

    /// Segment workers went away without reporting, for instance by
    /// panicking inside a key source or filter.
    #[error("{missing} segment worker(s) exited without reporting")]
    WorkerLost {
        /// Number of results never received.
        missing: usize,
    },

    /// Invalid or conflicting configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A grep, vgrep, sed or separator expression failed to compile.
    #[error("bad regular expression: {0}")]
    Pattern(#[from] regex::Error),
}

impl TopfewError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an open error for `path`.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}

/// Per-record key extraction failure. Never fatal: the record is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The record has fewer fields than the key asks for.
    #[error("not enough fields in record: wanted field {wanted}, found {found}")]
    NotEnoughFields {
        /// 1-based number of the field that was asked for.
        wanted: usize,
        /// Number of fields actually present.
        found: usize,
    },
}
