//! Error types for capture decoding.
//!
//! Nothing in the decode path is fatal. Malformed input and resource limits
//! surface as [`TapError`] values inside the pipeline, get logged, and cause
//! exactly one unit of work (attribute, frame, or segment) to be skipped.
//! Only setup operations (configuration, name tables, logging, capture
//! queues) return errors to the caller.
//!
//! ## Error Categories
//!
//! - **Malformed input**: truncated buffers, invalid varints, schema decode failures
//! - **Resource exhaustion**: decompression output above the configured bound
//! - **Configuration**: invalid config values, unreadable name tables
//! - **I/O**: file access and closed capture channels
//!
//! ```rust
//! use resonance_tap::{ErrorCategory, TapError};
//!
//! let error = TapError::truncated("notify header", 16, 3);
//! assert_eq!(error.category(), ErrorCategory::MalformedInput);
//! assert!(error.is_recoverable());
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::MessageKind;

/// Result type alias for tap operations.
pub type Result<T, E = TapError> = std::result::Result<T, E>;

/// Coarse classification of a [`TapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bytes on the wire did not decode; skip the unit of work.
    MalformedInput,
    /// A configured bound was exceeded; fall back or skip.
    ResourceExhaustion,
    /// Invalid configuration or lookup data supplied by the host.
    Configuration,
    /// File or channel failure outside the decode path.
    Io,
}

/// Main error type for capture decoding.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TapError {
    #[error("Truncated {context}: need {needed} bytes, have {available}")]
    Truncated { context: &'static str, needed: usize, available: usize },

    #[error("Unterminated varint in {available} bytes")]
    InvalidVarint { available: usize },

    #[error("Failed to decode {kind} payload")]
    Decode {
        kind: MessageKind,
        #[source]
        source: prost::DecodeError,
    },

    #[error("Decompression of {compressed_len} bytes failed (bound {bound} bytes)")]
    Decompression {
        compressed_len: usize,
        bound: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Segment source closed")]
    SourceClosed,

    #[error("Logging setup failed: {reason}")]
    Logging { reason: String },
}

impl TapError {
    /// Map this error onto the decode-path taxonomy.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TapError::Truncated { .. } => ErrorCategory::MalformedInput,
            TapError::InvalidVarint { .. } => ErrorCategory::MalformedInput,
            TapError::Decode { .. } => ErrorCategory::MalformedInput,
            TapError::Decompression { .. } => ErrorCategory::ResourceExhaustion,
            TapError::File { .. } => ErrorCategory::Io,
            TapError::SourceClosed => ErrorCategory::Io,
            TapError::Parse { .. } => ErrorCategory::Configuration,
            TapError::Config { .. } => ErrorCategory::Configuration,
            TapError::Logging { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns whether processing can continue with the next unit of work.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.category(), ErrorCategory::MalformedInput | ErrorCategory::ResourceExhaustion)
    }

    /// Helper constructor for short-buffer reads.
    pub fn truncated(context: &'static str, needed: usize, available: usize) -> Self {
        TapError::Truncated { context, needed, available }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TapError::Config { reason: reason.into() }
    }

    /// Helper constructor for parse errors with context.
    pub fn parse(context: impl Into<String>, details: impl Into<String>) -> Self {
        TapError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TapError::File { path, source }
    }
}

impl From<std::io::Error> for TapError {
    fn from(err: std::io::Error) -> Self {
        TapError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
