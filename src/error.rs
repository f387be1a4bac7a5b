//! Error types for confparse.
//!
//! Every failure the parser, tree and query engine can produce is surfaced
//! through [`Error`]. Nothing is retried and nothing is swallowed: parsing is
//! deterministic, so a failure on one run is a failure on every run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for confparse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for confparse.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Argument Errors
    // ========================================================================
    /// A caller supplied an argument the operation cannot work with.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The requested configuration dialect is not one of the supported tags.
    #[error("Unsupported dialect '{0}'; expected one of: ios, nxos, iosxr, asa, junos")]
    UnsupportedDialect(String),

    // ========================================================================
    // Consistency Errors
    // ========================================================================
    /// The tree was mutated after the last commit, so parent/child links
    /// cannot be trusted.
    #[error(
        "The configuration has changed since the last commit (checkpoint {checkpoint:#018x}, committed {committed:#018x}); a search is not safe"
    )]
    Stale {
        /// Checkpoint of the current node sequence
        checkpoint: u64,
        /// Checkpoint recorded by the last commit
        committed: u64,
    },

    // ========================================================================
    // Parse Errors
    // ========================================================================
    /// Brace-delimited text could not be normalized.
    #[error("Cannot parse line {line}: {message}")]
    ParseFailure {
        /// Zero-based physical line of the offending input
        line: usize,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Mutation Errors
    // ========================================================================
    /// A mutation targeted a line that does not exist.
    #[error("Configuration line not found: {0}")]
    NotFound(String),

    // ========================================================================
    // IO Errors
    // ========================================================================
    /// Reading or writing a configuration file failed.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments(message.into())
    }

    pub fn parse_failure(line: usize, message: impl Into<String>) -> Self {
        Self::ParseFailure {
            line,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_pattern(pattern: &str, source: &regex::Error) -> Self {
        Self::InvalidArguments(format!("invalid pattern '{}': {}", pattern, source))
    }

    /// Returns true if the error reports an uncommitted mutation.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Returns true if the error reports a missing mutation target.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the error came from malformed input text.
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseFailure { .. })
    }
}
