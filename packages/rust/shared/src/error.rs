//! Error types for the Triple Loop assistant.
//!
//! Library crates use [`TripleLoopError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all workspace operations.
#[derive(Debug, thiserror::Error)]
pub enum TripleLoopError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the completion endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// The completion endpoint answered, but not with something usable.
    #[error("completion error: {0}")]
    Completion(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input validation error (empty question, malformed value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TripleLoopError>;

impl TripleLoopError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a completion error from any displayable message.
    pub fn completion(msg: impl Into<String>) -> Self {
        Self::Completion(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TripleLoopError::config("overlap must be smaller than target_size");
        assert_eq!(
            err.to_string(),
            "config error: overlap must be smaller than target_size"
        );

        let err = TripleLoopError::validation("question is empty");
        assert!(err.to_string().contains("question is empty"));

        let err = TripleLoopError::completion("no choices returned");
        assert_eq!(err.to_string(), "completion error: no choices returned");
    }

    #[test]
    fn io_error_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = TripleLoopError::io("/tmp/knowledge_base.txt", source);
        assert!(err.to_string().contains("knowledge_base.txt"));
    }
}
