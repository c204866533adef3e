//! Error types for repocorpus.
//!
//! Library crates use [`CorpusError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all repocorpus operations.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the hosting API.
    #[error("network error: {0}")]
    Network(String),

    /// Malformed API response or input file.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (empty run, unsupported format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Guarded write refused because the destination exists.
    #[error("{path:?} already exists, pass --force to overwrite")]
    AlreadyExists { path: PathBuf },

    /// A content response carried no `content` payload.
    #[error("no content detected for file {url}")]
    MissingContent { url: String },

    /// A content payload could not be turned into UTF-8 text.
    #[error("unable to decode content for file at {url}: {message}")]
    Decode { url: String, message: String },

    /// Encoding or decoding a persisted corpus failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CorpusError>;

impl CorpusError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
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
    fn already_exists_mentions_force() {
        let err = CorpusError::AlreadyExists {
            path: PathBuf::from("/tmp/out.json"),
        };
        let msg = err.to_string();
        assert!(msg.contains("out.json"));
        assert!(msg.contains("--force"));
    }

    #[test]
    fn decode_error_carries_url() {
        let err = CorpusError::Decode {
            url: "https://api.example.com/blob/1".into(),
            message: "invalid byte".into(),
        };
        assert!(err.to_string().contains("blob/1"));
    }
}
