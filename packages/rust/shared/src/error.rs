//! Error types for DeepCut.
//!
//! Library crates use [`DeepCutError`] via `thiserror`.
//! The CLI wraps this with `color-eyre`; the server maps it onto JSON error documents.

use std::path::PathBuf;

/// Top-level error type for all DeepCut operations.
#[derive(Debug, thiserror::Error)]
pub enum DeepCutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Bad caller input (e.g., an empty topic).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The generation service call failed or returned nothing usable.
    #[error("generation error: {0}")]
    Generation(String),

    /// The storage layer rejected a read or write.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Shared-secret check failed for an automated trigger.
    #[error("auth error: {message}")]
    Auth { message: String },

    /// Outbound email delivery failed.
    #[error("notify error: {0}")]
    Notify(String),

    /// The streaming caller went away before the run finished.
    #[error("run cancelled: output channel closed")]
    Cancelled,

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DeepCutError>;

impl DeepCutError {
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

    /// Create an auth error from any displayable message.
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
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

    /// The bare message without the category prefix, for caller-facing documents.
    pub fn message(&self) -> String {
        match self {
            Self::Config { message } | Self::Validation { message } | Self::Auth { message } => {
                message.clone()
            }
            Self::Generation(m) | Self::Persistence(m) | Self::Notify(m) => m.clone(),
            other => other.to_string(),
        }
    }
}
