//! Error types for settings persistence.
//!
//! # Design
//! - Constant messages; the operation and path travel as fields.
//! - Source errors are preserved rather than interpolated.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for settings operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system operation failed.
    #[error("settings io failure")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// Settings document could not be serialised.
    #[error("settings json failure")]
    Json {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Source serde error.
        source: serde_json::Error,
    },
    /// No platform configuration directory could be resolved.
    #[error("settings location unavailable")]
    LocationUnavailable,
    /// A template name did not match any known operation.
    #[error("unknown template kind")]
    UnknownTemplate {
        /// Name supplied by the caller.
        value: String,
    },
}

impl ConfigError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: serde_json::Error,
    ) -> Self {
        Self::Json {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for settings results.
pub type ConfigResult<T> = Result<T, ConfigError>;
