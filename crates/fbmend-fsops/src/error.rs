//! # Design
//!
//! - Constant-message errors; the operation and path travel as fields.
//! - Source errors are preserved, never interpolated into the message.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for filesystem steps.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Errors produced by filesystem steps.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// IO failures while interacting with the filesystem.
    #[error("fsops io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Rename failed for a reason that retrying cannot fix.
    #[error("fsops rename failed")]
    Rename {
        /// Source path.
        from: PathBuf,
        /// Destination path.
        to: PathBuf,
        /// Attempt on which the failure occurred.
        attempt: u32,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Input validation failures.
    #[error("fsops invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
}

impl FsOpsError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Path the failure concerns, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Rename { from, .. } => Some(from),
            Self::InvalidInput { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn io_helper_keeps_context_out_of_the_message() {
        let err = FsOpsError::io(
            "layout.create_temp",
            "/data/TEMP",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "fsops io failure");
        assert_eq!(err.path(), Some(std::path::Path::new("/data/TEMP")));
        assert!(err.source().is_some());
    }

    #[test]
    fn invalid_input_has_no_path() {
        let err = FsOpsError::InvalidInput {
            field: "target",
            reason: "missing file name",
            value: None,
        };
        assert!(err.path().is_none());
        assert_eq!(err.to_string(), "fsops invalid input");
    }
}
