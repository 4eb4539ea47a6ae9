//! # Design
//!
//! - Errors here cover job construction only; once a job starts, every
//!   failure becomes part of the `RecoveryReport`.
//! - Constant messages with context fields, sources preserved.

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Job input failed validation.
    #[error("invalid job input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// Artifact paths could not be derived.
    #[error("filesystem layout failed")]
    FsOps {
        /// Operation identifier.
        operation: &'static str,
        /// Source fsops error.
        source: fbmend_fsops::FsOpsError,
    },
    /// Settings could not be accessed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: fbmend_config::ConfigError,
    },
}

impl AppError {
    pub(crate) const fn fsops(operation: &'static str, source: fbmend_fsops::FsOpsError) -> Self {
        Self::FsOps { operation, source }
    }

    /// Wrap a configuration error.
    #[must_use]
    pub const fn config(operation: &'static str, source: fbmend_config::ConfigError) -> Self {
        Self::Config { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn helpers_build_variants_with_sources() {
        let fsops = AppError::fsops(
            "job.layout",
            fbmend_fsops::FsOpsError::InvalidInput {
                field: "target",
                reason: "target path has no file name",
                value: None,
            },
        );
        assert!(matches!(fsops, AppError::FsOps { operation: "job.layout", .. }));
        assert!(fsops.source().is_some());

        let config = AppError::config("settings.location", fbmend_config::ConfigError::LocationUnavailable);
        assert_eq!(config.to_string(), "configuration operation failed");
    }
}
