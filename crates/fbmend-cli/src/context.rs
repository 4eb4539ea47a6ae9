//! CLI error type and the shared engine construction.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use fbmend_app::RecoveryEngine;
use fbmend_config::SettingsStore;
use fbmend_tools::{ServicePlatform, SystemRunner};
use tracing::{info, warn};

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Options shared by every command.
pub(crate) struct CliContext {
    config: Option<PathBuf>,
    pub(crate) output: OutputFormat,
}

impl CliContext {
    pub(crate) const fn new(config: Option<PathBuf>, output: OutputFormat) -> Self {
        Self { config, output }
    }

    /// Settings store at `--config` or the default location.
    pub(crate) fn store(&self) -> CliResult<SettingsStore> {
        match &self.config {
            Some(path) => Ok(SettingsStore::new(path)),
            None => SettingsStore::at_default_location().map_err(|err| {
                CliError::failure(anyhow!(err).context("cannot resolve the settings location"))
            }),
        }
    }

    /// Engine backed by real processes; writes default settings on first use.
    pub(crate) fn engine(&self) -> CliResult<RecoveryEngine> {
        let store = self.store()?;
        match store.ensure_exists() {
            Ok(true) => info!(path = %store.path().display(), "wrote default settings"),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "could not write default settings"),
        }
        let settings = store.load_settings();
        let runner = Arc::new(SystemRunner::new(settings.tool_timeout()));
        Ok(RecoveryEngine::new(store, runner, ServicePlatform::current()))
    }
}
