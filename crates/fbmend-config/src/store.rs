//! JSON-backed persistence for the settings document.
//!
//! # Design
//! - Reads never fail: a missing, unreadable or malformed file yields the
//!   compiled-in defaults and a log line.
//! - Writes are atomic: a sibling temp file is renamed over the target so a
//!   failed save leaves the previous document untouched.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{Settings, TemplateSet};

const TEMP_SUFFIX: &str = "tmp";

/// Handle to the settings document at a fixed location.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Store backed by the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location (see [`SettingsStore::default_location`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LocationUnavailable`] when no directory can be
    /// resolved.
    pub fn at_default_location() -> ConfigResult<Self> {
        Ok(Self::new(Self::default_location()?))
    }

    /// `$FBMEND_HOME/settings.json` when set, otherwise
    /// `<config dir>/fbmend/settings.json`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::LocationUnavailable`] when the environment
    /// override is unset and the platform has no config directory.
    pub fn default_location() -> ConfigResult<PathBuf> {
        if let Some(home) = std::env::var_os(defaults::HOME_ENV).filter(|value| !value.is_empty())
        {
            return Ok(PathBuf::from(home).join(defaults::SETTINGS_FILE_NAME));
        }
        dirs::config_dir()
            .map(|dir| {
                dir.join(defaults::APP_DIR_NAME)
                    .join(defaults::SETTINGS_FILE_NAME)
            })
            .ok_or(ConfigError::LocationUnavailable)
    }

    /// Location of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full settings document merged over defaults.
    #[must_use]
    pub fn load_settings(&self) -> Settings {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "settings file absent; using defaults");
                return Settings::default();
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "settings file unreadable; using defaults"
                );
                return Settings::default();
            }
        };

        match serde_json::from_str::<Settings>(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "settings file malformed; using defaults"
                );
                Settings::default()
            }
        }
    }

    /// Persist the full settings document atomically.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created or the document
    /// cannot be written; the previous document is left in place.
    pub fn save_settings(&self, settings: &Settings) -> ConfigResult<()> {
        let serialised = serde_json::to_string_pretty(settings)
            .map_err(|source| ConfigError::json("settings.serialize", &self.path, source))?;
        self.write_atomically(serialised.as_bytes())?;
        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Write the defaults when no document exists yet. Returns `true` when a
    /// document was created.
    ///
    /// # Errors
    ///
    /// Returns an error when the defaults cannot be written.
    pub fn ensure_exists(&self) -> ConfigResult<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save_settings(&Settings::default())?;
        Ok(true)
    }

    /// Load the command templates merged over defaults.
    #[must_use]
    pub fn load(&self) -> TemplateSet {
        self.load_settings().templates
    }

    /// Persist `templates`, keeping the rest of the document as it is.
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be written.
    pub fn save(&self, templates: &TemplateSet) -> ConfigResult<()> {
        let mut settings = self.load_settings();
        settings.templates = templates.clone();
        self.save_settings(&settings)
    }

    /// Persist and return the compiled-in templates.
    ///
    /// # Errors
    ///
    /// Returns an error when the defaults cannot be written.
    pub fn reset_to_default(&self) -> ConfigResult<TemplateSet> {
        let templates = TemplateSet::default();
        self.save(&templates)?;
        Ok(templates)
    }

    fn write_atomically(&self, bytes: &[u8]) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::io("settings.create_dir", parent, source))?;
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, bytes)
            .map_err(|source| ConfigError::io("settings.write_temp", &temp_path, source))?;

        if let Err(source) = fs::rename(&temp_path, &self.path) {
            if let Err(cleanup) = fs::remove_file(&temp_path) {
                warn!(
                    path = %temp_path.display(),
                    error = %cleanup,
                    "failed to remove temporary settings file"
                );
            }
            return Err(ConfigError::io("settings.replace", &self.path, source));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".");
        name.push(TEMP_SUFFIX);
        self.path.with_file_name(name)
    }
}
