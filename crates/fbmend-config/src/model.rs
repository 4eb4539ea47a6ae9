//! Typed settings document and command template set.
//!
//! # Design
//! - Pure data carriers; IO lives in `store.rs`.
//! - `#[serde(default)]` everywhere so a partial document merges over defaults
//!   key by key.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigError;

/// Operation a command template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// Connection test through `isql`.
    Test,
    /// Full validation through `gfix -v -full`.
    Check,
    /// In-place repair through `gfix -mend`.
    Mend,
    /// Archive creation through `gbak -backup`.
    Backup,
    /// Rebuild from archive through `gbak -create`.
    Restore,
}

impl TemplateKind {
    /// Every template kind, in the order they are shown to users.
    pub const ALL: [Self; 5] = [
        Self::Test,
        Self::Check,
        Self::Mend,
        Self::Backup,
        Self::Restore,
    ];

    /// Render the kind as its lowercase key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Check => "check",
            Self::Mend => "mend",
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }
}

impl Display for TemplateKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for TemplateKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ConfigError::UnknownTemplate {
                value: value.to_string(),
            })
    }
}

/// The five parametrised command strings plus the custom/built-in switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TemplateSet {
    /// When `false`, built-in argument lists are used and the templates are
    /// informational only.
    pub use_custom: bool,
    /// Connection test template.
    pub test: String,
    /// Validation template.
    pub check: String,
    /// Mend template.
    pub mend: String,
    /// Backup template.
    pub backup: String,
    /// Restore template.
    pub restore: String,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self {
            use_custom: false,
            test: defaults::TEST_TEMPLATE.to_string(),
            check: defaults::CHECK_TEMPLATE.to_string(),
            mend: defaults::MEND_TEMPLATE.to_string(),
            backup: defaults::BACKUP_TEMPLATE.to_string(),
            restore: defaults::RESTORE_TEMPLATE.to_string(),
        }
    }
}

impl TemplateSet {
    /// Template text for `kind`.
    #[must_use]
    pub fn get(&self, kind: TemplateKind) -> &str {
        match kind {
            TemplateKind::Test => &self.test,
            TemplateKind::Check => &self.check,
            TemplateKind::Mend => &self.mend,
            TemplateKind::Backup => &self.backup,
            TemplateKind::Restore => &self.restore,
        }
    }

    /// Replace the template text for `kind`.
    pub fn set(&mut self, kind: TemplateKind, template: impl Into<String>) {
        let slot = match kind {
            TemplateKind::Test => &mut self.test,
            TemplateKind::Check => &mut self.check,
            TemplateKind::Mend => &mut self.mend,
            TemplateKind::Backup => &mut self.backup,
            TemplateKind::Restore => &mut self.restore,
        };
        *slot = template.into();
    }
}

/// Full persisted settings document.
///
/// Template keys sit at the top level of the JSON object next to the
/// heuristic lists and retry knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Command templates and the custom switch.
    #[serde(flatten)]
    pub templates: TemplateSet,
    /// Failure heuristics applied to backup/restore output.
    pub error_heuristics: Vec<String>,
    /// Success markers that override failure heuristics.
    pub success_markers: Vec<String>,
    /// Engine service identities, queried in order.
    pub service_names: Vec<String>,
    /// Rename attempts before a locked file is reported as busy.
    pub rename_attempts: u32,
    /// Delay between rename attempts in milliseconds.
    pub rename_delay_ms: u64,
    /// Timeout for a single tool invocation in seconds.
    pub tool_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            templates: TemplateSet::default(),
            error_heuristics: defaults::to_owned_list(defaults::ERROR_HEURISTICS),
            success_markers: defaults::to_owned_list(defaults::SUCCESS_MARKERS),
            service_names: defaults::service_names(),
            rename_attempts: defaults::RENAME_ATTEMPTS,
            rename_delay_ms: defaults::RENAME_DELAY_MS,
            tool_timeout_secs: defaults::TOOL_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Delay between rename attempts.
    #[must_use]
    pub const fn rename_delay(&self) -> Duration {
        Duration::from_millis(self.rename_delay_ms)
    }

    /// Timeout applied to each external tool run.
    #[must_use]
    pub const fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Rename attempts, never less than one.
    #[must_use]
    pub fn rename_attempts(&self) -> u32 {
        self.rename_attempts.max(1)
    }
}
