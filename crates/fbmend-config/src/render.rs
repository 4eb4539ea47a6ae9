//! Placeholder substitution for command templates.
//!
//! Substitution is purely textual: `{NAME}` tokens (`[A-Z_]+`) are replaced
//! with the context value, unknown tokens collapse to the empty string and no
//! quoting is added. Callers quote values that may contain spaces before
//! inserting them (see [`quote_if_needed`]).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Placeholder names understood by the default templates.
pub mod placeholder {
    /// Quoted path to `gfix`.
    pub const GFIX: &str = "GFIX";
    /// Quoted path to `gbak`.
    pub const GBAK: &str = "GBAK";
    /// Quoted path to `isql`.
    pub const ISQL: &str = "ISQL";
    /// Database user name.
    pub const USER: &str = "USER";
    /// Database password.
    pub const PASS: &str = "PASS";
    /// Canonical path of the live database.
    pub const DB_PATH: &str = "DB_PATH";
    /// Renamed original used as the backup source.
    pub const OLD_DB: &str = "OLD_DB";
    /// Rebuilt file produced by the restore.
    pub const NEW_DB: &str = "NEW_DB";
    /// Archive produced by the backup.
    pub const FBK: &str = "FBK";
    /// Backup log path.
    pub const LOG_BKP: &str = "LOG_BKP";
    /// Restore log path.
    pub const LOG_RTR: &str = "LOG_RTR";
}

/// Values available to a template render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    values: BTreeMap<String, String>,
}

impl RenderContext {
    /// Empty context; every placeholder renders as the empty string.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a placeholder value.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a placeholder value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Value bound to `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\{([A-Z_]+)\}").ok())
        .as_ref()
}

/// Substitute every `{PLACEHOLDER}` in `template` from `context`.
#[must_use]
pub fn render(template: &str, context: &RenderContext) -> String {
    let Some(pattern) = placeholder_pattern() else {
        return template.to_string();
    };
    pattern
        .replace_all(template, |captures: &Captures<'_>| {
            captures
                .get(1)
                .and_then(|name| context.get(name.as_str()))
                .unwrap_or_default()
                .to_string()
        })
        .into_owned()
}

/// Wrap `value` in double quotes when it contains whitespace and is not
/// already quoted.
#[must_use]
pub fn quote_if_needed(value: &str) -> String {
    let already_quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    if already_quoted || !value.chars().any(char::is_whitespace) {
        value.to_string()
    } else {
        format!("\"{value}\"")
    }
}
