//! Sweep of history artifacts left by earlier runs into the `TEMP` directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

fn history_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)_OLD_\d{8}_\d{6}\.(fdb|gdb|fbk|db)$").ok())
        .as_ref()
}

/// Whether `name` looks like a history artifact (`*_OLD_<stamp>.<ext>`).
#[must_use]
pub fn is_history_artifact(name: &str) -> bool {
    history_pattern().is_some_and(|pattern| pattern.is_match(name))
}

/// Move every history artifact directly inside `dir` into `temp_dir`,
/// leaving the paths in `keep` alone.
///
/// Individual move failures are logged and skipped. Returns the new paths.
///
/// # Errors
///
/// Returns [`FsOpsError::Io`] when `dir` cannot be listed.
pub fn sweep_history(dir: &Path, temp_dir: &Path, keep: &[&Path]) -> FsOpsResult<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).map_err(|source| FsOpsError::io("history.read_dir", dir, source))?;
    let mut moved = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || keep.contains(&path.as_path()) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !is_history_artifact(name) {
            continue;
        }
        let destination = temp_dir.join(name);
        match fs::rename(&path, &destination) {
            Ok(()) => {
                debug!(from = %path.display(), to = %destination.display(), "swept history artifact");
                moved.push(destination);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not sweep history artifact");
            }
        }
    }
    moved.sort();
    Ok(moved)
}
