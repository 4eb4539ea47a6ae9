//! Location of the Firebird command-line tools.

use std::env;
use std::env::consts::EXE_SUFFIX;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

/// Firebird command-line tools the workflow drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Validation and repair.
    Gfix,
    /// Backup and restore.
    Gbak,
    /// Interactive SQL, used for the connection test.
    Isql,
}

impl Tool {
    /// Base name without the platform executable suffix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gfix => "gfix",
            Self::Gbak => "gbak",
            Self::Isql => "isql",
        }
    }

    /// File name including the platform executable suffix.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}{EXE_SUFFIX}", self.as_str())
    }

    /// Full path of this tool inside `dir`.
    #[must_use]
    pub fn path_in(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Which tools were found in a candidate directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolProbe {
    /// Directory that was probed.
    pub dir: PathBuf,
    /// `gfix` present.
    pub gfix: bool,
    /// `gbak` present.
    pub gbak: bool,
    /// `isql` present.
    pub isql: bool,
}

impl ToolProbe {
    /// A directory qualifies when both `gfix` and `gbak` exist.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.gfix && self.gbak
    }

    /// Whether `tool` was found.
    #[must_use]
    pub const fn has(&self, tool: Tool) -> bool {
        match tool {
            Tool::Gfix => self.gfix,
            Tool::Gbak => self.gbak,
            Tool::Isql => self.isql,
        }
    }
}

/// Check `dir` for each tool.
#[must_use]
pub fn probe_tool_dir(dir: &Path) -> ToolProbe {
    ToolProbe {
        dir: dir.to_path_buf(),
        gfix: Tool::Gfix.path_in(dir).is_file(),
        gbak: Tool::Gbak.path_in(dir).is_file(),
        isql: Tool::Isql.path_in(dir).is_file(),
    }
}

/// Default install locations, in search order.
#[must_use]
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        dirs.push(cwd.join("Firebird_2_5").join("bin"));
    }
    let program_files = env::var_os("ProgramFiles")
        .map_or_else(|| PathBuf::from("C:/Program Files"), PathBuf::from);
    let program_files_x86 = env::var_os("ProgramFiles(x86)")
        .map_or_else(|| PathBuf::from("C:/Program Files (x86)"), PathBuf::from);
    for root in [program_files, program_files_x86] {
        dirs.push(root.join("Firebird").join("Firebird_2_5").join("bin"));
    }
    if cfg!(unix) {
        dirs.push(PathBuf::from("/opt/firebird/bin"));
        dirs.push(PathBuf::from("/usr/lib/firebird/bin"));
    }
    dirs
}

/// First complete directory among `candidates`.
#[must_use]
pub fn detect_in<I>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    candidates.into_iter().find(|dir| {
        let probe = probe_tool_dir(dir);
        debug!(dir = %dir.display(), complete = probe.is_complete(), "probed tool directory");
        probe.is_complete()
    })
}

/// First complete directory among the default install locations.
#[must_use]
pub fn detect_tool_dir() -> Option<PathBuf> {
    detect_in(candidate_dirs())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn install(dir: &Path, tools: &[Tool]) -> anyhow::Result<()> {
        fs::create_dir_all(dir)?;
        for tool in tools {
            fs::write(tool.path_in(dir), b"")?;
        }
        Ok(())
    }

    #[test]
    fn probe_reports_each_tool() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        install(temp.path(), &[Tool::Gbak, Tool::Isql])?;
        let probe = probe_tool_dir(temp.path());
        assert!(!probe.gfix);
        assert!(probe.has(Tool::Gbak));
        assert!(probe.has(Tool::Isql));
        assert!(!probe.is_complete());
        Ok(())
    }

    #[test]
    fn detect_in_returns_first_complete_directory() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let partial = temp.path().join("partial");
        let full = temp.path().join("full");
        let later = temp.path().join("later");
        install(&partial, &[Tool::Gfix])?;
        install(&full, &[Tool::Gfix, Tool::Gbak])?;
        install(&later, &[Tool::Gfix, Tool::Gbak, Tool::Isql])?;

        let found = detect_in([temp.path().join("missing"), partial, full.clone(), later]);
        assert_eq!(found, Some(full));
        Ok(())
    }

    #[test]
    fn file_name_carries_platform_suffix() {
        assert_eq!(Tool::Gbak.file_name(), format!("gbak{EXE_SUFFIX}"));
        assert!(candidate_dirs().iter().any(|dir| dir.ends_with("Firebird_2_5/bin")));
    }
}
