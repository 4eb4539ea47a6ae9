//! Paths a backup/restore job produces, derived from the target and a stamp.
//!
//! # Design
//! - Every path is computed up front so the job never invents a name mid-run.
//! - Artifacts sit next to the target; logs go to a `TEMP` subdirectory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{FsOpsError, FsOpsResult};

/// `chrono` format of the timestamp token, sortable as text.
pub const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Subdirectory holding logs and swept history artifacts.
pub const TEMP_DIR_NAME: &str = "TEMP";
const DEFAULT_EXTENSION: &str = "FDB";
const ARCHIVE_EXTENSION: &str = "FBK";

/// Render `at` as the job timestamp token.
#[must_use]
pub fn stamp_token(at: NaiveDateTime) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Derived artifact paths of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactLayout {
    /// Canonical live path of the database.
    pub target: PathBuf,
    /// Timestamp token shared by every artifact.
    pub stamp: String,
    /// Name the original carries while tools run against it.
    pub working: PathBuf,
    /// File the restore writes.
    pub rebuilt: PathBuf,
    /// Backup archive.
    pub archive: PathBuf,
    /// Name the original keeps after a successful rebuild.
    pub history: PathBuf,
    /// Directory for logs and swept history.
    pub temp_dir: PathBuf,
    /// Backup tool log.
    pub backup_log: PathBuf,
    /// Restore tool log.
    pub restore_log: PathBuf,
}

impl ArtifactLayout {
    /// Derive every path for `target` at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::InvalidInput`] when `target` has no file stem.
    pub fn new(target: &Path, at: NaiveDateTime) -> FsOpsResult<Self> {
        let stem = target
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| FsOpsError::InvalidInput {
                field: "target",
                reason: "target path has no file name",
                value: Some(target.display().to_string()),
            })?;
        let ext = target
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_EXTENSION);
        let dir = target
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let stamp = stamp_token(at);
        let temp_dir = dir.join(TEMP_DIR_NAME);

        Ok(Self {
            target: target.to_path_buf(),
            working: dir.join(format!("{stem}_WORK_{stamp}.{ext}")),
            rebuilt: dir.join(format!("{stem}_NEW_{stamp}.{ext}")),
            archive: dir.join(format!("{stem}_{stamp}.{ARCHIVE_EXTENSION}")),
            history: dir.join(format!("{stem}_OLD_{stamp}.{ext}")),
            backup_log: temp_dir.join(format!("LOG_BKP_{stamp}.LOG")),
            restore_log: temp_dir.join(format!("LOG_RTR_{stamp}.LOG")),
            temp_dir,
            stamp,
        })
    }

    /// Directory containing the target.
    #[must_use]
    pub fn dir(&self) -> &Path {
        self.target.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Database paths this run reads or writes in [`Self::dir`].
    #[must_use]
    pub fn owned_paths(&self) -> [&Path; 4] {
        [&self.target, &self.working, &self.rebuilt, &self.history]
    }

    /// Create the `TEMP` directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::Io`] when the directory cannot be created.
    pub fn ensure_temp_dir(&self) -> FsOpsResult<()> {
        fs::create_dir_all(&self.temp_dir)
            .map_err(|source| FsOpsError::io("layout.create_temp", &self.temp_dir, source))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn noon() -> anyhow::Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .ok_or_else(|| anyhow::anyhow!("invalid fixture date"))
    }

    #[test]
    fn layout_keeps_the_target_extension() -> anyhow::Result<()> {
        let layout = ArtifactLayout::new(Path::new("/data/APP.DB"), noon()?)?;
        assert_eq!(layout.stamp, "20240101_120000");
        assert_eq!(layout.archive, PathBuf::from("/data/APP_20240101_120000.FBK"));
        assert_eq!(layout.history, PathBuf::from("/data/APP_OLD_20240101_120000.DB"));
        assert_eq!(layout.working, PathBuf::from("/data/APP_WORK_20240101_120000.DB"));
        assert_eq!(layout.rebuilt, PathBuf::from("/data/APP_NEW_20240101_120000.DB"));
        assert_eq!(
            layout.backup_log,
            PathBuf::from("/data/TEMP/LOG_BKP_20240101_120000.LOG")
        );
        assert_eq!(
            layout.restore_log,
            PathBuf::from("/data/TEMP/LOG_RTR_20240101_120000.LOG")
        );
        assert_eq!(layout.dir(), Path::new("/data"));
        assert_eq!(layout.owned_paths()[0], Path::new("/data/APP.DB"));
        Ok(())
    }

    #[test]
    fn missing_extension_defaults_to_fdb() -> anyhow::Result<()> {
        let layout = ArtifactLayout::new(Path::new("/data/SALES"), noon()?)?;
        assert_eq!(layout.history, PathBuf::from("/data/SALES_OLD_20240101_120000.FDB"));
        Ok(())
    }

    #[test]
    fn target_without_name_is_rejected() -> anyhow::Result<()> {
        let result = ArtifactLayout::new(Path::new("/"), noon()?);
        assert!(matches!(result, Err(FsOpsError::InvalidInput { field: "target", .. })));
        Ok(())
    }

    #[test]
    fn ensure_temp_dir_creates_the_directory() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let layout = ArtifactLayout::new(&temp.path().join("APP.FDB"), noon()?)?;
        layout.ensure_temp_dir()?;
        layout.ensure_temp_dir()?;
        assert!(layout.temp_dir.is_dir());
        Ok(())
    }
}
