//! One recovery job: what to work on, with which tools and credentials, and
//! every artifact path derived up front.

use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use fbmend_fsops::ArtifactLayout;
use fbmend_tools::Tool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Default engine administrator account.
pub const DEFAULT_USER: &str = "SYSDBA";

/// Database credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    /// Credential pair.
    #[must_use]
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    /// User name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Password in clear text, for building tool command lines.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Debug for Credentials {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// User input for a job.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Canonical database path.
    pub target: PathBuf,
    /// Directory holding `gfix`, `gbak` and `isql`.
    pub bin_dir: PathBuf,
    /// Credentials passed to the tools.
    pub credentials: Credentials,
}

/// Immutable job with its derived artifact layout.
#[derive(Debug, Clone)]
pub struct RecoveryJob {
    id: Uuid,
    bin_dir: PathBuf,
    credentials: Credentials,
    layout: ArtifactLayout,
}

impl RecoveryJob {
    /// Build a job stamped with the current local time.
    ///
    /// # Errors
    ///
    /// See [`RecoveryJob::at`].
    pub fn new(request: JobRequest) -> AppResult<Self> {
        Self::at(request, Local::now().naive_local())
    }

    /// Build a job stamped with `at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidInput`] for an empty user name and
    /// [`AppError::FsOps`] when the target has no file name.
    pub fn at(request: JobRequest, at: NaiveDateTime) -> AppResult<Self> {
        if request.credentials.user().trim().is_empty() {
            return Err(AppError::InvalidInput {
                field: "user",
                reason: "user name must not be empty",
            });
        }
        let target = std::path::absolute(&request.target).unwrap_or(request.target);
        let layout =
            ArtifactLayout::new(&target, at).map_err(|err| AppError::fsops("job.layout", err))?;
        Ok(Self {
            id: Uuid::new_v4(),
            bin_dir: request.bin_dir,
            credentials: request.credentials,
            layout,
        })
    }

    /// Unique identifier used in logs.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Canonical database path.
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.layout.target
    }

    /// Tool directory.
    #[must_use]
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Full path of `tool` in the tool directory.
    #[must_use]
    pub fn tool_path(&self, tool: Tool) -> PathBuf {
        tool.path_in(&self.bin_dir)
    }

    /// Credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Derived artifact paths.
    #[must_use]
    pub const fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn request(target: &str, user: &str) -> JobRequest {
        JobRequest {
            target: PathBuf::from(target),
            bin_dir: PathBuf::from("/opt/firebird/bin"),
            credentials: Credentials::new(user, "masterkey"),
        }
    }

    fn noon() -> anyhow::Result<NaiveDateTime> {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .ok_or_else(|| anyhow::anyhow!("invalid fixture date"))
    }

    #[test]
    fn debug_output_hides_the_password() {
        let rendered = format!("{:?}", Credentials::new("SYSDBA", "masterkey"));
        assert!(rendered.contains("SYSDBA"));
        assert!(!rendered.contains("masterkey"));
    }

    #[test]
    fn job_derives_layout_from_stamp() -> anyhow::Result<()> {
        let job = RecoveryJob::at(request("/data/APP.DB", DEFAULT_USER), noon()?)?;
        assert_eq!(job.target(), Path::new("/data/APP.DB"));
        assert_eq!(job.layout().stamp, "20240101_120000");
        assert_eq!(
            job.tool_path(Tool::Gbak),
            Path::new("/opt/firebird/bin").join(Tool::Gbak.file_name())
        );
        assert!(!format!("{job:?}").contains("masterkey"));
        Ok(())
    }

    #[test]
    fn empty_user_is_rejected() -> anyhow::Result<()> {
        let result = RecoveryJob::at(request("/data/APP.DB", "  "), noon()?);
        assert!(matches!(result, Err(AppError::InvalidInput { field: "user", .. })));
        Ok(())
    }

    #[test]
    fn relative_targets_become_absolute() -> anyhow::Result<()> {
        let job = RecoveryJob::at(request("APP.FDB", DEFAULT_USER), noon()?)?;
        assert!(job.target().is_absolute());
        Ok(())
    }
}
