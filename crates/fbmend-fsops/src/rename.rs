//! Rename with bounded retries while another process holds the file.
//!
//! # Design
//! - Only lock/sharing failures are retried; anything else aborts at once.
//! - Exhausting the attempts is an outcome, not an error, so callers can
//!   tell "still locked" apart from "cannot ever succeed".

use std::io;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{FsOpsError, FsOpsResult};

/// Attempt budget for a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one.
    pub max_attempts: u32,
    /// Sleep between attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Policy with at least one attempt.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(1))
    }
}

/// Non-fatal result of a retried rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The rename succeeded.
    Renamed {
        /// Attempts used, including the successful one.
        attempts: u32,
    },
    /// Every attempt hit a transient lock failure.
    Exhausted {
        /// Attempts used.
        attempts: u32,
        /// Message of the last transient failure.
        last_error: String,
    },
}

/// A single rename attempt, swappable so callers can simulate lock contention.
pub type RenameOp = dyn Fn(&Path, &Path) -> io::Result<()> + Send + Sync;

/// Whether `err` means another process still holds the file.
#[must_use]
pub fn is_transient(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::ResourceBusy {
        return true;
    }
    match err.raw_os_error() {
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        Some(32 | 33) if cfg!(windows) => true,
        // EBUSY, ETXTBSY
        Some(16 | 26) if cfg!(unix) => true,
        _ => false,
    }
}

/// Rename `from` to `to`, retrying transient lock failures per `policy`.
///
/// # Errors
///
/// Returns [`FsOpsError::Rename`] on the first non-transient failure.
pub async fn rename_with_retry(
    from: &Path,
    to: &Path,
    policy: RetryPolicy,
) -> FsOpsResult<RenameOutcome> {
    rename_with_retry_using(from, to, policy, |src, dst| std::fs::rename(src, dst)).await
}

/// [`rename_with_retry`] with an injected rename operation.
///
/// # Errors
///
/// Returns [`FsOpsError::Rename`] on the first non-transient failure.
pub async fn rename_with_retry_using<F>(
    from: &Path,
    to: &Path,
    policy: RetryPolicy,
    mut rename: F,
) -> FsOpsResult<RenameOutcome>
where
    F: FnMut(&Path, &Path) -> io::Result<()> + Send,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        match rename(from, to) {
            Ok(()) => {
                debug!(
                    from = %from.display(),
                    to = %to.display(),
                    attempt,
                    "rename succeeded"
                );
                return Ok(RenameOutcome::Renamed { attempts: attempt });
            }
            Err(err) if is_transient(&err) => {
                warn!(
                    from = %from.display(),
                    attempt,
                    max_attempts,
                    error = %err,
                    "file is locked; retrying rename"
                );
                last_error = err.to_string();
                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(source) => {
                return Err(FsOpsError::Rename {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    attempt,
                    source,
                });
            }
        }
    }
    Ok(RenameOutcome::Exhausted {
        attempts: max_attempts,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn busy() -> io::Error {
        io::Error::new(io::ErrorKind::ResourceBusy, "file in use")
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() -> anyhow::Result<()> {
        for failures in 0..4_u32 {
            let mut calls = 0_u32;
            let outcome = rename_with_retry_using(
                Path::new("a"),
                Path::new("b"),
                fast(10),
                |_, _| {
                    calls += 1;
                    if calls <= failures { Err(busy()) } else { Ok(()) }
                },
            )
            .await?;
            assert_eq!(outcome, RenameOutcome::Renamed { attempts: failures + 1 });
            assert_eq!(calls, failures + 1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn fatal_failure_aborts_after_one_attempt() {
        let mut calls = 0_u32;
        let result = rename_with_retry_using(Path::new("a"), Path::new("b"), fast(10), |_, _| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        })
        .await;
        assert!(matches!(result, Err(FsOpsError::Rename { attempt: 1, .. })));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn exhaustion_is_an_outcome() -> anyhow::Result<()> {
        let mut calls = 0_u32;
        let outcome = rename_with_retry_using(Path::new("a"), Path::new("b"), fast(3), |_, _| {
            calls += 1;
            Err(busy())
        })
        .await?;
        assert_eq!(
            outcome,
            RenameOutcome::Exhausted {
                attempts: 3,
                last_error: "file in use".to_string(),
            }
        );
        assert_eq!(calls, 3);
        Ok(())
    }

    #[tokio::test]
    async fn real_rename_moves_the_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let from = temp.path().join("APP.FDB");
        let to = temp.path().join("APP_WORK.FDB");
        fs::write(&from, b"pages")?;
        let outcome = rename_with_retry(&from, &to, fast(2)).await?;
        assert_eq!(outcome, RenameOutcome::Renamed { attempts: 1 });
        assert!(!from.exists());
        assert_eq!(fs::read(&to)?, b"pages");
        Ok(())
    }

    #[tokio::test]
    async fn missing_source_is_fatal() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let result = rename_with_retry(
            &temp.path().join("missing.fdb"),
            &temp.path().join("other.fdb"),
            fast(5),
        )
        .await;
        assert!(matches!(result, Err(FsOpsError::Rename { attempt: 1, .. })));
        Ok(())
    }

    #[test]
    fn policy_never_drops_below_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert!(!is_transient(&io::Error::from(io::ErrorKind::NotFound)));
    }
}
