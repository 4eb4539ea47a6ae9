//! Database jobs: test, check, mend and backup-restore.

use std::path::PathBuf;

use fbmend_app::{Credentials, JobRequest, RecoveryJob};
use fbmend_telemetry::record_target;
use fbmend_tools::detect_tool_dir;
use tracing::{info, warn};

use crate::cli::JobArgs;
use crate::context::{CliContext, CliError, CliResult};
use crate::output::format_report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobOperation {
    Test,
    Check,
    Mend,
    BackupRestore,
}

pub(crate) async fn handle_job(
    ctx: &CliContext,
    operation: JobOperation,
    args: JobArgs,
) -> CliResult<i32> {
    let bin_dir = resolve_bin_dir(args.bin)?;
    let job = RecoveryJob::new(JobRequest {
        target: args.db,
        bin_dir,
        credentials: Credentials::new(args.user, args.password),
    })
    .map_err(|err| CliError::validation(err.to_string()))?;
    record_target(&job.target().display().to_string());

    let engine = ctx.engine()?;
    let report = match operation {
        JobOperation::Test => engine.test_connection(&job).await,
        JobOperation::Check => engine.check(&job).await,
        JobOperation::Mend => engine.mend(&job).await,
        JobOperation::BackupRestore => engine.backup_restore(&job).await,
    };
    info!(job = %job.id(), outcome = report.outcome.as_str(), "job finished");

    println!("{}", format_report(&report, ctx.output)?);
    Ok(report.exit_code())
}

fn resolve_bin_dir(bin: Option<PathBuf>) -> CliResult<PathBuf> {
    if let Some(dir) = bin {
        return Ok(dir);
    }
    detect_tool_dir().ok_or_else(|| {
        warn!("no Firebird tool directory detected");
        CliError::validation("could not locate gfix and gbak; pass --bin")
    })
}
