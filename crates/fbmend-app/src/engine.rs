//! Recovery workflow state machine.
//!
//! # Design
//! - Settings are read once per operation, so edits take effect on the next
//!   run without restarting anything.
//! - Every exit path of the backup/restore cycle restarts the service and
//!   returns a report; nothing escapes as an `Err`.
//! - Rollback steps never replace the root cause; their failures become
//!   caveats on the report.
//! - Built-in commands are argument arrays. Custom templates are rendered
//!   and handed to the platform shell as-is: enabling them trusts their
//!   author with arbitrary shell syntax.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use fbmend_config::{RenderContext, Settings, SettingsStore, placeholder, quote_if_needed, render};
use fbmend_fsops::{
    FsOpsResult, RenameOp, RenameOutcome, RetryPolicy, rename_with_retry, rename_with_retry_using,
    sweep_history,
};
use fbmend_tools::{
    Classifier, CommandLine, CommandOutput, CommandRunner, ServiceController, ServicePlatform,
    ServiceState, Tool, Verdict,
};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::job::RecoveryJob;
use crate::report::{Operation, Outcome, RecoveryReport, ToolSection};
use crate::stage::{ToolKind, WorkflowStage};

/// Drives recovery jobs against the tools, the service manager and the
/// filesystem.
#[derive(Clone)]
pub struct RecoveryEngine {
    store: SettingsStore,
    runner: Arc<dyn CommandRunner>,
    platform: ServicePlatform,
    rename: Option<Arc<RenameOp>>,
}

impl RecoveryEngine {
    /// Engine reading settings from `store` and running commands through
    /// `runner`.
    #[must_use]
    pub fn new(
        store: SettingsStore,
        runner: Arc<dyn CommandRunner>,
        platform: ServicePlatform,
    ) -> Self {
        Self {
            store,
            runner,
            platform,
            rename: None,
        }
    }

    /// Replace the filesystem rename used for every move of the database.
    #[must_use]
    pub fn with_rename_op(mut self, rename: Arc<RenameOp>) -> Self {
        self.rename = Some(rename);
        self
    }

    /// Engine using the settings document at its default location.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when no settings location can be resolved.
    pub fn with_default_store(
        runner: Arc<dyn CommandRunner>,
        platform: ServicePlatform,
    ) -> AppResult<Self> {
        let store = SettingsStore::at_default_location()
            .map_err(|err| AppError::config("settings.location", err))?;
        Ok(Self::new(store, runner, platform))
    }

    /// Settings store in use.
    #[must_use]
    pub const fn store(&self) -> &SettingsStore {
        &self.store
    }

    async fn move_file(
        &self,
        from: &Path,
        to: &Path,
        policy: RetryPolicy,
    ) -> FsOpsResult<RenameOutcome> {
        match &self.rename {
            Some(rename) => {
                rename_with_retry_using(from, to, policy, |src, dst| rename(src, dst)).await
            }
            None => rename_with_retry(from, to, policy).await,
        }
    }

    fn services(&self, settings: &Settings) -> ServiceController {
        ServiceController::new(
            Arc::clone(&self.runner),
            self.platform,
            settings.service_names.clone(),
        )
    }

    /// Current state of the engine service.
    pub async fn service_state(&self) -> ServiceState {
        let settings = self.store.load_settings();
        self.services(&settings).query_state().await
    }

    /// Stop every known service identity.
    pub async fn stop_service(&self) {
        let settings = self.store.load_settings();
        self.services(&settings).stop_all().await;
    }

    /// Start every known service identity.
    pub async fn start_service(&self) {
        let settings = self.store.load_settings();
        self.services(&settings).start_all().await;
    }

    /// Restart the first installed identity and return its name.
    pub async fn restart_service(&self) -> Option<String> {
        let settings = self.store.load_settings();
        self.services(&settings).restart_first_recognized().await
    }

    /// Open the database with `isql` and quit.
    pub async fn test_connection(&self, job: &RecoveryJob) -> RecoveryReport {
        self.run_direct(Operation::Test, ToolKind::Test, job).await
    }

    /// Validate the live file with `gfix -v -full`.
    pub async fn check(&self, job: &RecoveryJob) -> RecoveryReport {
        self.run_direct(Operation::Check, ToolKind::Check, job).await
    }

    /// Repair the live file in place with `gfix -mend`.
    pub async fn mend(&self, job: &RecoveryJob) -> RecoveryReport {
        self.run_direct(Operation::Mend, ToolKind::Mend, job).await
    }

    async fn run_direct(
        &self,
        operation: Operation,
        kind: ToolKind,
        job: &RecoveryJob,
    ) -> RecoveryReport {
        let mut report = RecoveryReport::new(operation, job.target());
        if let Err(reason) = check_target_and_tool(job, kind.tool()) {
            return reject(report, reason);
        }

        let settings = self.store.load_settings();
        report.stage = WorkflowStage::ToolRunning(kind);
        info!(job = %job.id(), stage = %report.stage, "running tool");
        let (section, output) = self.run_tool(kind, &settings, job, None).await;
        report.tools.push(section);

        if output.ran_to_completion() {
            report.outcome = Outcome::Completed;
            report.stage = WorkflowStage::Done;
        } else {
            report.outcome = Outcome::Failed;
            report.failed_stage = Some(report.stage);
            report.reason = Some(format!("{kind} {}", interruption(&output)));
        }
        report
    }

    /// Rebuild the database through a full backup and restore cycle.
    ///
    /// The live file is moved aside, backed up, restored into a fresh file
    /// and the fresh file is moved into place. Any failure after the move
    /// puts the original back at its canonical path.
    pub async fn backup_restore(&self, job: &RecoveryJob) -> RecoveryReport {
        let layout = job.layout();
        let mut report = RecoveryReport::new(Operation::BackupRestore, job.target());

        if let Err(reason) = check_target_and_tool(job, Tool::Gbak) {
            return reject(report, reason);
        }
        if let Err(err) = layout.ensure_temp_dir() {
            warn!(error = %err, path = %layout.temp_dir.display(), "cannot create temp directory");
            return reject(
                report,
                format!("cannot create {}: {}", layout.temp_dir.display(), describe(&err)),
            );
        }
        match sweep_history(layout.dir(), &layout.temp_dir, &layout.owned_paths()) {
            Ok(swept) => report.artifacts.swept = swept,
            Err(err) => warn!(error = %err, path = ?err.path(), "history sweep skipped"),
        }

        let settings = self.store.load_settings();
        let services = self.services(&settings);
        let policy = RetryPolicy::new(settings.rename_attempts(), settings.rename_delay());
        let classifier = Classifier::new(&settings.error_heuristics, &settings.success_markers);

        let mut run = Run {
            engine: self,
            job,
            services: &services,
            policy,
            report,
        };

        run.enter(WorkflowStage::ServiceStopping);
        services.stop_all().await;

        run.enter(WorkflowStage::Renaming);
        match self.move_file(&layout.target, &layout.working, policy).await {
            Ok(RenameOutcome::Renamed { .. }) => {}
            Ok(RenameOutcome::Exhausted {
                attempts,
                last_error,
            }) => {
                return run
                    .fail(format!(
                        "database file is still locked after {attempts} rename attempts: {last_error}"
                    ))
                    .await;
            }
            Err(err) => {
                return run
                    .fail(format!("cannot rename database file: {}", describe(&err)))
                    .await;
            }
        }

        run.enter(WorkflowStage::ToolRunning(ToolKind::Backup));
        let (section, output) = self
            .run_tool(ToolKind::Backup, &settings, job, Some(&classifier))
            .await;
        let backup_failure = step_failure(ToolKind::Backup, &section, &output);
        run.report.tools.push(section);
        if let Some(reason) = backup_failure {
            run.restore_original().await;
            return run.fail(reason).await;
        }

        run.enter(WorkflowStage::ToolRunning(ToolKind::Restore));
        let (section, output) = self
            .run_tool(ToolKind::Restore, &settings, job, Some(&classifier))
            .await;
        let mut restore_failure = step_failure(ToolKind::Restore, &section, &output);
        run.report.tools.push(section);
        if restore_failure.is_none() && !layout.rebuilt.is_file() {
            restore_failure = Some(format!(
                "restore failed: no rebuilt database was written to {}",
                layout.rebuilt.display()
            ));
        }
        if let Some(reason) = restore_failure {
            run.restore_original().await;
            run.discard_rebuilt();
            return run.fail(reason).await;
        }

        run.enter(WorkflowStage::Finalizing);
        if let Some(reason) = run.finalize().await {
            return run.fail(reason).await;
        }

        run.enter(WorkflowStage::ServiceStarting);
        services.start_all().await;
        run.succeed()
    }

    async fn run_tool(
        &self,
        kind: ToolKind,
        settings: &Settings,
        job: &RecoveryJob,
        classifier: Option<&Classifier>,
    ) -> (ToolSection, CommandOutput) {
        let command = build_command(kind, settings, job);
        let password = job.credentials().password();
        let rendered = command.redacted(&[password]);
        debug!(job = %job.id(), tool = kind.as_str(), command = %rendered, "launching tool");

        let output = self.runner.run(&command).await;

        let verdict = classifier.map(|classifier| {
            let mut text = output.output.clone();
            if let Some(log) = log_path(kind, job) {
                text.push('\n');
                text.push_str(&read_log(log));
            }
            classifier.verdict(&text)
        });
        if let Some(Verdict::Overridden { rule, marker }) = &verdict {
            info!(tool = kind.as_str(), rule = %rule, marker = %marker, "success marker overrode failure rule");
        }

        let section = ToolSection {
            tool: kind,
            command: rendered,
            exit_code: output.code,
            output: mask(&output.output, password),
            verdict,
        };
        (section, output)
    }
}

impl std::fmt::Debug for RecoveryEngine {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RecoveryEngine")
            .field("store", &self.store)
            .field("platform", &self.platform)
            .field("custom_rename", &self.rename.is_some())
            .finish_non_exhaustive()
    }
}

/// Mutable state of one backup/restore run.
struct Run<'a> {
    engine: &'a RecoveryEngine,
    job: &'a RecoveryJob,
    services: &'a ServiceController,
    policy: RetryPolicy,
    report: RecoveryReport,
}

impl Run<'_> {
    fn enter(&mut self, stage: WorkflowStage) {
        info!(job = %self.job.id(), stage = %stage, "entering stage");
        self.report.stage = stage;
    }

    /// Move the working copy back to the canonical path.
    async fn restore_original(&mut self) {
        let layout = self.job.layout();
        if !layout.working.exists() {
            return;
        }
        let caveat = match self
            .engine
            .move_file(&layout.working, &layout.target, self.policy)
            .await
        {
            Ok(RenameOutcome::Renamed { .. }) => {
                info!(job = %self.job.id(), "original database restored");
                return;
            }
            Ok(RenameOutcome::Exhausted { last_error, .. }) => last_error,
            Err(err) => describe(&err),
        };
        warn!(job = %self.job.id(), error = %caveat, "could not restore original database");
        self.report.caveats.push(format!(
            "original database is still at {}: {caveat}",
            layout.working.display()
        ));
        self.report.artifacts.working = Some(layout.working.clone());
    }

    /// Delete a partial rebuilt file.
    fn discard_rebuilt(&mut self) {
        let rebuilt = &self.job.layout().rebuilt;
        if !rebuilt.exists() {
            return;
        }
        if let Err(err) = fs::remove_file(rebuilt) {
            warn!(path = %rebuilt.display(), error = %err, "could not delete partial rebuilt file");
            self.report.caveats.push(format!(
                "partial rebuilt file left at {}: {err}",
                rebuilt.display()
            ));
        }
    }

    /// Swap the rebuilt file in. Returns the failure reason, if any.
    async fn finalize(&mut self) -> Option<String> {
        let layout = self.job.layout();
        if layout.target.is_file() {
            warn!(path = %layout.target.display(), "file reappeared at live path; deleting");
            if let Err(err) = fs::remove_file(&layout.target) {
                self.report.caveats.push(format!(
                    "could not delete file that reappeared at {}: {err}",
                    layout.target.display()
                ));
            }
        }

        let failure = match self
            .engine
            .move_file(&layout.rebuilt, &layout.target, self.policy)
            .await
        {
            Ok(RenameOutcome::Renamed { .. }) => None,
            Ok(RenameOutcome::Exhausted { last_error, .. }) => Some(last_error),
            Err(err) => Some(describe(&err)),
        };
        if let Some(cause) = failure {
            self.restore_original().await;
            self.report.artifacts.rebuilt = Some(layout.rebuilt.clone());
            self.report
                .caveats
                .push(format!("rebuilt database kept at {}", layout.rebuilt.display()));
            return Some(format!("cannot move rebuilt database into place: {cause}"));
        }

        let archived = match self
            .engine
            .move_file(&layout.working, &layout.history, self.policy)
            .await
        {
            Ok(RenameOutcome::Renamed { .. }) => Ok(()),
            Ok(RenameOutcome::Exhausted { last_error, .. }) => Err(last_error),
            Err(err) => Err(describe(&err)),
        };
        if let Err(cause) = archived {
            warn!(error = %cause, "original kept under its working name");
            self.report.caveats.push(format!(
                "original database kept at {}: {cause}",
                layout.working.display()
            ));
            self.report.artifacts.working = Some(layout.working.clone());
        }
        None
    }

    async fn fail(mut self, reason: String) -> RecoveryReport {
        warn!(job = %self.job.id(), stage = %self.report.stage, reason = %reason, "rolling back");
        self.services.start_all().await;
        self.report.failed_stage = Some(self.report.stage);
        self.report.stage = WorkflowStage::RolledBack;
        self.report.outcome = Outcome::RolledBack;
        self.report.reason = Some(reason);
        self.collect_artifacts();
        self.report
    }

    fn succeed(mut self) -> RecoveryReport {
        info!(job = %self.job.id(), "backup and restore finished");
        self.report.stage = WorkflowStage::Done;
        self.report.outcome = Outcome::Succeeded;
        self.collect_artifacts();
        let history = &self.job.layout().history;
        if history.exists() {
            self.report.artifacts.history = Some(history.clone());
        }
        self.report
    }

    fn collect_artifacts(&mut self) {
        let layout = self.job.layout();
        let existing = |path: &Path| path.exists().then(|| path.to_path_buf());
        self.report.artifacts.archive = existing(&layout.archive);
        self.report.artifacts.backup_log = existing(&layout.backup_log);
        self.report.artifacts.restore_log = existing(&layout.restore_log);
    }
}

fn reject(mut report: RecoveryReport, reason: String) -> RecoveryReport {
    warn!(reason = %reason, "job rejected");
    report.outcome = Outcome::Rejected;
    report.failed_stage = Some(WorkflowStage::Idle);
    report.stage = WorkflowStage::Rejected;
    report.reason = Some(reason);
    report
}

fn check_target_and_tool(job: &RecoveryJob, tool: Tool) -> Result<(), String> {
    if !job.target().is_file() {
        return Err(format!("database file not found: {}", job.target().display()));
    }
    let path = job.tool_path(tool);
    if !path.is_file() {
        return Err(format!("{} not found at {}", tool.as_str(), path.display()));
    }
    Ok(())
}

fn step_failure(kind: ToolKind, section: &ToolSection, output: &CommandOutput) -> Option<String> {
    if !output.ran_to_completion() {
        return Some(format!("{kind} failed: {}", interruption(output)));
    }
    match &section.verdict {
        Some(Verdict::Failed { rule }) => {
            Some(format!("{kind} failed: output matched failure rule '{rule}'"))
        }
        _ => None,
    }
}

fn interruption(output: &CommandOutput) -> String {
    if output.timed_out {
        "timed out".to_string()
    } else {
        format!("could not be started: {}", output.output.trim())
    }
}

fn build_command(kind: ToolKind, settings: &Settings, job: &RecoveryJob) -> CommandLine {
    if settings.templates.use_custom {
        let template = settings.templates.get(kind.template());
        return CommandLine::shell(render(template, &render_context(job)));
    }

    let layout = job.layout();
    let user = job.credentials().user();
    let password = job.credentials().password();
    let auth = ["-user", user, "-password", password];
    let program = job.tool_path(kind.tool());
    let path = |path: &Path| path.display().to_string();

    match kind {
        ToolKind::Test => CommandLine::argv(program)
            .args(auth)
            .arg(path(&layout.target))
            .args(["-q", "-nod"])
            .with_stdin("quit;\n"),
        ToolKind::Check => CommandLine::argv(program)
            .args(auth)
            .args(["-v", "-full"])
            .arg(path(&layout.target)),
        ToolKind::Mend => CommandLine::argv(program)
            .args(auth)
            .arg("-mend")
            .arg(path(&layout.target)),
        ToolKind::Backup => CommandLine::argv(program)
            .args(["-backup", "-ignore", "-garbage", "-limbo", "-v", "-y"])
            .arg(path(&layout.backup_log))
            .arg(path(&layout.working))
            .arg(path(&layout.archive))
            .args(auth),
        ToolKind::Restore => CommandLine::argv(program)
            .args(["-create", "-z", "-v", "-y"])
            .arg(path(&layout.restore_log))
            .arg(path(&layout.archive))
            .arg(path(&layout.rebuilt))
            .args(auth),
    }
}

fn render_context(job: &RecoveryJob) -> RenderContext {
    let layout = job.layout();
    let quoted_tool = |tool: Tool| quote_if_needed(&job.tool_path(tool).display().to_string());
    let path = |path: &Path| path.display().to_string();
    RenderContext::new()
        .with(placeholder::GFIX, quoted_tool(Tool::Gfix))
        .with(placeholder::GBAK, quoted_tool(Tool::Gbak))
        .with(placeholder::ISQL, quoted_tool(Tool::Isql))
        .with(placeholder::USER, job.credentials().user())
        .with(placeholder::PASS, job.credentials().password())
        .with(placeholder::DB_PATH, path(&layout.target))
        .with(placeholder::OLD_DB, path(&layout.working))
        .with(placeholder::NEW_DB, path(&layout.rebuilt))
        .with(placeholder::FBK, path(&layout.archive))
        .with(placeholder::LOG_BKP, path(&layout.backup_log))
        .with(placeholder::LOG_RTR, path(&layout.restore_log))
}

fn log_path(kind: ToolKind, job: &RecoveryJob) -> Option<&Path> {
    match kind {
        ToolKind::Backup => Some(&job.layout().backup_log),
        ToolKind::Restore => Some(&job.layout().restore_log),
        ToolKind::Test | ToolKind::Check | ToolKind::Mend => None,
    }
}

fn read_log(path: &Path) -> String {
    fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

fn mask(text: &str, secret: &str) -> String {
    if secret.is_empty() {
        text.to_string()
    } else {
        text.replace(secret, "****")
    }
}

fn describe(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;
    use crate::job::{Credentials, JobRequest};

    fn job() -> anyhow::Result<RecoveryJob> {
        job_in("/opt/fb/bin")
    }

    fn job_in(bin_dir: &str) -> anyhow::Result<RecoveryJob> {
        let at = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .ok_or_else(|| anyhow::anyhow!("invalid fixture date"))?;
        Ok(RecoveryJob::at(
            JobRequest {
                target: PathBuf::from("/data/my app.FDB"),
                bin_dir: PathBuf::from(bin_dir),
                credentials: Credentials::new("SYSDBA", "masterkey"),
            },
            at,
        )?)
    }

    #[test]
    fn built_in_commands_are_argument_arrays() -> anyhow::Result<()> {
        let job = job()?;
        let settings = Settings::default();
        let CommandLine::Argv { args, stdin, .. } = build_command(ToolKind::Check, &settings, &job)
        else {
            anyhow::bail!("expected argv command");
        };
        assert_eq!(
            args,
            vec!["-user", "SYSDBA", "-password", "masterkey", "-v", "-full", "/data/my app.FDB"]
        );
        assert!(stdin.is_none());

        let CommandLine::Argv { stdin, .. } = build_command(ToolKind::Test, &settings, &job) else {
            anyhow::bail!("expected argv command");
        };
        assert_eq!(stdin.as_deref(), Some("quit;\n"));
        Ok(())
    }

    #[test]
    fn backup_reads_the_working_copy() -> anyhow::Result<()> {
        let job = job()?;
        let command = build_command(ToolKind::Backup, &Settings::default(), &job);
        let rendered = command.redacted(&["masterkey"]);
        assert!(rendered.contains("-backup -ignore -garbage -limbo -v -y"));
        assert!(rendered.contains("\"/data/my app_WORK_20240101_120000.FDB\""));
        assert!(rendered.ends_with("-user SYSDBA -password ****"));
        Ok(())
    }

    #[test]
    fn custom_templates_render_into_shell_commands() -> anyhow::Result<()> {
        let job = job()?;
        let mut settings = Settings::default();
        settings.templates.use_custom = true;
        settings.templates.mend = "{GFIX} -mend \"{DB_PATH}\" {UNKNOWN}-x".to_string();
        let command = build_command(ToolKind::Mend, &settings, &job);
        assert_eq!(
            command,
            CommandLine::shell(format!(
                "{} -mend \"/data/my app.FDB\" -x",
                Tool::Gfix.path_in(Path::new("/opt/fb/bin")).display()
            ))
        );
        Ok(())
    }

    #[test]
    fn tool_paths_with_spaces_are_quoted_for_templates() -> anyhow::Result<()> {
        let job = job_in("/opt/Firebird 2.5/bin")?;
        let context = render_context(&job);
        let gbak = Tool::Gbak.path_in(Path::new("/opt/Firebird 2.5/bin"));
        assert_eq!(context.get(placeholder::GBAK), Some(format!("\"{}\"", gbak.display()).as_str()));
        assert_eq!(context.get(placeholder::DB_PATH), Some("/data/my app.FDB"));
        Ok(())
    }

    #[test]
    fn step_failure_covers_interruptions_and_verdicts() {
        let section = |verdict| ToolSection {
            tool: ToolKind::Backup,
            command: String::new(),
            exit_code: Some(0),
            output: String::new(),
            verdict,
        };
        let clean = CommandOutput::completed(Some(0), "");
        assert_eq!(step_failure(ToolKind::Backup, &section(Some(Verdict::Clean)), &clean), None);
        let failed = step_failure(
            ToolKind::Backup,
            &section(Some(Verdict::Failed {
                rule: "error".to_string(),
            })),
            &clean,
        );
        assert_eq!(
            failed.as_deref(),
            Some("backup failed: output matched failure rule 'error'")
        );
        let timed_out = CommandOutput::timed_out(std::time::Duration::from_secs(5));
        assert_eq!(
            step_failure(ToolKind::Restore, &section(None), &timed_out).as_deref(),
            Some("restore failed: timed out")
        );
    }

    #[test]
    fn mask_hides_password_in_tool_output() {
        assert_eq!(mask("login masterkey failed", "masterkey"), "login **** failed");
        assert_eq!(mask("unchanged", ""), "unchanged");
    }
}
