//! Final report of a job, rendered as text or serialised as JSON.

use std::fmt::Write as _;
use std::path::PathBuf;

use fbmend_tools::Verdict;
use serde::Serialize;

use crate::stage::{ToolKind, WorkflowStage};

/// User-facing operation a report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    /// Connection test.
    Test,
    /// Validation.
    Check,
    /// In-place repair.
    Mend,
    /// Full backup and restore cycle.
    BackupRestore,
}

impl Operation {
    /// Command-line spelling of the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Check => "check",
            Self::Mend => "mend",
            Self::BackupRestore => "backup-restore",
        }
    }
}

/// How the job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The backup/restore cycle finished and the rebuilt file is live.
    Succeeded,
    /// A direct tool run finished; its output is returned verbatim.
    Completed,
    /// A direct tool run could not start or was killed by the timeout.
    Failed,
    /// The backup/restore cycle failed and the layout was restored.
    RolledBack,
    /// A precondition failed; nothing was touched.
    Rejected,
}

impl Outcome {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled back",
            Self::Rejected => "rejected",
        }
    }
}

/// One tool invocation and what it printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSection {
    /// Step that ran.
    pub tool: ToolKind,
    /// Command line with the password masked.
    pub command: String,
    /// Exit code, when the process exited on its own.
    pub exit_code: Option<i32>,
    /// Merged console output.
    pub output: String,
    /// Classifier verdict, for steps that are classified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

/// Where the backup/restore cycle left its files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Artifacts {
    /// Backup archive, when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
    /// Backup log, when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_log: Option<PathBuf>,
    /// Restore log, when it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_log: Option<PathBuf>,
    /// Original file after a successful rebuild.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<PathBuf>,
    /// Original file left at its working name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working: Option<PathBuf>,
    /// Rebuilt file kept aside after a failed finalize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebuilt: Option<PathBuf>,
    /// Earlier history artifacts swept into `TEMP`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub swept: Vec<PathBuf>,
}

impl Artifacts {
    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Everything a caller needs to know about a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Operation that ran.
    pub operation: Operation,
    /// Terminal condition.
    pub outcome: Outcome,
    /// Stage reached; `rolled_back` or `rejected` when the job ended early.
    pub stage: WorkflowStage,
    /// Stage in which the job failed or was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<WorkflowStage>,
    /// Database the job worked on.
    pub target: PathBuf,
    /// Root cause of a failure or rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Tool runs in order.
    pub tools: Vec<ToolSection>,
    /// Secondary problems, such as a rollback step that failed.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<String>,
    /// Files produced or kept by the job.
    #[serde(skip_serializing_if = "Artifacts::is_empty")]
    pub artifacts: Artifacts,
}

impl RecoveryReport {
    pub(crate) fn new(operation: Operation, target: impl Into<PathBuf>) -> Self {
        Self {
            operation,
            outcome: Outcome::Rejected,
            stage: WorkflowStage::Idle,
            failed_stage: None,
            target: target.into(),
            reason: None,
            tools: Vec::new(),
            caveats: Vec::new(),
            artifacts: Artifacts::default(),
        }
    }

    /// `true` for succeeded and completed jobs.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Succeeded | Outcome::Completed)
    }

    /// Process exit code: 0 on success, 2 on rejection, 3 otherwise.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.outcome {
            Outcome::Succeeded | Outcome::Completed => 0,
            Outcome::Rejected => 2,
            Outcome::Failed | Outcome::RolledBack => 3,
        }
    }

    /// Output of the last run of `tool`, if any.
    #[must_use]
    pub fn output_of(&self, tool: ToolKind) -> Option<&str> {
        self.tools
            .iter()
            .rev()
            .find(|section| section.tool == tool)
            .map(|section| section.output.as_str())
    }

    /// Plain-text rendering for terminals.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = writeln!(
            text,
            "{} {}: {} at {}",
            self.operation.as_str(),
            self.target.display(),
            self.outcome.as_str(),
            self.failed_stage.unwrap_or(self.stage)
        );
        if let Some(reason) = &self.reason {
            let _ = writeln!(text, "reason: {reason}");
        }
        for section in &self.tools {
            let _ = writeln!(text, "\n== {} ==", section.tool);
            let _ = writeln!(text, "$ {}", section.command);
            if let Some(code) = section.exit_code {
                let _ = writeln!(text, "exit code: {code}");
            }
            let output = section.output.trim_end();
            if !output.is_empty() {
                let _ = writeln!(text, "{output}");
            }
        }
        if !self.caveats.is_empty() {
            let _ = writeln!(text, "\ncaveats:");
            for caveat in &self.caveats {
                let _ = writeln!(text, " - {caveat}");
            }
        }
        if !self.artifacts.is_empty() {
            let _ = writeln!(text, "\nartifacts:");
            let named = [
                ("archive", &self.artifacts.archive),
                ("backup log", &self.artifacts.backup_log),
                ("restore log", &self.artifacts.restore_log),
                ("history", &self.artifacts.history),
                ("working copy", &self.artifacts.working),
                ("rebuilt copy", &self.artifacts.rebuilt),
            ];
            for (label, path) in named {
                if let Some(path) = path {
                    let _ = writeln!(text, " - {label}: {}", path.display());
                }
            }
            for path in &self.artifacts.swept {
                let _ = writeln!(text, " - swept: {}", path.display());
            }
        }
        text
    }
}
