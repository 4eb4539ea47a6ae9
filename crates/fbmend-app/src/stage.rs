//! Workflow stages and the tool runs they contain.

use std::fmt::{self, Display, Formatter};

use fbmend_config::TemplateKind;
use fbmend_tools::Tool;
use serde::Serialize;

/// Which tool invocation a stage runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// `isql` connection test.
    Test,
    /// `gfix -v -full`.
    Check,
    /// `gfix -mend`.
    Mend,
    /// `gbak -backup`.
    Backup,
    /// `gbak -create`.
    Restore,
}

impl ToolKind {
    /// Lowercase label.
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

    /// Executable that performs this step.
    #[must_use]
    pub const fn tool(self) -> Tool {
        match self {
            Self::Test => Tool::Isql,
            Self::Check | Self::Mend => Tool::Gfix,
            Self::Backup | Self::Restore => Tool::Gbak,
        }
    }

    /// Template that customises this step.
    #[must_use]
    pub const fn template(self) -> TemplateKind {
        match self {
            Self::Test => TemplateKind::Test,
            Self::Check => TemplateKind::Check,
            Self::Mend => TemplateKind::Mend,
            Self::Backup => TemplateKind::Backup,
            Self::Restore => TemplateKind::Restore,
        }
    }
}

impl Display for ToolKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Position of a job in the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStage {
    /// Preconditions are being checked.
    Idle,
    /// The engine service is being stopped.
    ServiceStopping,
    /// The live file is being moved to its working name.
    Renaming,
    /// An external tool is running.
    ToolRunning(ToolKind),
    /// The rebuilt file is being moved into place.
    Finalizing,
    /// The engine service is being started again.
    ServiceStarting,
    /// The workflow finished successfully.
    Done,
    /// A step failed and the layout was restored.
    RolledBack,
    /// A precondition failed before any side effect.
    Rejected,
}

impl WorkflowStage {
    /// Stage name without the tool detail.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ServiceStopping => "service_stopping",
            Self::Renaming => "renaming",
            Self::ToolRunning(_) => "tool_running",
            Self::Finalizing => "finalizing",
            Self::ServiceStarting => "service_starting",
            Self::Done => "done",
            Self::RolledBack => "rolled_back",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for WorkflowStage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ToolRunning(kind) => write!(formatter, "tool_running({kind})"),
            other => formatter.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_tool_detail() {
        assert_eq!(WorkflowStage::ToolRunning(ToolKind::Backup).to_string(), "tool_running(backup)");
        assert_eq!(WorkflowStage::Renaming.to_string(), "renaming");
        assert_eq!(WorkflowStage::ToolRunning(ToolKind::Mend).as_str(), "tool_running");
    }

    #[test]
    fn early_end_states_have_snake_case_names() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_value(WorkflowStage::RolledBack)?, "rolled_back");
        assert_eq!(serde_json::to_value(WorkflowStage::Rejected)?, "rejected");
        assert_eq!(WorkflowStage::RolledBack.to_string(), "rolled_back");
        Ok(())
    }

    #[test]
    fn tool_kinds_map_to_executables_and_templates() {
        assert_eq!(ToolKind::Test.tool(), Tool::Isql);
        assert_eq!(ToolKind::Mend.tool(), Tool::Gfix);
        assert_eq!(ToolKind::Restore.tool(), Tool::Gbak);
        assert_eq!(ToolKind::Check.template(), TemplateKind::Check);
    }

    #[test]
    fn stages_serialise_in_snake_case() -> anyhow::Result<()> {
        assert_eq!(serde_json::to_value(WorkflowStage::ServiceStopping)?, "service_stopping");
        assert_eq!(
            serde_json::to_value(WorkflowStage::ToolRunning(ToolKind::Restore))?,
            serde_json::json!({ "tool_running": "restore" })
        );
        Ok(())
    }
}
