//! Scripted command runner that stands in for the Firebird tools.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use fbmend_tools::{CommandLine, CommandOutput, CommandRunner};

/// One scripted reply, chosen when the rendered command contains `needle`.
#[derive(Debug, Clone)]
pub struct Script {
    needle: String,
    output: CommandOutput,
    creates: Vec<(PathBuf, Vec<u8>)>,
    once: bool,
}

impl Script {
    /// Reply to commands whose rendering contains `needle` with empty success.
    #[must_use]
    pub fn when(needle: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            output: CommandOutput::completed(Some(0), ""),
            creates: Vec::new(),
            once: false,
        }
    }

    /// Console text of the reply; exit code stays as configured.
    #[must_use]
    pub fn output(mut self, text: impl Into<String>) -> Self {
        self.output.output = text.into();
        self
    }

    /// Exit code of the reply.
    #[must_use]
    pub const fn exit_code(mut self, code: i32) -> Self {
        self.output.code = Some(code);
        self
    }

    /// Reply as a process that could not be launched.
    #[must_use]
    pub fn launch_failure(mut self, message: impl Into<String>) -> Self {
        self.output = CommandOutput::launch_failed(message);
        self
    }

    /// Reply as a process killed by the timeout.
    #[must_use]
    pub fn timed_out(mut self) -> Self {
        self.output = CommandOutput::timed_out(std::time::Duration::from_secs(1));
        self
    }

    /// Write `contents` to `path` when the script fires, creating parents.
    #[must_use]
    pub fn creates(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.creates.push((path.into(), contents.into()));
        self
    }

    /// Fire at most once; later matches fall through to other scripts.
    #[must_use]
    pub const fn once(mut self) -> Self {
        self.once = true;
        self
    }
}

#[derive(Debug, Default)]
struct State {
    scripts: Vec<Script>,
    calls: Vec<CommandLine>,
}

/// Runner that records every command and answers from scripts.
///
/// Commands matching no script succeed with empty output, which is what the
/// service control commands need in most tests.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    state: Mutex<State>,
}

impl ScriptedRunner {
    /// Runner with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a script; earlier scripts take precedence.
    #[must_use]
    pub fn with(self, script: Script) -> Self {
        self.push(script);
        self
    }

    /// Add a script to a shared runner.
    pub fn push(&self, script: Script) {
        self.lock().scripts.push(script);
    }

    /// Every command run so far.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandLine> {
        self.lock().calls.clone()
    }

    /// Every command run so far, rendered without redaction.
    #[must_use]
    pub fn rendered_calls(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .map(|call| call.redacted(&[]))
            .collect()
    }

    /// Number of recorded commands containing `needle`.
    #[must_use]
    pub fn count(&self, needle: &str) -> usize {
        self.rendered_calls()
            .iter()
            .filter(|call| call.contains(needle))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn materialise(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let _ = fs::write(path, contents);
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &CommandLine) -> CommandOutput {
        let rendered = command.redacted(&[]);
        let mut state = self.lock();
        state.calls.push(command.clone());

        let Some(index) = state
            .scripts
            .iter()
            .position(|script| rendered.contains(&script.needle))
        else {
            return CommandOutput::completed(Some(0), "");
        };

        let script = if state.scripts[index].once {
            state.scripts.remove(index)
        } else {
            state.scripts[index].clone()
        };
        drop(state);

        for (path, contents) in &script.creates {
            materialise(path, contents);
        }
        script.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripts_match_by_substring_and_record_calls() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = temp.path().join("nested").join("APP.FBK");
        let runner = ScriptedRunner::new().with(
            Script::when("-backup")
                .output("gbak: closing file, committing, and finishing")
                .creates(&archive, "archive"),
        );

        let output = runner
            .run(&CommandLine::argv("gbak").args(["-backup", "a", "b"]))
            .await;
        assert_eq!(output.output, "gbak: closing file, committing, and finishing");
        assert_eq!(fs::read_to_string(&archive)?, "archive");

        let other = runner.run(&CommandLine::argv("systemctl").arg("stop")).await;
        assert_eq!(other, CommandOutput::completed(Some(0), ""));
        assert_eq!(runner.count("gbak"), 1);
        assert_eq!(runner.calls().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn once_scripts_fall_through_after_firing() {
        let runner = ScriptedRunner::new()
            .with(Script::when("sc query").output("STATE : 4 RUNNING").once())
            .with(Script::when("sc query").output("STATE : 1 STOPPED"));
        let query = CommandLine::argv("sc").args(["query", "FirebirdServer"]);
        assert_eq!(runner.run(&query).await.output, "STATE : 4 RUNNING");
        assert_eq!(runner.run(&query).await.output, "STATE : 1 STOPPED");
        assert_eq!(runner.run(&query).await.output, "STATE : 1 STOPPED");
    }

    #[tokio::test]
    async fn failure_replies_keep_their_shape() {
        let runner = ScriptedRunner::new()
            .with(Script::when("isql").launch_failure("not found"))
            .with(Script::when("gfix").timed_out());
        assert!(!runner.run(&CommandLine::argv("isql")).await.launched);
        assert!(runner.run(&CommandLine::argv("gfix")).await.timed_out);
    }
}
