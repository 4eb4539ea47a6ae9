//! Command execution boundary.
//!
//! # Design
//! - Argument construction (`CommandLine`) is separate from execution
//!   (`CommandRunner`), so built-in commands are passed as argument arrays and
//!   never go through a shell.
//! - `CommandLine::Shell` exists only for user-supplied templates, which may
//!   contain arbitrary shell syntax by choice of the user.
//! - Runners never fail: launch errors and timeouts are reported inside
//!   `CommandOutput` and the caller classifies the text.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

const REDACTED: &str = "****";

/// A fully constructed command, ready to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// Program plus an argument array; no shell is involved.
    Argv {
        /// Executable to launch.
        program: PathBuf,
        /// Arguments passed verbatim.
        args: Vec<String>,
        /// Text written to standard input before it is closed.
        stdin: Option<String>,
    },
    /// Script handed to the platform shell (`cmd /C` or `sh -c`).
    Shell {
        /// Script text.
        script: String,
    },
}

impl CommandLine {
    /// Argument-array command for `program` with no arguments yet.
    #[must_use]
    pub fn argv(program: impl Into<PathBuf>) -> Self {
        Self::Argv {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Shell command for a rendered template.
    #[must_use]
    pub fn shell(script: impl Into<String>) -> Self {
        Self::Shell {
            script: script.into(),
        }
    }

    /// Append one argument. Has no effect on shell commands.
    #[must_use]
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        if let Self::Argv { args, .. } = &mut self {
            args.push(value.into());
        }
        self
    }

    /// Append several arguments. Has no effect on shell commands.
    #[must_use]
    pub fn args<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        values.into_iter().fold(self, Self::arg)
    }

    /// Feed `input` on standard input. Has no effect on shell commands.
    #[must_use]
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        if let Self::Argv { stdin, .. } = &mut self {
            *stdin = Some(input.into());
        }
        self
    }

    /// Human-readable rendering with every occurrence of `secrets` masked.
    #[must_use]
    pub fn redacted(&self, secrets: &[&str]) -> String {
        let text = match self {
            Self::Argv { program, args, .. } => {
                let mut parts = vec![program.display().to_string()];
                parts.extend(args.iter().map(|arg| {
                    if arg.contains(char::is_whitespace) {
                        format!("\"{arg}\"")
                    } else {
                        arg.clone()
                    }
                }));
                parts.join(" ")
            }
            Self::Shell { script } => script.clone(),
        };
        secrets
            .iter()
            .filter(|secret| !secret.is_empty())
            .fold(text, |acc, secret| acc.replace(secret, REDACTED))
    }
}

/// Result of running a command: merged console text plus completion facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code when the process exited normally.
    pub code: Option<i32>,
    /// Standard output followed by standard error.
    pub output: String,
    /// Whether the process was started at all.
    pub launched: bool,
    /// Whether the process was killed after exceeding the timeout.
    pub timed_out: bool,
}

impl CommandOutput {
    /// A process that ran to completion.
    #[must_use]
    pub fn completed(code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            code,
            output: output.into(),
            launched: true,
            timed_out: false,
        }
    }

    /// A process that could not be started.
    #[must_use]
    pub fn launch_failed(message: impl Into<String>) -> Self {
        Self {
            code: None,
            output: message.into(),
            launched: false,
            timed_out: false,
        }
    }

    /// A process that was killed after the timeout elapsed.
    #[must_use]
    pub fn timed_out(after: Duration) -> Self {
        Self {
            code: None,
            output: format!("command killed after {}s timeout", after.as_secs()),
            launched: true,
            timed_out: true,
        }
    }

    /// `true` when the process started and finished on its own.
    #[must_use]
    pub const fn ran_to_completion(&self) -> bool {
        self.launched && !self.timed_out
    }
}

/// Executes command lines and collects their merged output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` to completion. Never fails; see [`CommandOutput`].
    async fn run(&self, command: &CommandLine) -> CommandOutput;
}

/// Runner backed by real OS processes.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    /// Runner that kills commands exceeding `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn build(command: &CommandLine) -> Command {
        let mut process = match command {
            CommandLine::Argv { program, args, .. } => {
                let mut process = Command::new(program);
                process.args(args);
                process
            }
            CommandLine::Shell { script } => shell_command(script),
        };
        #[cfg(windows)]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            process.creation_flags(CREATE_NO_WINDOW);
        }
        process
    }
}

#[cfg(windows)]
fn shell_command(script: &str) -> Command {
    let mut process = Command::new("cmd");
    process.arg("/C").raw_arg(script);
    process
}

#[cfg(not(windows))]
fn shell_command(script: &str) -> Command {
    let mut process = Command::new("sh");
    process.arg("-c").arg(script);
    process
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandLine) -> CommandOutput {
        let stdin_text = match command {
            CommandLine::Argv { stdin, .. } => stdin.clone(),
            CommandLine::Shell { .. } => None,
        };

        let mut process = Self::build(command);
        process
            .stdin(if stdin_text.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match process.spawn() {
            Ok(child) => child,
            Err(err) => {
                warn!(error = %err, "failed to launch command");
                return CommandOutput::launch_failed(format!("failed to launch command: {err}"));
            }
        };

        // Output is drained while stdin is written, so a child that fills its
        // stdout pipe before reading all input cannot stall the run.
        let writer = match (stdin_text, child.stdin.take()) {
            (Some(text), Some(mut pipe)) => Some(tokio::spawn(async move {
                if let Err(err) = pipe.write_all(text.as_bytes()).await {
                    debug!(error = %err, "command closed stdin early");
                }
            })),
            _ => None,
        };

        let waited = tokio::time::timeout(self.timeout, child.wait_with_output()).await;
        if let Some(writer) = writer {
            writer.abort();
        }

        match waited {
            Ok(Ok(result)) => {
                let mut merged = String::from_utf8_lossy(&result.stdout).into_owned();
                merged.push_str(&String::from_utf8_lossy(&result.stderr));
                CommandOutput::completed(result.status.code(), merged)
            }
            Ok(Err(err)) => CommandOutput {
                code: None,
                output: format!("failed to collect command output: {err}"),
                launched: true,
                timed_out: false,
            },
            Err(_elapsed) => {
                warn!(timeout_secs = self.timeout.as_secs(), "command timed out");
                CommandOutput::timed_out(self.timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_builder_collects_arguments() {
        let command = CommandLine::argv("/opt/firebird/bin/gfix")
            .args(["-user", "SYSDBA"])
            .arg("-v")
            .with_stdin("quit;\n");
        let CommandLine::Argv {
            program,
            args,
            stdin,
        } = command
        else {
            panic!("expected argv command");
        };
        assert_eq!(program, PathBuf::from("/opt/firebird/bin/gfix"));
        assert_eq!(args, vec!["-user", "SYSDBA", "-v"]);
        assert_eq!(stdin.as_deref(), Some("quit;\n"));
    }

    #[test]
    fn shell_commands_ignore_argument_builders() {
        let command = CommandLine::shell("echo hi").arg("ignored").with_stdin("x");
        assert_eq!(command, CommandLine::shell("echo hi"));
    }

    #[test]
    fn redacted_masks_secrets_and_quotes_spaced_args() {
        let command = CommandLine::argv("gbak")
            .args(["-password", "masterkey", "/data/my db.fdb"]);
        assert_eq!(
            command.redacted(&["masterkey", ""]),
            "gbak -password **** \"/data/my db.fdb\""
        );
        let shell = CommandLine::shell("gfix -password masterkey");
        assert_eq!(shell.redacted(&["masterkey"]), "gfix -password ****");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_merges_stdout_and_stderr() {
        let runner = SystemRunner::new(Duration::from_secs(10));
        let output = runner
            .run(&CommandLine::shell("echo out; echo err 1>&2; exit 3"))
            .await;
        assert!(output.ran_to_completion());
        assert_eq!(output.code, Some(3));
        assert_eq!(output.output, "out\nerr\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_feeds_stdin() {
        let runner = SystemRunner::new(Duration::from_secs(10));
        let output = runner
            .run(&CommandLine::argv("cat").with_stdin("quit;\n"))
            .await;
        assert_eq!(output.output, "quit;\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_streams_large_stdin_through_echoing_child() {
        let runner = SystemRunner::new(Duration::from_secs(10));
        let input = "select 1 from rdb$database;\n".repeat(40_000);
        let output = runner
            .run(&CommandLine::argv("cat").with_stdin(input.clone()))
            .await;
        assert!(!output.timed_out);
        assert_eq!(output.code, Some(0));
        assert_eq!(output.output.len(), input.len());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_kills_on_timeout() {
        let runner = SystemRunner::new(Duration::from_millis(100));
        let output = runner.run(&CommandLine::argv("sleep").arg("5")).await;
        assert!(output.timed_out);
        assert!(!output.ran_to_completion());
    }

    #[tokio::test]
    async fn system_runner_reports_launch_failures() {
        let runner = SystemRunner::new(Duration::from_secs(1));
        let output = runner
            .run(&CommandLine::argv("/definitely/missing/fbmend-tool"))
            .await;
        assert!(!output.launched);
        assert!(output.output.contains("failed to launch command"));
    }
}
