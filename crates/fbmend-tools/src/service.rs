//! Engine service control across a list of candidate service identities.
//!
//! # Design
//! - The platform backend only knows how to phrase commands and parse their
//!   output; all execution goes through the shared `CommandRunner`.
//! - Stop and start are fire-and-forget: failures are logged and never
//!   surface to the caller.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::runner::{CommandLine, CommandRunner};

/// Observed state of the engine service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// A recognized identity reports running (or transitioning).
    Running,
    /// A recognized identity reports stopped.
    Stopped,
    /// No identity was recognized or the query failed.
    Unknown,
}

impl ServiceState {
    /// Lowercase label used in reports and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for ServiceState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Service manager backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServicePlatform {
    /// Windows service control manager (`sc`, `net`).
    WindowsScm,
    /// systemd (`systemctl`).
    Systemd,
}

impl ServicePlatform {
    /// Backend for the platform this binary was built for.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Self::WindowsScm
        } else {
            Self::Systemd
        }
    }

    /// Status query for `name`.
    #[must_use]
    pub fn query_command(self, name: &str) -> CommandLine {
        match self {
            Self::WindowsScm => CommandLine::argv("sc").args(["query", name]),
            Self::Systemd => CommandLine::argv("systemctl").args([
                "show",
                "-p",
                "LoadState",
                "-p",
                "ActiveState",
                name,
            ]),
        }
    }

    /// Stop request for `name`.
    #[must_use]
    pub fn stop_command(self, name: &str) -> CommandLine {
        match self {
            Self::WindowsScm => CommandLine::argv("net").args(["stop", name]),
            Self::Systemd => CommandLine::argv("systemctl").args(["stop", name]),
        }
    }

    /// Start request for `name`.
    #[must_use]
    pub fn start_command(self, name: &str) -> CommandLine {
        match self {
            Self::WindowsScm => CommandLine::argv("net").args(["start", name]),
            Self::Systemd => CommandLine::argv("systemctl").args(["start", name]),
        }
    }

    /// Parse query output. `None` means the identity is not recognized.
    #[must_use]
    pub fn parse_state(self, output: &str) -> Option<ServiceState> {
        match self {
            Self::WindowsScm => parse_scm_state(output),
            Self::Systemd => parse_systemd_state(output),
        }
    }
}

/// `sc query` prints `STATE : 4  RUNNING` (`ESTADO` on Portuguese systems).
/// Code 1 is stopped; every other code is a running or pending state.
fn parse_scm_state(output: &str) -> Option<ServiceState> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if !key.eq_ignore_ascii_case("STATE") && !key.eq_ignore_ascii_case("ESTADO") {
            return None;
        }
        let code: u32 = value.split_whitespace().next()?.parse().ok()?;
        Some(if code == 1 {
            ServiceState::Stopped
        } else {
            ServiceState::Running
        })
    })
}

fn parse_systemd_state(output: &str) -> Option<ServiceState> {
    let mut load_state = None;
    let mut active_state = None;
    for line in output.lines() {
        match line.trim().split_once('=') {
            Some(("LoadState", value)) => load_state = Some(value.trim()),
            Some(("ActiveState", value)) => active_state = Some(value.trim()),
            _ => {}
        }
    }
    if matches!(load_state, None | Some("not-found")) {
        return None;
    }
    match active_state? {
        "active" | "activating" | "reloading" | "deactivating" => Some(ServiceState::Running),
        "inactive" | "failed" => Some(ServiceState::Stopped),
        _ => None,
    }
}

/// Queries, stops and starts the engine service through a command runner.
#[derive(Clone)]
pub struct ServiceController {
    runner: Arc<dyn CommandRunner>,
    platform: ServicePlatform,
    identities: Vec<String>,
}

impl ServiceController {
    /// Controller over `identities`, queried in order.
    #[must_use]
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        platform: ServicePlatform,
        identities: Vec<String>,
    ) -> Self {
        Self {
            runner,
            platform,
            identities,
        }
    }

    /// State of the first identity the platform recognizes.
    pub async fn query_state(&self) -> ServiceState {
        match self.first_recognized().await {
            Some((name, state)) => {
                debug!(service = %name, state = state.as_str(), "service state resolved");
                state
            }
            None => ServiceState::Unknown,
        }
    }

    /// Issue a stop to every identity. Failures are logged only.
    pub async fn stop_all(&self) {
        for name in &self.identities {
            let output = self.runner.run(&self.platform.stop_command(name)).await;
            if output.code == Some(0) {
                info!(service = %name, "service stop issued");
            } else {
                debug!(service = %name, code = ?output.code, "service stop had no effect");
            }
        }
    }

    /// Issue a start to every identity. Failures are logged only.
    pub async fn start_all(&self) {
        for name in &self.identities {
            let output = self.runner.run(&self.platform.start_command(name)).await;
            if output.code == Some(0) {
                info!(service = %name, "service start issued");
            } else {
                debug!(service = %name, code = ?output.code, "service start had no effect");
            }
        }
    }

    /// Stop then start the first recognized identity and return its name.
    pub async fn restart_first_recognized(&self) -> Option<String> {
        let Some((name, _)) = self.first_recognized().await else {
            warn!("no known service identity is installed");
            return None;
        };
        let stop = self.runner.run(&self.platform.stop_command(&name)).await;
        if stop.code != Some(0) {
            debug!(service = %name, code = ?stop.code, "service stop had no effect");
        }
        let start = self.runner.run(&self.platform.start_command(&name)).await;
        if start.code == Some(0) {
            info!(service = %name, "service restarted");
        } else {
            warn!(service = %name, code = ?start.code, "service start failed during restart");
        }
        Some(name)
    }

    async fn first_recognized(&self) -> Option<(String, ServiceState)> {
        for name in &self.identities {
            let output = self.runner.run(&self.platform.query_command(name)).await;
            if !output.launched {
                debug!(service = %name, "service query could not be launched");
                continue;
            }
            if let Some(state) = self.platform.parse_state(&output.output) {
                return Some((name.clone(), state));
            }
        }
        None
    }
}

impl std::fmt::Debug for ServiceController {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ServiceController")
            .field("platform", &self.platform)
            .field("identities", &self.identities)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::runner::CommandOutput;

    #[derive(Default)]
    struct FakeRunner {
        replies: HashMap<String, CommandOutput>,
        seen: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn reply(mut self, command: &CommandLine, output: CommandOutput) -> Self {
            self.replies.insert(command.redacted(&[]), output);
            self
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(&self, command: &CommandLine) -> CommandOutput {
            let key = command.redacted(&[]);
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(key.clone());
            }
            self.replies
                .get(&key)
                .cloned()
                .unwrap_or_else(|| CommandOutput::completed(Some(1060), "service does not exist"))
        }
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn scm_output_parses_english_and_portuguese() {
        let platform = ServicePlatform::WindowsScm;
        assert_eq!(
            platform.parse_state("SERVICE_NAME: FirebirdServerFB25\n        STATE              : 4  RUNNING\n"),
            Some(ServiceState::Running)
        );
        assert_eq!(
            platform.parse_state("        ESTADO             : 1  PARADO\n"),
            Some(ServiceState::Stopped)
        );
        assert_eq!(
            platform.parse_state("        STATE              : 3  STOP_PENDING\n"),
            Some(ServiceState::Running)
        );
        assert_eq!(
            platform.parse_state("[SC] EnumQueryServicesStatus:OpenService FAILED 1060:\n"),
            None
        );
    }

    #[test]
    fn systemd_output_parses_load_and_active_state() {
        let platform = ServicePlatform::Systemd;
        assert_eq!(
            platform.parse_state("LoadState=loaded\nActiveState=active\n"),
            Some(ServiceState::Running)
        );
        assert_eq!(
            platform.parse_state("LoadState=loaded\nActiveState=failed\n"),
            Some(ServiceState::Stopped)
        );
        assert_eq!(
            platform.parse_state("LoadState=not-found\nActiveState=inactive\n"),
            None
        );
        assert_eq!(platform.parse_state(""), None);
    }

    #[tokio::test]
    async fn query_state_returns_first_recognized_identity() {
        let platform = ServicePlatform::WindowsScm;
        let runner = FakeRunner::default().reply(
            &platform.query_command("FirebirdServer"),
            CommandOutput::completed(Some(0), "STATE : 1 STOPPED"),
        );
        let controller = ServiceController::new(
            Arc::new(runner),
            platform,
            names(&["FirebirdServerFB25", "FirebirdServer", "FirebirdGuardian"]),
        );
        assert_eq!(controller.query_state().await, ServiceState::Stopped);
    }

    #[tokio::test]
    async fn query_state_is_unknown_when_nothing_is_recognized() {
        let controller = ServiceController::new(
            Arc::new(FakeRunner::default()),
            ServicePlatform::Systemd,
            names(&["firebird", "firebird3.0"]),
        );
        assert_eq!(controller.query_state().await, ServiceState::Unknown);
    }

    #[tokio::test]
    async fn stop_and_start_address_every_identity() {
        let runner = Arc::new(FakeRunner::default());
        let controller = ServiceController::new(
            runner.clone(),
            ServicePlatform::Systemd,
            names(&["firebird", "firebird3.0"]),
        );
        controller.stop_all().await;
        controller.start_all().await;
        assert_eq!(
            runner.seen(),
            vec![
                "systemctl stop firebird",
                "systemctl stop firebird3.0",
                "systemctl start firebird",
                "systemctl start firebird3.0",
            ]
        );
    }

    #[tokio::test]
    async fn restart_targets_the_first_recognized_identity() {
        let platform = ServicePlatform::WindowsScm;
        let runner = Arc::new(FakeRunner::default().reply(
            &platform.query_command("FirebirdServerDefaultInstance"),
            CommandOutput::completed(Some(0), "STATE : 4 RUNNING"),
        ));
        let controller = ServiceController::new(
            runner.clone(),
            platform,
            names(&["FirebirdServerFB25", "FirebirdServerDefaultInstance"]),
        );
        assert_eq!(
            controller.restart_first_recognized().await.as_deref(),
            Some("FirebirdServerDefaultInstance")
        );
        let seen = runner.seen();
        assert_eq!(
            &seen[seen.len() - 2..],
            [
                "net stop FirebirdServerDefaultInstance",
                "net start FirebirdServerDefaultInstance"
            ]
        );
    }

    #[tokio::test]
    async fn restart_reports_none_when_no_identity_exists() {
        let controller = ServiceController::new(
            Arc::new(FakeRunner::default()),
            ServicePlatform::WindowsScm,
            names(&["FirebirdServer"]),
        );
        assert_eq!(controller.restart_first_recognized().await, None);
    }
}
