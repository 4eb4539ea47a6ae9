//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fbmend_app::DEFAULT_USER;
use fbmend_telemetry::{DEFAULT_LOG_LEVEL, JobSpanGuard, LogFormat, LoggingConfig, init_logging};
use uuid::Uuid;

use crate::commands::jobs::{JobOperation, handle_job};
use crate::commands::service::handle_service;
use crate::commands::templates::handle_templates;
use crate::commands::tools::handle_detect_bin;
use crate::context::{CliContext, CliResult};

/// Parses CLI arguments, installs logging, runs the requested command and
/// returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let format = cli.log_format.map_or_else(LogFormat::infer, LogFormat::from);
    let logging = LoggingConfig {
        level: &cli.log_level,
        format,
        build_sha: env!("CARGO_PKG_VERSION"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err:#}");
    }

    let run_id = Uuid::new_v4().to_string();
    let _span = JobSpanGuard::new(command_label(&cli.command), run_id);

    match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<i32> {
    let ctx = CliContext::new(cli.config, cli.output);
    match cli.command {
        Command::Test(args) => handle_job(&ctx, JobOperation::Test, args).await,
        Command::Check(args) => handle_job(&ctx, JobOperation::Check, args).await,
        Command::Mend(args) => handle_job(&ctx, JobOperation::Mend, args).await,
        Command::BackupRestore(args) => handle_job(&ctx, JobOperation::BackupRestore, args).await,
        Command::Service(command) => handle_service(&ctx, command).await,
        Command::Templates(command) => handle_templates(&ctx, command),
        Command::DetectBin => handle_detect_bin(&ctx),
    }
}

#[derive(Parser)]
#[command(
    name = "fbmend",
    version,
    about = "Check, repair and rebuild Firebird database files"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "FBMEND_CONFIG",
        help = "Settings file (defaults to the platform config directory)"
    )]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    #[arg(long, global = true, value_enum)]
    pub(crate) log_format: Option<LogFormatArg>,
    #[arg(
        long = "output",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Select output format for reports"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Open the database with isql and quit.
    Test(JobArgs),
    /// Validate the database with gfix -v -full.
    Check(JobArgs),
    /// Repair the database in place with gfix -mend.
    Mend(JobArgs),
    /// Rebuild the database through gbak backup and restore.
    BackupRestore(JobArgs),
    /// Control the Firebird service.
    #[command(subcommand)]
    Service(ServiceCommand),
    /// Inspect or change the command templates.
    #[command(subcommand)]
    Templates(TemplatesCommand),
    /// Locate the Firebird tool directory.
    DetectBin,
}

#[derive(Args, Clone)]
pub(crate) struct JobArgs {
    #[arg(long, help = "Directory holding gfix, gbak and isql (detected when omitted)")]
    pub(crate) bin: Option<PathBuf>,
    #[arg(long, help = "Database file")]
    pub(crate) db: PathBuf,
    #[arg(long, env = "ISC_USER", default_value = DEFAULT_USER)]
    pub(crate) user: String,
    #[arg(long, env = "ISC_PASSWORD", hide_env_values = true)]
    pub(crate) password: String,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ServiceCommand {
    /// Show the service state.
    Status,
    /// Start every known service identity.
    Start,
    /// Stop every known service identity.
    Stop,
    /// Restart the first installed service identity.
    Restart,
}

#[derive(Subcommand)]
pub(crate) enum TemplatesCommand {
    /// Print the active templates.
    Show,
    /// Restore and persist the default templates.
    Reset,
    /// Replace templates from a JSON file; missing keys keep their defaults.
    Set(TemplatesSetArgs),
}

#[derive(Args)]
pub(crate) struct TemplatesSetArgs {
    #[arg(short = 'f', long = "file")]
    pub(crate) file: PathBuf,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Test(_) => "test",
        Command::Check(_) => "check",
        Command::Mend(_) => "mend",
        Command::BackupRestore(_) => "backup_restore",
        Command::Service(ServiceCommand::Status) => "service_status",
        Command::Service(ServiceCommand::Start) => "service_start",
        Command::Service(ServiceCommand::Stop) => "service_stop",
        Command::Service(ServiceCommand::Restart) => "service_restart",
        Command::Templates(TemplatesCommand::Show) => "templates_show",
        Command::Templates(TemplatesCommand::Reset) => "templates_reset",
        Command::Templates(TemplatesCommand::Set(_)) => "templates_set",
        Command::DetectBin => "detect_bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("fbmend").chain(args.iter().copied()))
    }

    #[test]
    fn job_arguments_parse() -> Result<(), clap::Error> {
        let cli = parse(&[
            "backup-restore",
            "--bin",
            "/opt/firebird/bin",
            "--db",
            "/data/APP.FDB",
            "--user",
            "ADMIN",
            "--password",
            "secret",
            "--output",
            "json",
        ])?;
        assert_eq!(cli.output, OutputFormat::Json);
        let Command::BackupRestore(args) = cli.command else {
            panic!("expected backup-restore");
        };
        assert_eq!(args.bin, Some(PathBuf::from("/opt/firebird/bin")));
        assert_eq!(args.db, PathBuf::from("/data/APP.FDB"));
        assert_eq!(args.user, "ADMIN");
        assert_eq!(args.password, "secret");
        Ok(())
    }

    #[test]
    fn global_flags_apply_after_subcommands() -> Result<(), clap::Error> {
        let cli = parse(&[
            "service",
            "status",
            "--config",
            "/tmp/fbmend.json",
            "--log-format",
            "json",
            "--log-level",
            "debug",
        ])?;
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/fbmend.json")));
        assert_eq!(cli.log_format, Some(LogFormatArg::Json));
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Command::Service(ServiceCommand::Status)));
        Ok(())
    }

    #[test]
    fn templates_set_requires_a_file() {
        assert!(parse(&["templates", "set"]).is_err());
        assert!(parse(&["templates", "set", "-f", "templates.json"]).is_ok());
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        assert!(parse(&["detect-bin", "--output", "yaml"]).is_err());
    }

    #[test]
    fn command_labels_are_stable() -> Result<(), clap::Error> {
        assert_eq!(command_label(&parse(&["detect-bin"])?.command), "detect_bin");
        assert_eq!(
            command_label(&parse(&["templates", "reset"])?.command),
            "templates_reset"
        );
        assert_eq!(
            command_label(&parse(&["service", "restart"])?.command),
            "service_restart"
        );
        Ok(())
    }

    #[test]
    fn log_format_argument_maps_to_telemetry_format() {
        assert_eq!(LogFormat::from(LogFormatArg::Json), LogFormat::Json);
        assert_eq!(LogFormat::from(LogFormatArg::Pretty), LogFormat::Pretty);
    }
}
