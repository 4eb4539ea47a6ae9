//! Output renderers and formatting helpers for CLI commands.

use std::fmt::Write as _;

use anyhow::anyhow;
use fbmend_app::RecoveryReport;
use fbmend_config::{TemplateKind, TemplateSet};
use fbmend_tools::{ServiceState, ToolProbe};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::context::{CliError, CliResult};

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}

pub(crate) fn format_report(report: &RecoveryReport, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Text => Ok(report.render().trim_end().to_string()),
    }
}

pub(crate) fn format_templates(templates: &TemplateSet, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(templates),
        OutputFormat::Text => {
            let mut text = format!("useCustom: {}", templates.use_custom);
            for kind in TemplateKind::ALL {
                let _ = write!(text, "\n{}: {}", kind.as_str(), templates.get(kind));
            }
            Ok(text)
        }
    }
}

#[derive(Serialize)]
struct ServiceStatus {
    state: ServiceState,
}

pub(crate) fn format_service_state(state: ServiceState, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(&ServiceStatus { state }),
        OutputFormat::Text => Ok(format!("service: {state}")),
    }
}

pub(crate) fn format_probes(probes: &[ToolProbe], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(probes),
        OutputFormat::Text => {
            let lines: Vec<String> = probes
                .iter()
                .map(|probe| {
                    let marker = if probe.is_complete() { "*" } else { " " };
                    format!(
                        "{marker} {} gfix={} gbak={} isql={}",
                        probe.dir.display(),
                        yes_no(probe.gfix),
                        yes_no(probe.gbak),
                        yes_no(probe.isql)
                    )
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn templates_render_as_camel_case_json() -> Result<(), Box<dyn std::error::Error>> {
        let text = format_templates(&TemplateSet::default(), OutputFormat::Json)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        assert_eq!(value["useCustom"], false);
        assert!(value["backup"].as_str().is_some_and(|t| t.contains("{GBAK}")));
        Ok(())
    }

    #[test]
    fn templates_render_one_line_per_kind() -> Result<(), CliError> {
        let text = format_templates(&TemplateSet::default(), OutputFormat::Text)?;
        assert!(text.starts_with("useCustom: false"));
        assert_eq!(text.lines().count(), 1 + TemplateKind::ALL.len());
        Ok(())
    }

    #[test]
    fn service_state_formats() -> Result<(), CliError> {
        assert_eq!(
            format_service_state(ServiceState::Stopped, OutputFormat::Text)?,
            "service: stopped"
        );
        assert!(format_service_state(ServiceState::Running, OutputFormat::Json)?.contains("\"running\""));
        Ok(())
    }

    #[test]
    fn probes_mark_complete_directories() -> Result<(), CliError> {
        let probes = [
            ToolProbe {
                dir: PathBuf::from("/opt/firebird/bin"),
                gfix: true,
                gbak: true,
                isql: false,
            },
            ToolProbe {
                dir: PathBuf::from("/usr/lib/firebird/bin"),
                gfix: true,
                gbak: false,
                isql: true,
            },
        ];
        let text = format_probes(&probes, OutputFormat::Text)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "* /opt/firebird/bin gfix=yes gbak=yes isql=no");
        assert_eq!(lines[1], "  /usr/lib/firebird/bin gfix=yes gbak=no isql=yes");
        Ok(())
    }
}
