//! Template inspection and editing.

use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use fbmend_config::{SettingsStore, TemplateSet};
use tracing::info;

use crate::cli::TemplatesCommand;
use crate::context::{CliContext, CliError, CliResult};
use crate::output::format_templates;

pub(crate) fn handle_templates(ctx: &CliContext, command: TemplatesCommand) -> CliResult<i32> {
    let store = ctx.store()?;
    let templates = match command {
        TemplatesCommand::Show => store.load(),
        TemplatesCommand::Reset => store
            .reset_to_default()
            .map_err(|err| CliError::failure(anyhow!(err).context("cannot reset templates")))?,
        TemplatesCommand::Set(args) => apply_file(&store, &args.file)?,
    };
    println!("{}", format_templates(&templates, ctx.output)?);
    Ok(0)
}

fn apply_file(store: &SettingsStore, file: &Path) -> CliResult<TemplateSet> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("cannot read {}", file.display()))
        .map_err(CliError::failure)?;
    let templates: TemplateSet = serde_json::from_str(&raw).map_err(|err| {
        CliError::validation(format!("{} is not a template set: {err}", file.display()))
    })?;
    store
        .save(&templates)
        .map_err(|err| CliError::failure(anyhow!(err).context("cannot save templates")))?;
    info!(path = %store.path().display(), "templates updated");
    Ok(templates)
}
