//! Tool directory detection.

use fbmend_tools::{ToolProbe, candidate_dirs, probe_tool_dir};
use tracing::debug;

use crate::context::{CliContext, CliResult};
use crate::output::format_probes;

/// Prints every candidate directory; exits 0 when one holds gfix and gbak.
pub(crate) fn handle_detect_bin(ctx: &CliContext) -> CliResult<i32> {
    let probes: Vec<ToolProbe> = candidate_dirs()
        .iter()
        .map(|dir| probe_tool_dir(dir))
        .collect();
    let found = probes.iter().any(ToolProbe::is_complete);
    debug!(candidates = probes.len(), found, "probed tool directories");
    println!("{}", format_probes(&probes, ctx.output)?);
    Ok(if found { 0 } else { 2 })
}
