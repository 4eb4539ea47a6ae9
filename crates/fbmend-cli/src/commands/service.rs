//! Service control commands.

use anyhow::anyhow;

use crate::cli::{OutputFormat, ServiceCommand};
use crate::context::{CliContext, CliError, CliResult};
use crate::output::{format_service_state, to_json};

pub(crate) async fn handle_service(ctx: &CliContext, command: ServiceCommand) -> CliResult<i32> {
    let engine = ctx.engine()?;
    match command {
        ServiceCommand::Status => {
            let state = engine.service_state().await;
            println!("{}", format_service_state(state, ctx.output)?);
        }
        ServiceCommand::Stop => {
            engine.stop_service().await;
            println!("stop requested for every service identity");
        }
        ServiceCommand::Start => {
            engine.start_service().await;
            println!("start requested for every service identity");
        }
        ServiceCommand::Restart => {
            let name = engine
                .restart_service()
                .await
                .ok_or_else(|| CliError::failure(anyhow!("no Firebird service is installed")))?;
            match ctx.output {
                OutputFormat::Json => {
                    println!("{}", to_json(&serde_json::json!({ "restarted": name }))?);
                }
                OutputFormat::Text => println!("restarted {name}"),
            }
        }
    }
    Ok(0)
}
