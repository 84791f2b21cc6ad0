//! Implementation of the `layr check` command.

use serde_json::json;
use tracing::instrument;

use crate::{
    cli::{CheckArgs, GlobalArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// Load every template; the first failure becomes the command's error.
#[instrument(skip_all)]
pub fn execute(
    args: CheckArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let engine = super::open_engine(&global, &args.engine, &config)?;
    let count = engine.names().count();

    if output.is_json() {
        output.json(&json!({ "ok": true, "templates": count }))?;
    } else if count == 0 {
        output.warning(&format!(
            "No templates with suffix {} found",
            engine.extensions().join(", ")
        ))?;
    } else {
        output.success(&format!("{count} templates resolved"))?;
    }
    Ok(())
}
