//! Implementation of the `layr inspect` command.

use serde_json::json;

use crate::{
    cli::{GlobalArgs, InspectArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

/// Print the resolved root and block table of one template.
pub fn execute(
    args: InspectArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let engine = super::open_engine(&global, &args.engine, &config)?;
    let resolved = engine.lookup(&args.name)?;

    if output.is_json() {
        let template = resolved.template();
        let blocks: serde_json::Map<String, serde_json::Value> = template
            .trees()
            .iter()
            .map(|(name, tree)| (name.clone(), json!(tree.to_string())))
            .collect();
        output.json(&json!({
            "name": resolved.name(),
            "extends": resolved.parent(),
            "root": template.root().to_string(),
            "blocks": blocks,
        }))?;
    } else {
        output.emit(&resolved.describe())?;
    }
    Ok(())
}
