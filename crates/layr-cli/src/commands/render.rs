//! Implementation of the `layr render` command.

use std::fs;

use serde_json::Value;
use tracing::{info, instrument};

use crate::{
    cli::{GlobalArgs, RenderArgs},
    config::AppConfig,
    error::{CliResult, CliContext, file_context},
    output::OutputManager,
};

/// Render one template to stdout or to `--output`.
#[instrument(skip_all, fields(template = %args.name))]
pub fn execute(
    args: RenderArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let data = load_data(&args)?;
    let engine = super::open_engine(&global, &args.engine, &config)?;
    let rendered = engine.render(&args.name, &data)?;
    info!(bytes = rendered.len(), "Rendered");

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).cli_context(|| file_context("create", parent))?;
            }
            fs::write(path, &rendered).cli_context(|| file_context("write", path))?;
            output.success(&format!("Rendered {} to {}", args.name, path.display()))?;
        }
        None => output.emit(&rendered)?,
    }

    Ok(())
}

/// Template data from `--data` or `--data-file`; an empty object otherwise.
fn load_data(args: &RenderArgs) -> CliResult<Value> {
    if let Some(inline) = &args.data {
        return serde_json::from_str(inline).cli_context(|| "--data is not valid JSON");
    }
    if let Some(path) = &args.data_file {
        let text = fs::read_to_string(path).cli_context(|| file_context("read", path))?;
        return serde_json::from_str(&text)
            .cli_context(|| format!("{} is not valid JSON", path.display()));
    }
    Ok(Value::Object(Default::default()))
}
