//! Implementation of the `layr list` command.

use serde::Serialize;

use crate::{
    cli::{GlobalArgs, ListArgs, ListFormat},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
};

#[derive(Debug, Serialize)]
struct Entry<'a> {
    name: &'a str,
    extends: Option<&'a str>,
    blocks: Vec<&'a str>,
}

pub fn execute(
    args: ListArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let engine = super::open_engine(&global, &args.engine, &config)?;

    let mut entries = Vec::new();
    for name in engine.names() {
        let resolved = engine.lookup(name)?;
        entries.push(Entry {
            name: resolved.name(),
            extends: resolved.parent(),
            blocks: resolved.block_names(),
        });
    }

    let format = if output.is_json() { ListFormat::Json } else { args.format };
    match format {
        ListFormat::Table => {
            output.header("Templates:")?;
            for entry in &entries {
                let layout = entry
                    .extends
                    .map(|parent| output.dim(&format!("  extends {parent}")))
                    .unwrap_or_default();
                output.print(&format!("  {}{layout}", entry.name))?;
            }
        }
        ListFormat::List => {
            for entry in &entries {
                output.emit(&format!("{}\n", entry.name))?;
            }
        }
        ListFormat::Json => output.json(&entries)?,
    }

    Ok(())
}
