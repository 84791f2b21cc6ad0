//! `layr config` - read the effective configuration.

use serde_json::Value;

use crate::cli::ConfigCommands;
use crate::config::AppConfig;
use crate::error::{CliError, CliResult};
use crate::output::OutputManager;

pub fn execute(cmd: ConfigCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    match cmd {
        ConfigCommands::Get { key } => output.emit(&format!("{}\n", lookup(&config, &key)?))?,
        ConfigCommands::List if output.is_json() => output.json(&config)?,
        ConfigCommands::List => {
            let text = toml::to_string_pretty(&config).map_err(|e| CliError::ConfigError {
                message: format!("cannot print the configuration as TOML: {e}"),
                source: Some(e.into()),
            })?;
            output.header("Effective configuration:")?;
            output.emit(&text)?;
        }
        ConfigCommands::Path => {
            output.emit(&format!("{}\n", AppConfig::config_path().display()))?
        }
    }
    Ok(())
}

/// Value of a dotted key such as `engine.root`. Only leaves are addressable;
/// lists print comma-separated.
fn lookup(config: &AppConfig, key: &str) -> CliResult<String> {
    let unknown = || CliError::InvalidInput {
        message: format!("Unknown config key: '{key}'"),
    };
    let tree = serde_json::to_value(config).map_err(|e| CliError::ConfigError {
        message: e.to_string(),
        source: Some(e.into()),
    })?;

    let leaf = key
        .split('.')
        .try_fold(&tree, |node, part| node.get(part))
        .ok_or_else(unknown)?;
    match leaf {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(_) | Value::Number(_) => Ok(leaf.to_string()),
        Value::Array(items) => Ok(items
            .iter()
            .map(|item| item.as_str().map_or_else(|| item.to_string(), str::to_owned))
            .collect::<Vec<_>>()
            .join(",")),
        Value::Null | Value::Object(_) => Err(unknown()),
    }
}
