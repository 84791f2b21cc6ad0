//! Command handlers. Each one translates arguments into engine calls and
//! prints the results; no resolution logic lives here.

pub mod check;
pub mod completions;
pub mod config;
pub mod inspect;
pub mod list;
pub mod render;

use tracing::debug;

use layr_adapters::EngineConfig;
use layr_core::prelude::Engine;

use crate::{
    cli::{EngineArgs, GlobalArgs},
    config::AppConfig,
    error::CliResult,
};

/// Engine settings after CLI flags are applied over the configuration.
pub fn engine_config(global: &GlobalArgs, args: &EngineArgs, config: &AppConfig) -> EngineConfig {
    let mut engine = config.engine.clone();
    if let Some(root) = &global.root {
        engine.root = root.clone();
    }
    if !args.extensions.is_empty() {
        engine.extensions = args.extensions.clone();
    }
    if args.no_escape {
        engine.escape_html = false;
    }
    engine
}

/// Build the engine and load every template under the root.
pub fn open_engine(global: &GlobalArgs, args: &EngineArgs, config: &AppConfig) -> CliResult<Engine> {
    let settings = engine_config(global, args, config);
    debug!(
        root = %settings.root.display(),
        extensions = ?settings.extensions,
        escape_html = settings.escape_html,
        "Opening engine"
    );
    Ok(settings.open()?)
}
