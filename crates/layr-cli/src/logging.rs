//! Logging setup for the `layr` binary.
//!
//! The library crates only emit events. The binary installs a single `fmt`
//! subscriber on stderr so rendered output on stdout stays clean.
//!
//! `--quiet` keeps errors only and no flag keeps warnings. Each `-v` steps
//! through info, debug and trace for the layr crates. Dependencies never go
//! past `warn`. A non-empty `RUST_LOG` replaces all of this.

use std::io::IsTerminal as _;

use anyhow::Context as _;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::GlobalArgs;

/// Targets whose level follows the verbosity flags.
const LAYR_TARGETS: [&str; 3] = ["layr", "layr_core", "layr_adapters"];

/// Install the global subscriber. Call once, before any event fires.
pub fn init_logging(args: &GlobalArgs) -> anyhow::Result<()> {
    let level = level_for(args);
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(custom) if !custom.trim().is_empty() => {
            EnvFilter::try_new(&custom).with_context(|| format!("invalid RUST_LOG '{custom}'"))?
        }
        _ => EnvFilter::try_new(directives(level))?,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(!args.no_color && std::io::stderr().is_terminal())
        // Targets from -vv on, when resolver and loader events interleave.
        .with_target(level >= LevelFilter::DEBUG);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("a tracing subscriber is already installed")
}

fn level_for(args: &GlobalArgs) -> LevelFilter {
    if args.quiet {
        return LevelFilter::ERROR;
    }
    match args.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// `EnvFilter` directives: a floor for everything, then the layr crates.
fn directives(level: LevelFilter) -> String {
    let floor = level.min(LevelFilter::WARN).to_string().to_lowercase();
    let level = level.to_string().to_lowercase();
    std::iter::once(floor)
        .chain(LAYR_TARGETS.iter().map(|target| format!("{target}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}
