//! `layr`: resolve, inspect and render layout-inheriting templates.
//!
//! Exit codes:
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! |  0   | Success                                        |
//! |  1   | Internal or filesystem error                   |
//! |  2   | User error: arguments, syntax, cycles, data    |
//! |  3   | Template not found                             |
//! |  4   | Configuration error                            |

use std::io::IsTerminal as _;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, instrument};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;
use crate::error::{CliError, CliResult};
use crate::output::OutputManager;

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

fn main() -> ExitCode {
    // A missing .env is not an error.
    dotenvy::dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // Also reached for --help and --version, which exit 0.
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(err.exit_code() as u8);
        }
    };

    if let Err(err) = logging::init_logging(&cli.global) {
        eprintln!("layr: cannot set up logging: {err:#}");
        return ExitCode::FAILURE;
    }
    let verbose = cli.global.verbose > 0;
    debug!(global = ?cli.global, "arguments parsed");

    let config = match AppConfig::load(cli.global.config.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            let err = CliError::ConfigError {
                message: format!("{err:#}"),
                source: Some(err.into()),
            };
            return report(err, verbose);
        }
    };
    let output = OutputManager::new(&cli.global, &config);

    match dispatch(cli, config, output) {
        Ok(()) => {
            debug!("done");
            ExitCode::SUCCESS
        }
        Err(err) => report(err, verbose),
    }
}

#[instrument(skip_all, fields(command = cli.command.name()))]
fn dispatch(cli: Cli, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let global = cli.global;
    match cli.command {
        Commands::Render(args) => commands::render::execute(args, global, config, output),
        Commands::Check(args) => commands::check::execute(args, global, config, output),
        Commands::List(args) => commands::list::execute(args, global, config, output),
        Commands::Inspect(args) => commands::inspect::execute(args, global, config, output),
        Commands::Config(args) => commands::config::execute(args, config, output),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Log `err`, print it on stderr and turn it into the process exit code.
fn report(err: CliError, verbose: bool) -> ExitCode {
    err.log();
    let text = if std::io::stderr().is_terminal() {
        err.format_colored(verbose)
    } else {
        err.format_plain(verbose)
    };
    eprint!("{text}");
    ExitCode::from(err.exit_code())
}
