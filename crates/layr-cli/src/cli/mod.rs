//! Argument definitions for the `layr` binary.
//!
//! Only names, aliases and help text live here; the handlers in
//! [`crate::commands`] do the work.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

pub mod global;
pub use global::{GlobalArgs, OutputFormat};

/// Layout inheritance and includes for `{{ }}` templates.
///
/// Layr resolves templates that extend layouts, override named blocks and
/// include fragments, then renders them with JSON data.
#[derive(Debug, Parser)]
#[command(
    name = "layr",
    version,
    author,
    arg_required_else_help = true,
    subcommand_required = true,
    after_help = "Examples:\n\
        \x20 layr --root templates check\n\
        \x20 layr render pages/home.html --data '{\"Title\": \"Home\"}'\n\
        \x20 layr inspect pages/home.html"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Render a template with JSON data.
    #[command(
        visible_alias = "r",
        after_help = "Examples:\n\
            \x20 layr render pages/home.html --data '{\"Name\": \"Ann\"}'\n\
            \x20 layr render pages/home.html --data-file data.json -o home.html\n\
            \x20 layr render mail.txt --ext txt --no-escape"
    )]
    Render(RenderArgs),

    /// Load every template and report the first failure.
    #[command(after_help = "Examples:\n\
            \x20 layr check\n\
            \x20 layr --root site/templates check --ext html --ext xml")]
    Check(CheckArgs),

    /// List the loaded templates and the layouts they extend.
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Show the resolved structure of one template.
    #[command(after_help = "Examples:\n\
            \x20 layr inspect pages/home.html\n\
            \x20 layr --output-format json inspect pages/home.html")]
    Inspect(InspectArgs),

    /// Print a shell completion script.
    #[command(after_help = "Examples:\n\
            \x20 layr completions bash > ~/.local/share/bash-completion/completions/layr\n\
            \x20 layr completions zsh > ~/.zfunc/_layr")]
    Completions(CompletionsArgs),

    /// Read the effective configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

impl Commands {
    /// Subcommand name as typed on the command line, for log spans.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Render(_) => "render",
            Self::Check(_) => "check",
            Self::List(_) => "list",
            Self::Inspect(_) => "inspect",
            Self::Completions(_) => "completions",
            Self::Config(_) => "config",
        }
    }
}

/// Engine options shared by every command that loads templates.
#[derive(Debug, Clone, Default, Args)]
pub struct EngineArgs {
    /// Template suffixes; replaces `engine.extensions` from the configuration.
    #[arg(
        short = 'e',
        long = "ext",
        value_name = "EXT",
        help = "Template file suffix (repeatable)"
    )]
    pub extensions: Vec<String>,

    /// Print interpolated values without HTML escaping.
    #[arg(long = "no-escape", help = "Disable HTML escaping")]
    pub no_escape: bool,
}

/// Arguments for `layr render`.
#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Logical template name, relative to the root.
    #[arg(value_name = "NAME", help = "Template name, e.g. pages/home.html")]
    pub name: String,

    /// Inline JSON data.
    #[arg(
        short = 'd',
        long = "data",
        value_name = "JSON",
        conflicts_with = "data_file",
        help = "Template data as a JSON string"
    )]
    pub data: Option<String>,

    /// JSON data file.
    #[arg(
        short = 'f',
        long = "data-file",
        value_name = "FILE",
        help = "Read template data from a JSON file"
    )]
    pub data_file: Option<PathBuf>,

    /// Write the result to a file instead of stdout.
    #[arg(short = 'o', long = "output", value_name = "FILE", help = "Output file")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for `layr check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Arguments for `layr list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// How to lay out the listing.
    #[arg(long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    /// Names with their layouts.
    Table,
    /// One name per line.
    List,
    /// JSON array.
    Json,
}

/// Arguments for `layr inspect`.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Logical template name.
    #[arg(value_name = "NAME")]
    pub name: String,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Shells `clap_complete` can generate for.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one value.
    Get {
        /// Dotted key path, e.g. `engine.root`.
        key: String,
    },
    /// Print every setting, as TOML or JSON.
    List,
    /// Print the path to the default configuration file.
    Path,
}
