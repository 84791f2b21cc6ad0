//! Errors surfaced by the `layr` binary.
//!
//! Every failure ends up as a [`CliError`], which knows its exit code, a few
//! hints for the user and how to print itself on stderr.

use std::error::Error as _;
use std::fmt::Write as _;
use std::path::Path;

use owo_colors::OwoColorize;
use thiserror::Error;

use layr_core::error::{ErrorCategory as CoreCategory, LayrError};

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    /// Arguments that parse but make no sense, e.g. an unknown config key.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// `--data` or `--data-file` is not JSON.
    #[error("Invalid template data: {message}")]
    InvalidData {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Core(#[from] LayrError),

    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for CliError {
    fn from(source: std::io::Error) -> Self {
        Self::IoError {
            message: source.to_string(),
            source,
        }
    }
}

/// How a failure is reported and which exit code it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad arguments, bad templates or bad data.
    UserError,
    NotFound,
    Configuration,
    Internal,
}

impl ErrorCategory {
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::UserError => 2,
            Self::NotFound => 3,
            Self::Configuration => 4,
        }
    }
}

impl From<CoreCategory> for ErrorCategory {
    fn from(category: CoreCategory) -> Self {
        match category {
            CoreCategory::Syntax | CoreCategory::Cycle | CoreCategory::Runtime => Self::UserError,
            CoreCategory::NotFound => Self::NotFound,
            CoreCategory::Configuration => Self::Configuration,
            CoreCategory::Internal => Self::Internal,
        }
    }
}

impl CliError {
    /// Hints printed under the error message.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Core(err) => err.suggestions(),
            Self::InvalidInput { message } => vec![
                format!("Check your input: {message}"),
                "Run the command with --help to see what it accepts".into(),
            ],
            Self::InvalidData { .. } => vec![
                "Template data must be a JSON document".into(),
                r#"Example: layr render page.html --data '{"Title": "Home"}'"#.into(),
            ],
            Self::ConfigError { message, .. } => vec![
                format!("Configuration issue: {message}"),
                format!(
                    "The default config file is {}",
                    crate::config::AppConfig::config_path().display()
                ),
                "Run 'layr config list' to print the effective settings".into(),
            ],
            Self::IoError { message, .. } => vec![
                format!("Filesystem operation failed: {message}"),
                "Check that the path exists and is writable".into(),
            ],
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Core(err) => err.category().into(),
            Self::InvalidInput { .. } | Self::InvalidData { .. } => ErrorCategory::UserError,
            Self::ConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError { .. } => ErrorCategory::Internal,
        }
    }

    /// See the exit code table on the binary's crate docs.
    pub fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }

    /// Report for a terminal: red headline, yellow hints.
    pub fn format_colored(&self, verbose: bool) -> String {
        self.report(verbose, true)
    }

    /// Same report as [`Self::format_colored`] without ANSI codes.
    pub fn format_plain(&self, verbose: bool) -> String {
        self.report(verbose, false)
    }

    fn report(&self, verbose: bool, color: bool) -> String {
        let mut out = String::from("\n");
        let headline = format!("Error: {self}");
        if color {
            let _ = writeln!(out, "{} {}", "\u{2717}".red().bold(), headline.red().bold());
        } else {
            let _ = writeln!(out, "{headline}");
        }

        if verbose {
            let mut cause = self.source();
            while let Some(err) = cause {
                let line = format!("  Caused by: {err}");
                if color {
                    let _ = writeln!(out, "{}", line.dimmed());
                } else {
                    let _ = writeln!(out, "{line}");
                }
                cause = err.source();
            }
        }

        let hints = self.suggestions();
        if !hints.is_empty() {
            let title = "Suggestions:";
            if color {
                let _ = writeln!(out, "\n{}", title.yellow().bold());
            } else {
                let _ = writeln!(out, "\n{title}");
            }
            for hint in hints {
                let _ = writeln!(out, "  {hint}");
            }
        }

        if !verbose {
            let tip = "Use -v / --verbose for more details.";
            if color {
                let _ = writeln!(out, "\n{}", tip.dimmed());
            } else {
                let _ = writeln!(out, "\n{tip}");
            }
        }
        out
    }

    /// Mirror the failure into the tracing log before it is printed.
    pub fn log(&self) {
        let code = self.exit_code();
        match self.category() {
            ErrorCategory::UserError | ErrorCategory::NotFound => {
                tracing::warn!(exit_code = code, "{self}");
            }
            ErrorCategory::Configuration | ErrorCategory::Internal => {
                tracing::error!(exit_code = code, "{self}");
            }
        }
        if let Some(cause) = self.source() {
            tracing::debug!(%cause, "underlying error");
        }
    }
}

/// Attach a message to a foreign error while turning it into a [`CliError`].
pub trait CliContext<T> {
    fn cli_context<S: Into<String>>(self, message: impl FnOnce() -> S) -> CliResult<T>;
}

impl<T> CliContext<T> for Result<T, std::io::Error> {
    fn cli_context<S: Into<String>>(self, message: impl FnOnce() -> S) -> CliResult<T> {
        self.map_err(|source| CliError::IoError {
            message: message().into(),
            source,
        })
    }
}

impl<T> CliContext<T> for Result<T, serde_json::Error> {
    fn cli_context<S: Into<String>>(self, message: impl FnOnce() -> S) -> CliResult<T> {
        self.map_err(|source| CliError::InvalidData {
            message: format!("{}: {source}", message().into()),
            source,
        })
    }
}

/// `Failed to <action> '<path>'`
pub fn file_context(action: &str, path: &Path) -> String {
    format!("Failed to {action} '{}'", path.display())
}
