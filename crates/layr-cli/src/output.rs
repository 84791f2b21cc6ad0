//! Everything the commands print to stdout goes through [`OutputManager`].
//!
//! Rendered templates and JSON documents are payload: written as is and
//! never silenced. Status lines, headers and listings are chatter: dropped
//! under `--quiet` and only coloured in the human format.

use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use console::Term;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::cli::global::{GlobalArgs, OutputFormat};
use crate::config::AppConfig;

#[derive(Clone, Copy)]
enum Style {
    Ok,
    Warn,
    Heading,
}

pub struct OutputManager {
    format: OutputFormat,
    quiet: bool,
    color: bool,
    term: Term,
}

impl OutputManager {
    pub fn new(args: &GlobalArgs, config: &AppConfig) -> Self {
        // The flag wins; `output.format` only fills in for `auto`.
        let requested = match args.output_format {
            OutputFormat::Auto => OutputFormat::from_str(&config.output.format, true)
                .unwrap_or(OutputFormat::Auto),
            chosen => chosen,
        };
        let format = match requested {
            OutputFormat::Auto if io::stdout().is_terminal() => OutputFormat::Human,
            OutputFormat::Auto => OutputFormat::Plain,
            chosen => chosen,
        };
        let color = format == OutputFormat::Human && !args.no_color && !config.output.no_color;

        Self {
            format,
            quiet: args.quiet,
            color,
            term: Term::stdout(),
        }
    }

    /// Write `content` to stdout byte for byte.
    pub fn emit(&self, content: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(content.as_bytes())?;
        stdout.flush()
    }

    /// Pretty-printed JSON followed by a newline.
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) -> io::Result<()> {
        let text = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        self.term.write_line(&text)
    }

    /// A line of chatter.
    pub fn print(&self, line: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(line)
    }

    /// `✓ message`
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.status('\u{2713}', message, Style::Ok)
    }

    /// `⚠ message`
    pub fn warning(&self, message: &str) -> io::Result<()> {
        self.status('\u{26a0}', message, Style::Warn)
    }

    pub fn header(&self, text: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        self.term.write_line(&self.paint(text, Style::Heading))
    }

    /// Secondary text inside a line, e.g. a template's layout in `list`.
    pub fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_owned()
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn status(&self, mark: char, message: &str, style: Style) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mark = self.paint(&mark.to_string(), style);
        let message = self.paint(message, style);
        self.term.write_line(&format!("{mark} {message}"))
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if !self.color {
            return text.to_owned();
        }
        match style {
            Style::Ok => text.green().to_string(),
            Style::Warn => text.yellow().to_string(),
            Style::Heading => text.cyan().bold().to_string(),
        }
    }
}
