//! Error types for the template runtime.
//!
//! Parsing, execution and tree merging fail in distinct ways, so each gets
//! its own type. Callers in `layr-core` translate them into the engine-level
//! taxonomy.

use thiserror::Error;

/// A template source could not be lexed or parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("template: {template}:{line}: {message}")]
pub struct SyntaxError {
    /// Name the source was parsed under.
    pub template: String,
    /// 1-based line of the offending token.
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(template: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            line,
            message: message.into(),
        }
    }
}

/// Failure while executing a parsed template against data.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("no such template {name:?}")]
    UndefinedTemplate { name: String },

    #[error("can't evaluate field {field} in type {kind}")]
    Field { field: String, kind: &'static str },

    #[error("error calling {name}: {message}")]
    Function { name: String, message: String },

    #[error("{0}")]
    Invalid(String),

    #[error("exceeded maximum template depth ({depth}) while executing {name:?}")]
    DepthExceeded { name: String, depth: usize },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A named tree could not be merged into a template.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot add tree {name:?}: {reason}")]
pub struct NameConflict {
    pub name: String,
    pub reason: String,
}
