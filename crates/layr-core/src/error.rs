//! Unified error handling for Layr Core.
//!
//! One error type covers loading, resolution and rendering. Each variant
//! carries the logical template name so callers can point at the file that
//! needs fixing.

use std::fmt;

use layr_syntax::{NameConflict, SyntaxError};
use thiserror::Error;

/// Which relation a cycle was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Extends,
    Include,
}

impl fmt::Display for CycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extends => write!(f, "inheritance"),
            Self::Include => write!(f, "include"),
        }
    }
}

/// Root error type for Layr operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LayrError {
    /// Misused directives, reserved names, missing adapters.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The template source does not parse.
    #[error("Syntax error in {name}: {message}")]
    Syntax { name: String, message: String },

    /// A template could not be read, or is not in the published table.
    #[error(
        "Template {name:?} not found{}: {reason}",
        .referenced_by.as_ref().map(|by| format!(" (referenced by {by:?})")).unwrap_or_default()
    )]
    NotFound {
        name: String,
        referenced_by: Option<String>,
        reason: String,
    },

    /// A template reaches itself through `extend` or `include`.
    #[error("Circular {kind} detected: {}", .chain.join(" -> "))]
    Cycle { kind: CycleKind, chain: Vec<String> },

    /// Executing a resolved template failed.
    #[error("Render error in {name}: {message}")]
    Runtime { name: String, message: String },

    /// A named region could not be merged.
    #[error("Name conflict for {name:?}: {reason}")]
    NameConflict { name: String, reason: String },

    /// Unexpected internal errors (bugs, poisoned locks).
    #[error("Internal error: {message}. This is a bug, please report it.")]
    Internal { message: String },
}

impl LayrError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NotFound {
            name: name.into(),
            referenced_by: None,
            reason: reason.into(),
        }
    }

    /// Attach the referencing template to a `NotFound` that lacks one.
    pub fn referenced_by(self, by: &str) -> Self {
        match self {
            Self::NotFound {
                name,
                referenced_by: None,
                reason,
            } => Self::NotFound {
                name,
                referenced_by: Some(by.to_string()),
                reason,
            },
            other => other,
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Configuration { .. } => vec![
                "Check directive arguments: extend and include take a quoted template name".into(),
                "The names extend, include and block are reserved".into(),
            ],
            Self::Syntax { name, .. } => vec![
                format!("Fix the template syntax in {name}"),
                "Check that every {{if}}, {{range}}, {{with}} and {{block}} has a matching {{end}}"
                    .into(),
            ],
            Self::NotFound {
                name,
                referenced_by,
                ..
            } => {
                let mut hints = vec![format!("Check that {name} exists under the template root")];
                if let Some(by) = referenced_by {
                    hints.push(format!("Or fix the reference in {by}"));
                }
                hints.push("Try: layr list to see available templates".into());
                hints
            }
            Self::Cycle { kind, .. } => vec![
                format!("Remove one {kind} directive from the chain"),
                "A template must not reach itself through extend or include".into(),
            ],
            Self::Runtime { .. } => vec![
                "Check the data passed to the template".into(),
                "Check that called functions are registered".into(),
            ],
            Self::NameConflict { .. } => vec!["Block names must not be empty".into()],
            Self::Internal { .. } => vec![
                "This appears to be a bug in Layr".into(),
                "Re-run with -vvv and include the log when reporting it".into(),
            ],
        }
    }

    /// Get error category for display/styling purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Syntax { .. } | Self::NameConflict { .. } => ErrorCategory::Syntax,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Cycle { .. } => ErrorCategory::Cycle,
            Self::Runtime { .. } => ErrorCategory::Runtime,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<SyntaxError> for LayrError {
    fn from(err: SyntaxError) -> Self {
        Self::Syntax {
            name: err.template.clone(),
            message: err.to_string(),
        }
    }
}

impl From<NameConflict> for LayrError {
    fn from(err: NameConflict) -> Self {
        Self::NameConflict {
            name: err.name,
            reason: err.reason,
        }
    }
}

/// Error categories for UI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Syntax,
    NotFound,
    Cycle,
    Runtime,
    Internal,
}

/// Convenient result type alias.
pub type LayrResult<T> = Result<T, LayrError>;
