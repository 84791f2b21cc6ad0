//! Raw and scanned template sources.

use layr_syntax::Span;

/// A template as read from a loader. Lives only for the duration of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSource {
    pub name: String,
    pub content: String,
}

impl TemplateSource {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A standalone `{{include "target" ...}}` found by the scanner, at any depth.
/// `span` points into [`TemplateTree::content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeDirective {
    pub target: String,
    pub span: Span,
}

/// A scanned template: the honoured `extend` directive has been cut out of
/// `content`, and includes are recorded in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateTree {
    pub name: String,
    pub content: String,
    pub extends: Option<String>,
    pub includes: Vec<IncludeDirective>,
}

impl TemplateTree {
    pub fn is_root(&self) -> bool {
        self.extends.is_none()
    }
}
