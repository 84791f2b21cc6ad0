//! Render-ready templates.

use std::fmt::Write as _;

use layr_syntax::Template;

/// A fully merged template: the root of its chain plus every block visible
/// from it, leaf definitions winning.
#[derive(Debug, Clone)]
pub struct ResolvedTemplate {
    name: String,
    parent: Option<String>,
    template: Template,
}

impl ResolvedTemplate {
    pub fn new(name: impl Into<String>, parent: Option<String>, template: Template) -> Self {
        Self {
            name: name.into(),
            parent,
            template,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The template named by this one's `extend`, if any.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn block_names(&self) -> Vec<&str> {
        self.template.names().collect()
    }

    /// Human-readable dump of the root tree and every block.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "template: {}", self.name);
        if let Some(parent) = &self.parent {
            let _ = writeln!(out, "extends: {parent}");
        }
        let _ = writeln!(out, "root:\n{}", indent(&self.template.root().to_string()));
        if self.template.trees().is_empty() {
            let _ = writeln!(out, "blocks: (none)");
        } else {
            let _ = writeln!(out, "blocks:");
            for (name, tree) in self.template.trees() {
                let _ = writeln!(out, "  - {name}:\n{}", indent(&tree.to_string()));
            }
        }
        out
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("      {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
