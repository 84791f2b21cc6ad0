//! Directive scanner: finds `extend` and standalone `include` actions.

use layr_syntax::{Arg, Node, Parsed, Span, parse, trim_extent};
use tracing::{debug, warn};

use crate::{
    domain::{FunctionTable, IncludeDirective, TemplateSource, TemplateTree},
    error::{LayrError, LayrResult},
};

/// Turns a raw source into a [`TemplateTree`].
///
/// `extend` is only looked for at the top level. The first one is honoured
/// and its action text removed from the content, together with any
/// whitespace its trim markers claim; a later one stays in place and renders
/// as nothing. Includes are recorded at any depth, with spans into the
/// returned content.
pub struct DirectiveScanner<'a> {
    functions: &'a FunctionTable,
}

impl<'a> DirectiveScanner<'a> {
    pub fn new(functions: &'a FunctionTable) -> Self {
        Self { functions }
    }

    pub fn scan(&self, source: &TemplateSource) -> LayrResult<TemplateTree> {
        let name = source.name.as_str();
        let parsed = parse(name, &source.content, self.functions.as_func_map())?;

        let mut extends: Option<(String, Span)> = None;
        for node in &parsed.root.nodes {
            let Node::Action { span, pipe } = node else {
                continue;
            };
            if !pipe.decl.is_empty() || pipe.head_function() != Some("extend") {
                continue;
            }
            let target = match &pipe.cmds[0].args[1..] {
                [Arg::Str(target)] => target.clone(),
                _ => {
                    return Err(LayrError::configuration(format!(
                        "extend in {name} takes exactly one quoted template name"
                    )));
                }
            };
            match &extends {
                Some((first, _)) => {
                    warn!(template = name, first = %first, ignored = %target, "Ignoring repeated extend directive");
                }
                None => extends = Some((target, trim_extent(&source.content, span.clone()))),
            }
        }

        let mut includes = standalone_includes(name, &parsed)?;
        let (extends, content) = match extends {
            Some((target, cut)) => {
                for include in &mut includes {
                    if include.span.start >= cut.end {
                        include.span = include.span.start - cut.len()..include.span.end - cut.len();
                    }
                }
                let mut content = String::with_capacity(source.content.len());
                content.push_str(&source.content[..cut.start]);
                content.push_str(&source.content[cut.end..]);
                (Some(target), content)
            }
            None => (None, source.content.clone()),
        };

        debug!(
            template = name,
            extends = ?extends,
            includes = includes.len(),
            "Scanned directives"
        );

        Ok(TemplateTree {
            name: name.to_string(),
            content,
            extends,
            includes,
        })
    }
}

/// Standalone `{{include "x" [ctx]}}` actions in the root and in every
/// definition body, in document order.
fn standalone_includes(name: &str, parsed: &Parsed) -> LayrResult<Vec<IncludeDirective>> {
    let mut found = Vec::new();
    let mut invalid = false;
    let mut visit = |node: &Node| {
        let Node::Action { span, pipe } = node else {
            return;
        };
        if !pipe.decl.is_empty() || pipe.head_function() != Some("include") {
            return;
        }
        match &pipe.cmds[0].args[1..] {
            [Arg::Str(target)] | [Arg::Str(target), _] => found.push(IncludeDirective {
                target: target.clone(),
                span: span.clone(),
            }),
            _ => invalid = true,
        }
    };
    parsed.root.walk(&mut visit);
    for def in &parsed.definitions {
        def.tree.walk(&mut visit);
    }

    if invalid {
        return Err(LayrError::configuration(format!(
            "include in {name} takes a quoted template name and an optional context"
        )));
    }
    found.sort_by_key(|include| include.span.start);
    Ok(found)
}
