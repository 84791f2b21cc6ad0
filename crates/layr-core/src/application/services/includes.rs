//! Include expansion: textual splicing of fragments.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use layr_syntax::{Namespace, Parsed, Tree, parse, trim_extent};
use tracing::{debug, instrument};

use crate::{
    application::ports::TemplateLoader,
    domain::{Coloring, FunctionTable, TemplateSource, TemplateTree},
    error::{LayrError, LayrResult},
};

use super::scanner::DirectiveScanner;

/// Collaborators borrowed for one resolution pass.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub loader: &'a dyn TemplateLoader,
    pub functions: &'a FunctionTable,
}

/// A template with every standalone include spliced in.
#[derive(Debug, Clone)]
pub struct IncludeExpansion {
    pub name: String,
    /// Source after splicing.
    pub content: String,
    /// `content` without its `{{define}}` sections: the text spliced into an
    /// includer. Defined blocks travel in `carried` instead, so the fragment
    /// can be included where a `define` would not parse.
    pub body: String,
    /// Parsed root of `content`.
    pub root: Arc<Tree>,
    /// Blocks brought in by included fragments.
    pub carried: Namespace,
    /// Blocks this template declares itself, outside any spliced text.
    pub declared: Namespace,
    /// Set when the template declares a layout; such templates cannot be
    /// included.
    pub extends: Option<String>,
}

/// Expands includes and caches the result per template name.
#[derive(Debug, Default)]
pub struct IncludeProcessor {
    cache: HashMap<String, Arc<IncludeExpansion>>,
}

impl IncludeProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, name: &str) -> Option<&Arc<IncludeExpansion>> {
        self.cache.get(name)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Expand every include the scanner recorded in `tree`, recursively.
    ///
    /// A cached expansion for `tree.name` is returned as is. Trim markers on
    /// an include claim the neighbouring whitespace, as they would for any
    /// other action.
    #[instrument(skip_all, fields(template = %tree.name))]
    pub fn expand(
        &mut self,
        ctx: ResolveContext<'_>,
        tree: &TemplateTree,
        coloring: &mut Coloring,
    ) -> LayrResult<Arc<IncludeExpansion>> {
        let name = tree.name.as_str();
        if let Some(hit) = self.cache.get(name) {
            debug!("Include cache hit");
            return Ok(Arc::clone(hit));
        }
        coloring.enter(name)?;

        let mut content = String::with_capacity(tree.content.len());
        let mut spliced: Vec<Range<usize>> = Vec::with_capacity(tree.includes.len());
        let mut carried = Namespace::new();
        let mut cursor = 0;

        for include in &tree.includes {
            let fragment = self.fragment(ctx, name, &include.target, coloring)?;
            let cut = trim_extent(&tree.content, include.span.clone());

            // A previous `-}}` may already have eaten the whitespace before this one.
            content.push_str(&tree.content[cursor..cut.start.max(cursor)]);
            let start = content.len();
            content.push_str(&fragment.body);
            spliced.push(start..content.len());
            cursor = cut.end;

            merge_namespace(&mut carried, &fragment.carried);
            merge_namespace(&mut carried, &fragment.declared);
        }
        content.push_str(&tree.content[cursor..]);

        let parsed = parse(name, &content, ctx.functions.as_func_map())?;

        let mut declared = Namespace::new();
        for def in &parsed.definitions {
            let inside_fragment = spliced.iter().any(|range| range.contains(&def.span.start));
            if !inside_fragment {
                merge_namespace(
                    &mut declared,
                    &Namespace::from([(def.name.clone(), Arc::new(def.tree.clone()))]),
                );
            }
        }

        coloring.leave(name);
        debug!(
            includes = tree.includes.len(),
            carried = carried.len(),
            declared = declared.len(),
            "Expanded includes"
        );

        let body = without_define_sections(&content, &parsed);
        let expansion = Arc::new(IncludeExpansion {
            name: name.to_string(),
            body,
            content,
            root: Arc::new(parsed.root),
            carried,
            declared,
            extends: tree.extends.clone(),
        });
        self.cache.insert(name.to_string(), Arc::clone(&expansion));
        Ok(expansion)
    }

    /// Expansion of an include target, from cache or from the loader.
    fn fragment(
        &mut self,
        ctx: ResolveContext<'_>,
        from: &str,
        target: &str,
        coloring: &mut Coloring,
    ) -> LayrResult<Arc<IncludeExpansion>> {
        coloring.check(target)?;

        let expansion = match self.cache.get(target) {
            Some(hit) => Arc::clone(hit),
            None => {
                let source = ctx.loader.read(target).map_err(|e| e.referenced_by(from))?;
                let tree = DirectiveScanner::new(ctx.functions)
                    .scan(&TemplateSource::new(target, source))?;
                reject_layout(from, &tree.name, tree.extends.as_deref())?;
                self.expand(ctx, &tree, coloring)?
            }
        };
        reject_layout(from, target, expansion.extends.as_deref())?;
        Ok(expansion)
    }
}

fn reject_layout(from: &str, target: &str, extends: Option<&str>) -> LayrResult<()> {
    match extends {
        Some(parent) => Err(LayrError::configuration(format!(
            "{from} includes {target}, which extends {parent}; included templates cannot extend"
        ))),
        None => Ok(()),
    }
}

fn without_define_sections(content: &str, parsed: &Parsed) -> String {
    let mut body = String::with_capacity(content.len());
    let mut cursor = 0;
    for section in &parsed.define_sections {
        let cut = trim_extent(content, section.clone());
        body.push_str(&content[cursor..cut.start.max(cursor)]);
        cursor = cut.end;
    }
    body.push_str(&content[cursor..]);
    body
}

/// Later entries win, except that an empty body never replaces a non-empty one.
pub(crate) fn merge_namespace(into: &mut Namespace, from: &Namespace) {
    for (name, tree) in from {
        let keep_existing =
            tree.is_empty() && into.get(name).is_some_and(|existing| !existing.is_empty());
        if !keep_existing {
            into.insert(name.clone(), Arc::clone(tree));
        }
    }
}
