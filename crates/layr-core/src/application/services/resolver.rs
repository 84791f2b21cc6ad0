//! Inheritance resolution: walks `extend` chains and merges blocks.

use std::collections::HashMap;
use std::sync::Arc;

use layr_syntax::Template;
use tracing::{debug, instrument};

use crate::{
    domain::{Coloring, ResolvedTemplate, TemplateSource},
    error::{CycleKind, LayrResult},
};

use super::includes::{IncludeProcessor, ResolveContext};
use super::scanner::DirectiveScanner;

/// Resolves templates into [`ResolvedTemplate`]s and caches them by name.
///
/// The inheritance cache and the include cache are filled lazily and only
/// cleared together by [`InheritanceResolver::clear`].
#[derive(Debug, Default)]
pub struct InheritanceResolver {
    cache: HashMap<String, Arc<ResolvedTemplate>>,
    includes: IncludeProcessor,
}

impl InheritanceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, name: &str) -> Option<&Arc<ResolvedTemplate>> {
        self.cache.get(name)
    }

    pub fn includes(&self) -> &IncludeProcessor {
        &self.includes
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.includes.clear();
    }

    /// Resolve `name`, its ancestors and everything they include.
    pub fn resolve(&mut self, ctx: ResolveContext<'_>, name: &str) -> LayrResult<Arc<ResolvedTemplate>> {
        let mut extends = Coloring::new(CycleKind::Extends);
        let mut includes = Coloring::new(CycleKind::Include);
        self.resolve_in(ctx, name, &mut extends, &mut includes)
    }

    #[instrument(skip(self, ctx, extends, includes))]
    fn resolve_in(
        &mut self,
        ctx: ResolveContext<'_>,
        name: &str,
        extends: &mut Coloring,
        includes: &mut Coloring,
    ) -> LayrResult<Arc<ResolvedTemplate>> {
        extends.check(name)?;
        if let Some(hit) = self.cache.get(name) {
            debug!("Inheritance cache hit");
            return Ok(Arc::clone(hit));
        }
        extends.enter(name)?;

        // A fragment already expanded for some include is not read again.
        let expansion = match self.includes.cached(name) {
            Some(hit) => Arc::clone(hit),
            None => {
                let source = ctx.loader.read(name)?;
                let tree = DirectiveScanner::new(ctx.functions)
                    .scan(&TemplateSource::new(name, source))?;
                self.includes.expand(ctx, &tree, includes)?
            }
        };

        let template = match &expansion.extends {
            None => {
                let mut template = Template::new(name, Arc::clone(&expansion.root));
                template.merge(&expansion.carried)?;
                template.merge(&expansion.declared)?;
                template
            }
            Some(parent) => {
                let parent = self
                    .resolve_in(ctx, parent, extends, includes)
                    .map_err(|e| e.referenced_by(name))?;
                let mut template = parent.template().fork(name);
                template.merge(&expansion.carried)?;
                template.merge(&expansion.declared)?;
                template
            }
        };
        extends.leave(name);

        let resolved = Arc::new(ResolvedTemplate::new(name, expansion.extends.clone(), template));
        debug!(parent = ?resolved.parent(), blocks = resolved.block_names().len(), "Resolved");
        self.cache.insert(name.to_string(), Arc::clone(&resolved));
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockTemplateLoader;
    use crate::domain::FunctionTable;
    use crate::error::LayrError;
    use layr_syntax::Escape;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn loader_with(files: &'static [(&'static str, &'static str)]) -> MockTemplateLoader {
        let mut loader = MockTemplateLoader::new();
        loader.expect_read().returning(move |name| {
            files
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, content)| content.to_string())
                .ok_or_else(|| LayrError::not_found(name, "no such file"))
        });
        loader
    }

    fn render(resolved: &ResolvedTemplate, functions: &FunctionTable) -> String {
        resolved
            .template()
            .execute_to_string(&json!({"Title": "T"}), functions.as_func_map(), Escape::Html)
            .unwrap()
    }

    #[test]
    fn child_overrides_parent_block() {
        let loader = loader_with(&[
            ("base.html", r#"<title>{{block "title" .}}Base{{end}}</title>"#),
            ("page.html", r#"{{extend "base.html"}}{{define "title"}}{{.Title}}{{end}}"#),
        ]);
        let functions = FunctionTable::new();
        let ctx = ResolveContext {
            loader: &loader,
            functions: &functions,
        };
        let mut resolver = InheritanceResolver::new();

        let page = resolver.resolve(ctx, "page.html").unwrap();
        assert_eq!(page.parent(), Some("base.html"));
        assert_eq!(render(&page, &functions), "<title>T</title>");

        // The parent was cached untouched.
        let base = resolver.cached("base.html").unwrap();
        assert_eq!(render(base, &functions), "<title>Base</title>");
    }

    #[test]
    fn each_source_is_read_once_across_resolutions() {
        let mut loader = MockTemplateLoader::new();
        loader
            .expect_read()
            .with(eq("base.html"))
            .times(1)
            .returning(|_| Ok(r#"{{block "body" .}}{{end}}"#.into()));
        loader
            .expect_read()
            .with(eq("a.html"))
            .times(1)
            .returning(|_| Ok(r#"{{extend "base.html"}}{{define "body"}}a{{end}}"#.into()));
        loader
            .expect_read()
            .with(eq("b.html"))
            .times(1)
            .returning(|_| Ok(r#"{{extend "base.html"}}{{define "body"}}b{{end}}"#.into()));

        let functions = FunctionTable::new();
        let ctx = ResolveContext {
            loader: &loader,
            functions: &functions,
        };
        let mut resolver = InheritanceResolver::new();
        for name in ["a.html", "b.html", "a.html", "base.html"] {
            resolver.resolve(ctx, name).unwrap();
        }
    }

    #[test]
    fn included_fragment_is_not_read_again_when_resolved() {
        let mut loader = MockTemplateLoader::new();
        loader
            .expect_read()
            .with(eq("page.html"))
            .times(1)
            .returning(|_| Ok(r#"<{{include "nav.html"}}>"#.into()));
        loader
            .expect_read()
            .with(eq("nav.html"))
            .times(1)
            .returning(|_| Ok("nav".into()));

        let functions = FunctionTable::new();
        let ctx = ResolveContext {
            loader: &loader,
            functions: &functions,
        };
        let mut resolver = InheritanceResolver::new();
        let page = resolver.resolve(ctx, "page.html").unwrap();
        let nav = resolver.resolve(ctx, "nav.html").unwrap();
        assert_eq!(render(&page, &functions), "<nav>");
        assert_eq!(render(&nav, &functions), "nav");
        assert_eq!(nav.parent(), None);
    }

    #[test]
    fn extends_cycle_reports_chain() {
        let loader = loader_with(&[
            ("a.html", r#"{{extend "b.html"}}"#),
            ("b.html", r#"{{extend "a.html"}}"#),
        ]);
        let functions = FunctionTable::new();
        let ctx = ResolveContext {
            loader: &loader,
            functions: &functions,
        };
        let mut resolver = InheritanceResolver::new();

        let err = resolver.resolve(ctx, "a.html").unwrap_err();
        assert_eq!(
            err,
            LayrError::Cycle {
                kind: CycleKind::Extends,
                chain: vec!["a.html".into(), "b.html".into(), "a.html".into()],
            }
        );
        assert!(resolver.cached("a.html").is_none());
        assert!(resolver.cached("b.html").is_none());
    }

    #[test]
    fn missing_parent_names_the_child() {
        let loader = loader_with(&[("page.html", r#"{{extend "gone.html"}}"#)]);
        let functions = FunctionTable::new();
        let ctx = ResolveContext {
            loader: &loader,
            functions: &functions,
        };
        let err = InheritanceResolver::new().resolve(ctx, "page.html").unwrap_err();
        assert!(matches!(
            err,
            LayrError::NotFound { ref name, referenced_by: Some(ref by), .. }
                if name == "gone.html" && by == "page.html"
        ));
    }

    #[test]
    fn three_level_chain_leaf_wins() {
        let loader = loader_with(&[
            ("base.html", r#"[{{block "a" .}}base-a{{end}}|{{block "b" .}}base-b{{end}}]"#),
            ("mid.html", r#"{{extend "base.html"}}{{define "a"}}mid-a{{end}}{{define "b"}}mid-b{{end}}"#),
            ("leaf.html", r#"{{extend "mid.html"}}{{define "b"}}leaf-b{{end}}"#),
        ]);
        let functions = FunctionTable::new();
        let ctx = ResolveContext {
            loader: &loader,
            functions: &functions,
        };
        let mut resolver = InheritanceResolver::new();
        let leaf = resolver.resolve(ctx, "leaf.html").unwrap();
        assert_eq!(render(&leaf, &functions), "[mid-a|leaf-b]");
        let mid = resolver.cached("mid.html").unwrap();
        assert_eq!(render(mid, &functions), "[mid-a|mid-b]");
    }
}
