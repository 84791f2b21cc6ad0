//! Engine facade: load every template once, then render by name.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use layr_syntax::{Escape, FuncMap};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    application::ports::TemplateLoader,
    domain::{FunctionTable, ResolvedTemplate},
    error::{LayrError, LayrResult},
};

use super::includes::ResolveContext;
use super::resolver::InheritanceResolver;

/// Default template suffix.
pub const DEFAULT_EXTENSION: &str = "html";

/// Builder for [`Engine`].
pub struct EngineBuilder {
    loader: Option<Box<dyn TemplateLoader>>,
    functions: FuncMap,
    extensions: Vec<String>,
    escape: Escape,
}

impl EngineBuilder {
    fn new() -> Self {
        Self {
            loader: None,
            functions: FuncMap::new(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            escape: Escape::Html,
        }
    }

    pub fn loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn boxed_loader(mut self, loader: Box<dyn TemplateLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn functions(mut self, functions: FuncMap) -> Self {
        self.functions.extend(functions);
        self
    }

    /// Replace the template suffixes considered by `load_all`.
    /// A leading dot is optional.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn escape(mut self, escape: Escape) -> Self {
        self.escape = escape;
        self
    }

    pub fn build(self) -> LayrResult<Engine> {
        let loader = self
            .loader
            .ok_or_else(|| LayrError::configuration("no template loader configured"))?;
        if self.extensions.is_empty() {
            return Err(LayrError::configuration("at least one template extension is required"));
        }
        let mut functions = FunctionTable::new();
        functions.merge(self.functions)?;

        Ok(Engine {
            loader,
            functions,
            extensions: self.extensions,
            escape: self.escape,
            resolver: InheritanceResolver::new(),
            published: BTreeMap::new(),
            loaded: false,
        })
    }
}

/// Loads, resolves and renders templates.
///
/// Loading takes `&mut self` and rendering `&self`, so a shared engine can
/// serve renders concurrently while a reload needs exclusive access.
pub struct Engine {
    loader: Box<dyn TemplateLoader>,
    functions: FunctionTable,
    extensions: Vec<String>,
    escape: Escape,
    resolver: InheritanceResolver,
    published: BTreeMap<String, Arc<ResolvedTemplate>>,
    loaded: bool,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Engine over `loader` with default settings.
    pub fn new(loader: impl TemplateLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            functions: FunctionTable::new(),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            escape: Escape::Html,
            resolver: InheritanceResolver::new(),
            published: BTreeMap::new(),
            loaded: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    fn matches_extension(&self, name: &str) -> bool {
        name.rsplit_once('.')
            .is_some_and(|(_, ext)| self.extensions.iter().any(|e| e == ext))
    }

    /// Template names the loader offers, filtered by extension and sorted.
    pub fn discover(&self) -> LayrResult<Vec<String>> {
        let mut names: Vec<String> = self
            .loader
            .list()?
            .into_iter()
            .filter(|name| self.matches_extension(name))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Resolve every template and publish the results.
    ///
    /// Does nothing if already loaded. The new table replaces the published
    /// one only once every template has resolved; on failure the published
    /// table is left as it was.
    #[instrument(skip_all)]
    pub fn load_all(&mut self) -> LayrResult<()> {
        if self.loaded {
            debug!("Templates already loaded");
            return Ok(());
        }

        let names = self.discover()?;
        info!(count = names.len(), "Loading templates");

        let ctx = ResolveContext {
            loader: self.loader.as_ref(),
            functions: &self.functions,
        };
        let mut table = BTreeMap::new();
        for name in names {
            let resolved = self.resolver.resolve(ctx, &name)?;
            table.insert(name, resolved);
        }

        self.published = table;
        self.loaded = true;
        info!(count = self.published.len(), "Templates loaded");
        Ok(())
    }

    /// Resolve one template without publishing it.
    pub fn resolve(&mut self, name: &str) -> LayrResult<Arc<ResolvedTemplate>> {
        let ctx = ResolveContext {
            loader: self.loader.as_ref(),
            functions: &self.functions,
        };
        self.resolver.resolve(ctx, name)
    }

    /// Register more functions, then rebuild everything.
    ///
    /// Templates that failed to parse for lack of a function resolve after
    /// this call.
    pub fn add_functions(&mut self, functions: FuncMap) -> LayrResult<()> {
        self.functions.merge(functions)?;
        self.reload()
    }

    /// Drop every cache and the published table.
    pub fn reset(&mut self) {
        self.resolver.clear();
        self.published.clear();
        self.loaded = false;
        debug!("Template caches cleared");
    }

    /// Discard both caches and load again. Until that succeeds the previous
    /// table keeps serving `lookup` and `render`.
    pub fn reload(&mut self) -> LayrResult<()> {
        self.resolver.clear();
        self.loaded = false;
        self.load_all()
    }

    /// Published template by name.
    pub fn lookup(&self, name: &str) -> LayrResult<&Arc<ResolvedTemplate>> {
        self.published.get(name).ok_or_else(|| {
            let reason = if self.loaded {
                "not among the loaded templates"
            } else {
                "templates have not been loaded"
            };
            LayrError::not_found(name, reason)
        })
    }

    /// Published names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.published.keys().map(String::as_str)
    }

    pub fn render<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> LayrResult<String> {
        let mut buf = Vec::new();
        self.render_to(&mut buf, name, data)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn render_to<W: Write, T: Serialize + ?Sized>(
        &self,
        out: &mut W,
        name: &str,
        data: &T,
    ) -> LayrResult<()> {
        let resolved = self.lookup(name)?;
        let data = serde_json::to_value(data).map_err(|e| LayrError::Runtime {
            name: name.to_string(),
            message: format!("data is not serializable: {e}"),
        })?;
        resolved
            .template()
            .execute(out, &data, self.functions.as_func_map(), self.escape)
            .map_err(|e| LayrError::Runtime {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("extensions", &self.extensions)
            .field("functions", &self.functions)
            .field("escape", &self.escape)
            .field("loaded", &self.loaded)
            .field("published", &self.published.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
