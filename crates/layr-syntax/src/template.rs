//! Executable templates: one unnamed root tree plus named trees.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use serde_json::Value;

use crate::ast::Tree;
use crate::error::{ExecError, NameConflict};
use crate::exec::State;
use crate::funcs::FuncMap;

/// Named trees reachable through `{{template}}` and `{{block}}`.
pub type Namespace = BTreeMap<String, Arc<Tree>>;

/// Whether interpolated values are HTML-escaped on output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Escape {
    #[default]
    Html,
    None,
}

/// A root tree and the named trees it can call.
///
/// Trees are shared, so [`Template::fork`] is cheap and never mutates the
/// template it was forked from.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    root: Arc<Tree>,
    trees: Namespace,
}

impl Template {
    pub fn new(name: impl Into<String>, root: Arc<Tree>) -> Self {
        Self {
            name: name.into(),
            root,
            trees: Namespace::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Arc<Tree> {
        &self.root
    }

    /// Copy of this template under a new name, sharing every tree.
    pub fn fork(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Arc::clone(&self.root),
            trees: self.trees.clone(),
        }
    }

    /// Add or replace a named tree.
    ///
    /// An empty tree does not replace a non-empty one, so an empty
    /// `{{define}}` never erases a body it collides with.
    pub fn add_tree(&mut self, name: impl Into<String>, tree: Arc<Tree>) -> Result<(), NameConflict> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(NameConflict {
                name,
                reason: "template name must not be empty".to_string(),
            });
        }
        let keep_existing =
            tree.is_empty() && self.trees.get(&name).is_some_and(|existing| !existing.is_empty());
        if !keep_existing {
            self.trees.insert(name, tree);
        }
        Ok(())
    }

    /// Add every entry of `namespace`, in key order.
    pub fn merge(&mut self, namespace: &Namespace) -> Result<(), NameConflict> {
        for (name, tree) in namespace {
            self.add_tree(name.clone(), Arc::clone(tree))?;
        }
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Arc<Tree>> {
        self.trees.get(name)
    }

    pub fn trees(&self) -> &Namespace {
        &self.trees
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    /// Execute the root tree with `data` as dot, writing to `out`.
    pub fn execute(
        &self,
        out: &mut dyn Write,
        data: &Value,
        funcs: &FuncMap,
        escape: Escape,
    ) -> Result<(), ExecError> {
        let mut state = State::new(self, funcs, escape, out, data);
        state.walk(data, &self.root)
    }

    /// Execute into a string.
    pub fn execute_to_string(&self, data: &Value, funcs: &FuncMap, escape: Escape) -> Result<String, ExecError> {
        let mut buf = Vec::new();
        self.execute(&mut buf, data, funcs, escape)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn template(src: &str) -> Template {
        let parsed = parse("t", src, &FuncMap::new()).unwrap();
        let mut tmpl = Template::new("t", Arc::new(parsed.root.clone()));
        tmpl.merge(&parsed.namespace()).unwrap();
        tmpl
    }

    #[test]
    fn fork_leaves_original_untouched() {
        let base = template(r#"[{{block "body" .}}base{{end}}]"#);
        let mut child = base.fork("child");
        child
            .add_tree("body", Arc::new(parse("c", "child", &FuncMap::new()).unwrap().root))
            .unwrap();

        let data = json!({});
        let funcs = FuncMap::new();
        assert_eq!(base.execute_to_string(&data, &funcs, Escape::Html).unwrap(), "[base]");
        assert_eq!(child.execute_to_string(&data, &funcs, Escape::Html).unwrap(), "[child]");
    }

    #[test]
    fn empty_tree_does_not_replace_body() {
        let mut tmpl = template(r#"{{block "a" .}}keep{{end}}"#);
        tmpl.add_tree("a", Arc::new(Tree::default())).unwrap();
        assert_eq!(tmpl.lookup("a").unwrap().to_string(), "keep");
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut tmpl = template("x");
        let err = tmpl.add_tree("", Arc::new(Tree::default())).unwrap_err();
        assert!(err.reason.contains("empty"));
    }
}
