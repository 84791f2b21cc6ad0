//! Parsed template trees.
//!
//! Every action-bearing node carries the byte span of its opening action
//! (`{{ ... }}` including delimiters) so callers can locate and rewrite
//! directives in the original source.

use std::fmt;

use serde_json::Number;

use crate::lexer::Span;

/// An ordered list of nodes: the body of a template, branch or definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// True when the tree holds nothing but whitespace text.
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| match node {
            Node::Text(text) => text.trim().is_empty(),
            _ => false,
        })
    }

    /// Depth-first visit of every node, descending into branch bodies.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        for node in &self.nodes {
            visit(node);
            if let Node::If(branch) | Node::Range(branch) | Node::With(branch) = node {
                branch.list.walk(visit);
                if let Some(else_list) = &branch.else_list {
                    else_list.walk(visit);
                }
            }
        }
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    /// `{{pipeline}}`
    Action { span: Span, pipe: Pipeline },
    If(Branch),
    Range(Branch),
    With(Branch),
    /// `{{template "name" pipeline}}`; also produced by `block`.
    Template {
        span: Span,
        name: String,
        pipe: Option<Pipeline>,
    },
}

/// Shared shape of `if`, `range` and `with`.
///
/// `else if` / `else with` chains are stored as a single nested branch
/// inside `else_list`.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub span: Span,
    pub pipe: Pipeline,
    pub list: Tree,
    pub else_list: Option<Tree>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    /// Variables declared with `:=`, at most two (`$i, $v := ...`).
    pub decl: Vec<String>,
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Dot,
    Nil,
    Bool(bool),
    Number(Number),
    Str(String),
    Field(Vec<String>),
    Variable { name: String, fields: Vec<String> },
    Function(String),
    Pipeline(Box<Pipeline>),
}

impl Node {
    /// Span of the opening action, `None` for text.
    pub fn span(&self) -> Option<&Span> {
        match self {
            Node::Text(_) => None,
            Node::Action { span, .. } | Node::Template { span, .. } => Some(span),
            Node::If(b) | Node::Range(b) | Node::With(b) => Some(&b.span),
        }
    }
}

impl Pipeline {
    /// Name of the function a single-command pipeline starts with.
    pub fn head_function(&self) -> Option<&str> {
        match self.cmds.as_slice() {
            [cmd] => match cmd.args.first() {
                Some(Arg::Function(name)) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

// ── Display, Go String() style ───────────────────────────────────────────

fn write_branch(f: &mut fmt::Formatter<'_>, keyword: &str, b: &Branch) -> fmt::Result {
    write!(f, "{{{{{keyword} {}}}}}{}", b.pipe, b.list)?;
    if let Some(else_list) = &b.else_list {
        write!(f, "{{{{else}}}}{else_list}")?;
    }
    write!(f, "{{{{end}}}}")
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => write!(f, "{text}"),
            Node::Action { pipe, .. } => write!(f, "{{{{{pipe}}}}}"),
            Node::If(b) => write_branch(f, "if", b),
            Node::Range(b) => write_branch(f, "range", b),
            Node::With(b) => write_branch(f, "with", b),
            Node::Template { name, pipe, .. } => match pipe {
                Some(pipe) => write!(f, "{{{{template {name:?} {pipe}}}}}"),
                None => write!(f, "{{{{template {name:?}}}}}"),
            },
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.decl.is_empty() {
            let vars: Vec<String> = self.decl.iter().map(|v| format!("${v}")).collect();
            write!(f, "{} := ", vars.join(", "))?;
        }
        for (i, cmd) in self.cmds.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            for (j, arg) in cmd.args.iter().enumerate() {
                if j > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{arg}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Dot => write!(f, "."),
            Arg::Nil => write!(f, "nil"),
            Arg::Bool(b) => write!(f, "{b}"),
            Arg::Number(n) => write!(f, "{n}"),
            Arg::Str(s) => write!(f, "{s:?}"),
            Arg::Field(path) => write!(f, ".{}", path.join(".")),
            Arg::Variable { name, fields } => {
                write!(f, "${name}")?;
                for field in fields {
                    write!(f, ".{field}")?;
                }
                Ok(())
            }
            Arg::Function(name) => write!(f, "{name}"),
            Arg::Pipeline(pipe) => write!(f, "({pipe})"),
        }
    }
}
