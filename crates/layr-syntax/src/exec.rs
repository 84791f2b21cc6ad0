//! Tree-walking executor.

use std::io::Write;

use serde_json::{Number, Value};

use crate::ast::{Arg, Branch, Command, Node, Pipeline, Tree};
use crate::error::ExecError;
use crate::funcs::{builtin, FuncMap};
use crate::template::{Escape, Template};
use crate::value::{escape_html, kind, to_text, truthy};

/// Maximum `{{template}}` nesting before execution is aborted.
pub const MAX_DEPTH: usize = 1000;

pub(crate) struct State<'a> {
    template: &'a Template,
    funcs: &'a FuncMap,
    escape: Escape,
    out: &'a mut dyn Write,
    /// `(name, value)` pairs, innermost last. `$` has the empty name.
    vars: Vec<(String, Value)>,
    depth: usize,
}

impl<'a> State<'a> {
    pub(crate) fn new(
        template: &'a Template,
        funcs: &'a FuncMap,
        escape: Escape,
        out: &'a mut dyn Write,
        data: &Value,
    ) -> Self {
        Self {
            template,
            funcs,
            escape,
            out,
            vars: vec![(String::new(), data.clone())],
            depth: 0,
        }
    }

    pub(crate) fn walk(&mut self, dot: &Value, tree: &Tree) -> Result<(), ExecError> {
        for node in &tree.nodes {
            match node {
                Node::Text(text) => self.out.write_all(text.as_bytes())?,
                Node::Action { pipe, .. } => {
                    let value = self.eval_pipeline(dot, pipe)?;
                    if pipe.decl.is_empty() {
                        self.print(&value)?;
                    } else {
                        self.declare(&pipe.decl, value);
                    }
                }
                Node::If(branch) => self.walk_if(dot, branch)?,
                Node::With(branch) => self.walk_with(dot, branch)?,
                Node::Range(branch) => self.walk_range(dot, branch)?,
                Node::Template { name, pipe, .. } => {
                    let next_dot = match pipe {
                        Some(pipe) => self.eval_pipeline(dot, pipe)?,
                        None => Value::Null,
                    };
                    self.call_template(name, &next_dot)?;
                }
            }
        }
        Ok(())
    }

    fn print(&mut self, value: &Value) -> Result<(), ExecError> {
        let text = match value {
            Value::Null => return Ok(()),
            other => to_text(other),
        };
        let text = match self.escape {
            Escape::Html => escape_html(&text),
            Escape::None => text,
        };
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }

    fn declare(&mut self, names: &[String], value: Value) {
        if let Some(name) = names.first() {
            self.vars.push((name.clone(), value));
        }
    }

    fn walk_if(&mut self, dot: &Value, branch: &Branch) -> Result<(), ExecError> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipe)?;
        let cond = truthy(&value);
        self.declare(&branch.pipe.decl, value);
        let result = if cond {
            self.walk(dot, &branch.list)
        } else if let Some(else_list) = &branch.else_list {
            self.walk(dot, else_list)
        } else {
            Ok(())
        };
        self.vars.truncate(mark);
        result
    }

    fn walk_with(&mut self, dot: &Value, branch: &Branch) -> Result<(), ExecError> {
        let mark = self.vars.len();
        let value = self.eval_pipeline(dot, &branch.pipe)?;
        self.declare(&branch.pipe.decl, value.clone());
        let result = if truthy(&value) {
            self.walk(&value, &branch.list)
        } else if let Some(else_list) = &branch.else_list {
            self.walk(dot, else_list)
        } else {
            Ok(())
        };
        self.vars.truncate(mark);
        result
    }

    fn walk_range(&mut self, dot: &Value, branch: &Branch) -> Result<(), ExecError> {
        let value = self.eval_pipeline(dot, &branch.pipe)?;
        let items: Vec<(Value, Value)> = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::Number(Number::from(i)), v))
                .collect(),
            Value::Object(map) => map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
            Value::Number(ref n) if n.as_u64().is_some() => {
                let count = n.as_u64().unwrap_or_default();
                (0..count)
                    .map(|i| (Value::Number(Number::from(i)), Value::Number(Number::from(i))))
                    .collect()
            }
            other => {
                return Err(ExecError::Invalid(format!(
                    "range can't iterate over {}",
                    to_text(&other)
                )));
            }
        };

        if items.is_empty() {
            if let Some(else_list) = &branch.else_list {
                return self.walk(dot, else_list);
            }
            return Ok(());
        }

        for (key, elem) in items {
            let mark = self.vars.len();
            match branch.pipe.decl.as_slice() {
                [] => {}
                [elem_var] => self.vars.push((elem_var.clone(), elem.clone())),
                [key_var, elem_var, ..] => {
                    self.vars.push((key_var.clone(), key));
                    self.vars.push((elem_var.clone(), elem.clone()));
                }
            }
            let result = self.walk(&elem, &branch.list);
            self.vars.truncate(mark);
            result?;
        }
        Ok(())
    }

    fn call_template(&mut self, name: &str, dot: &Value) -> Result<(), ExecError> {
        let template = self.template;
        let tree = template
            .lookup(name)
            .ok_or_else(|| ExecError::UndefinedTemplate { name: name.to_string() })?;
        if self.depth >= MAX_DEPTH {
            return Err(ExecError::DepthExceeded {
                name: name.to_string(),
                depth: MAX_DEPTH,
            });
        }

        self.depth += 1;
        let outer = std::mem::replace(&mut self.vars, vec![(String::new(), dot.clone())]);
        let result = self.walk(dot, tree);
        self.vars = outer;
        self.depth -= 1;
        result
    }

    fn eval_pipeline(&mut self, dot: &Value, pipe: &Pipeline) -> Result<Value, ExecError> {
        let mut last = None;
        for cmd in &pipe.cmds {
            last = Some(self.eval_command(dot, cmd, last.take())?);
        }
        Ok(last.unwrap_or(Value::Null))
    }

    fn eval_command(&mut self, dot: &Value, cmd: &Command, piped: Option<Value>) -> Result<Value, ExecError> {
        let Some((first, rest)) = cmd.args.split_first() else {
            return Err(ExecError::Invalid("empty command".to_string()));
        };
        match first {
            Arg::Function(name) => {
                let mut args = Vec::with_capacity(rest.len() + 1);
                for arg in rest {
                    args.push(self.eval_arg(dot, arg)?);
                }
                args.extend(piped);
                self.call(name, &args)
            }
            other => {
                if piped.is_some() {
                    return Err(ExecError::Invalid(format!(
                        "can't give argument to non-function {other}"
                    )));
                }
                self.eval_arg(dot, other)
            }
        }
    }

    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExecError> {
        let result = if let Some(func) = self.funcs.get(name) {
            func(args)
        } else if let Some(func) = builtin(name) {
            func(args)
        } else {
            return Err(ExecError::Invalid(format!("function {name:?} not defined")));
        };
        result.map_err(|message| ExecError::Function {
            name: name.to_string(),
            message,
        })
    }

    fn eval_arg(&mut self, dot: &Value, arg: &Arg) -> Result<Value, ExecError> {
        match arg {
            Arg::Dot => Ok(dot.clone()),
            Arg::Nil => Ok(Value::Null),
            Arg::Bool(b) => Ok(Value::Bool(*b)),
            Arg::Number(n) => Ok(Value::Number(n.clone())),
            Arg::Str(s) => Ok(Value::String(s.clone())),
            Arg::Field(path) => field_chain(dot, path),
            Arg::Variable { name, fields } => {
                let value = self
                    .vars
                    .iter()
                    .rev()
                    .find(|(var, _)| var == name)
                    .map(|(_, value)| value)
                    .ok_or_else(|| ExecError::Invalid(format!("undefined variable \"${name}\"")))?;
                field_chain(value, fields)
            }
            Arg::Function(name) => self.call(name, &[]),
            Arg::Pipeline(pipe) => self.eval_pipeline(dot, pipe),
        }
    }
}

fn field_chain(start: &Value, path: &[String]) -> Result<Value, ExecError> {
    let mut current = start;
    for field in path {
        current = match current {
            Value::Object(map) => match map.get(field) {
                Some(value) => value,
                None => return Ok(Value::Null),
            },
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(ExecError::Field {
                    field: field.clone(),
                    kind: kind(other),
                });
            }
        };
    }
    Ok(current.clone())
}
