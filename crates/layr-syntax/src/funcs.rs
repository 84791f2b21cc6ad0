//! Function tables: user-registered functions plus the builtin set.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Number, Value};

use crate::value::{kind, to_text, truthy};

/// A callable exposed to templates.
///
/// Functions receive already-evaluated arguments; with pipelines the
/// previous command's value arrives as the last argument.
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// Name → function map consulted by the parser and executor.
///
/// Entries shadow builtins of the same name.
#[derive(Clone, Default)]
pub struct FuncMap {
    funcs: BTreeMap<String, Function>,
}

impl FuncMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.funcs.insert(name.into(), Arc::new(func));
        self
    }

    pub fn insert_shared(&mut self, name: impl Into<String>, func: Function) -> &mut Self {
        self.funcs.insert(name.into(), func);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.funcs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    /// Merge `other` in; its entries win on collision.
    pub fn extend(&mut self, other: FuncMap) {
        self.funcs.extend(other.funcs);
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }

    /// True if `name` resolves to a user function or a builtin.
    pub fn resolves(&self, name: &str) -> bool {
        self.contains(name) || is_builtin(name)
    }
}

impl fmt::Debug for FuncMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.funcs.keys()).finish()
    }
}

type Builtin = fn(&[Value]) -> Result<Value, String>;

pub(crate) fn builtin(name: &str) -> Option<Builtin> {
    let f: Builtin = match name {
        "and" => and,
        "or" => or,
        "not" => not,
        "eq" => eq,
        "ne" => ne,
        "lt" => |args| compare(args, "lt", |o| o.is_lt()),
        "le" => |args| compare(args, "le", |o| o.is_le()),
        "gt" => |args| compare(args, "gt", |o| o.is_gt()),
        "ge" => |args| compare(args, "ge", |o| o.is_ge()),
        "len" => len,
        "index" => index,
        "print" => |args| Ok(Value::String(sprint(args))),
        _ => return None,
    };
    Some(f)
}

pub fn is_builtin(name: &str) -> bool {
    builtin(name).is_some()
}

fn arity(args: &[Value], name: &str, min: usize) -> Result<(), String> {
    if args.len() < min {
        return Err(format!("wrong number of args for {name}: want at least {min} got {}", args.len()));
    }
    Ok(())
}

fn and(args: &[Value]) -> Result<Value, String> {
    arity(args, "and", 1)?;
    let found = args.iter().find(|v| !truthy(v)).unwrap_or(&args[args.len() - 1]);
    Ok(found.clone())
}

fn or(args: &[Value]) -> Result<Value, String> {
    arity(args, "or", 1)?;
    let found = args.iter().find(|v| truthy(v)).unwrap_or(&args[args.len() - 1]);
    Ok(found.clone())
}

fn not(args: &[Value]) -> Result<Value, String> {
    match args {
        [v] => Ok(Value::Bool(!truthy(v))),
        _ => Err(format!("wrong number of args for not: want 1 got {}", args.len())),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn eq(args: &[Value]) -> Result<Value, String> {
    arity(args, "eq", 2)?;
    let first = &args[0];
    Ok(Value::Bool(args[1..].iter().any(|v| values_equal(first, v))))
}

fn ne(args: &[Value]) -> Result<Value, String> {
    match args {
        [a, b] => Ok(Value::Bool(!values_equal(a, b))),
        _ => Err(format!("wrong number of args for ne: want 2 got {}", args.len())),
    }
}

fn compare(
    args: &[Value],
    name: &str,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, String> {
    let [a, b] = args else {
        return Err(format!("wrong number of args for {name}: want 2 got {}", args.len()));
    };
    let ordering = match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.partial_cmp(&y).ok_or("incomparable numbers")?
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => {
            return Err(format!(
                "incompatible types for comparison: {} and {}",
                kind(a),
                kind(b)
            ));
        }
    };
    Ok(Value::Bool(accept(ordering)))
}

fn len(args: &[Value]) -> Result<Value, String> {
    let [v] = args else {
        return Err(format!("wrong number of args for len: want 1 got {}", args.len()));
    };
    let n = match v {
        Value::String(s) => s.len(),
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::Null => 0,
        other => return Err(format!("len of type {}", kind(other))),
    };
    Ok(Value::Number(Number::from(n)))
}

fn index(args: &[Value]) -> Result<Value, String> {
    arity(args, "index", 1)?;
    let mut current = args[0].clone();
    for key in &args[1..] {
        current = match (&current, key) {
            (Value::Array(items), Value::Number(n)) => {
                let i = n
                    .as_u64()
                    .ok_or_else(|| format!("cannot index array with {n}"))?;
                items
                    .get(i as usize)
                    .cloned()
                    .ok_or_else(|| format!("index out of range: {i}"))?
            }
            (Value::Object(map), Value::String(k)) => map.get(k).cloned().unwrap_or(Value::Null),
            (Value::Null, _) => Value::Null,
            (target, key) => {
                return Err(format!("can't index item of type {} with {}", kind(target), kind(key)));
            }
        };
    }
    Ok(current)
}

/// `fmt.Sprint`: spaces only between operands when neither is a string.
fn sprint(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !args[i - 1].is_string() && !arg.is_string() {
            out.push(' ');
        }
        out.push_str(&to_text(arg));
    }
    out
}
