//! # layr-syntax
//!
//! A small `{{ }}` template runtime over `serde_json::Value` data, in the
//! style of Go's `text/template`:
//!
//! ```text
//!   source ──lexer──▶ tokens ──parser──▶ Parsed { root, definitions }
//!                                              │
//!                          Template::new + add_tree / merge
//!                                              │
//!                          Template::execute(out, data, funcs)
//! ```
//!
//! The crate knows nothing about layouts or includes. It parses, merges
//! named trees and executes; composition lives in `layr-core`.

pub mod ast;
pub mod error;
pub mod exec;
pub mod funcs;
pub mod lexer;
pub mod parser;
pub mod template;
pub mod value;

pub use ast::{Arg, Branch, Command, Node, Pipeline, Tree};
pub use error::{ExecError, NameConflict, SyntaxError};
pub use exec::MAX_DEPTH;
pub use funcs::{is_builtin, FuncMap, Function};
pub use lexer::{Span, trim_extent};
pub use parser::{parse, Definition, Parsed};
pub use template::{Escape, Namespace, Template};
