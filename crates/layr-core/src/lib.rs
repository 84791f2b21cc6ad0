//! Layr Core - layout inheritance and includes for `{{ }}` templates
//!
//! This crate turns a set of templates that `extend` one another, override
//! named `block`s and `include` fragments into render-ready templates.
//!
//! ## Layout
//!
//! * [`domain`] holds plain data: sources, parsed trees, the function table
//!   and the colouring used for cycle detection.
//! * [`application::ports`] declares [`TemplateLoader`](application::ports::TemplateLoader),
//!   the only way the engine reaches template text. `layr-adapters` implements it.
//! * [`application::services`] does the work, one stage per service:
//!
//! ```text
//! loader.read ─► DirectiveScanner ─► IncludeProcessor ─► InheritanceResolver ─► Engine
//!                (extend, includes)   (splice, carry)     (root to leaf merge)   (publish, render)
//! ```
//!
//! Parsing and execution are delegated to `layr-syntax`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use layr_core::prelude::*;
//! # fn demo(loader: impl TemplateLoader + 'static) -> LayrResult<()> {
//! let mut engine = Engine::new(loader);
//! engine.load_all()?;
//! let html = engine.render("pages/home.html", &serde_json::json!({"Title": "Home"}))?;
//! # Ok(())
//! # }
//! ```

pub mod application;
pub mod domain;
pub mod error;

pub mod prelude {
    pub use crate::application::{Engine, EngineBuilder, ports::TemplateLoader};
    pub use crate::domain::{FunctionTable, ResolvedTemplate, TemplateSource, TemplateTree};
    pub use crate::error::{CycleKind, ErrorCategory, LayrError, LayrResult};
    pub use layr_syntax::{Escape, FuncMap};
}
