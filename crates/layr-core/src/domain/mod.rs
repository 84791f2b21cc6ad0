//! Core domain layer for Layr.
//!
//! Pure data and bookkeeping: no I/O happens here. Loading goes through the
//! ports in `crate::application::ports`.

pub mod coloring;
pub mod functions;
pub mod resolved;
pub mod source;

pub use coloring::Coloring;
pub use functions::{FunctionTable, RESERVED};
pub use resolved::ResolvedTemplate;
pub use source::{IncludeDirective, TemplateSource, TemplateTree};
