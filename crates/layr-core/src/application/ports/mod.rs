//! Application ports (traits) for external dependencies.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: called by the engine, implemented by infrastructure
//!   - `TemplateLoader`: template source access

pub mod output;

pub use output::TemplateLoader;

#[cfg(test)]
pub use output::MockTemplateLoader;
