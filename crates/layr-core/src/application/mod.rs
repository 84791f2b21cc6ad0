//! Application layer for Layr.
//!
//! - **Services**: the scanner, include processor, resolver and engine
//! - **Ports**: traits the engine needs from the outside world

pub mod ports;
pub mod services;

pub use ports::TemplateLoader;
pub use services::{
    DirectiveScanner, Engine, EngineBuilder, IncludeExpansion, IncludeProcessor,
    InheritanceResolver,
};
