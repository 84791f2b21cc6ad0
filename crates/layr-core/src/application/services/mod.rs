//! Application services.
//!
//! Data flows scanner → include processor → resolver, driven by the engine:
//!
//! ```text
//!   Engine::load_all
//!     └─ InheritanceResolver::resolve(name)
//!          ├─ TemplateLoader::read
//!          ├─ DirectiveScanner::scan         (strip extend, record includes)
//!          ├─ IncludeProcessor::expand       (splice fragments, split blocks)
//!          └─ resolve(parent) → fork → merge (leaf wins)
//! ```

mod engine;
mod includes;
mod resolver;
mod scanner;

pub use engine::{DEFAULT_EXTENSION, Engine, EngineBuilder};
pub use includes::{IncludeExpansion, IncludeProcessor, ResolveContext};
pub use resolver::InheritanceResolver;
pub use scanner::DirectiveScanner;
