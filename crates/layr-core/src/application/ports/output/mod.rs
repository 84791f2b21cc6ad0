//! Driven (output) ports - implemented by infrastructure.
//!
//! The `layr-adapters` crate provides implementations.

use crate::error::LayrResult;

/// Port for reading template sources by logical name.
///
/// Logical names are `/`-separated paths relative to the template root,
/// e.g. `layouts/base.html`.
///
/// Implemented by:
/// - `layr_adapters::loader::FsLoader` (directory tree)
/// - `layr_adapters::loader::MemoryLoader` (embedded sources, testing)
#[cfg_attr(test, mockall::automock)]
pub trait TemplateLoader: Send + Sync {
    /// Read the source of `name`. Missing or unreadable sources are
    /// `LayrError::NotFound`.
    fn read(&self, name: &str) -> LayrResult<String>;

    /// Every logical name the loader can serve, in any order.
    fn list(&self) -> LayrResult<Vec<String>>;
}
