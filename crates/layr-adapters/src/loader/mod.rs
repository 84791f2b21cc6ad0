//! Template loader adapters.

mod fs;
mod memory;

pub use fs::FsLoader;
pub use memory::MemoryLoader;
