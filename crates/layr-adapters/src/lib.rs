//! Infrastructure adapters for Layr.
//!
//! This crate implements the ports defined in `layr_core::application::ports`
//! and wires them into a ready-to-use [`Engine`](layr_core::application::Engine).

pub mod config;
pub mod loader;

// Re-export commonly used adapters
pub use config::{EngineConfig, open};
pub use loader::{FsLoader, MemoryLoader};
