//! Engine bootstrap from a template directory.

use std::path::PathBuf;

use layr_core::{
    application::{Engine, EngineBuilder, services::DEFAULT_EXTENSION},
    error::LayrResult,
    prelude::Escape,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::loader::FsLoader;

/// Settings for a filesystem-backed engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the templates.
    pub root: PathBuf,
    /// Suffixes (without the dot) of files treated as templates.
    pub extensions: Vec<String>,
    /// HTML-escape interpolated values.
    pub escape_html: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("templates"),
            extensions: vec![DEFAULT_EXTENSION.to_string()],
            escape_html: true,
        }
    }
}

impl EngineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Builder with an [`FsLoader`] over `root` and these settings applied.
    pub fn builder(&self) -> EngineBuilder {
        let escape = if self.escape_html { Escape::Html } else { Escape::None };
        Engine::builder()
            .loader(FsLoader::new(&self.root))
            .extensions(&self.extensions)
            .escape(escape)
    }

    /// Build the engine and load every template.
    pub fn open(&self) -> LayrResult<Engine> {
        let mut engine = self.builder().build()?;
        engine.load_all()?;
        info!(root = %self.root.display(), templates = engine.names().count(), "Engine ready");
        Ok(engine)
    }
}

/// Create an engine over `root` with default settings and load it.
pub fn open(root: impl Into<PathBuf>) -> LayrResult<Engine> {
    EngineConfig::new(root).open()
}
