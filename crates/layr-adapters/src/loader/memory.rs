//! In-memory template loader for embedded sources and tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use layr_core::{
    application::ports::TemplateLoader,
    error::{LayrError, LayrResult},
};

/// Templates held in memory.
///
/// Clones share storage, so a test can keep a handle after moving a clone
/// into an engine and inspect how often each template was read.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    inner: Arc<RwLock<MemoryLoaderInner>>,
}

#[derive(Debug, Default)]
struct MemoryLoaderInner {
    files: BTreeMap<String, String>,
    reads: HashMap<String, usize>,
}

fn lock_error() -> LayrError {
    LayrError::Internal {
        message: "template store lock poisoned".into(),
    }
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(name, content);
        self
    }

    /// Add or replace a template.
    pub fn insert(&self, name: impl Into<String>, content: impl Into<String>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.files.insert(name.into(), content.into());
        }
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.inner.write().ok()?.files.remove(name)
    }

    /// How many times `read` has been called for `name`.
    pub fn read_count(&self, name: &str) -> usize {
        self.inner
            .read()
            .map(|inner| inner.reads.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.reads.values().sum())
            .unwrap_or(0)
    }

    pub fn reset_counts(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.reads.clear();
        }
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryLoader
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let loader = Self::new();
        for (name, content) in iter {
            loader.insert(name, content);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn read(&self, name: &str) -> LayrResult<String> {
        let mut inner = self.inner.write().map_err(|_| lock_error())?;
        *inner.reads.entry(name.to_string()).or_default() += 1;
        inner
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| LayrError::not_found(name, "no such template in memory"))
    }

    fn list(&self) -> LayrResult<Vec<String>> {
        let inner = self.inner.read().map_err(|_| lock_error())?;
        Ok(inner.files.keys().cloned().collect())
    }
}
