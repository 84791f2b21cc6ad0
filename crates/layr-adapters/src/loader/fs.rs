//! Directory-tree template loader using `std::fs` and `walkdir`.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use layr_core::{
    application::ports::TemplateLoader,
    error::{LayrError, LayrResult},
};
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// Serves every file under `root`; logical names are root-relative paths
/// with forward slashes.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a logical name to a path under the root. Names that would escape
    /// the root are not found.
    fn path_for(&self, name: &str) -> LayrResult<PathBuf> {
        let relative = Path::new(name);
        let escapes = name.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(LayrError::not_found(name, "name must be a path inside the template root"));
        }
        Ok(self.root.join(relative))
    }
}

impl TemplateLoader for FsLoader {
    fn read(&self, name: &str) -> LayrResult<String> {
        let path = self.path_for(name)?;
        debug!(template = name, path = %path.display(), "Reading template");
        fs::read_to_string(&path).map_err(|e| map_io_error(name, &path, e))
    }

    #[instrument(skip(self), fields(root = %self.root.display()))]
    fn list(&self) -> LayrResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(LayrError::configuration(format!(
                "template root {} is not a directory",
                self.root.display()
            )));
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true).min_depth(1) {
            let entry = entry.map_err(|e| {
                LayrError::configuration(format!("directory walk error: {e}"))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(&self.root).map_err(|_| LayrError::Internal {
                message: format!(
                    "failed to relativise '{}' against '{}'",
                    entry.path().display(),
                    self.root.display()
                ),
            })?;
            names.push(normalize_path(&relative.to_string_lossy()));
        }
        debug!(count = names.len(), "Listed templates");
        Ok(names)
    }
}

fn map_io_error(name: &str, path: &Path, e: io::Error) -> LayrError {
    let reason = match e.kind() {
        io::ErrorKind::NotFound => format!("no such file {}", path.display()),
        _ => format!("failed to read {}: {e}", path.display()),
    };
    LayrError::not_found(name, reason)
}

/// Forward slashes on every platform.
fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}
