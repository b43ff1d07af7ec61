//! Per-operation cache directories.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A scoped staging directory for one resolve-and-use cycle.
///
/// The directory is created on construction and removed when the value is
/// dropped, on success and failure alike. It is never shared: each manifest
/// entry gets its own.
#[derive(Debug)]
pub struct CacheDir {
    dir: TempDir,
}

impl CacheDir {
    /// Create a cache directory under the system temporary directory.
    pub fn new() -> Result<Self> {
        Self::new_in(std::env::temp_dir())
    }

    /// Create a cache directory under `root`, creating `root` if needed.
    pub fn new_in(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        let dir = tempfile::Builder::new()
            .prefix("arx.")
            .tempdir_in(root)
            .map_err(|e| Error::io(root, e))?;
        log::debug!("Created cache directory {}", dir.path().display());
        Ok(Self { dir })
    }

    /// Path of the directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `name` inside the directory.
    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Drop for CacheDir {
    fn drop(&mut self) {
        log::debug!("Removing cache directory {}", self.dir.path().display());
    }
}
