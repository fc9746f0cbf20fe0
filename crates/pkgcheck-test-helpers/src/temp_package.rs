//! Throwaway package directories on disk

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory holding one package. Removed on drop.
pub struct TempPackage {
    dir: TempDir,
}

impl TempPackage {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Add a file (relative paths may include subdirectories)
    pub fn file(self, name: &str, source: &str) -> Self {
        self.write(name, source);
        self
    }

    /// Write or overwrite a file, returning its path
    pub fn write(&self, name: &str, source: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, source).expect("failed to write file");
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TempPackage {
    fn default() -> Self {
        Self::new()
    }
}
