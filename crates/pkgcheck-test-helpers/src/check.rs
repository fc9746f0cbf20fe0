//! Check helpers for tests
//!
//! Run the production pipeline through the `Container` with minimal setup.

use pkgcheck_core::{CheckError, CheckerConfig, Container, Diagnostic};
use std::path::{Path, PathBuf};

/// Check a file on disk with the default configuration
pub fn check_file(path: &Path) -> Result<Vec<Diagnostic>, CheckError> {
    let container = Container::new(CheckerConfig::default());
    container.check(&container.target(path))
}

/// Check a file with `search_paths` as import roots
pub fn check_file_with_roots(
    path: &Path,
    search_paths: &[PathBuf],
) -> Result<Vec<Diagnostic>, CheckError> {
    let mut config = CheckerConfig::default();
    config.build.search_paths = search_paths.to_vec();
    let container = Container::new(config);
    container.check(&container.target(path))
}

/// Messages of `diagnostics`, in order
pub fn messages(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|d| d.message.as_str()).collect()
}
