//! Package file discovery: which files in a directory make up its package.

use crate::build_env::BuildEnv;
use crate::syntax::{read_header, SOURCE_EXTENSION};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Pseudo-import marking a file as an interop file.
pub const INTEROP_IMPORT: &str = "C";

const TEST_SUFFIX: &str = "_test";

#[derive(Debug, Error)]
pub enum ListError {
    /// Nothing buildable in the directory. Recoverable: callers treat it as
    /// an empty package.
    #[error("no buildable source files in {}", .dir.display())]
    NoPackage { dir: PathBuf },

    #[error("found packages {} in {}", .names.join(", "), .dir.display())]
    MultiplePackages { dir: PathBuf, names: Vec<String> },

    #[error("cannot list {}: {source}", .dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ListError {
    pub fn is_no_package(&self) -> bool {
        matches!(self, ListError::NoPackage { .. })
    }
}

/// File names (not paths) of one package directory, grouped by role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageListing {
    pub dir: PathBuf,
    pub name: String,
    pub files: Vec<String>,
    pub interop_files: Vec<String>,
    /// Tests declared in the package itself
    pub test_files: Vec<String>,
    /// Tests declared in the `<name>_test` package; never part of a check
    pub external_test_files: Vec<String>,
    /// Sources excluded by build constraints
    pub ignored_files: Vec<String>,
}

impl PackageListing {
    /// Paths of the files that take part in a build of the package.
    pub fn source_paths(&self, include_tests: bool) -> Vec<PathBuf> {
        let tests: &[String] = if include_tests { &self.test_files } else { &[] };
        self.files
            .iter()
            .chain(&self.interop_files)
            .chain(tests)
            .map(|name| self.dir.join(name))
            .collect()
    }
}

/// Enumerates the files belonging to the package in a directory.
pub trait PackageLister: Send + Sync {
    fn list_package(&self, env: &BuildEnv, dir: &Path) -> Result<PackageListing, ListError>;
}

/// Sibling file paths of the package in `dir`: regular files, interop files,
/// then in-package test files when `include_tests` is set.
pub fn discover(
    lister: &dyn PackageLister,
    env: &BuildEnv,
    dir: &Path,
    include_tests: bool,
) -> Result<Vec<PathBuf>, ListError> {
    let listing = lister.list_package(env, dir)?;
    let paths = listing.source_paths(include_tests);

    debug!(
        dir = %dir.display(),
        package = %listing.name,
        files = paths.len(),
        "discovered package files"
    );

    Ok(paths)
}

/// Lists `.mini` files from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirLister;

impl DirLister {
    pub fn new() -> Self {
        Self
    }
}

impl PackageLister for DirLister {
    fn list_package(&self, env: &BuildEnv, dir: &Path) -> Result<PackageListing, ListError> {
        let io_err = |source| ListError::Io {
            dir: dir.to_path_buf(),
            source,
        };

        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.file_type().map_err(io_err)?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || name.starts_with('_') {
                continue;
            }
            if Path::new(&name).extension() != Some(OsStr::new(SOURCE_EXTENSION)) {
                continue;
            }
            names.push(name);
        }
        names.sort();

        let mut listing = PackageListing {
            dir: dir.to_path_buf(),
            ..PackageListing::default()
        };
        let mut package_names: Vec<String> = Vec::new();

        for name in names {
            let stem = name
                .strip_suffix(SOURCE_EXTENSION)
                .and_then(|s| s.strip_suffix('.'))
                .unwrap_or(&name);
            if !env.matches_file_name(stem) {
                listing.ignored_files.push(name);
                continue;
            }

            let source = std::fs::read(dir.join(&name)).map_err(io_err)?;
            let header = read_header(&String::from_utf8_lossy(&source));

            if !header
                .constraints
                .iter()
                .all(|line| env.matches_constraint(line))
            {
                listing.ignored_files.push(name);
                continue;
            }

            let is_test = stem.ends_with(TEST_SUFFIX);
            let is_interop = header.imports_path(INTEROP_IMPORT);
            if is_interop && !env.interop {
                listing.ignored_files.push(name);
                continue;
            }

            match header.package {
                Some(pkg) if is_test && pkg.ends_with(TEST_SUFFIX) => {
                    listing.external_test_files.push(name);
                }
                Some(pkg) => {
                    package_names.push(pkg);
                    if is_test {
                        listing.test_files.push(name);
                    } else if is_interop {
                        listing.interop_files.push(name);
                    } else {
                        listing.files.push(name);
                    }
                }
                // unreadable clause: keep the file so its parse reports the error
                None if is_test => listing.test_files.push(name),
                None => listing.files.push(name),
            }
        }

        if listing.files.is_empty()
            && listing.interop_files.is_empty()
            && listing.test_files.is_empty()
            && listing.external_test_files.is_empty()
        {
            return Err(ListError::NoPackage {
                dir: dir.to_path_buf(),
            });
        }

        let mut distinct: Vec<String> = Vec::new();
        for pkg in package_names {
            if !distinct.contains(&pkg) {
                distinct.push(pkg);
            }
        }
        match distinct.len() {
            // only external tests or unreadable clauses: the name stays unknown
            0 => {}
            1 => listing.name = distinct.remove(0),
            _ => {
                return Err(ListError::MultiplePackages {
                    dir: dir.to_path_buf(),
                    names: distinct,
                })
            }
        }

        Ok(listing)
    }
}
