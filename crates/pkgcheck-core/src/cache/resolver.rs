use crate::build_env::BuildEnv;
use crate::discovery::PackageLister;
use crate::package::{is_exported, Package, SymbolKind};
use crate::parallel::{parse_all, SourceOverrides};
use crate::syntax::ast::Decl;
use crate::syntax::{ParseMode, SourceParser};
use std::path::{Component, Path};
use std::sync::Arc;
use tracing::debug;

use super::{ResolveError, Result};

/// Turns an import path into package metadata. This is the slow path the
/// import cache sits in front of.
pub trait PackageResolver: Send + Sync {
    fn resolve(&self, env: &BuildEnv, import_path: &str) -> Result<Package>;
}

/// Resolves imports against the environment's search paths: import path
/// `a/b` is the package in `<root>/a/b` for the first root that has it.
pub struct DirResolver {
    lister: Arc<dyn PackageLister>,
    parser: Arc<dyn SourceParser>,
}

impl DirResolver {
    pub fn new(lister: Arc<dyn PackageLister>, parser: Arc<dyn SourceParser>) -> Self {
        Self { lister, parser }
    }
}

impl PackageResolver for DirResolver {
    fn resolve(&self, env: &BuildEnv, import_path: &str) -> Result<Package> {
        if !is_valid_import_path(import_path) {
            return Err(ResolveError::InvalidPath {
                path: import_path.to_string(),
            });
        }

        let Some(dir) = env
            .search_paths
            .iter()
            .map(|root| root.join(import_path))
            .find(|dir| dir.is_dir())
        else {
            return Err(ResolveError::NotFound {
                path: import_path.to_string(),
                searched: env.search_paths.clone(),
            });
        };

        debug!(import = import_path, dir = %dir.display(), "resolving package");

        let listing = self
            .lister
            .list_package(env, &dir)
            .map_err(|source| ResolveError::Listing {
                path: import_path.to_string(),
                source,
            })?;
        let paths = listing.source_paths(false);

        let files = parse_all(
            self.parser.as_ref(),
            &paths,
            &SourceOverrides::new(),
            ParseMode::default(),
        )
        .map_err(|source| ResolveError::Broken {
            path: import_path.to_string(),
            source,
        })?;

        let mut package = Package::new(import_path, listing.name, dir);
        package.files = paths;
        for file in &files {
            for decl in &file.decls {
                let name = &decl.name().name;
                if !is_exported(name) {
                    continue;
                }
                let kind = match decl {
                    Decl::Func(func) => SymbolKind::Func {
                        params: func.params.len(),
                    },
                    Decl::Var(_) => SymbolKind::Var,
                };
                package = package.with_export(name.clone(), kind);
            }
        }

        Ok(package)
    }
}

/// Import paths are relative, slash separated, and never climb out of a root.
fn is_valid_import_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && !path.contains('\\')
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DirLister;
    use crate::syntax::MiniParser;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> DirResolver {
        DirResolver::new(Arc::new(DirLister), Arc::new(MiniParser))
    }

    fn env_with_root(root: &Path) -> BuildEnv {
        BuildEnv {
            search_paths: vec![root.to_path_buf()],
            ..BuildEnv::default()
        }
    }

    #[test]
    fn test_resolves_exports() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("text/fmt");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("fmt.mini"),
            "package fmt\nfunc Println(x) {}\nfunc helper() {}\nvar Version = 1\n",
        )
        .unwrap();

        let package = resolver()
            .resolve(&env_with_root(root.path()), "text/fmt")
            .unwrap();

        assert_eq!(package.name, "fmt");
        assert_eq!(package.files.len(), 1);
        assert_eq!(
            package.lookup("Println").unwrap().kind,
            SymbolKind::Func { params: 1 }
        );
        assert_eq!(package.lookup("Version").unwrap().kind, SymbolKind::Var);
        assert!(package.lookup("helper").is_none());
    }

    #[test]
    fn test_first_root_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        for (root, export) in [(&first, "First"), (&second, "Second")] {
            let dir = root.path().join("lib");
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("lib.mini"), format!("package lib\nvar {} = 1\n", export))
                .unwrap();
        }
        let env = BuildEnv {
            search_paths: vec![first.path().to_path_buf(), second.path().to_path_buf()],
            ..BuildEnv::default()
        };

        let package = resolver().resolve(&env, "lib").unwrap();
        assert!(package.lookup("First").is_some());
        assert!(package.lookup("Second").is_none());
    }

    #[test]
    fn test_not_found() {
        let root = TempDir::new().unwrap();
        let err = resolver()
            .resolve(&env_with_root(root.path()), "missing/pkg")
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { .. }));
    }

    #[test]
    fn test_broken_dependency() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("bad");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.mini"), "package bad\nfunc F( {\n").unwrap();

        let err = resolver()
            .resolve(&env_with_root(root.path()), "bad")
            .unwrap_err();
        assert!(matches!(err, ResolveError::Broken { .. }));
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let root = TempDir::new().unwrap();
        for path in ["../etc", "/abs", "a/../b", ""] {
            let err = resolver()
                .resolve(&env_with_root(root.path()), path)
                .unwrap_err();
            assert!(
                matches!(err, ResolveError::InvalidPath { .. }),
                "{path} should be invalid"
            );
        }
    }
}
