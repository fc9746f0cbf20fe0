//! Mock collaborators for testing

use pkgcheck_core::{
    BuildEnv, CheckOptions, CheckerError, Importer, Package, PackageResolver, Position,
    ResolveError, SourceFile, SymbolKind, TypeChecker, TypeError,
};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Resolver that fabricates a package for any path and counts its calls.
///
/// Every package exports `Println(x)`. Paths starting with `missing` fail.
#[derive(Debug, Default)]
pub struct CountingResolver {
    calls: AtomicUsize,
    resolved: Mutex<Vec<String>>,
}

impl CountingResolver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Import paths in the order they were resolved
    pub fn resolved(&self) -> Vec<String> {
        self.resolved.lock().unwrap().clone()
    }
}

impl PackageResolver for CountingResolver {
    fn resolve(&self, _env: &BuildEnv, import_path: &str) -> Result<Package, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.resolved.lock().unwrap().push(import_path.to_string());

        if import_path.starts_with("missing") {
            return Err(ResolveError::NotFound {
                path: import_path.to_string(),
                searched: Vec::new(),
            });
        }
        let name = import_path.rsplit('/').next().unwrap_or(import_path);
        Ok(
            Package::new(import_path, name, PathBuf::from("/mock").join(import_path))
                .with_export("Println", SymbolKind::Func { params: 1 }),
        )
    }
}

/// Checker that reports `count` errors in the first file, one per line,
/// and records how many the sink accepted before asking it to stop.
#[derive(Debug, Default)]
pub struct ScriptedChecker {
    count: usize,
    delivered: AtomicUsize,
}

impl ScriptedChecker {
    pub fn new(count: usize) -> Arc<Self> {
        Arc::new(Self {
            count,
            delivered: AtomicUsize::new(0),
        })
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl TypeChecker for ScriptedChecker {
    fn check(
        &self,
        _package: &str,
        files: &[Arc<SourceFile>],
        _importer: &dyn Importer,
        _options: &CheckOptions,
        report: &mut dyn FnMut(TypeError) -> ControlFlow<()>,
    ) -> Result<(), CheckerError> {
        let filename = files
            .first()
            .map(|file| file.filename())
            .unwrap_or_default();
        for line in 1..=self.count {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            let error = TypeError::new(
                Position::new(filename.clone(), line, 1),
                format!("scripted error {line}"),
            );
            if report(error).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// Checker that always fails.
#[derive(Debug, Default)]
pub struct FailingChecker;

impl TypeChecker for FailingChecker {
    fn check(
        &self,
        package: &str,
        _files: &[Arc<SourceFile>],
        _importer: &dyn Importer,
        _options: &CheckOptions,
        _report: &mut dyn FnMut(TypeError) -> ControlFlow<()>,
    ) -> Result<(), CheckerError> {
        Err(CheckerError::NoFiles {
            package: package.to_string(),
        })
    }
}
