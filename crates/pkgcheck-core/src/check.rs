//! The check pipeline: assemble the package around a target file, then run
//! the type checker with the import cache as its import backend.

use crate::assemble::{assemble, Assembly};
use crate::build_env::BuildEnv;
use crate::cache::{ImportCache, Importer, PackageResolver};
use crate::diagnostics::{Diagnostic, DiagnosticCollector};
use crate::discovery::PackageLister;
use crate::errors::CheckError;
use crate::syntax::{SourceFile, SourceParser, DEFAULT_SYNTAX_ERROR_LIMIT};
use crate::typecheck::{CheckOptions, TypeChecker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// The file to check and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckTarget {
    pub path: PathBuf,
    /// Unsaved contents of the file. `None` or empty means read from disk
    pub source: Option<Vec<u8>>,
    pub include_tests: bool,
    pub all_errors: bool,
}

impl CheckTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<Vec<u8>>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn include_tests(mut self, include_tests: bool) -> Self {
        self.include_tests = include_tests;
        self
    }

    pub fn all_errors(mut self, all_errors: bool) -> Self {
        self.all_errors = all_errors;
        self
    }

    /// The in-memory buffer, if it is non-empty.
    pub fn buffer(&self) -> Option<&[u8]> {
        self.source.as_deref().filter(|source| !source.is_empty())
    }

    /// Directory holding the target's package.
    pub fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

/// Collaborators and limits for one or more checks.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub parser: &'a dyn SourceParser,
    pub checker: &'a dyn TypeChecker,
    pub lister: &'a dyn PackageLister,
    pub resolver: &'a dyn PackageResolver,
    pub cache: &'a ImportCache,
    /// Type errors kept per check when not in all-errors mode
    pub error_limit: usize,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        parser: &'a dyn SourceParser,
        checker: &'a dyn TypeChecker,
        lister: &'a dyn PackageLister,
        resolver: &'a dyn PackageResolver,
        cache: &'a ImportCache,
    ) -> Self {
        Self {
            parser,
            checker,
            lister,
            resolver,
            cache,
            error_limit: DEFAULT_SYNTAX_ERROR_LIMIT,
        }
    }

    pub fn with_error_limit(mut self, error_limit: usize) -> Self {
        self.error_limit = error_limit;
        self
    }
}

/// Check `target` within its package.
///
/// Returns the diagnostics in the order they were produced. Syntax errors in
/// any file of the package end the check before type checking.
pub fn check(
    ctx: &CheckContext<'_>,
    env: &BuildEnv,
    target: &CheckTarget,
) -> Result<Vec<Diagnostic>, CheckError> {
    let package = match assemble(ctx, env, target)? {
        Assembly::Diagnostics(diagnostics) => {
            debug!(
                file = %target.path.display(),
                count = diagnostics.len(),
                "package has syntax errors"
            );
            return Ok(diagnostics);
        }
        Assembly::Files(package) => package,
    };

    let importer = ctx.cache.importer(env, ctx.resolver);
    let options = CheckOptions {
        fake_import_c: true,
    };
    let limit = (!target.all_errors).then_some(ctx.error_limit);

    let diagnostics = check_package(
        ctx.checker,
        &package.name,
        &package.files,
        &importer,
        &options,
        limit,
    )?;

    info!(
        file = %target.path.display(),
        files = package.files.len(),
        diagnostics = diagnostics.len(),
        "checked package {}",
        package.name
    );
    Ok(diagnostics)
}

/// Type check `files` as package `package`.
///
/// With `error_limit` set, checking stops once that many diagnostics have been
/// collected and the partial list is returned. `None` collects everything.
pub fn check_package(
    checker: &dyn TypeChecker,
    package: &str,
    files: &[Arc<SourceFile>],
    importer: &dyn Importer,
    options: &CheckOptions,
    error_limit: Option<usize>,
) -> Result<Vec<Diagnostic>, CheckError> {
    let mut collector = match error_limit {
        Some(limit) => DiagnosticCollector::bounded(limit),
        None => DiagnosticCollector::unbounded(),
    };

    checker.check(package, files, importer, options, &mut |error| {
        collector.report(&error.position, error.message)
    })?;

    if collector.is_truncated() {
        debug!(package, limit = ?error_limit, "error limit reached, remaining errors dropped");
    }
    Ok(collector.into_diagnostics())
}
