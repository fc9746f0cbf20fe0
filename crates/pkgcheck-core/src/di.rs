use crate::build_env::BuildEnv;
use crate::cache::{DirResolver, ImportCache, PackageResolver};
use crate::check::{check, CheckContext, CheckTarget};
use crate::config::{CheckerConfig, ImportCacheOptions};
use crate::diagnostics::Diagnostic;
use crate::discovery::{DirLister, PackageLister};
use crate::errors::CheckError;
use crate::syntax::{MiniParser, SourceParser};
use crate::typecheck::{MiniChecker, TypeChecker};
use std::path::PathBuf;
use std::sync::Arc;

/// Dependency injection container
/// Owns the collaborators and the long-lived import cache shared by every check
pub struct Container {
    config: Arc<CheckerConfig>,
    parser: Arc<dyn SourceParser>,
    checker: Arc<dyn TypeChecker>,
    lister: Arc<dyn PackageLister>,
    resolver: Arc<dyn PackageResolver>,
    cache: ImportCache,
}

impl Container {
    /// Create a new container with the built-in Mini collaborators
    pub fn new(config: CheckerConfig) -> Self {
        let parser: Arc<dyn SourceParser> = Arc::new(MiniParser::new());
        let lister: Arc<dyn PackageLister> = Arc::new(DirLister::new());
        let resolver = Arc::new(DirResolver::new(lister.clone(), parser.clone()));

        Self::with_dependencies(
            config,
            parser,
            Arc::new(MiniChecker::new()),
            lister,
            resolver,
        )
    }

    /// Create a container with custom dependencies (for testing)
    pub fn with_dependencies(
        config: CheckerConfig,
        parser: Arc<dyn SourceParser>,
        checker: Arc<dyn TypeChecker>,
        lister: Arc<dyn PackageLister>,
        resolver: Arc<dyn PackageResolver>,
    ) -> Self {
        let cache = build_cache(&config.import_cache);

        Container {
            config: Arc::new(config),
            parser,
            checker,
            lister,
            resolver,
            cache,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Arc<CheckerConfig> {
        &self.config
    }

    /// Get the import cache
    pub fn cache(&self) -> &ImportCache {
        &self.cache
    }

    pub fn resolver(&self) -> &Arc<dyn PackageResolver> {
        &self.resolver
    }

    /// Borrow the collaborators for a check
    pub fn context(&self) -> CheckContext<'_> {
        CheckContext::new(
            self.parser.as_ref(),
            self.checker.as_ref(),
            self.lister.as_ref(),
            self.resolver.as_ref(),
            &self.cache,
        )
        .with_error_limit(self.config.error_limit)
    }

    /// A target for `path` using the configured test and error modes
    pub fn target(&self, path: impl Into<PathBuf>) -> CheckTarget {
        CheckTarget::new(path)
            .include_tests(self.config.include_tests)
            .all_errors(self.config.all_errors)
    }

    /// Check a target in the configured build environment
    pub fn check(&self, target: &CheckTarget) -> Result<Vec<Diagnostic>, CheckError> {
        self.check_with_env(&self.config.build, target)
    }

    /// Check a target in another build environment; imports cached for
    /// other environments are not shared with it
    pub fn check_with_env(
        &self,
        env: &BuildEnv,
        target: &CheckTarget,
    ) -> Result<Vec<Diagnostic>, CheckError> {
        check(&self.context(), env, target)
    }
}

fn build_cache(options: &ImportCacheOptions) -> ImportCache {
    if options.enabled {
        ImportCache::new(options.capacity)
    } else {
        ImportCache::disabled()
    }
}
