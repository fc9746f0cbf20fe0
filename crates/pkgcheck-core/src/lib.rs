pub mod assemble;
pub mod build_env;
pub mod cache;
pub mod check;
pub mod config;
pub mod di;
pub mod diagnostics;
pub mod discovery;
pub mod errors;
pub mod package;
pub mod parallel;
pub mod span;
pub mod syntax;
pub mod typecheck;

pub use assemble::{assemble, Assembly, PackageFiles};
pub use build_env::{BuildEnv, EnvId};
pub use cache::{
    CacheStats, CachedImporter, DirResolver, ImportCache, Importer, PackageResolver, ResolveError,
};
pub use check::{check, check_package, CheckContext, CheckTarget};
pub use config::{CheckerConfig, CliOverrides, ConfigError};
pub use di::Container;
pub use diagnostics::{sort_diagnostics, Diagnostic, DiagnosticCollector, DiagnosticKind};
pub use discovery::{discover, DirLister, ListError, PackageLister, PackageListing};
pub use errors::CheckError;
pub use package::{Package, Symbol, SymbolKind};
pub use parallel::{parse_all, SourceOverrides};
pub use span::{LineIndex, Position, Span};
pub use syntax::{MiniParser, ParseError, ParseMode, SourceFile, SourceParser, SyntaxError};
pub use typecheck::{CheckOptions, CheckerError, MiniChecker, TypeChecker, TypeError};
