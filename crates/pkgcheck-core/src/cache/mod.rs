//! Import resolution and the process-wide import cache
//!
//! Resolving an import means listing and parsing another package directory,
//! which dominates the cost of a check. The cache keeps recently resolved
//! packages keyed by build environment and import path so that repeated
//! checks (watch mode, the server loop) pay that cost once.

mod error;
mod importer;
mod resolver;

pub use error::{ResolveError, Result};
pub use importer::{CacheStats, CachedImporter, ImportCache, Importer};
pub use resolver::{DirResolver, PackageResolver};

/// Number of packages kept when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 100;
