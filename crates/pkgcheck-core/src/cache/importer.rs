use crate::build_env::{BuildEnv, EnvId};
use crate::package::Package;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use super::{PackageResolver, Result, DEFAULT_CAPACITY};

/// What the type checker uses to look up imported packages.
pub trait Importer {
    fn import(&self, path: &str) -> Result<Arc<Package>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    env: EnvId,
    path: String,
}

#[derive(Debug)]
struct CacheEntry {
    package: Arc<Package>,
    /// Tick of the most recent hit or insert
    last_used: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: FxHashMap<CacheKey, CacheEntry>,
    clock: u64,
    stats: CacheStats,
}

impl CacheState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

/// Counters for tooling and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded LRU store of resolved imports, shared by every check a process
/// runs.
///
/// Entries are keyed by build environment identity and import path, so two
/// environments never see each other's packages. Failed resolutions are not
/// stored. The resolver runs outside the lock; if two checks miss on the same
/// key at once both resolve and the later insert replaces the earlier one.
#[derive(Debug)]
pub struct ImportCache {
    state: Mutex<CacheState>,
    /// `None` disables caching: every lookup re-resolves
    capacity: Option<usize>,
}

impl Default for ImportCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ImportCache {
    /// A cache holding at most `capacity` packages (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: Some(capacity.max(1)),
        }
    }

    /// A pass-through cache that always asks the resolver.
    pub fn disabled() -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            capacity: None,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity.is_some()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // entries are replaced whole, so a panicking holder cannot leave one torn
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolve `import_path` under `env`, consulting the cache first.
    pub fn resolve(
        &self,
        env: &BuildEnv,
        import_path: &str,
        resolver: &dyn PackageResolver,
    ) -> Result<Arc<Package>> {
        self.resolve_with_id(&env.identity(), env, import_path, resolver)
    }

    fn resolve_with_id(
        &self,
        env_id: &EnvId,
        env: &BuildEnv,
        import_path: &str,
        resolver: &dyn PackageResolver,
    ) -> Result<Arc<Package>> {
        let Some(capacity) = self.capacity else {
            self.lock().stats.misses += 1;
            return resolver.resolve(env, import_path).map(Arc::new);
        };

        let key = CacheKey {
            env: env_id.clone(),
            path: import_path.to_string(),
        };

        {
            let mut state = self.lock();
            let now = state.tick();
            if let Some(entry) = state.entries.get_mut(&key) {
                entry.last_used = now;
                let package = Arc::clone(&entry.package);
                state.stats.hits += 1;
                trace!(import = import_path, env = %env_id, "import cache hit");
                return Ok(package);
            }
            state.stats.misses += 1;
        }

        debug!(import = import_path, env = %env_id, "import cache miss");
        let package = Arc::new(resolver.resolve(env, import_path)?);

        let mut state = self.lock();
        if !state.entries.contains_key(&key) && state.entries.len() >= capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
                state.stats.evictions += 1;
                debug!(import = %oldest.path, "import cache evicted least recently used entry");
            }
        }
        let now = state.tick();
        state.entries.insert(
            key,
            CacheEntry {
                package: Arc::clone(&package),
                last_used: now,
            },
        );

        Ok(package)
    }

    /// Whether a package is cached, without touching its recency.
    pub fn contains(&self, env: &BuildEnv, import_path: &str) -> bool {
        let key = CacheKey {
            env: env.identity(),
            path: import_path.to_string(),
        };
        self.lock().entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Bind the cache to one environment and resolver for a single check.
    pub fn importer<'a>(
        &'a self,
        env: &'a BuildEnv,
        resolver: &'a dyn PackageResolver,
    ) -> CachedImporter<'a> {
        CachedImporter {
            cache: self,
            env,
            env_id: env.identity(),
            resolver,
        }
    }
}

/// `Importer` backed by an `ImportCache`. The environment identity is
/// computed once per check.
pub struct CachedImporter<'a> {
    cache: &'a ImportCache,
    env: &'a BuildEnv,
    env_id: EnvId,
    resolver: &'a dyn PackageResolver,
}

impl Importer for CachedImporter<'_> {
    fn import(&self, path: &str) -> Result<Arc<Package>> {
        self.cache
            .resolve_with_id(&self.env_id, self.env, path, self.resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResolveError;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl CountingResolver {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PackageResolver for CountingResolver {
        fn resolve(&self, _env: &BuildEnv, import_path: &str) -> Result<Package> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if import_path.starts_with("bad") {
                return Err(ResolveError::NotFound {
                    path: import_path.to_string(),
                    searched: Vec::new(),
                });
            }
            Ok(Package::new(import_path, import_path, PathBuf::from("/lib")))
        }
    }

    #[test]
    fn test_second_resolve_is_a_hit() {
        let cache = ImportCache::new(4);
        let resolver = CountingResolver::default();
        let env = BuildEnv::default();

        let first = cache.resolve(&env, "fmt", &resolver).unwrap();
        let second = cache.resolve(&env, "fmt", &resolver).unwrap();

        assert_eq!(resolver.calls(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                evictions: 0
            }
        );
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = ImportCache::new(4);
        let resolver = CountingResolver::default();
        let env = BuildEnv::default();

        assert!(cache.resolve(&env, "bad/pkg", &resolver).is_err());
        assert!(cache.resolve(&env, "bad/pkg", &resolver).is_err());

        assert_eq!(resolver.calls(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_entry_is_evicted() {
        let cache = ImportCache::new(2);
        let resolver = CountingResolver::default();
        let env = BuildEnv::default();

        cache.resolve(&env, "a", &resolver).unwrap();
        cache.resolve(&env, "b", &resolver).unwrap();
        // touch a so b becomes the oldest
        cache.resolve(&env, "a", &resolver).unwrap();
        cache.resolve(&env, "c", &resolver).unwrap();

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&env, "a"));
        assert!(!cache.contains(&env, "b"));
        assert!(cache.contains(&env, "c"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_environments_do_not_share_entries() {
        let cache = ImportCache::new(4);
        let resolver = CountingResolver::default();
        let linux = BuildEnv {
            os: "linux".to_string(),
            ..BuildEnv::default()
        };
        let windows = BuildEnv {
            os: "windows".to_string(),
            ..BuildEnv::default()
        };

        cache.resolve(&linux, "fmt", &resolver).unwrap();
        cache.resolve(&windows, "fmt", &resolver).unwrap();

        assert_eq!(resolver.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_environments_with_non_utf8_roots_do_not_share_entries() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let cache = ImportCache::new(4);
        let resolver = CountingResolver::default();
        let root = PathBuf::from(OsStr::from_bytes(b"/r\xff"));
        let linux = BuildEnv {
            os: "linux".to_string(),
            search_paths: vec![root.clone()],
            ..BuildEnv::default()
        };
        let windows = BuildEnv {
            os: "windows".to_string(),
            search_paths: vec![root],
            ..BuildEnv::default()
        };

        cache.resolve(&linux, "fmt", &resolver).unwrap();
        cache.resolve(&windows, "fmt", &resolver).unwrap();

        assert_eq!(resolver.calls(), 2);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&linux, "fmt"));
        assert!(cache.contains(&windows, "fmt"));
    }

    #[test]
    fn test_disabled_cache_always_resolves() {
        let cache = ImportCache::disabled();
        let resolver = CountingResolver::default();
        let env = BuildEnv::default();

        cache.resolve(&env, "fmt", &resolver).unwrap();
        cache.resolve(&env, "fmt", &resolver).unwrap();

        assert_eq!(resolver.calls(), 2);
        assert!(cache.is_empty());
        assert!(!cache.is_enabled());
    }

    #[test]
    fn test_importer_uses_cache() {
        let cache = ImportCache::new(4);
        let resolver = CountingResolver::default();
        let env = BuildEnv::default();

        {
            let importer = cache.importer(&env, &resolver);
            importer.import("fmt").unwrap();
            importer.import("fmt").unwrap();
        }
        cache.resolve(&env, "fmt", &resolver).unwrap();

        assert_eq!(resolver.calls(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = ImportCache::new(4);
        let resolver = CountingResolver::default();
        let env = BuildEnv::default();

        cache.resolve(&env, "fmt", &resolver).unwrap();
        cache.clear();
        cache.resolve(&env, "fmt", &resolver).unwrap();

        assert_eq!(resolver.calls(), 2);
    }
}
