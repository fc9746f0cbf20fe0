use pkgcheck_core::{BuildEnv, ImportCache, Importer};
use pkgcheck_test_helpers::mocks::CountingResolver;
use std::sync::Arc;
use std::thread;

#[test]
fn test_capacity_overflow_evicts_least_recently_used() {
    let cache = ImportCache::new(100);
    let resolver = CountingResolver::new();
    let env = BuildEnv::default();

    for i in 0..100 {
        cache.resolve(&env, &format!("pkg/{i}"), resolver.as_ref()).unwrap();
    }
    // pkg/0 becomes the most recent, pkg/1 the oldest
    cache.resolve(&env, "pkg/0", resolver.as_ref()).unwrap();
    cache.resolve(&env, "pkg/100", resolver.as_ref()).unwrap();

    assert_eq!(cache.len(), 100);
    assert_eq!(resolver.calls(), 101);
    assert!(cache.contains(&env, "pkg/0"));
    assert!(!cache.contains(&env, "pkg/1"));

    cache.resolve(&env, "pkg/1", resolver.as_ref()).unwrap();
    assert_eq!(resolver.calls(), 102);
    assert_eq!(cache.stats().evictions, 2);
}

#[test]
fn test_failed_resolution_is_retried() {
    let cache = ImportCache::default();
    let resolver = CountingResolver::new();
    let env = BuildEnv::default();
    let importer = cache.importer(&env, resolver.as_ref());

    assert!(importer.import("missing/pkg").is_err());
    assert!(importer.import("missing/pkg").is_err());
    assert_eq!(resolver.calls(), 2);
    assert!(cache.is_empty());
}

#[test]
fn test_concurrent_checks_share_entries() {
    let cache = Arc::new(ImportCache::new(16));
    let resolver = CountingResolver::new();
    let env = BuildEnv::default();

    // warm the cache so every thread hits
    for i in 0..8 {
        cache.resolve(&env, &format!("lib/{i}"), resolver.as_ref()).unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let resolver = Arc::clone(&resolver);
            let env = env.clone();
            thread::spawn(move || {
                for round in 0..100 {
                    let path = format!("lib/{}", round % 8);
                    let package = cache.resolve(&env, &path, resolver.as_ref()).unwrap();
                    assert_eq!(package.import_path, path);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(resolver.calls(), 8);
    assert_eq!(cache.stats().hits, 800);
    assert_eq!(cache.len(), 8);
}

#[test]
fn test_concurrent_misses_stay_within_capacity() {
    let cache = Arc::new(ImportCache::new(4));
    let resolver = CountingResolver::new();

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                let env = BuildEnv::default();
                for i in 0..50 {
                    let path = format!("t{t}/p{i}");
                    cache.resolve(&env, &path, resolver.as_ref()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(cache.len() <= 4);
    assert_eq!(resolver.calls(), 200);
}
