//! Parallel file parsing using Rayon.
//!
//! Each file is parsed on its own task; results come back in input order.

use crate::syntax::{ParseError, ParseMode, SourceFile, SourceParser};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// In-memory contents that replace what is on disk, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    sources: FxHashMap<PathBuf, Vec<u8>>,
}

impl SourceOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, source: impl Into<Vec<u8>>) {
        self.sources.insert(path.into(), source.into());
    }

    /// The override for `path`. Empty buffers count as absent.
    pub fn get(&self, path: &Path) -> Option<&[u8]> {
        self.sources
            .get(path)
            .map(Vec::as_slice)
            .filter(|source| !source.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Parse every path in parallel.
///
/// The returned files are in the same order as `paths`. The first failure
/// to be observed fails the whole call; results of other tasks are dropped.
pub fn parse_all(
    parser: &dyn SourceParser,
    paths: &[PathBuf],
    overrides: &SourceOverrides,
    mode: ParseMode,
) -> Result<Vec<Arc<SourceFile>>, ParseError> {
    paths
        .par_iter()
        .map(|path| {
            parser
                .parse_file(path, overrides.get(path), mode)
                .map(Arc::new)
        })
        .collect()
}
