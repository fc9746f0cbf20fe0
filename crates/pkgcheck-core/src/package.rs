//! Resolved package metadata handed out by the import cache.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Func { params: usize },
    Var,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
}

/// Everything an importing file may know about a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Path used in the import declaration
    pub import_path: String,
    /// Name from the package clause
    pub name: String,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    /// Exported symbols in declaration order
    pub exports: IndexMap<String, Symbol>,
}

impl Package {
    pub fn new(import_path: impl Into<String>, name: impl Into<String>, dir: PathBuf) -> Self {
        Self {
            import_path: import_path.into(),
            name: name.into(),
            dir,
            files: Vec::new(),
            exports: IndexMap::new(),
        }
    }

    pub fn with_export(mut self, name: impl Into<String>, kind: SymbolKind) -> Self {
        let name = name.into();
        self.exports.insert(
            name.clone(),
            Symbol {
                name,
                kind,
            },
        );
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.exports.get(name)
    }
}

/// Exported names start with an uppercase letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}
