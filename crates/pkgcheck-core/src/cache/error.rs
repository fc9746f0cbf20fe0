use crate::discovery::ListError;
use crate::syntax::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Why an import path could not be resolved. Never cached.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("cannot find package \"{path}\" in any of {}", display_roots(.searched))]
    NotFound { path: String, searched: Vec<PathBuf> },

    #[error("cannot list package \"{path}\": {source}")]
    Listing {
        path: String,
        #[source]
        source: ListError,
    },

    #[error("package \"{path}\" does not parse: {source}")]
    Broken {
        path: String,
        #[source]
        source: ParseError,
    },

    #[error("invalid import path \"{path}\"")]
    InvalidPath { path: String },
}

fn display_roots(roots: &[PathBuf]) -> String {
    if roots.is_empty() {
        return "(no search paths)".to_string();
    }
    roots
        .iter()
        .map(|root| root.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, ResolveError>;
