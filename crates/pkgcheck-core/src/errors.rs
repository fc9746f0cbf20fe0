use crate::config::ConfigError;
use crate::discovery::ListError;
use crate::syntax::ParseError;
use crate::typecheck::CheckerError;
use std::path::PathBuf;
use thiserror::Error;

/// A failure that prevents a check from producing diagnostics at all.
///
/// Errors in the checked source are never reported this way; they come back
/// as diagnostics.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid target {}: not a file path", .path.display())]
    InvalidTarget { path: PathBuf },

    #[error("package discovery failed: {0}")]
    Discovery(#[from] ListError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("type checker failed: {0}")]
    Checker(#[from] CheckerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
