//! Type checking: the `TypeChecker` contract and the built-in Mini checker.

mod checker;
mod scope;

pub use checker::MiniChecker;
pub use scope::{Builtin, Entity, Scope};

use crate::cache::Importer;
use crate::span::Position;
use crate::syntax::SourceFile;
use std::ops::ControlFlow;
use std::sync::Arc;
use thiserror::Error;

/// One semantic error found by a type checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub position: Position,
    pub message: String,
}

impl TypeError {
    pub fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Resolve the `"C"` pseudo-import to a package that accepts any member
    pub fake_import_c: bool,
}

/// A failure of the checker itself, as opposed to an error in the checked code.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("no files to check in package {package}")]
    NoFiles { package: String },
}

/// Checks a set of parsed files as one package.
///
/// Every semantic error goes through `report`. When `report` returns
/// `ControlFlow::Break`, the checker stops and returns `Ok(())`; a `Break` is
/// not a failure.
pub trait TypeChecker: Send + Sync {
    fn check(
        &self,
        package: &str,
        files: &[Arc<SourceFile>],
        importer: &dyn Importer,
        options: &CheckOptions,
        report: &mut dyn FnMut(TypeError) -> ControlFlow<()>,
    ) -> Result<(), CheckerError>;
}
