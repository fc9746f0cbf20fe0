//! Target assembly: the ordered set of files a check runs over.

use crate::build_env::BuildEnv;
use crate::check::{CheckContext, CheckTarget};
use crate::diagnostics::Diagnostic;
use crate::discovery::discover;
use crate::errors::CheckError;
use crate::parallel::{parse_all, SourceOverrides};
use crate::syntax::{ParseError, ParseMode, SourceFile, SyntaxError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Parsed files of the target's package.
#[derive(Debug, Clone)]
pub struct PackageFiles {
    /// Package name from the target's package clause
    pub name: String,
    /// Siblings in discovery order, then the target
    pub files: Vec<Arc<SourceFile>>,
}

impl PackageFiles {
    pub fn target(&self) -> Option<&Arc<SourceFile>> {
        self.files.last()
    }
}

#[derive(Debug, Clone)]
pub enum Assembly {
    Files(PackageFiles),
    /// Some file did not parse; these are its syntax errors
    Diagnostics(Vec<Diagnostic>),
}

/// Parse the target and its siblings.
///
/// Discovery runs alongside the parse of the target. A directory without a
/// package is not an error: the target is checked alone.
pub fn assemble(
    ctx: &CheckContext<'_>,
    env: &BuildEnv,
    target: &CheckTarget,
) -> Result<Assembly, CheckError> {
    let Some(base_name) = target.path.file_name() else {
        return Err(CheckError::InvalidTarget {
            path: target.path.clone(),
        });
    };
    let dir = target.directory();
    let mode = ParseMode::all_errors(target.all_errors);

    let (listed, parsed) = rayon::join(
        || discover(ctx.lister, env, dir, target.include_tests),
        || ctx.parser.parse_file(&target.path, target.buffer(), mode),
    );

    let target_file = match parsed {
        Ok(file) => Arc::new(file),
        Err(ParseError::Syntax { errors, .. }) => {
            return Ok(Assembly::Diagnostics(syntax_diagnostics(&errors)))
        }
        Err(ParseError::Io { path, source }) => return Err(CheckError::Read { path, source }),
    };

    let siblings: Vec<PathBuf> = match listed {
        Ok(paths) => paths
            .into_iter()
            .filter(|path| path.file_name() != Some(base_name))
            .collect(),
        Err(err) if err.is_no_package() => {
            debug!(dir = %dir.display(), "no package in directory, checking target alone");
            Vec::new()
        }
        Err(err) => return Err(err.into()),
    };

    let mut files = match parse_all(ctx.parser, &siblings, &SourceOverrides::new(), mode) {
        Ok(files) => files,
        Err(ParseError::Syntax { errors, .. }) => {
            return Ok(Assembly::Diagnostics(syntax_diagnostics(&errors)))
        }
        Err(err) => return Err(err.into()),
    };

    let name = target_file.package_name().to_string();
    files.push(target_file);

    Ok(Assembly::Files(PackageFiles { name, files }))
}

fn syntax_diagnostics(errors: &[SyntaxError]) -> Vec<Diagnostic> {
    errors
        .iter()
        .filter_map(|error| Diagnostic::from_position(&error.position, error.message.as_str()))
        .collect()
}
