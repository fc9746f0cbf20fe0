//! Source parsing: the `SourceParser` contract and the built-in Mini parser.

pub mod ast;
pub mod header;
pub mod lexer;
pub mod parser;

#[cfg(test)]
mod tests;

use crate::span::{LineIndex, Position, Span};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use ast::SourceFile;
pub use header::{read_header, Header};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{Parser, MAX_NESTING_DEPTH};

/// Extension of Mini source files, without the dot.
pub const SOURCE_EXTENSION: &str = "mini";

/// Without `all_errors` the parser keeps this many errors at most.
pub const DEFAULT_SYNTAX_ERROR_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseMode {
    /// Report every syntax error instead of the first few (one per line)
    pub all_errors: bool,
}

impl ParseMode {
    pub fn all_errors(all_errors: bool) -> Self {
        Self { all_errors }
    }
}

/// One positioned scan or syntax error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub position: Position,
    pub message: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.message)
    }
}

/// Why a file could not be turned into a syntax tree.
///
/// `Syntax` carries positioned errors that become diagnostics; `Io` is opaque
/// and aborts the check.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{}: {} syntax error(s), first: {}", .path.display(), .errors.len(), first_message(.errors))]
    Syntax {
        path: PathBuf,
        errors: Vec<SyntaxError>,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn first_message(errors: &[SyntaxError]) -> &str {
    errors.first().map(|e| e.message.as_str()).unwrap_or("")
}

/// Turns a file (or an in-memory override of it) into a syntax tree.
pub trait SourceParser: Send + Sync {
    /// Parse `path`. When `source` is `Some`, its bytes are used and the file
    /// is not read.
    fn parse_file(
        &self,
        path: &Path,
        source: Option<&[u8]>,
        mode: ParseMode,
    ) -> Result<SourceFile, ParseError>;
}

/// Parser for the Mini language.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniParser;

impl MiniParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse already-decoded source text.
    pub fn parse_source(
        &self,
        path: &Path,
        source: &str,
        mode: ParseMode,
    ) -> Result<SourceFile, ParseError> {
        let lines = LineIndex::new(source);
        let filename = path.display().to_string();

        let (tokens, lex_errors) = Lexer::new(source).tokenize();
        let (ast, parse_errors) = Parser::new(tokens).parse();

        let mut raw: Vec<(Span, String)> = lex_errors
            .into_iter()
            .map(|e| (e.span, e.message))
            .chain(parse_errors.into_iter().map(|e| (e.span, e.message)))
            .collect();

        match ast {
            Some(ast) if raw.is_empty() => Ok(SourceFile {
                path: path.to_path_buf(),
                package: ast.package,
                imports: ast.imports,
                decls: ast.decls,
                lines,
            }),
            _ => {
                raw.sort_by_key(|(span, _)| span.start);
                let errors = limit_errors(
                    raw.into_iter().map(|(span, message)| {
                        let (line, column) = lines.line_col(span.start);
                        SyntaxError {
                            position: Position::new(filename.clone(), line, column),
                            message,
                        }
                    }),
                    mode,
                );
                Err(ParseError::Syntax {
                    path: path.to_path_buf(),
                    errors,
                })
            }
        }
    }
}

impl SourceParser for MiniParser {
    fn parse_file(
        &self,
        path: &Path,
        source: Option<&[u8]>,
        mode: ParseMode,
    ) -> Result<SourceFile, ParseError> {
        let owned;
        let bytes = match source {
            Some(bytes) => bytes,
            None => {
                owned = std::fs::read(path).map_err(|source| ParseError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                &owned[..]
            }
        };

        match std::str::from_utf8(bytes) {
            Ok(text) => self.parse_source(path, text, mode),
            Err(e) => {
                let valid = &bytes[..e.valid_up_to()];
                // the prefix is valid UTF-8 by construction
                let prefix = String::from_utf8_lossy(valid);
                let (line, column) = LineIndex::new(&prefix).line_col(prefix.len());
                Err(ParseError::Syntax {
                    path: path.to_path_buf(),
                    errors: vec![SyntaxError {
                        position: Position::new(path.display().to_string(), line, column),
                        message: "invalid UTF-8 encoding".to_string(),
                    }],
                })
            }
        }
    }
}

/// Keep at most one error per line and at most
/// `DEFAULT_SYNTAX_ERROR_LIMIT` errors, unless every error was requested.
fn limit_errors(errors: impl Iterator<Item = SyntaxError>, mode: ParseMode) -> Vec<SyntaxError> {
    if mode.all_errors {
        return errors.collect();
    }
    let mut kept: Vec<SyntaxError> = Vec::new();
    for error in errors {
        if kept.len() >= DEFAULT_SYNTAX_ERROR_LIMIT {
            break;
        }
        if kept
            .last()
            .is_some_and(|last| last.position.line == error.position.line)
        {
            continue;
        }
        kept.push(error);
    }
    kept
}
