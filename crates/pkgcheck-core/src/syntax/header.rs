//! Cheap scan of a file's leading section: build constraints, package clause
//! and imports. Used by the package lister without a full parse.

use super::lexer::{Lexer, TokenKind};

const BUILD_PREFIX: &str = "//+build";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    /// Bodies of `//+build` lines seen before the package clause
    pub constraints: Vec<String>,
    /// `None` when the package clause is missing or malformed
    pub package: Option<String>,
    pub imports: Vec<String>,
}

impl Header {
    pub fn imports_path(&self, path: &str) -> bool {
        self.imports.iter().any(|p| p == path)
    }
}

pub fn read_header(source: &str) -> Header {
    let mut header = Header::default();

    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(body) = line.strip_prefix(BUILD_PREFIX) {
            if body.is_empty() || body.starts_with(char::is_whitespace) {
                header.constraints.push(body.trim().to_string());
            }
            continue;
        }
        if line.starts_with("//") {
            continue;
        }
        break;
    }

    let (tokens, _) = Lexer::new(source).tokenize();
    let mut tokens = tokens.into_iter().map(|t| t.kind);

    match (tokens.next(), tokens.next()) {
        (Some(TokenKind::Package), Some(TokenKind::Ident(name))) => header.package = Some(name),
        _ => return header,
    }

    loop {
        match tokens.next() {
            Some(TokenKind::Semi) => continue,
            Some(TokenKind::Import) => match tokens.next() {
                Some(TokenKind::Str(path)) => header.imports.push(path),
                _ => break,
            },
            _ => break,
        }
    }

    header
}
