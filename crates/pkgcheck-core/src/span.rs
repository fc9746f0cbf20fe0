//! Byte spans, line tables and resolved source positions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self::default()
    }

    pub fn combine(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A resolved location: file name plus 1-based line and column.
///
/// Line 0 marks an unknown position. Columns count bytes from the start of
/// the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub filename: String,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(filename: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            filename: filename.into(),
            line,
            column,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.line > 0 && self.column > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}:{}", self.filename, self.line, self.column)
        } else if self.filename.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", self.filename)
        }
    }
}

/// Maps byte offsets to line/column pairs for one file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            line_starts,
            len: source.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based (line, column) for `offset`, clamped to the end of the file.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_first_line() {
        let index = LineIndex::new("package a\nfunc f() {}\n");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(8), (1, 9));
    }

    #[test]
    fn test_line_col_after_newline() {
        let index = LineIndex::new("package a\nfunc f() {}\n");
        assert_eq!(index.line_col(10), (2, 1));
        assert_eq!(index.line_col(15), (2, 6));
    }

    #[test]
    fn test_line_col_clamps_past_end() {
        let index = LineIndex::new("ab");
        assert_eq!(index.line_col(99), (1, 3));
    }

    #[test]
    fn test_position_validity() {
        assert!(Position::new("a.mini", 1, 1).is_valid());
        assert!(!Position::new("a.mini", 0, 1).is_valid());
        assert!(!Position::default().is_valid());
    }

    #[test]
    fn test_span_combine() {
        let a = Span::new(4, 8);
        let b = Span::new(2, 5);
        assert_eq!(a.combine(&b), Span::new(2, 8));
        assert_eq!(a.len(), 4);
    }
}
