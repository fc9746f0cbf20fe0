use crate::span::Position;
use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

/// Kind tag attached to every reported diagnostic.
///
/// Only one kind exists today; the tag is kept in the output so editor
/// plugins can group reports once more kinds are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DiagnosticKind {
    #[default]
    #[serde(rename = "pkgcheck.syntax")]
    Syntax,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::Syntax => "pkgcheck.syntax",
        }
    }
}

/// A single positioned problem, shaped for editor plugins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    #[serde(rename = "Fn")]
    pub filename: String,
    #[serde(rename = "Row")]
    pub row: usize,
    #[serde(rename = "Col")]
    pub column: usize,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Kind")]
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// Build a diagnostic from a resolved position.
    ///
    /// Returns `None` when the position is invalid or has no file name;
    /// recovered parse errors routinely produce such positions and they are
    /// dropped rather than reported.
    pub fn from_position(position: &Position, message: impl Into<String>) -> Option<Self> {
        if position.filename.is_empty() || !position.is_valid() {
            return None;
        }
        Some(Self {
            filename: position.filename.clone(),
            row: position.line,
            column: position.column,
            message: message.into(),
            kind: DiagnosticKind::Syntax,
        })
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.filename, self.row, self.column, self.message
        )
    }
}

/// Sort into presentation order: file name, then row, then column.
///
/// Checks return diagnostics in the order the type checker found them; this
/// is only applied when a caller asks for it.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        (a.filename.as_str(), a.row, a.column).cmp(&(b.filename.as_str(), b.row, b.column))
    });
}

/// Accumulates diagnostics, optionally up to a cap.
///
/// `report` returns `ControlFlow::Break` once the cap is reached so the
/// producer can stop early.
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
    limit: Option<usize>,
    truncated: bool,
}

impl DiagnosticCollector {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(limit: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            limit: Some(limit),
            truncated: false,
        }
    }

    pub fn report(&mut self, position: &Position, message: impl Into<String>) -> ControlFlow<()> {
        if self.truncated {
            return ControlFlow::Break(());
        }
        if let Some(diagnostic) = Diagnostic::from_position(position, message) {
            self.diagnostics.push(diagnostic);
        }
        match self.limit {
            Some(limit) if self.diagnostics.len() >= limit => {
                self.truncated = true;
                ControlFlow::Break(())
            }
            _ => ControlFlow::Continue(()),
        }
    }

    /// True once the cap was hit and further reports are refused.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
