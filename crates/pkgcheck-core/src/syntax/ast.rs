use crate::span::{LineIndex, Position, Span};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub path: String,
    pub span: Span,
}

impl ImportSpec {
    /// Name the import binds in the file scope: the last path segment.
    pub fn local_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDecl {
    pub name: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: Ident,
    pub params: Vec<Ident>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Var(VarDecl),
    Func(FuncDecl),
}

impl Decl {
    pub fn name(&self) -> &Ident {
        match self {
            Decl::Var(var) => &var.name,
            Decl::Func(func) => &func.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Var(VarDecl),
    Assign { target: Ident, value: Expr },
    Return { value: Option<Expr>, span: Span },
    Block(Block),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(Ident),
    Int(i64, Span),
    Str(String, Span),
    Selector {
        base: Ident,
        field: Ident,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident(ident) => ident.span,
            Expr::Int(_, span) | Expr::Str(_, span) => *span,
            Expr::Selector { base, field } => base.span.combine(&field.span),
            Expr::Call { span, .. } | Expr::Unary { span, .. } => *span,
            Expr::Binary { lhs, rhs, .. } => lhs.span().combine(&rhs.span()),
        }
    }
}

/// A parsed file. Carries its own line table, so positions resolve without
/// any shared registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub package: Ident,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
    pub lines: LineIndex,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> String {
        self.path.display().to_string()
    }

    /// Base name of the file, used to de-duplicate the target against its siblings.
    pub fn base_name(&self) -> Option<&std::ffi::OsStr> {
        self.path.file_name()
    }

    pub fn position(&self, offset: usize) -> Position {
        let (line, column) = self.lines.line_col(offset);
        Position::new(self.filename(), line, column)
    }

    pub fn package_name(&self) -> &str {
        &self.package.name
    }
}
