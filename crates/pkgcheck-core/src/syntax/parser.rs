use super::ast::{
    BinaryOp, Block, Decl, Expr, FuncDecl, Ident, ImportSpec, Stmt, UnaryOp, VarDecl,
};
use super::lexer::{Token, TokenKind};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at offset {}", self.message, self.span.start)
    }
}

impl std::error::Error for ParserError {}

/// Syntax tree of one file, before it is tied to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAst {
    pub package: Ident,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
}

type ParseResult<T> = Result<T, ParserError>;

/// Deepest nesting of blocks, operators and calls the parser accepts.
/// Every later pass walks the tree recursively, so this also bounds them.
pub const MAX_NESTING_DEPTH: usize = 200;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    errors: Vec<ParserError>,
    depth: usize,
}

impl Parser {
    /// `tokens` must end with `Eof`, as produced by the lexer.
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
            errors: Vec::new(),
            depth: 0,
        }
    }

    /// Parse a whole file, recovering at declaration and statement
    /// boundaries. The tree is `None` only when the package clause is
    /// missing; callers must still treat any reported error as a failure.
    pub fn parse(mut self) -> (Option<FileAst>, Vec<ParserError>) {
        let package = match self.package_clause() {
            Ok(package) => package,
            Err(e) => {
                self.errors.push(e);
                return (None, self.errors);
            }
        };

        let mut imports = Vec::new();
        let mut decls = Vec::new();

        while !self.is_at_end() {
            if self.check(&TokenKind::Semi) {
                self.advance();
                continue;
            }
            if self.check(&TokenKind::Import) {
                match self.import_decl() {
                    Ok(spec) => {
                        if !decls.is_empty() {
                            self.errors.push(ParserError {
                                message: "imports must appear before other declarations"
                                    .to_string(),
                                span: spec.span,
                            });
                        }
                        imports.push(spec);
                    }
                    Err(e) => {
                        self.errors.push(e);
                        self.synchronize_decl();
                    }
                }
                continue;
            }
            match self.declaration() {
                Ok(decl) => decls.push(decl),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize_decl();
                }
            }
        }

        (
            Some(FileAst {
                package,
                imports,
                decls,
            }),
            self.errors,
        )
    }

    // Token stream management
    fn current(&self) -> &Token {
        // the stream always ends with Eof, and advance() never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.position += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            return Ok(self.advance());
        }
        Err(self.expected(what))
    }

    fn expected(&self, what: &str) -> ParserError {
        let token = self.current();
        ParserError {
            message: format!("expected {}, found {}", what, token.kind),
            span: token.span,
        }
    }

    /// Count one more level of nesting, failing at the current token once
    /// the limit is reached.
    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParserError {
                message: "exceeded max nesting depth".to_string(),
                span: self.current().span,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse`, then drop whatever nesting it entered.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let depth = self.depth;
        let result = parse(self);
        self.depth = depth;
        result
    }

    fn ident(&mut self) -> ParseResult<Ident> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident {
                    name,
                    span: token.span,
                })
            }
            _ => Err(self.expected("identifier")),
        }
    }

    /// Skip to the next top-level declaration keyword.
    fn synchronize_decl(&mut self) {
        self.advance();
        while !self.is_at_end() {
            match self.current().kind {
                TokenKind::Func | TokenKind::Var | TokenKind::Import => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip to the end of the broken statement inside a block.
    fn synchronize_stmt(&mut self) {
        while !self.is_at_end() {
            match self.current().kind {
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                TokenKind::RBrace | TokenKind::Var | TokenKind::Return | TokenKind::Func => {
                    return
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn package_clause(&mut self) -> ParseResult<Ident> {
        self.consume(TokenKind::Package, "'package'")?;
        self.ident()
    }

    fn import_decl(&mut self) -> ParseResult<ImportSpec> {
        self.consume(TokenKind::Import, "'import'")?;
        let token = self.current().clone();
        match token.kind {
            TokenKind::Str(path) => {
                self.advance();
                if path.is_empty() {
                    return Err(ParserError {
                        message: "invalid import path: empty string".to_string(),
                        span: token.span,
                    });
                }
                Ok(ImportSpec {
                    path,
                    span: token.span,
                })
            }
            _ => Err(self.expected("import path")),
        }
    }

    fn declaration(&mut self) -> ParseResult<Decl> {
        match self.current().kind {
            TokenKind::Var => Ok(Decl::Var(self.var_decl()?)),
            TokenKind::Func => Ok(Decl::Func(self.func_decl()?)),
            _ => Err(self.expected("declaration")),
        }
    }

    fn var_decl(&mut self) -> ParseResult<VarDecl> {
        self.consume(TokenKind::Var, "'var'")?;
        let name = self.ident()?;
        self.consume(TokenKind::Assign, "'='")?;
        let value = self.expression()?;
        Ok(VarDecl { name, value })
    }

    fn func_decl(&mut self) -> ParseResult<FuncDecl> {
        self.consume(TokenKind::Func, "'func'")?;
        let name = self.ident()?;
        self.consume(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.ident()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "')'")?;
        let body = self.block()?;
        Ok(FuncDecl { name, params, body })
    }

    fn block(&mut self) -> ParseResult<Block> {
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> ParseResult<Block> {
        self.enter()?;
        let open = self.consume(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.match_token(&TokenKind::Semi) {
                continue;
            }
            if self.check(&TokenKind::Func) {
                // a func keyword inside a body means the body was never closed
                break;
            }
            match self.statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize_stmt();
                }
            }
        }

        let close = self.consume(TokenKind::RBrace, "'}'")?;
        Ok(Block {
            stmts,
            span: open.span.combine(&close.span),
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        match self.current().kind {
            TokenKind::Var => Ok(Stmt::Var(self.var_decl()?)),
            TokenKind::Return => {
                let keyword = self.advance();
                let value = if self.check(&TokenKind::RBrace)
                    || self.check(&TokenKind::Semi)
                    || self.is_at_end()
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                let span = match &value {
                    Some(expr) => keyword.span.combine(&expr.span()),
                    None => keyword.span,
                };
                Ok(Stmt::Return { value, span })
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.block()?)),
            _ => {
                let expr = self.expression()?;
                if self.check(&TokenKind::Assign) {
                    let assign = self.advance();
                    let Expr::Ident(target) = expr else {
                        return Err(ParserError {
                            message: "cannot assign to expression".to_string(),
                            span: assign.span,
                        });
                    };
                    let value = self.expression()?;
                    return Ok(Stmt::Assign { target, value });
                }
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.nested(Self::binary_chain)
    }

    /// Operators fold to the left, so each one adds a level to the tree.
    fn binary_chain(&mut self) -> ParseResult<Expr> {
        self.enter()?;
        let mut lhs = self.unary()?;
        while let Some(op) = self.binary_op() {
            self.advance();
            self.enter()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        Some(match self.current().kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::EqEq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            _ => return None,
        })
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            _ => return self.nested(Self::postfix),
        };
        let token = self.advance();
        let operand = self.nested(|parser| {
            parser.enter()?;
            parser.unary()
        })?;
        let span = token.span.combine(&operand.span());
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.check(&TokenKind::LParen) {
            self.enter()?;
            self.advance();
            let mut args = Vec::new();
            if !self.check(&TokenKind::RParen) {
                loop {
                    args.push(self.expression()?);
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            let close = self.consume(TokenKind::RParen, "')'")?;
            let span = expr.span().combine(&close.span);
            expr = Expr::Call {
                callee: Box::new(expr),
                args,
                span,
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Ident(_) => {
                let base = self.ident()?;
                if self.match_token(&TokenKind::Dot) {
                    let field = self.ident()?;
                    return Ok(Expr::Selector { base, field });
                }
                Ok(Expr::Ident(base))
            }
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Int(value, token.span))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expr::Str(value, token.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.expected("expression")),
        }
    }
}
