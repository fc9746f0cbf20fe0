//! Hand-written lexer for Mini source.

use crate::span::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Str(String),

    // keywords
    Package,
    Import,
    Func,
    Var,
    Return,

    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Semi,
    Assign,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    EqEq,
    NotEq,
    Lt,
    Gt,
    Bang,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Ident(name) => return write!(f, "'{}'", name),
            TokenKind::Int(value) => return write!(f, "'{}'", value),
            TokenKind::Str(value) => return write!(f, "{:?}", value),
            TokenKind::Package => "'package'",
            TokenKind::Import => "'import'",
            TokenKind::Func => "'func'",
            TokenKind::Var => "'var'",
            TokenKind::Return => "'return'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Semi => "';'",
            TokenKind::Assign => "'='",
            TokenKind::Dot => "'.'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::EqEq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Bang => "'!'",
            TokenKind::Eof => "EOF",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// A scan error: the lexer reports it and keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Scan the whole input. The token list always ends with `Eof`.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<LexError>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.errors)
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(c) = self.peek_char() else {
                return Token {
                    kind: TokenKind::Eof,
                    span: Span::new(start, start),
                };
            };

            let kind = match c {
                c if c.is_ascii_alphabetic() || c == '_' => self.ident_or_keyword(),
                c if c.is_ascii_digit() => self.number(),
                '"' => self.string(),
                _ => match self.punct(c) {
                    Some(kind) => kind,
                    None => {
                        self.pos += c.len_utf8();
                        self.error(
                            Span::new(start, self.pos),
                            format!("illegal character U+{:04X} '{}'", c as u32, c),
                        );
                        continue;
                    }
                },
            };
            return Token {
                kind,
                span: Span::new(start, self.pos),
            };
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_byte(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(b) = self.peek_byte(0) {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'/' if self.peek_byte(1) == Some(b'/') => {
                    while let Some(b) = self.peek_byte(0) {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(b) = self.peek_byte(0) {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        match &self.source[start..self.pos] {
            "package" => TokenKind::Package,
            "import" => TokenKind::Import,
            "func" => TokenKind::Func,
            "var" => TokenKind::Var,
            "return" => TokenKind::Return,
            name => TokenKind::Ident(name.to_string()),
        }
    }

    fn number(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek_byte(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        match self.source[start..self.pos].parse::<i64>() {
            Ok(value) => TokenKind::Int(value),
            Err(_) => {
                self.error(
                    Span::new(start, self.pos),
                    "integer literal out of range".to_string(),
                );
                TokenKind::Int(0)
            }
        }
    }

    fn string(&mut self) -> TokenKind {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut value = String::new();
        loop {
            let Some(c) = self.peek_char() else {
                self.error(
                    Span::new(start, self.pos),
                    "string literal not terminated".to_string(),
                );
                break;
            };
            match c {
                '"' => {
                    self.pos += 1;
                    break;
                }
                '\n' => {
                    self.error(
                        Span::new(start, self.pos),
                        "string literal not terminated".to_string(),
                    );
                    break;
                }
                '\\' => {
                    self.pos += 1;
                    let escaped = self.peek_char();
                    match escaped {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some(other) => {
                            self.error(
                                Span::new(self.pos - 1, self.pos + other.len_utf8()),
                                "unknown escape sequence".to_string(),
                            );
                        }
                        None => continue,
                    }
                    if let Some(escaped) = escaped {
                        self.pos += escaped.len_utf8();
                    }
                }
                other => {
                    value.push(other);
                    self.pos += other.len_utf8();
                }
            }
        }
        TokenKind::Str(value)
    }

    fn punct(&mut self, c: char) -> Option<TokenKind> {
        let two = |lexer: &mut Self, kind| {
            lexer.pos += 2;
            Some(kind)
        };
        let next = self.peek_byte(1);
        let kind = match c {
            '=' if next == Some(b'=') => return two(self, TokenKind::EqEq),
            '!' if next == Some(b'=') => return two(self, TokenKind::NotEq),
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '=' => TokenKind::Assign,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '!' => TokenKind::Bang,
            _ => return None,
        };
        self.pos += 1;
        Some(kind)
    }

    fn error(&mut self, span: Span, message: String) {
        self.errors.push(LexError { message, span });
    }
}
