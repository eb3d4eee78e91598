//! Tokens produced by the lexer, with their source locations.

use std::fmt;
use std::sync::Arc;

use crate::ast::PrimitiveKind;

/// Position in a source file (1-based line and column).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Location {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Error,
    Enum,
    Type,
    Import,
    Fn,
    True,
    False,
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Self> {
        let keyword = match name {
            "error" => Keyword::Error,
            "enum" => Keyword::Enum,
            "type" => Keyword::Type,
            "import" => Keyword::Import,
            "fn" => Keyword::Fn,
            "true" => Keyword::True,
            "false" => Keyword::False,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn name(self) -> &'static str {
        match self {
            Keyword::Error => "error",
            Keyword::Enum => "enum",
            Keyword::Type => "type",
            Keyword::Import => "import",
            Keyword::Fn => "fn",
            Keyword::True => "true",
            Keyword::False => "false",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    Question,
    Colon,
    Equals,
    Exclamation,
    Comma,
    /// `[]`
    ArraySuffix,
    /// `...`
    Spread,
}

impl Symbol {
    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::LeftBrace => "{",
            Symbol::RightBrace => "}",
            Symbol::LeftParen => "(",
            Symbol::RightParen => ")",
            Symbol::Question => "?",
            Symbol::Colon => ":",
            Symbol::Equals => "=",
            Symbol::Exclamation => "!",
            Symbol::Comma => ",",
            Symbol::ArraySuffix => "[]",
            Symbol::Spread => "...",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(String),
    PrimitiveType(PrimitiveKind),
    Keyword(Keyword),
    Symbol(Symbol),
    /// String literal with escapes already processed.
    StringLiteral(String),
    /// Raw annotation text after `@`, continuation lines joined with a space.
    Annotation(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::PrimitiveType(kind) => write!(f, "type '{kind}'"),
            TokenKind::Keyword(keyword) => write!(f, "keyword '{}'", keyword.name()),
            TokenKind::Symbol(symbol) => write!(f, "'{}'", symbol.as_str()),
            TokenKind::StringLiteral(text) => write!(f, "string {text:?}"),
            TokenKind::Annotation(text) => write!(f, "annotation '@{text}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

impl Token {
    /// Spelling of identifier-like tokens (identifiers, primitive names and
    /// keywords), which are all accepted where a field or member name goes.
    pub fn word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            TokenKind::PrimitiveType(kind) => Some(kind.name()),
            TokenKind::Keyword(keyword) => Some(keyword.name()),
            _ => None,
        }
    }

    pub fn is_symbol(&self, symbol: Symbol) -> bool {
        self.kind == TokenKind::Symbol(symbol)
    }
}
