//! Single-pass scanner turning IDL source text into tokens.
//!
//! Comments (`//` to end of line, `/* ... */`) and whitespace are skipped.
//! `@` starts an annotation running to the end of the line; a line whose
//! trimmed text ends in `\` continues onto the next one.

use std::sync::Arc;

use crate::ast::PrimitiveKind;
use crate::token::{Keyword, Location, Symbol, Token, TokenKind};

/// Lexer configuration.
///
/// By default an unterminated string literal or block comment at end of
/// input is accepted and reported as a warning; `strict` turns both into
/// errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LexerOptions {
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{location}: {message}")]
pub struct LexError {
    pub location: Location,
    pub message: String,
}

pub struct Lexer {
    file: Arc<str>,
    chars: Vec<char>,
    index: usize,
    line: u32,
    column: u32,
    options: LexerOptions,
    warnings: Vec<String>,
}

impl Lexer {
    pub fn new(file: impl Into<Arc<str>>, source: &str) -> Self {
        Lexer {
            file: file.into(),
            chars: source.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
            options: LexerOptions::default(),
            warnings: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: LexerOptions) -> Self {
        self.options = options;
        self
    }

    /// Leniency warnings recorded so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Current position; at end of input this is where EOF was reached.
    pub fn location(&self) -> Location {
        Location {
            file: Arc::clone(&self.file),
            line: self.line,
            column: self.column,
        }
    }

    /// Lex the whole input.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        while let Some(ch) = self.peek_char() {
            let location = self.location();
            let symbol = match ch {
                ' ' | '\t' | '\r' | '\n' => {
                    self.consume_char();
                    continue;
                }
                '/' if self.peek_next() == Some('/') => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek_next() == Some('*') => {
                    self.skip_block_comment(&location)?;
                    continue;
                }
                '@' => return self.lex_annotation(location).map(Some),
                '"' => return self.lex_string(location).map(Some),
                '{' => Symbol::LeftBrace,
                '}' => Symbol::RightBrace,
                '(' => Symbol::LeftParen,
                ')' => Symbol::RightParen,
                '?' => Symbol::Question,
                ':' => Symbol::Colon,
                '=' => Symbol::Equals,
                '!' => Symbol::Exclamation,
                ',' => Symbol::Comma,
                '[' => {
                    self.consume_char();
                    if self.peek_char() != Some(']') {
                        return Err(self.error(location, "expected ']' after '['"));
                    }
                    self.consume_char();
                    return Ok(Some(Token {
                        kind: TokenKind::Symbol(Symbol::ArraySuffix),
                        location,
                    }));
                }
                '.' => {
                    for _ in 0..3 {
                        if self.peek_char() != Some('.') {
                            return Err(self.error(location, "expected '...'"));
                        }
                        self.consume_char();
                    }
                    return Ok(Some(Token {
                        kind: TokenKind::Symbol(Symbol::Spread),
                        location,
                    }));
                }
                c if is_ident_start(c) => return Ok(Some(self.lex_word(location))),
                other => {
                    return Err(self.error(location, format!("unexpected character '{other}'")));
                }
            };
            self.consume_char();
            return Ok(Some(Token {
                kind: TokenKind::Symbol(symbol),
                location,
            }));
        }
        Ok(None)
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.consume_char();
        }
    }

    fn skip_block_comment(&mut self, start: &Location) -> Result<(), LexError> {
        // opening "/*"
        self.consume_char();
        self.consume_char();
        while let Some(ch) = self.peek_char() {
            if ch == '*' && self.peek_next() == Some('/') {
                self.consume_char();
                self.consume_char();
                return Ok(());
            }
            self.consume_char();
        }
        self.lenient_eof(start, "unterminated block comment")
    }

    fn lex_annotation(&mut self, location: Location) -> Result<Token, LexError> {
        self.consume_char(); // '@'
        let mut parts: Vec<String> = Vec::new();
        loop {
            let line = self.read_line();
            let trimmed = line.trim();
            match trimmed.strip_suffix('\\') {
                Some(continued) => {
                    parts.push(continued.trim_end().to_string());
                    if self.peek_char() != Some('\n') {
                        break;
                    }
                    self.consume_char();
                }
                None => {
                    parts.push(trimmed.to_string());
                    break;
                }
            }
        }
        Ok(Token {
            kind: TokenKind::Annotation(parts.join(" ")),
            location,
        })
    }

    /// Consume up to (not including) the next newline.
    fn read_line(&mut self) -> String {
        let mut line = String::new();
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            line.push(ch);
            self.consume_char();
        }
        line
    }

    fn lex_string(&mut self, location: Location) -> Result<Token, LexError> {
        self.consume_char(); // opening quote
        let mut text = String::new();
        loop {
            match self.peek_char() {
                None => {
                    self.lenient_eof(&location, "unterminated string literal")?;
                    break;
                }
                Some('"') => {
                    self.consume_char();
                    break;
                }
                Some('\\') => {
                    self.consume_char();
                    match self.peek_char() {
                        Some('n') => text.push('\n'),
                        Some('t') => text.push('\t'),
                        Some(other) => text.push(other),
                        None => continue,
                    }
                    self.consume_char();
                }
                Some(other) => {
                    text.push(other);
                    self.consume_char();
                }
            }
        }
        Ok(Token {
            kind: TokenKind::StringLiteral(text),
            location,
        })
    }

    fn lex_word(&mut self, location: Location) -> Token {
        let mut word = String::new();
        while let Some(ch) = self.peek_char() {
            if !is_ident_continue(ch) {
                break;
            }
            word.push(ch);
            self.consume_char();
        }
        let kind = if let Some(primitive) = PrimitiveKind::from_name(&word) {
            TokenKind::PrimitiveType(primitive)
        } else if let Some(keyword) = Keyword::from_name(&word) {
            TokenKind::Keyword(keyword)
        } else {
            TokenKind::Identifier(word)
        };
        Token { kind, location }
    }

    fn lenient_eof(&mut self, start: &Location, what: &str) -> Result<(), LexError> {
        if self.options.strict {
            return Err(self.error(start.clone(), what));
        }
        tracing::warn!(location = %start, "{what} reaches end of input");
        self.warnings.push(format!("{start}: {what} reaches end of input"));
        Ok(())
    }

    fn error(&self, location: Location, message: impl Into<String>) -> LexError {
        LexError {
            location,
            message: message.into(),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.index += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new("test.idl", source)
            .tokenize()
            .expect("lex")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn classifies_words() {
        assert_eq!(
            kinds("type User uuid fn true"),
            vec![
                TokenKind::Keyword(Keyword::Type),
                TokenKind::Identifier("User".into()),
                TokenKind::PrimitiveType(PrimitiveKind::Uuid),
                TokenKind::Keyword(Keyword::Fn),
                TokenKind::Keyword(Keyword::True),
            ]
        );
    }

    #[test]
    fn lexes_symbols() {
        assert_eq!(
            kinds("{ } ( ) ? : = ! , [] ..."),
            [
                Symbol::LeftBrace,
                Symbol::RightBrace,
                Symbol::LeftParen,
                Symbol::RightParen,
                Symbol::Question,
                Symbol::Colon,
                Symbol::Equals,
                Symbol::Exclamation,
                Symbol::Comma,
                Symbol::ArraySuffix,
                Symbol::Spread,
            ]
            .into_iter()
            .map(TokenKind::Symbol)
            .collect::<Vec<_>>()
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("// line\nint /* block\n still */ string"),
            vec![
                TokenKind::PrimitiveType(PrimitiveKind::Int),
                TokenKind::PrimitiveType(PrimitiveKind::String),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\nb\tc\"d\\e\x""#),
            vec![TokenKind::StringLiteral("a\nb\tc\"d\\ex".into())]
        );
    }

    #[test]
    fn annotation_continues_across_lines() {
        let source = "@description first \\\n   second\\\n third\nint";
        assert_eq!(
            kinds(source),
            vec![
                TokenKind::Annotation("description first second third".into()),
                TokenKind::PrimitiveType(PrimitiveKind::Int),
            ]
        );
    }

    #[test]
    fn tracks_lines_and_columns() {
        let tokens = Lexer::new("f.idl", "type\n  X").tokenize().expect("lex");
        assert_eq!(tokens[1].location, Location::new("f.idl", 2, 3));
        assert_eq!(tokens[1].location.to_string(), "f.idl:2:3");
    }

    #[test]
    fn lone_bracket_is_an_error() {
        let err = Lexer::new("f.idl", "int[ ]").tokenize().unwrap_err();
        assert_eq!(err.location, Location::new("f.idl", 1, 4));
        assert!(err.message.contains("']'"));
    }

    #[test]
    fn partial_spread_is_an_error() {
        assert!(Lexer::new("f.idl", "..User").tokenize().is_err());
        assert!(Lexer::new("f.idl", ".").tokenize().is_err());
    }

    #[test]
    fn unexpected_character_is_an_error() {
        let err = Lexer::new("f.idl", "type # X").tokenize().unwrap_err();
        assert!(err.message.contains("'#'"));
    }

    #[test]
    fn unterminated_constructs_are_lenient_with_warnings() {
        let mut lexer = Lexer::new("f.idl", "int /* never closed");
        assert!(lexer.next_token().expect("int").is_some());
        assert!(lexer.next_token().expect("eof").is_none());
        assert_eq!(lexer.warnings().len(), 1);

        let mut lexer = Lexer::new("f.idl", "\"open");
        let token = lexer.next_token().expect("string").expect("token");
        assert_eq!(token.kind, TokenKind::StringLiteral("open".into()));
        assert!(lexer.warnings()[0].contains("unterminated string"));
    }

    #[test]
    fn strict_mode_rejects_unterminated_constructs() {
        let strict = LexerOptions { strict: true };
        assert!(Lexer::new("f.idl", "/* open").with_options(strict).tokenize().is_err());
        assert!(Lexer::new("f.idl", "\"open").with_options(strict).tokenize().is_err());
    }
}
