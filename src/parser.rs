//! Recursive-descent parser producing a raw [`AstRoot`].
//!
//! One token of lookahead is buffered from the [`Lexer`]. The first error
//! aborts the whole parse; there is no recovery. Every node records the
//! location of the token it started at.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ast::*;
use crate::lexer::{LexError, Lexer, LexerOptions};
use crate::token::{Keyword, Location, Symbol, Token, TokenKind};

/// Extension appended to imports written without one.
pub const SOURCE_EXTENSION: &str = "idl";

/// Deepest nesting of struct and enum literals accepted in one type.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("{location}: {message}")]
    Syntax { location: Location, message: String },
    #[error("cannot read {}: {source}", path.display())]
    Import {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    pub fn location(&self) -> Option<&Location> {
        match self {
            ParseError::Lex(err) => Some(&err.location),
            ParseError::Syntax { location, .. } => Some(location),
            ParseError::Import { .. } => None,
        }
    }
}

/// Parse source text held in memory. `file` names it in diagnostics and is
/// the base for relative imports.
pub fn parse_str(file: &str, source: &str) -> Result<AstRoot, ParseError> {
    Parser::new(file, source).parse()
}

/// Parse a schema file and everything it imports.
pub fn parse_file(path: impl AsRef<Path>) -> Result<AstRoot, ParseError> {
    Parser::from_path(path)?.parse()
}

pub struct Parser {
    file: Arc<str>,
    source: String,
    options: LexerOptions,
}

impl Parser {
    pub fn new(file: &str, source: &str) -> Self {
        Parser {
            file: Arc::from(file),
            source: source.to_string(),
            options: LexerOptions::default(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ParseError::Import {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Parser {
            file: Arc::from(path.to_string_lossy().as_ref()),
            source,
            options: LexerOptions::default(),
        })
    }

    pub fn with_options(mut self, options: LexerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn parse(self) -> Result<AstRoot, ParseError> {
        let mut root = AstRoot::new();
        let mut visited = HashSet::new();
        if let Ok(canonical) = Path::new(&*self.file).canonicalize() {
            visited.insert(canonical);
        }
        let lexer = Lexer::new(Arc::clone(&self.file), &self.source).with_options(self.options);
        FileParser::new(lexer, self.options, &mut root, &mut visited)?.run()?;

        if root.error("Fatal").is_none() {
            let location = Location::new(Arc::clone(&self.file), 1, 1);
            let void = root.add_type(TypeKind::Primitive(PrimitiveKind::Void), location.clone());
            root.errors.push(ErrorNode {
                name: "Fatal".to_string(),
                data_type: void,
                annotations: Vec::new(),
                location,
            });
        }
        Ok(root)
    }
}

/// Parser state for one source file. Imports spawn a nested `FileParser`
/// writing into the same root.
struct FileParser<'a> {
    lexer: Lexer,
    current: Option<Token>,
    options: LexerOptions,
    root: &'a mut AstRoot,
    visited: &'a mut HashSet<PathBuf>,
    depth: usize,
}

impl<'a> FileParser<'a> {
    fn new(
        mut lexer: Lexer,
        options: LexerOptions,
        root: &'a mut AstRoot,
        visited: &'a mut HashSet<PathBuf>,
    ) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(FileParser {
            lexer,
            current,
            options,
            root,
            visited,
            depth: 0,
        })
    }

    fn run(mut self) -> Result<(), ParseError> {
        let mut annotations = Vec::new();
        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::Annotation(_) => annotations.push(self.parse_annotation()?),
                TokenKind::Keyword(Keyword::Import) => {
                    self.reject_annotations(&annotations)?;
                    self.parse_import()?;
                }
                TokenKind::Keyword(Keyword::Type) => {
                    let annotations = std::mem::take(&mut annotations);
                    self.parse_type_definition(annotations)?;
                }
                TokenKind::Keyword(Keyword::Fn) => {
                    self.advance()?;
                    let annotations = std::mem::take(&mut annotations);
                    self.parse_operation(annotations, None)?;
                }
                TokenKind::Keyword(Keyword::Error) => {
                    let annotations = std::mem::take(&mut annotations);
                    self.parse_error(annotations)?;
                }
                TokenKind::Identifier(word) if word == "get" || word == "function" => {
                    let prefix = (word == "get").then_some("get");
                    self.advance()?;
                    let annotations = std::mem::take(&mut annotations);
                    self.parse_operation(annotations, prefix)?;
                }
                other => {
                    return Err(self.syntax_error(
                        token.location.clone(),
                        format!("expected a declaration, found {other}"),
                    ));
                }
            }
        }
        self.reject_annotations(&annotations)?;
        let warnings = self.lexer.take_warnings();
        self.root.warnings.extend(warnings);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------

    fn parse_import(&mut self) -> Result<(), ParseError> {
        let keyword = self.advance()?;
        let relative = match self.advance_or_eof("an import path")? {
            Token {
                kind: TokenKind::StringLiteral(path),
                ..
            } => path,
            token => {
                return Err(self.syntax_error(
                    token.location,
                    format!("expected an import path string, found {}", token.kind),
                ));
            }
        };

        let base = Path::new(&*keyword.location.file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut path = base.join(&relative);
        if path.extension().is_none() {
            path.set_extension(SOURCE_EXTENSION);
        }
        let canonical = path.canonicalize().map_err(|source| ParseError::Import {
            path: path.clone(),
            source,
        })?;
        if !self.visited.insert(canonical.clone()) {
            tracing::trace!(path = %canonical.display(), "import already parsed");
            return Ok(());
        }
        tracing::trace!(path = %canonical.display(), "importing");
        let source = std::fs::read_to_string(&canonical).map_err(|source| ParseError::Import {
            path: canonical.clone(),
            source,
        })?;
        let file = path.to_string_lossy().into_owned();
        let lexer = Lexer::new(file, &source).with_options(self.options);
        FileParser::new(lexer, self.options, &mut *self.root, &mut *self.visited)?.run()
    }

    fn parse_type_definition(&mut self, annotations: Vec<Annotation>) -> Result<(), ParseError> {
        let keyword = self.advance()?;
        let name = self.expect_identifier("a type name")?;
        let ty = match self.peek() {
            Some(token) if token.is_symbol(Symbol::Equals) => {
                self.advance()?;
                self.parse_type()?
            }
            // legacy form: `type User { ... }`, `type Color enum { ... }`
            Some(token)
                if token.is_symbol(Symbol::LeftBrace)
                    || token.kind == TokenKind::Keyword(Keyword::Enum) =>
            {
                self.parse_type()?
            }
            _ => return Err(self.unexpected("'=' after the type name")),
        };
        self.root.type_definitions.push(TypeDefinition {
            name,
            ty,
            annotations,
            location: keyword.location,
        });
        Ok(())
    }

    /// Everything after `fn` (or a legacy `get` / `function` word).
    fn parse_operation(
        &mut self,
        annotations: Vec<Annotation>,
        prefix: Option<&str>,
    ) -> Result<(), ParseError> {
        let location = self.current_location();
        let mut name = self.expect_identifier("an operation name")?;
        if let Some(prefix) = prefix {
            name = format!("{prefix}{}", pascal_case(&name));
        }
        self.expect_symbol(Symbol::LeftParen)?;
        let args = self.parse_members(Symbol::RightParen)?;
        let return_type = if self.eat_symbol(Symbol::Colon)? {
            self.parse_type()?
        } else {
            self.void_type(location.clone())
        };
        self.root.operations.push(FunctionOperation {
            name,
            args,
            return_type,
            annotations,
            location,
        });
        Ok(())
    }

    fn parse_error(&mut self, annotations: Vec<Annotation>) -> Result<(), ParseError> {
        let keyword = self.advance()?;
        let name = self.expect_identifier("an error name")?;
        let data_type = if self.eat_symbol(Symbol::Colon)? {
            self.parse_type()?
        } else {
            self.void_type(keyword.location.clone())
        };
        self.root.errors.push(ErrorNode {
            name,
            data_type,
            annotations,
            location: keyword.location,
        });
        Ok(())
    }

    // ---------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------

    fn parse_type(&mut self) -> Result<TypeId, ParseError> {
        let token = self.advance_or_eof("a type")?;
        let location = token.location.clone();
        let mut ty = match token.kind {
            TokenKind::PrimitiveType(kind) => {
                self.root.add_type(TypeKind::Primitive(kind), location.clone())
            }
            TokenKind::Identifier(name) => self.root.add_type(
                TypeKind::Reference(TypeReference { name, target: None }),
                location.clone(),
            ),
            TokenKind::Symbol(Symbol::LeftBrace) => {
                self.enter_literal(&location)?;
                let ty = self.parse_struct_body(location.clone())?;
                self.depth -= 1;
                ty
            }
            TokenKind::Keyword(Keyword::Enum) => {
                self.enter_literal(&location)?;
                let ty = self.parse_enum_body(location.clone())?;
                self.depth -= 1;
                ty
            }
            other => {
                return Err(
                    self.syntax_error(location, format!("expected a type, found {other}"))
                );
            }
        };
        loop {
            if self.eat_symbol(Symbol::Question)? {
                ty = self.root.add_type(TypeKind::Optional(ty), location.clone());
            } else if self.eat_symbol(Symbol::ArraySuffix)? {
                ty = self.root.add_type(TypeKind::Array(ty), location.clone());
            } else {
                return Ok(ty);
            }
        }
    }

    fn enter_literal(&mut self, location: &Location) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.syntax_error(
                location.clone(),
                format!("type literals nested deeper than {MAX_NESTING} levels"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    /// Struct literal after its opening `{`.
    fn parse_struct_body(&mut self, location: Location) -> Result<TypeId, ParseError> {
        let members = self.parse_members(Symbol::RightBrace)?;
        Ok(self.root.add_type(
            TypeKind::Struct(StructType {
                name: None,
                members,
            }),
            location,
        ))
    }

    /// `enum { a b "c" d { x: int } }` after the `enum` keyword.
    fn parse_enum_body(&mut self, location: Location) -> Result<TypeId, ParseError> {
        self.expect_symbol(Symbol::LeftBrace)?;
        let mut values = Vec::new();
        loop {
            let token = self.advance_or_eof("an enum member or '}'")?;
            let value = match &token.kind {
                TokenKind::Symbol(Symbol::RightBrace) => break,
                TokenKind::StringLiteral(text) => text.clone(),
                _ => match token.word() {
                    Some(word) => word.to_string(),
                    None => {
                        return Err(self.syntax_error(
                            token.location,
                            format!("expected an enum member, found {}", token.kind),
                        ));
                    }
                },
            };
            let data = match self.peek() {
                Some(next) if next.is_symbol(Symbol::LeftBrace) => {
                    let brace = self.advance()?;
                    Some(self.parse_struct_body(brace.location)?)
                }
                _ => None,
            };
            values.push(EnumValue {
                value,
                data,
                location: token.location,
            });
            self.eat_symbol(Symbol::Comma)?;
        }
        Ok(self.root.add_type(
            TypeKind::Enum(EnumType { name: None, values }),
            location,
        ))
    }

    /// Fields and spreads up to and including `close`.
    fn parse_members(&mut self, close: Symbol) -> Result<Vec<Member>, ParseError> {
        let mut members = Vec::new();
        loop {
            let mut annotations = Vec::new();
            while matches!(self.peek(), Some(Token { kind: TokenKind::Annotation(_), .. })) {
                annotations.push(self.parse_annotation()?);
            }
            if self.eat_symbol(close)? {
                self.reject_annotations(&annotations)?;
                return Ok(members);
            }
            if self.peek().is_some_and(|token| token.is_symbol(Symbol::Spread)) {
                let spread = self.advance()?;
                self.reject_annotations(&annotations)?;
                let reference_location = self.current_location();
                let name = self.expect_identifier("a type name after '...'")?;
                let reference = self.root.add_type(
                    TypeKind::Reference(TypeReference { name, target: None }),
                    reference_location,
                );
                members.push(Member::Spread(Spread {
                    reference,
                    location: spread.location,
                }));
            } else {
                members.push(Member::Field(self.parse_field(annotations)?));
            }
            self.eat_symbol(Symbol::Comma)?;
        }
    }

    fn parse_field(&mut self, annotations: Vec<Annotation>) -> Result<Field, ParseError> {
        let token = self.advance_or_eof("a field name")?;
        let name = match token.word() {
            Some(word) => word.to_string(),
            None => {
                return Err(self.syntax_error(
                    token.location,
                    format!("expected a field name, found {}", token.kind),
                ));
            }
        };
        self.expect_symbol(Symbol::Colon)?;
        let ty = self.parse_type()?;
        let mut secret = false;
        while self.eat_symbol(Symbol::Exclamation)? {
            let flag_location = self.current_location();
            let flag = self.expect_identifier("a field flag after '!'")?;
            match flag.as_str() {
                "secret" => secret = true,
                other => {
                    return Err(
                        self.syntax_error(flag_location, format!("unknown field flag '!{other}'"))
                    );
                }
            }
        }
        Ok(Field {
            name,
            ty,
            secret,
            annotations,
            location: token.location,
        })
    }

    fn parse_annotation(&mut self) -> Result<Annotation, ParseError> {
        let token = self.advance()?;
        let TokenKind::Annotation(text) = &token.kind else {
            return Err(self.syntax_error(token.location.clone(), "expected an annotation"));
        };
        let text = text.trim();
        let (name, body) = match text.split_once(char::is_whitespace) {
            Some((name, body)) => (name, body.trim()),
            None => (text, ""),
        };
        if name.is_empty() {
            return Err(self.syntax_error(token.location.clone(), "empty annotation"));
        }
        Ok(Annotation::new(name, body, token.location))
    }

    // ---------------------------------------------------------------
    // Token helpers
    // ---------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Return the buffered token and buffer the next one.
    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        match std::mem::replace(&mut self.current, next) {
            Some(token) => Ok(token),
            None => Err(self.syntax_error(self.lexer.location(), "unexpected end of input")),
        }
    }

    fn advance_or_eof(&mut self, expected: &str) -> Result<Token, ParseError> {
        if self.current.is_none() {
            return Err(self.unexpected(expected));
        }
        self.advance()
    }

    fn eat_symbol(&mut self, symbol: Symbol) -> Result<bool, ParseError> {
        if self.peek().is_some_and(|token| token.is_symbol(symbol)) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_symbol(&mut self, symbol: Symbol) -> Result<Token, ParseError> {
        if self.peek().is_some_and(|token| token.is_symbol(symbol)) {
            self.advance()
        } else {
            Err(self.unexpected(&format!("'{}'", symbol.as_str())))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Identifier(_),
                ..
            }) => match self.advance()?.kind {
                TokenKind::Identifier(name) => Ok(name),
                _ => Err(self.unexpected(expected)),
            },
            _ => Err(self.unexpected(expected)),
        }
    }

    fn reject_annotations(&self, annotations: &[Annotation]) -> Result<(), ParseError> {
        match annotations.first() {
            Some(annotation) => Err(self.syntax_error(
                annotation.location.clone(),
                format!("annotation '@{}' is not attached to a declaration", annotation.name),
            )),
            None => Ok(()),
        }
    }

    fn void_type(&mut self, location: Location) -> TypeId {
        self.root.add_type(TypeKind::Primitive(PrimitiveKind::Void), location)
    }

    fn current_location(&self) -> Location {
        match self.peek() {
            Some(token) => token.location.clone(),
            None => self.lexer.location(),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(token) => self.syntax_error(
                token.location.clone(),
                format!("expected {expected}, found {}", token.kind),
            ),
            None => self.syntax_error(
                self.lexer.location(),
                format!("expected {expected}, found end of input"),
            ),
        }
    }

    fn syntax_error(&self, location: Location, message: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            location,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> AstRoot {
        parse_str("test.idl", source).expect("parse")
    }

    #[test]
    fn parses_type_definition_with_modifiers() {
        let root = parse("type Ids = uuid[]?");
        let def = root.type_definition("Ids").expect("Ids");
        assert_eq!(root.type_name(def.ty), "uuid[]?");
    }

    #[test]
    fn modifiers_apply_in_written_order() {
        let root = parse("type A = int?[]");
        let def = root.type_definition("A").expect("A");
        assert!(matches!(root.kind(def.ty), TypeKind::Array(_)));
        assert_eq!(root.type_name(def.ty), "int?[]");
    }

    #[test]
    fn parses_struct_with_spread_and_secret() {
        let root = parse("type User = { ...Base, name: string password: string !secret }");
        let def = root.type_definition("User").expect("User");
        let TypeKind::Struct(structure) = root.kind(def.ty) else {
            panic!("expected struct");
        };
        assert_eq!(structure.members.len(), 3);
        assert!(matches!(structure.members[0], Member::Spread(_)));
        let password = structure.field("password").expect("password");
        assert!(password.secret);
    }

    #[test]
    fn parses_operation_and_defaults_return_to_void() {
        let root = parse("fn ping()\nfn getUser(id: uuid): User");
        let ping = root.operation("ping").expect("ping");
        assert_eq!(root.type_name(ping.return_type), "void");
        let get = root.operation("getUser").expect("getUser");
        assert_eq!(get.arguments().count(), 1);
        assert_eq!(root.type_name(get.return_type), "User");
    }

    #[test]
    fn legacy_forms() {
        let root = parse(
            "type Color enum { red green }\ntype Point { x: float y: float }\nget user(id: uuid): Point\nfunction reset()",
        );
        assert!(root.type_definition("Color").is_some());
        assert!(root.type_definition("Point").is_some());
        assert!(root.operation("getUser").is_some());
        assert!(root.operation("reset").is_some());
    }

    #[test]
    fn enum_members_with_data_and_strings() {
        let root = parse(r#"type Shape = enum { circle { radius: float }, "square", type }"#);
        let def = root.type_definition("Shape").expect("Shape");
        let TypeKind::Enum(enumeration) = root.kind(def.ty) else {
            panic!("expected enum");
        };
        let values: Vec<_> = enumeration.values.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, ["circle", "square", "type"]);
        assert!(enumeration.values[0].data.is_some());
    }

    #[test]
    fn keywords_are_valid_field_names() {
        let root = parse("type T = { type: string, error: int, string: bool }");
        let def = root.type_definition("T").expect("T");
        let structure = root.struct_type(def.ty).expect("struct");
        assert_eq!(structure.fields().count(), 3);
    }

    #[test]
    fn annotations_attach_to_following_item() {
        let root = parse(
            "@description Finds a user\n@throws NotFound\nfn find(\n@description the id\nid: uuid): void\nerror NotFound",
        );
        let op = root.operation("find").expect("find");
        assert_eq!(op.annotations.len(), 2);
        assert_eq!(op.annotations[0].name, "description");
        assert_eq!(op.annotations[0].body, "Finds a user");
        assert_eq!(op.arguments().next().expect("id").annotations.len(), 1);
    }

    #[test]
    fn injects_fatal_error_once() {
        let root = parse("error NotFound: { id: uuid }");
        assert_eq!(root.errors.len(), 2);
        assert_eq!(root.errors[1].name, "Fatal");
        let root = parse("error Fatal");
        assert_eq!(root.errors.len(), 1);
    }

    #[test]
    fn dangling_annotation_is_an_error() {
        assert!(parse_str("t.idl", "type A = int\n@description nothing").is_err());
        assert!(parse_str("t.idl", "type A = { x: int @hidden }").is_err());
    }

    #[test]
    fn reports_location_of_first_error() {
        let err = parse_str("t.idl", "type A = int\ntype B = \n}").unwrap_err();
        let location = err.location().expect("location");
        assert_eq!((location.line, location.column), (3, 1));
    }

    #[test]
    fn unknown_flag_and_missing_pieces_fail() {
        assert!(parse_str("t.idl", "type A = { x: int !hidden }").is_err());
        assert!(parse_str("t.idl", "type A int").is_err());
        assert!(parse_str("t.idl", "fn f(x int)").is_err());
        assert!(parse_str("t.idl", "type A = { x: int").is_err());
        assert!(parse_str("t.idl", "User").is_err());
    }

    #[test]
    fn lexer_warnings_reach_the_root() {
        let root = parse("type A = int /* unterminated");
        assert_eq!(root.warnings.len(), 1);
    }
}
