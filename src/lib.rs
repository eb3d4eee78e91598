//! # rpcidl: RPC interface description language and schema-driven codec
//!
//! A compiler front-end for an IDL describing RPC APIs (types, operations,
//! errors), plus a codec that validates and normalizes values against the
//! compiled schema at the network boundary.
//!
//! ## Pipeline
//!
//! - **Lexer** ([`lexer`]): source text to tokens, with comments, string
//!   escapes and `@annotation` lines (a trailing `\` continues a line).
//! - **Parser** ([`parser`]): recursive descent into a raw [`AstRoot`];
//!   `import "file"` pulls in other files once each.
//! - **Semantic analysis** ([`semantic`]): ten ordered passes that name
//!   anonymous literals, resolve references, expand spreads and reject
//!   invalid schemas (duplicates, secret leaks, empty types, direct
//!   recursion, bad annotations, repeated enum members).
//! - **Flat schema** ([`json`]): [`ast_to_json`] projects the resolved AST
//!   onto a JSON type table, function table, error list and annotation map;
//!   [`json_to_ast`] reads it back.
//! - **Codec** ([`codec`]): [`decode`] / [`encode`] between wire JSON and
//!   [`Value`] for any type expression over the type table.
//!
//! ## Example IDL
//!
//! ```text
//! import "common"
//!
//! type User = {
//!   id: uuid
//!   name: string
//!   password: string !secret
//!   ...Timestamps
//! }
//!
//! error NotFound
//!
//! @description Look a user up by id
//! @throws NotFound
//! @rest GET /users/{id}
//! fn getUser(id: uuid): { id: uuid, name: string }
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! let root = rpcidl::compile_file("api.idl")?;
//! let schema = rpcidl::ast_to_json(&root);
//! let codec = rpcidl::Codec::from_schema(schema);
//! let args = codec.decode_args("getUser", &serde_json::json!({ "id": "..." }));
//! # Ok::<(), rpcidl::CompileError>(())
//! ```

pub mod ast;
pub mod codec;
pub mod json;
pub mod lexer;
pub mod parser;
pub mod rest;
pub mod semantic;
pub mod token;
pub mod value;

use std::path::Path;

pub use ast::{AstRoot, PrimitiveKind, TypeId, TypeKind};
pub use codec::{decode, encode, Codec, CodecError};
pub use json::{ast_to_json, json_to_ast, Schema, TypeDescription, TypeTable};
pub use lexer::{LexError, Lexer, LexerOptions};
pub use parser::{parse_file, parse_str, ParseError, Parser};
pub use semantic::{analyse, SemanticError};
pub use token::{Location, Token, TokenKind};
pub use value::Value;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

/// Parse and analyse source text held in memory.
pub fn compile_str(file: &str, source: &str) -> Result<AstRoot, CompileError> {
    let mut root = parse_str(file, source)?;
    analyse(&mut root)?;
    Ok(root)
}

/// Parse and analyse a schema file and its imports.
pub fn compile_file(path: impl AsRef<Path>) -> Result<AstRoot, CompileError> {
    let mut root = parse_file(path)?;
    analyse(&mut root)?;
    Ok(root)
}

/// Like [`compile_file`] with explicit lexer options.
pub fn compile_file_with(path: impl AsRef<Path>, options: LexerOptions) -> Result<AstRoot, CompileError> {
    let mut root = Parser::from_path(path)?.with_options(options).parse()?;
    analyse(&mut root)?;
    Ok(root)
}
