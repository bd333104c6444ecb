//! Lightweight SQL tokenizer and parser for dump INSERT statements.
//!
//! This module handles only the syntax that appears in a data dump's
//! INSERT statements:
//! - `INSERT INTO [schema.]table (columns) VALUES` headers
//! - parenthesized value tuples of string, number, boolean and NULL literals,
//!   optionally followed by `::type` casts
//!
//! It is intentionally limited compared to a full SQL parser. Every token
//! keeps its byte span so rewritten output can reuse the exact source text.

mod format;
mod lexer;
mod parser;

pub use format::{FormatSql, quote_identifier};
pub use lexer::{Lexer, LexerError, Token, TokenKind};
pub use parser::{
    Field, Identifier, InsertHeader, LiteralKind, ParseError, Parser, QualifiedName, Tuple,
};
